use crate::backend::{BackendSession, ConnectRequest, PubSubBackend};
use crate::error::BackendError;
use crate::types::{Message, Topic};

/// Run the full backend conformance test suite.
///
/// Call this from your backend's test module with a fresh backend instance.
/// The suite creates topics prefixed with `conformance-` under `project_id`.
///
/// # Errors
///
/// Returns an error if any backend call fails unexpectedly.
pub async fn run_backend_conformance_tests(
    backend: &dyn PubSubBackend,
    project_id: &str,
) -> Result<(), BackendError> {
    test_connect_rejects_empty_project(backend).await?;

    let session = backend.connect(&ConnectRequest::new(project_id)).await?;
    let session = session.as_ref();
    test_get_missing(session, project_id).await?;
    test_create_and_get(session, project_id).await?;
    test_create_existing(session, project_id).await?;
    test_list_contains_created(session, project_id).await?;
    test_publish_batch(session, project_id).await?;
    test_publish_missing_topic(session, project_id).await?;
    Ok(())
}

async fn test_connect_rejects_empty_project(
    backend: &dyn PubSubBackend,
) -> Result<(), BackendError> {
    let result = backend.connect(&ConnectRequest::new("")).await;
    assert!(result.is_err(), "connect with empty project should fail");
    Ok(())
}

async fn test_get_missing(
    session: &dyn BackendSession,
    project_id: &str,
) -> Result<(), BackendError> {
    let topic = Topic::new(project_id, "conformance-missing");
    let found = session.get_topic(&topic).await?;
    assert!(found.is_none(), "get on missing topic should return None");
    Ok(())
}

async fn test_create_and_get(
    session: &dyn BackendSession,
    project_id: &str,
) -> Result<(), BackendError> {
    let topic = Topic::new(project_id, "conformance-create");
    let created = session.create_topic(&topic).await?;
    assert_eq!(created, topic);
    let found = session.get_topic(&topic).await?;
    assert_eq!(found, Some(topic), "created topic should be found");
    Ok(())
}

async fn test_create_existing(
    session: &dyn BackendSession,
    project_id: &str,
) -> Result<(), BackendError> {
    let topic = Topic::new(project_id, "conformance-dup");
    session.create_topic(&topic).await?;
    let second = session.create_topic(&topic).await;
    assert!(
        matches!(second, Err(ref e) if e.is_already_exists()),
        "second create should report already exists, got {second:?}"
    );
    Ok(())
}

async fn test_list_contains_created(
    session: &dyn BackendSession,
    project_id: &str,
) -> Result<(), BackendError> {
    let topic = Topic::new(project_id, "conformance-listed");
    session.create_topic(&topic).await?;

    let mut names = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = session.list_topics(project_id, token.as_deref()).await?;
        names.extend(page.topics.into_iter().map(|t| t.name().to_owned()));
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    assert!(
        names.iter().any(|n| n == "conformance-listed"),
        "listing should include the created topic"
    );
    Ok(())
}

async fn test_publish_batch(
    session: &dyn BackendSession,
    project_id: &str,
) -> Result<(), BackendError> {
    let topic = Topic::new(project_id, "conformance-publish");
    session.create_topic(&topic).await?;
    let messages = vec![
        Message::new("one"),
        Message::new("two").with_attribute("k", "v"),
    ];
    let ids = session.publish(&topic, &messages).await?;
    assert_eq!(ids.len(), 2, "one id per published message");
    Ok(())
}

async fn test_publish_missing_topic(
    session: &dyn BackendSession,
    project_id: &str,
) -> Result<(), BackendError> {
    let topic = Topic::new(project_id, "conformance-never-created");
    let result = session.publish(&topic, &[Message::new("x")]).await;
    assert!(
        matches!(result, Err(ref e) if e.is_not_found()),
        "publish to missing topic should report not found, got {result:?}"
    );
    Ok(())
}
