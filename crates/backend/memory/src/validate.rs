use pubgate_backend::{BackendError, Message};

/// Largest batch the service accepts in one publish request.
pub const MAX_BATCH_MESSAGES: usize = 1000;

/// Check a topic's short name against the service's naming rules: 3 to 255
/// characters, starting with a letter, drawn from `[A-Za-z0-9-_.~+%]`, and
/// not starting with `goog`.
pub fn topic_name(name: &str) -> Result<(), BackendError> {
    let invalid = |reason: &str| {
        Err(BackendError::InvalidArgument(format!(
            "invalid topic name '{name}': {reason}"
        )))
    };

    if !(3..=255).contains(&name.len()) {
        return invalid("must be between 3 and 255 characters");
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return invalid("must start with a letter");
    }
    if name.starts_with("goog") {
        return invalid("must not start with 'goog'");
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || "-_.~+%".contains(*c)))
    {
        return invalid(&format!("contains disallowed character '{c}'"));
    }
    Ok(())
}

/// Check a publish batch. A message must carry data or at least one attribute.
pub fn batch(messages: &[Message]) -> Result<(), BackendError> {
    if messages.len() > MAX_BATCH_MESSAGES {
        return Err(BackendError::InvalidArgument(format!(
            "batch of {} messages exceeds the limit of {MAX_BATCH_MESSAGES}",
            messages.len()
        )));
    }
    if let Some(index) = messages
        .iter()
        .position(|m| m.data.is_empty() && m.attributes.is_empty())
    {
        return Err(BackendError::InvalidArgument(format!(
            "message at index {index} has neither data nor attributes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        assert!(topic_name("events").is_ok());
        assert!(topic_name("a.b-c_d~e+f%g9").is_ok());
    }

    #[test]
    fn rejects_bad_names() {
        assert!(topic_name("ab").is_err());
        assert!(topic_name(&"a".repeat(256)).is_err());
        assert!(topic_name("1events").is_err());
        assert!(topic_name("google-events").is_err());
        assert!(topic_name("has space").is_err());
        assert!(topic_name("slash/name").is_err());
    }

    #[test]
    fn batch_rules() {
        assert!(batch(&[]).is_ok());
        assert!(batch(&[Message::new("x")]).is_ok());
        assert!(batch(&[Message::default().with_attribute("k", "v")]).is_ok());

        let err = batch(&[Message::new("x"), Message::default()]).unwrap_err();
        assert!(err.to_string().contains("index 1"));

        let big = vec![Message::new("x"); MAX_BATCH_MESSAGES + 1];
        assert!(matches!(batch(&big), Err(BackendError::InvalidArgument(_))));
    }
}
