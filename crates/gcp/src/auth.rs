use google_cloud_auth::credentials::service_account::AccessSpecifier;
use google_cloud_auth::credentials::{self, Credentials};
use pubgate_backend::{ConnectRequest, Credentials as CredentialSelector, ServiceAccountKey};
use tracing::info;

use crate::error::GcpBackendError;

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Build GCP credentials for a connect request.
///
/// An explicit service account is turned into a JWT bearer token source
/// from its email and private key. Otherwise Application Default
/// Credentials are discovered from the environment. Both are scoped to
/// `request.scopes`.
///
/// # Errors
///
/// Returns [`GcpBackendError::CredentialError`] if the key is invalid or
/// no default credentials can be found.
pub fn build_gcp_credentials(request: &ConnectRequest) -> Result<Credentials, GcpBackendError> {
    let scopes = request.scopes.as_slice();
    match &request.credentials {
        CredentialSelector::ServiceAccount(key) => {
            info!(email = %key.email(), "building GCP service account credentials");
            credentials::service_account::Builder::new(service_account_json(
                key,
                &request.project_id,
            ))
            .with_access_specifier(AccessSpecifier::from_scopes(scopes.iter().cloned()))
            .build()
            .map_err(|e| {
                GcpBackendError::CredentialError(format!(
                    "failed to build service account credentials: {e}"
                ))
            })
        }
        CredentialSelector::Ambient => {
            info!("using Application Default Credentials (ADC) for GCP");
            credentials::Builder::default()
                .with_scopes(scopes.iter().cloned())
                .build()
                .map_err(|e| {
                    GcpBackendError::CredentialError(format!(
                        "failed to load application default credentials: {e}"
                    ))
                })
        }
    }
}

/// Render a service account key in the JSON key-file layout the credential
/// builder expects.
fn service_account_json(key: &ServiceAccountKey, project_id: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "service_account",
        "project_id": project_id,
        "client_email": key.email(),
        "private_key": key.private_key(),
        "token_uri": TOKEN_URI,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_account_json_layout() {
        let key = ServiceAccountKey::new("svc@proj.iam.gserviceaccount.com", "PEM");
        let json = service_account_json(&key, "proj");
        assert_eq!(json["type"], "service_account");
        assert_eq!(json["client_email"], "svc@proj.iam.gserviceaccount.com");
        assert_eq!(json["private_key"], "PEM");
        assert_eq!(json["project_id"], "proj");
        assert_eq!(json["token_uri"], TOKEN_URI);
    }
}
