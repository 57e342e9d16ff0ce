use google_cloud_gax::error::Error;
use google_cloud_gax::error::rpc::Code;
use pubgate_backend::BackendError;
use thiserror::Error;

/// Errors specific to GCP backend operations.
#[derive(Debug, Error)]
pub enum GcpBackendError {
    /// The GCP service returned an error.
    #[error("GCP service error: {0}")]
    ServiceError(String),

    /// The request was throttled by the GCP service.
    #[error("GCP request throttled: {0}")]
    Throttled(String),

    /// A network or connection error occurred communicating with GCP.
    #[error("GCP connection error: {0}")]
    Connection(String),

    /// The request timed out.
    #[error("GCP request timed out: {0}")]
    Timeout(String),

    #[error("GCP resource not found: {0}")]
    NotFound(String),

    #[error("GCP resource already exists: {0}")]
    AlreadyExists(String),

    #[error("GCP permission denied: {0}")]
    PermissionDenied(String),

    #[error("GCP invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller's credentials were rejected by the service.
    #[error("GCP unauthenticated: {0}")]
    Unauthenticated(String),

    /// GCP credential resolution failed.
    #[error("credential error: {0}")]
    CredentialError(String),
}

impl From<GcpBackendError> for BackendError {
    fn from(err: GcpBackendError) -> Self {
        match err {
            GcpBackendError::ServiceError(msg) => BackendError::Service(msg),
            GcpBackendError::Throttled(msg) => BackendError::ResourceExhausted(msg),
            GcpBackendError::Connection(msg) => BackendError::Unavailable(msg),
            GcpBackendError::Timeout(msg) => BackendError::Timeout(msg),
            GcpBackendError::NotFound(msg) => BackendError::NotFound(msg),
            GcpBackendError::AlreadyExists(msg) => BackendError::AlreadyExists(msg),
            GcpBackendError::PermissionDenied(msg) => BackendError::PermissionDenied(msg),
            GcpBackendError::InvalidArgument(msg) => BackendError::InvalidArgument(msg),
            GcpBackendError::Unauthenticated(msg) => BackendError::Unauthenticated(msg),
            GcpBackendError::CredentialError(msg) => BackendError::InvalidCredentials(msg),
        }
    }
}

/// Classify a client library error from its typed status.
///
/// The RPC status code wins when the service returned one. Otherwise the
/// transport-level flags and the HTTP status code decide, and only an error
/// carrying none of these falls back to [`classify_gcp_error`].
pub fn classify_client_error(err: &Error) -> GcpBackendError {
    let msg = err.to_string();
    if let Some(status) = err.status() {
        return from_rpc_code(status.code, msg);
    }
    if err.is_timeout() {
        return GcpBackendError::Timeout(msg);
    }
    if err.is_authentication() {
        return GcpBackendError::Unauthenticated(msg);
    }
    if err.is_connect() || err.is_io() || err.is_transport() {
        return GcpBackendError::Connection(msg);
    }
    if let Some(code) = err.http_status_code() {
        return from_http_status(code, msg);
    }
    classify_gcp_error(&msg)
}

fn from_rpc_code(code: Code, msg: String) -> GcpBackendError {
    match code {
        Code::NotFound => GcpBackendError::NotFound(msg),
        Code::AlreadyExists => GcpBackendError::AlreadyExists(msg),
        Code::PermissionDenied => GcpBackendError::PermissionDenied(msg),
        Code::Unauthenticated => GcpBackendError::Unauthenticated(msg),
        Code::InvalidArgument => GcpBackendError::InvalidArgument(msg),
        Code::ResourceExhausted => GcpBackendError::Throttled(msg),
        Code::DeadlineExceeded => GcpBackendError::Timeout(msg),
        Code::Unavailable => GcpBackendError::Connection(msg),
        _ => GcpBackendError::ServiceError(msg),
    }
}

fn from_http_status(code: u16, msg: String) -> GcpBackendError {
    match code {
        400 => GcpBackendError::InvalidArgument(msg),
        401 => GcpBackendError::Unauthenticated(msg),
        403 => GcpBackendError::PermissionDenied(msg),
        404 => GcpBackendError::NotFound(msg),
        409 => GcpBackendError::AlreadyExists(msg),
        429 => GcpBackendError::Throttled(msg),
        408 | 504 => GcpBackendError::Timeout(msg),
        502 | 503 => GcpBackendError::Connection(msg),
        _ => GcpBackendError::ServiceError(msg),
    }
}

/// Canonical status names as they prefix service error messages.
const STATUS_NAMES: [(&str, Code); 8] = [
    ("ALREADY_EXISTS", Code::AlreadyExists),
    ("NOT_FOUND", Code::NotFound),
    ("PERMISSION_DENIED", Code::PermissionDenied),
    ("UNAUTHENTICATED", Code::Unauthenticated),
    ("INVALID_ARGUMENT", Code::InvalidArgument),
    ("RESOURCE_EXHAUSTED", Code::ResourceExhausted),
    ("DEADLINE_EXCEEDED", Code::DeadlineExceeded),
    ("UNAVAILABLE", Code::Unavailable),
];

/// Classify a GCP error string into the appropriate [`GcpBackendError`].
///
/// Used only when an error carries no typed status. The earliest canonical
/// status name in the message decides, since messages lead with the status
/// and may quote resource names afterwards. Without one, a few phrases
/// containing spaces are matched; topic names cannot contain spaces, so a
/// quoted name never matches them. Numeric codes are never matched.
pub fn classify_gcp_error(error_str: &str) -> GcpBackendError {
    let msg = error_str.to_owned();

    if let Some((_, code)) = STATUS_NAMES
        .iter()
        .filter_map(|(name, code)| error_str.find(name).map(|at| (at, *code)))
        .min_by_key(|(at, _)| *at)
    {
        return from_rpc_code(code, msg);
    }

    let lower = error_str.to_lowercase();
    let has = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));
    if has(&["already exists"]) {
        GcpBackendError::AlreadyExists(msg)
    } else if has(&["permission denied", "not authorized"]) {
        GcpBackendError::PermissionDenied(msg)
    } else if has(&["not found"]) {
        GcpBackendError::NotFound(msg)
    } else if has(&["invalid authentication", "invalid_grant"]) {
        GcpBackendError::Unauthenticated(msg)
    } else if has(&["invalid argument"]) {
        GcpBackendError::InvalidArgument(msg)
    } else if has(&["too many requests", "rate exceeded", "quota exceeded"]) {
        GcpBackendError::Throttled(msg)
    } else if has(&["timed out", "deadline exceeded"]) {
        GcpBackendError::Timeout(msg)
    } else if has(&["connection refused", "connection reset", "dns error", "service unavailable"]) {
        GcpBackendError::Connection(msg)
    } else {
        GcpBackendError::ServiceError(msg)
    }
}
