//! Error types for the FortiManager API client.
//!
//! FortiManager reports failures as negative status codes in the JSON-RPC
//! result envelope. `FmgError::from_status` translates that numeric table
//! into one typed error at the client boundary so the raw codes never leak
//! past it.

use thiserror::Error;

/// Classification of a non-zero FortiManager status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// -1: internal server error.
    Internal,
    /// -2: session is invalid or expired.
    InvalidSession,
    /// -3: permission denied for this operation.
    PermissionDenied,
    /// -4: requested resource not found.
    NotFound,
    /// -5: invalid parameter value.
    InvalidParameter,
    /// -6: object already exists.
    Duplicate,
    /// -7: object still referenced, cannot delete.
    InUse,
    /// -8: ADOM locked by another user.
    WorkspaceLocked,
    /// -9: ADOM has uncommitted changes.
    WorkspaceDirty,
    /// -10: API version mismatch.
    VersionMismatch,
    /// -11: task timed out on the appliance side.
    TaskTimeout,
    /// -20: invalid username or password.
    BadCredentials,
    /// -21: authentication token expired.
    TokenExpired,
    /// Any code outside the documented table.
    Other,
}

impl ApiErrorKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            -1 => ApiErrorKind::Internal,
            -2 => ApiErrorKind::InvalidSession,
            -3 => ApiErrorKind::PermissionDenied,
            -4 => ApiErrorKind::NotFound,
            -5 => ApiErrorKind::InvalidParameter,
            -6 => ApiErrorKind::Duplicate,
            -7 => ApiErrorKind::InUse,
            -8 => ApiErrorKind::WorkspaceLocked,
            -9 => ApiErrorKind::WorkspaceDirty,
            -10 => ApiErrorKind::VersionMismatch,
            -11 => ApiErrorKind::TaskTimeout,
            -20 => ApiErrorKind::BadCredentials,
            -21 => ApiErrorKind::TokenExpired,
            _ => ApiErrorKind::Other,
        }
    }

    /// Human-readable base message for documented codes.
    fn canonical_message(code: i64) -> Option<&'static str> {
        match code {
            -1 => Some("Internal server error occurred"),
            -2 => Some("Session is invalid or expired"),
            -3 => Some("Permission denied for this operation"),
            -4 => Some("Requested resource not found"),
            -5 => Some("Invalid parameter value"),
            -6 => Some("Object already exists"),
            -7 => Some("Cannot delete object - it is still in use"),
            -8 => Some("ADOM is locked by another user"),
            -9 => Some("ADOM has uncommitted changes"),
            -10 => Some("API version mismatch"),
            -11 => Some("Operation timed out"),
            -20 => Some("Invalid username or password"),
            -21 => Some("Authentication token has expired"),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum FmgError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),

    /// The response parsed as JSON but did not carry the expected
    /// FortiManager envelope (missing `result`, missing `status`, ...).
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid input: {0}")]
    Validation(String),

    /// A non-zero status code returned by the appliance.
    #[error("{message} (code {code})")]
    Api {
        code: i64,
        kind: ApiErrorKind,
        message: String,
    },
}

impl FmgError {
    /// Translate a FortiManager status code into a typed error.
    ///
    /// The composed message keeps the canonical description for documented
    /// codes, appends the appliance's own message when it adds information,
    /// and names the endpoint for context.
    pub fn from_status(code: i64, message: &str, url: Option<&str>) -> Self {
        let kind = ApiErrorKind::from_code(code);

        let base = ApiErrorKind::canonical_message(code).unwrap_or(message);
        let mut composed = if !message.is_empty() && message != base {
            format!("{base}: {message}")
        } else {
            base.to_string()
        };
        if let Some(url) = url {
            composed.push_str(&format!(" (endpoint: {url})"));
        }

        FmgError::Api {
            code,
            kind,
            message: composed,
        }
    }

    fn kind(&self) -> Option<ApiErrorKind> {
        match self {
            FmgError::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True when a delete failed because the object is still referenced.
    pub fn is_in_use(&self) -> bool {
        self.kind() == Some(ApiErrorKind::InUse)
    }

    /// True when a create failed because the name already exists.
    pub fn is_duplicate(&self) -> bool {
        self.kind() == Some(ApiErrorKind::Duplicate)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ApiErrorKind::NotFound)
    }

    pub fn is_permission(&self) -> bool {
        self.kind() == Some(ApiErrorKind::PermissionDenied)
    }

    /// True for any authentication-related failure, whether raised locally
    /// or reported by the appliance.
    pub fn is_auth(&self) -> bool {
        matches!(self, FmgError::Auth(_))
            || matches!(
                self.kind(),
                Some(
                    ApiErrorKind::InvalidSession
                        | ApiErrorKind::BadCredentials
                        | ApiErrorKind::TokenExpired
                )
            )
    }
}

pub type Result<T> = std::result::Result<T, FmgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_codes_classify() {
        let cases = [
            (-1, ApiErrorKind::Internal),
            (-2, ApiErrorKind::InvalidSession),
            (-3, ApiErrorKind::PermissionDenied),
            (-4, ApiErrorKind::NotFound),
            (-5, ApiErrorKind::InvalidParameter),
            (-6, ApiErrorKind::Duplicate),
            (-7, ApiErrorKind::InUse),
            (-8, ApiErrorKind::WorkspaceLocked),
            (-9, ApiErrorKind::WorkspaceDirty),
            (-10, ApiErrorKind::VersionMismatch),
            (-11, ApiErrorKind::TaskTimeout),
            (-20, ApiErrorKind::BadCredentials),
            (-21, ApiErrorKind::TokenExpired),
        ];
        for (code, kind) in cases {
            assert_eq!(ApiErrorKind::from_code(code), kind, "code {code}");
        }
        assert_eq!(ApiErrorKind::from_code(-999), ApiErrorKind::Other);
    }

    #[test]
    fn from_status_composes_message() {
        let err = FmgError::from_status(-4, "no such adom", Some("/dvmdb/adom/missing"));
        let text = err.to_string();
        assert!(text.contains("Requested resource not found"));
        assert!(text.contains("no such adom"));
        assert!(text.contains("/dvmdb/adom/missing"));
        assert!(text.contains("code -4"));
        assert!(err.is_not_found());
    }

    #[test]
    fn from_status_unknown_code_keeps_raw_message() {
        let err = FmgError::from_status(-12345, "vendor oddity", None);
        assert!(err.to_string().contains("vendor oddity"));
        match err {
            FmgError::Api { kind, .. } => assert_eq!(kind, ApiErrorKind::Other),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn from_status_duplicate_message_not_repeated() {
        let err = FmgError::from_status(-6, "Object already exists", None);
        assert_eq!(err.to_string(), "Object already exists (code -6)");
        assert!(err.is_duplicate());
    }

    #[test]
    fn auth_classification_covers_local_and_api_errors() {
        assert!(FmgError::Auth("no credentials".into()).is_auth());
        assert!(FmgError::from_status(-2, "", None).is_auth());
        assert!(FmgError::from_status(-20, "", None).is_auth());
        assert!(FmgError::from_status(-21, "", None).is_auth());
        assert!(!FmgError::from_status(-4, "", None).is_auth());
    }
}
