use thiserror::Error;

/// Errors surfaced by the QR sharing core.
///
/// None of these are fatal: every variant is reported to the user and the
/// UI returns to a stable idle state.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Scan rejected: {message}")]
    ScanRejected { message: String },

    #[error("QR session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl ShareError {
    /// Create a new Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new Auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn camera(message: impl Into<String>) -> Self {
        Self::Camera(message.into())
    }

    pub fn scan_rejected(message: impl Into<String>) -> Self {
        Self::ScanRejected {
            message: message.into(),
        }
    }

    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the user can carry on without changing anything.
    ///
    /// A cancel that hits an already expired or cancelled session is the
    /// typical case: the session is gone either way.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Configuration(_) | Self::UrlError(_))
    }

    /// Whether the error was raised before any request left the client.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Configuration(_) | Self::UrlError(_)
        )
    }

    /// Get error category for logging and user-facing grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Auth(_) => ErrorCategory::Auth,
            Self::Network(_) => ErrorCategory::Network,
            Self::Server { .. } | Self::InvalidResponse(_) => ErrorCategory::Server,
            Self::Camera(_) => ErrorCategory::Camera,
            Self::ScanRejected { .. } => ErrorCategory::ScanRejected,
            Self::SessionNotFound { .. } => ErrorCategory::NotFound,
            Self::Configuration(_) | Self::UrlError(_) => ErrorCategory::Configuration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Auth,
    Network,
    Server,
    Camera,
    ScanRejected,
    NotFound,
    Configuration,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Auth => write!(f, "auth"),
            Self::Network => write!(f, "network"),
            Self::Server => write!(f, "server"),
            Self::Camera => write!(f, "camera"),
            Self::ScanRejected => write!(f, "scan_rejected"),
            Self::NotFound => write!(f, "not_found"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, ShareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = ShareError::validation("Please select at least one data type to share");
        assert_eq!(
            err.to_string(),
            "Validation error: Please select at least one data type to share"
        );
        assert!(err.is_preflight());
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_server_error_message() {
        let err = ShareError::server(500, "boom");
        assert_eq!(err.to_string(), "Server error (HTTP 500): boom");
        assert!(!err.is_preflight());
        assert_eq!(err.category(), ErrorCategory::Server);
    }

    #[test]
    fn test_session_not_found_is_recoverable() {
        let err = ShareError::session_not_found("abc123");
        assert!(err.to_string().contains("abc123"));
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_url_error_conversion() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: ShareError = url_err.into();

        assert!(matches!(err, ShareError::UrlError(_)));
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_error_categories_display() {
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::Auth.to_string(), "auth");
        assert_eq!(ErrorCategory::Network.to_string(), "network");
        assert_eq!(ErrorCategory::Camera.to_string(), "camera");
        assert_eq!(ErrorCategory::ScanRejected.to_string(), "scan_rejected");
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
    }

    #[test]
    fn test_scan_rejected_and_camera() {
        let err = ShareError::scan_rejected("QR code expired");
        assert_eq!(err.to_string(), "Scan rejected: QR code expired");
        assert_eq!(err.category(), ErrorCategory::ScanRejected);

        let err = ShareError::camera("permission denied");
        assert_eq!(err.to_string(), "Camera error: permission denied");
        assert_eq!(err.category(), ErrorCategory::Camera);
    }
}
