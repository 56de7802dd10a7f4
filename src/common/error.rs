use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("router returned {status}: {body}")]
    RouterStatus { status: u16, body: String },

    #[error("invalid configuration document: {0}")]
    InvalidDocument(String),

    #[error("proxy group not found: {0}")]
    GroupNotFound(String),

    #[error("configuration verification failed: {0}")]
    VerificationFailed(String),

    #[error("update action failed: {0}")]
    UpdateFailed(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// 瞬时错误，外部调用方可以重试
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Get the kind/category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::Json(_) | Error::Yaml(_) => ErrorKind::Decode,
            Error::Http(_) => ErrorKind::Transport,
            Error::RouterStatus { status, .. } if *status >= 500 => ErrorKind::Transport,
            Error::RouterStatus { .. } => ErrorKind::Rejected,
            Error::InvalidDocument(_) => ErrorKind::InvalidDocument,
            Error::GroupNotFound(_) => ErrorKind::GroupNotFound,
            Error::VerificationFailed(_) => ErrorKind::VerificationFailed,
            Error::UpdateFailed(_) => ErrorKind::UpdateFailed,
            Error::Config(_) => ErrorKind::Config,
            Error::Other(_) => ErrorKind::Other,
        }
    }
}

/// Lightweight error category for pattern matching without borrowing the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Decode,
    Transport,
    Rejected,
    InvalidDocument,
    GroupNotFound,
    VerificationFailed,
    UpdateFailed,
    Config,
    Other,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Io | ErrorKind::Transport)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Io => "IO",
            ErrorKind::Decode => "DECODE",
            ErrorKind::Transport => "TRANSPORT",
            ErrorKind::Rejected => "REJECTED",
            ErrorKind::InvalidDocument => "INVALID_DOCUMENT",
            ErrorKind::GroupNotFound => "GROUP_NOT_FOUND",
            ErrorKind::VerificationFailed => "VERIFY_FAILED",
            ErrorKind::UpdateFailed => "UPDATE_FAILED",
            ErrorKind::Config => "CONFIG",
            ErrorKind::Other => "OTHER",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_and_server_errors_are_retryable() {
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.is_retryable());

        let server = Error::RouterStatus {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(server.kind(), ErrorKind::Transport);
        assert!(server.is_retryable());
    }

    #[test]
    fn document_errors_are_permanent() {
        let rejected = Error::RouterStatus {
            status: 400,
            body: "bad config".to_string(),
        };
        assert_eq!(rejected.kind(), ErrorKind::Rejected);
        assert!(!rejected.is_retryable());
        assert!(!Error::GroupNotFound("G".to_string()).is_retryable());
        assert!(!Error::VerificationFailed("x".to_string()).is_retryable());
    }

    #[test]
    fn group_not_found_names_the_group() {
        let err = Error::GroupNotFound("手机002".to_string());
        assert_eq!(err.to_string(), "proxy group not found: 手机002");
        assert_eq!(err.kind().as_str(), "GROUP_NOT_FOUND");
    }
}
