//! Error kinds raised at the component boundaries.
//!
//! Every variant is recoverable: the component that detects it converts it
//! into a single user-visible message and the session carries on.

/// Errors from talking to the document Q&A service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),
    /// The server answered with a non-success status.
    #[error("{status} {reason}")]
    Status { status: u16, reason: String },
    /// The request could not complete.
    #[error("{0}")]
    Transport(String),
    /// A success status whose body is not the expected JSON.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ClientError::Validation(msg.into())
    }

    pub fn status(status: reqwest::StatusCode) -> Self {
        ClientError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Malformed(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ClientError::validation("no files selected").to_string(),
            "no files selected"
        );
        assert_eq!(
            ClientError::status(reqwest::StatusCode::INTERNAL_SERVER_ERROR).to_string(),
            "500 Internal Server Error"
        );
        assert_eq!(
            ClientError::Transport("connection refused".into()).to_string(),
            "connection refused"
        );
        assert_eq!(
            ClientError::Malformed("expected value".into()).to_string(),
            "malformed response: expected value"
        );
    }

    #[test]
    fn test_nonstandard_status_has_empty_reason() {
        let code = reqwest::StatusCode::from_u16(599).unwrap();
        let err = ClientError::status(code);
        assert_eq!(err.to_string(), "599 ");
    }

    #[test]
    fn test_json_error_is_malformed() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: ClientError = parse.unwrap_err().into();
        assert!(matches!(err, ClientError::Malformed(_)));
        assert!(!err.is_validation());
    }
}
