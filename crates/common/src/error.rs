//! Error types for the NetBox provider

use thiserror::Error;

/// Result type alias using the provider Error
pub type Result<T> = std::result::Result<T, Error>;

/// Provider error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Resource not found: {kind} with id {id}")]
    NotFound { kind: String, id: String },

    #[error("NetBox API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid resource id: {0:?}")]
    InvalidId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tag error: {0}")]
    Tag(String),

    /// The remote object exists but its state could not be read back
    #[error("{kind} {id} was created but could not be read back: {source}")]
    CreatedUnread {
        kind: String,
        id: String,
        source: Box<Error>,
    },
}

impl Error {
    pub fn not_found(kind: impl Into<String>, id: impl ToString) -> Self {
        Error::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    /// True when the remote reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Id of an object left behind by a create whose read-back failed.
    pub fn created_id(&self) -> Option<&str> {
        match self {
            Error::CreatedUnread { id, .. } => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = Error::not_found("device", 42);
        assert!(err.is_not_found());
        assert!(err.created_id().is_none());
        assert_eq!(err.to_string(), "Resource not found: device with id 42");
    }

    #[test]
    fn test_api_error_is_not_not_found() {
        let err = Error::Api {
            status: 500,
            body: "boom".to_string(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_invalid_id_message() {
        let err = Error::InvalidId("abc".to_string());
        assert!(err.to_string().contains("\"abc\""));
    }

    #[test]
    fn test_created_unread_keeps_id() {
        let err = Error::CreatedUnread {
            kind: "device".to_string(),
            id: "42".to_string(),
            source: Box::new(Error::Api {
                status: 500,
                body: "boom".to_string(),
            }),
        };
        assert_eq!(err.created_id(), Some("42"));
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "device 42 was created but could not be read back: NetBox API returned 500: boom"
        );
    }
}
