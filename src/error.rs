//! Error types shared by every layer of the client.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No wallet identity is loaded for this session.
    #[error("wallet is not connected")]
    WalletNotConnected,

    /// User input rejected before anything was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The relay client refused or could not queue a record.
    #[error("relay error: {0}")]
    Relay(String),

    /// The pinning service did not return a locator. `source` is the failure
    /// underneath, when there was one.
    #[error("backup error: {reason}")]
    Backup {
        reason: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// JSON-RPC error object returned by a Solana node.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Non-success HTTP status from a remote API.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("signature error: {0}")]
    Signature(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn backup(reason: impl Into<String>) -> Self {
        Error::Backup {
            reason: reason.into(),
            source: None,
        }
    }

    /// Wraps a failed upload, keeping the cause so callers can still ask
    /// [`Error::is_transient`].
    pub fn backup_failed(source: Error) -> Self {
        match source {
            err @ Error::Backup { .. } => err,
            other => Error::Backup {
                reason: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.status().is_some_and(|s| s.as_u16() == 429 || s.is_server_error())
            }
            Error::Status(code) => *code == 429 || *code >= 500,
            // -32005: node is behind / rate limited
            Error::Rpc { code, .. } => *code == -32005 || *code == 429,
            Error::Relay(_) => true,
            Error::Backup {
                source: Some(source),
                ..
            } => source.is_transient(),
            _ => false,
        }
    }

    /// Short text suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            Error::WalletNotConnected => "Wallet is not connected".to_string(),
            Error::InvalidInput(reason) => format!("Check your input: {reason}"),
            err @ Error::Backup { .. } if err.is_transient() => {
                "Backup service is busy or unreachable; message not sent, try again shortly"
                    .to_string()
            }
            Error::Backup { .. } => "Could not back up the chat; message not sent".to_string(),
            Error::Relay(_) => "Relay unavailable; message not sent".to_string(),
            err if err.is_transient() => {
                "The network is busy or rate limited, try again shortly".to_string()
            }
            err => format!("Request failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_are_transient() {
        assert!(Error::Status(429).is_transient());
        assert!(Error::Status(503).is_transient());
        assert!(!Error::Status(404).is_transient());
        assert!(
            Error::Rpc {
                code: 429,
                message: "Too many requests".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn permanent_errors_keep_their_detail() {
        let err = Error::Rpc {
            code: -32602,
            message: "Invalid param: WrongSize".into(),
        };
        assert!(!err.is_transient());
        assert!(err.user_message().contains("WrongSize"));
        assert_eq!(
            Error::WalletNotConnected.user_message(),
            "Wallet is not connected"
        );
    }

    #[test]
    fn wrapped_backup_failures_stay_retryable() {
        let throttled = Error::backup_failed(Error::Status(429));
        assert!(matches!(throttled, Error::Backup { source: Some(_), .. }));
        assert!(throttled.is_transient());

        let rejected = Error::backup_failed(Error::Status(401));
        assert!(!rejected.is_transient());
        assert_ne!(throttled.user_message(), rejected.user_message());

        let missing_hash = Error::backup_failed(Error::backup("no hash"));
        assert!(matches!(missing_hash, Error::Backup { source: None, .. }));
        assert!(!missing_hash.is_transient());
    }
}
