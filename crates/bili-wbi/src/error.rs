use std::fmt;

use thiserror::Error;

/// The credential slot a fetch failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    AnonymousCookie,
    WbiKeys,
    Ticket,
    WebId,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AnonymousCookie => "anonymous cookie",
            Self::WbiKeys => "wbi keys",
            Self::Ticket => "ticket",
            Self::WebId => "web id",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum WbiError {
    /// Fetching or parsing a credential failed. The slot is left untouched.
    #[error("failed to fetch {kind}: {reason}")]
    CredentialFetch {
        kind: CredentialKind,
        reason: String,
    },
    #[error("invalid signature input: {0}")]
    SignatureInput(String),
    /// The remote answered with a non-zero code or a non-success status.
    /// For signed calls this usually means a stale key pair or cookie.
    #[error("upstream rejected request (code {code}): {message}")]
    UpstreamRejected { code: i64, message: String },
    #[error("failed after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("client error: {0}")]
    Client(String),
}

impl WbiError {
    pub(crate) fn credential(kind: CredentialKind, reason: impl ToString) -> Self {
        Self::CredentialFetch {
            kind,
            reason: reason.to_string(),
        }
    }

    /// Whether repeating the whole call sequence could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CredentialFetch { .. } | Self::UpstreamRejected { .. } | Self::Http(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_fetch_message() {
        let err = WbiError::credential(CredentialKind::WebId, "missing __RENDER_DATA__");
        assert_eq!(
            err.to_string(),
            "failed to fetch web id: missing __RENDER_DATA__"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_input_errors_are_permanent() {
        let err = WbiError::SignatureInput("empty key".to_string());
        assert!(!err.is_retryable());
    }
}
