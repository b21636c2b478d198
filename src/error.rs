use thiserror::Error;

/// Longest slice of a server body kept in an [`Error::Upstream`] message.
const MAX_UPSTREAM_MESSAGE: usize = 500;

/// Errors surfaced by the client, the catalog and the storage helpers.
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The service answered, but not with something usable.
    #[error("upstream error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    /// Connection, DNS or timeout failure from the HTTP layer.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// An rc file or environment setting could not be used.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Bundled reference tables could not be loaded.
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Config {
            message: msg.into(),
        }
    }

    /// Build an upstream error from a status and a raw server body.
    pub(crate) fn upstream(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            "(empty response body)".to_string()
        } else if body.chars().count() > MAX_UPSTREAM_MESSAGE {
            let cut: String = body.chars().take(MAX_UPSTREAM_MESSAGE).collect();
            format!("{cut}…")
        } else {
            body.to_string()
        };
        Error::Upstream { status, message }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Upstream { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_is_trimmed_and_truncated() {
        let e = Error::upstream(500, "  boom \n");
        assert_eq!(e.to_string(), "upstream error (HTTP 500): boom");
        assert_eq!(e.status(), Some(500));

        let long = "x".repeat(MAX_UPSTREAM_MESSAGE + 20);
        match Error::upstream(502, &long) {
            Error::Upstream { message, .. } => {
                assert_eq!(message.chars().count(), MAX_UPSTREAM_MESSAGE + 1)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_body_gets_placeholder() {
        match Error::upstream(404, "") {
            Error::Upstream { message, .. } => assert_eq!(message, "(empty response body)"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
