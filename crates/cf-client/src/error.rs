//! Error type shared by the CF API, UAA and BBS clients.

use thiserror::Error;

/// Errors produced while talking to the CF API, UAA or BBS.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the response body could not be read.
    #[error("request to {endpoint} failed: {source}")]
    Http {
        /// Endpoint path or URL the request was addressed to.
        endpoint: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Endpoint path or URL the request was addressed to.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body did not match the expected JSON shape.
    #[error("failed to decode response from {endpoint}: {reason}")]
    Decode {
        /// Endpoint path or URL the request was addressed to.
        endpoint: String,
        /// Decoder message.
        reason: String,
    },

    /// Token acquisition against UAA failed.
    #[error("authentication failed: {reason}")]
    Auth {
        /// Why the token could not be obtained.
        reason: String,
    },

    /// Certificate or key material could not be loaded.
    #[error("TLS configuration error: {reason}")]
    Tls {
        /// Loader message.
        reason: String,
    },

    /// Invalid client configuration (bad URL, missing credentials).
    #[error("invalid client configuration: {reason}")]
    Config {
        /// What is wrong with the configuration.
        reason: String,
    },

    #[error(transparent)]
    /// Local I/O failure.
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Returns the HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the server reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ClientError::Status {
            endpoint: "/v3/apps".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "/v3/apps returned HTTP 503");
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_detection() {
        let err = ClientError::Status {
            endpoint: "/v2/spaces/abc/summary".to_string(),
            status: 404,
        };
        assert!(err.is_not_found());
    }

    #[test]
    fn test_non_http_errors_have_no_status() {
        let err = ClientError::Auth {
            reason: "bad credentials".to_string(),
        };
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("bad credentials"));
    }
}
