//! Error types for deploydash-gateway.

use thiserror::Error;

/// Failures talking to the VCS platform or the ticket tracker.
///
/// "Not found" on content lookups is not an error; it comes back as
/// `Lookup::NotApplicable` from the gateway methods that can see it.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The repository URL is not an `https://host/owner/repo` URL.
    #[error("invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: &'static str },

    /// The server answered with a non-success status.
    #[error("GET {url} returned HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    /// DNS, TLS, connect, or timeout failure.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The body did not have the expected shape.
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    /// A required setting is missing.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401: credentials were rejected.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub(crate) fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                GatewayError::Status {
                    url: url.to_string(),
                    status,
                    message: api_message(&body),
                }
            }
            ureq::Error::Transport(transport) => GatewayError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            },
        }
    }
}

/// The `message` field of a JSON error body, or the body itself, truncated.
fn api_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    body.chars().take(200).collect()
}
