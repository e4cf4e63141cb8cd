//! Error types for the REDCap gateway

use fieldalert_domain::{GatewayError, ParticipantId};
use thiserror::Error;

/// REDCap API and decoding errors
#[derive(Debug, Error)]
pub enum RedcapError {
    /// Network failure or timeout
    #[error("Connection error: {0}")]
    Connection(String),

    /// Token rejected
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Non-success HTTP status other than an authentication failure
    #[error("REDCap API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message returned by REDCap
        message: String,
    },

    /// Response body was not what the API documents
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// A record could not be turned into a participant history
    #[error("Malformed record {record}: {reason}")]
    Malformed {
        /// Record identifier
        record: String,
        /// What was wrong with it
        reason: String,
    },

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RedcapError {
    /// Build an error from a non-success response
    ///
    /// REDCap reports failures as `{"error": "..."}`; other bodies are kept
    /// verbatim.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string());

        match status {
            401 | 403 => RedcapError::Auth(message),
            _ => RedcapError::Api { status, message },
        }
    }

    /// Malformed-record error
    pub fn malformed(record: &str, reason: impl Into<String>) -> Self {
        RedcapError::Malformed {
            record: record.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for RedcapError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            RedcapError::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            RedcapError::from_status(status.as_u16(), &e.to_string())
        } else if e.is_decode() {
            RedcapError::Decode(e.to_string())
        } else {
            RedcapError::Connection(e.to_string())
        }
    }
}

impl From<serde_json::Error> for RedcapError {
    fn from(e: serde_json::Error) -> Self {
        RedcapError::Decode(format!("JSON parsing error: {}", e))
    }
}

impl From<RedcapError> for GatewayError {
    fn from(e: RedcapError) -> Self {
        match e {
            RedcapError::Connection(_) | RedcapError::Decode(_) => {
                GatewayError::Transient(e.to_string())
            }
            RedcapError::Api { status, .. } if status >= 500 || status == 429 => {
                GatewayError::Transient(e.to_string())
            }
            RedcapError::Malformed { record, reason } => GatewayError::Malformed {
                participant: ParticipantId::new(record),
                reason,
            },
            RedcapError::Auth(_) | RedcapError::Api { .. } | RedcapError::Config(_) => {
                GatewayError::Fatal(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_extracted() {
        let e = RedcapError::from_status(400, r#"{"error":"The value you provided for fields is invalid"}"#);
        assert!(matches!(
            e,
            RedcapError::Api { status: 400, ref message } if message.starts_with("The value")
        ));
    }

    #[test]
    fn test_forbidden_is_auth() {
        let e = RedcapError::from_status(403, r#"{"error":"You do not have permissions to use the API"}"#);
        assert!(matches!(e, RedcapError::Auth(_)));
        assert!(GatewayError::from(e).is_fatal());
    }

    #[test]
    fn test_gateway_mapping() {
        assert!(matches!(
            GatewayError::from(RedcapError::Connection("timed out".into())),
            GatewayError::Transient(_)
        ));
        assert!(matches!(
            GatewayError::from(RedcapError::from_status(502, "Bad Gateway")),
            GatewayError::Transient(_)
        ));
        assert!(matches!(
            GatewayError::from(RedcapError::malformed("17", "bad date")),
            GatewayError::Malformed { ref participant, .. } if participant.as_str() == "17"
        ));
        assert!(GatewayError::from(RedcapError::from_status(400, "nope")).is_fatal());
    }
}
