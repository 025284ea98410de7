//! LLM error types.

use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    /// The provider answered with a non-success status.
    #[error("{status} - {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The provider answered 2xx but the envelope had no message content.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    /// LLM response was not valid JSON for the expected shape.
    #[error("Failed to parse LLM response as JSON: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("LLM request timed out after {0}ms")]
    Timeout(u64),

    /// LLM provider is unavailable.
    #[error("LLM provider unavailable: {0}")]
    Unavailable(String),

    /// Configuration error.
    #[error("LLM configuration error: {0}")]
    ConfigError(String),

    /// Every candidate model of a race failed.
    #[error("all model requests failed for {agent}: {}", failures.join("; "))]
    AllCandidatesFailed {
        /// Agent that ran the race.
        agent: String,
        /// One message per candidate, in settle order.
        failures: Vec<String>,
    },
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(0)
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}
