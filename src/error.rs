//! Error types shared by the service client and the controller.

use thiserror::Error;

/// Input problems caught before any request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a stock!")]
    NoSelection,
    #[error("Please enter a valid prediction period!")]
    InvalidHorizon,
}

/// Why a predict action did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("a prediction is already in progress")]
    InFlight,
}

/// Failures talking to the suggestion/prediction service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was abandoned through its cancellation token.
    #[error("request cancelled")]
    Cancelled,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response: {0}")]
    Decode(String),
    /// The suggestion endpoint answered with an error payload instead of results.
    #[error("service error: {0}")]
    Service(String),
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}
