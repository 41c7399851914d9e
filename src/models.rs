//! Data models for symbol suggestions and growth predictions.

use crate::error::ValidationError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A symbol match returned by the suggestion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Opaque ticker identifier (e.g., "AAPL", "RELIANCE.NS")
    pub symbol: String,
    /// Display label
    pub name: String,
}

#[cfg(test)]
impl Suggestion {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

/// The suggestion the user explicitly picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub symbol: String,
    pub name: String,
}

/// A validated prediction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(rename = "stock")]
    pub symbol: String,
    #[serde(rename = "prediction_period")]
    pub horizon_days: u32,
}

/// What the prediction service answered.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictOutcome {
    /// Predicted growth in percent
    Growth(f64),
    /// The service declined with an explicit message
    Rejected(String),
}

/// Parse the horizon field into whole days.
///
/// Any finite number is accepted and truncated toward zero, so "1.5" is one
/// day. The truncated value must be at least 1.
pub fn parse_horizon(input: &str) -> Result<u32, ValidationError> {
    let value = input
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidHorizon)?;
    if !value.is_finite() {
        return Err(ValidationError::InvalidHorizon);
    }

    let days = value.trunc();
    if days < 1.0 || days > f64::from(u32::MAX) {
        return Err(ValidationError::InvalidHorizon);
    }
    Ok(days as u32)
}

/// Format a growth figure with an explicit sign.
///
/// Non-negative values get a leading `+`; negative values keep their own `-`.
pub fn format_growth(growth: f64) -> String {
    if growth >= 0.0 {
        // abs() folds -0.0 into +0
        format!("+{}%", growth.abs())
    } else {
        format!("{}%", growth)
    }
}

/// Status line shown under the prediction form.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PredictionStatus {
    #[default]
    Empty,
    Invalid(ValidationError),
    Predicting,
    Growth(f64),
    Rejected(String),
    Failed,
}

impl PredictionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PredictionStatus::Invalid(_) | PredictionStatus::Rejected(_) | PredictionStatus::Failed
        )
    }
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionStatus::Empty => Ok(()),
            PredictionStatus::Invalid(e) => write!(f, "❌ {}", e),
            PredictionStatus::Predicting => write!(f, "⏳ Predicting..."),
            PredictionStatus::Growth(g) => write!(f, "✅ Predicted Growth: {}", format_growth(*g)),
            PredictionStatus::Rejected(msg) => write!(f, "❌ Error: {}", msg),
            PredictionStatus::Failed => write!(f, "❌ Failed to fetch prediction!"),
        }
    }
}

/// A finished prediction, kept for the session history pane.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub symbol: String,
    pub name: String,
    pub horizon_days: u32,
    pub growth_percent: f64,
    pub at: DateTime<Local>,
}
