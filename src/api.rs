//! HTTP client for the symbol suggestion and growth prediction service.

use crate::error::ApiError;
use crate::models::{PredictOutcome, PredictionRequest, Suggestion};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Where the service listens when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

const USER_AGENT: &str = concat!("stonkcast/", env!("CARGO_PKG_VERSION"));

/// The two calls the controller needs from the prediction backend.
pub trait PredictionService: Send + Sync + 'static {
    /// Fetch symbols matching `query`.
    ///
    /// Must resolve to `ApiError::Cancelled` once `cancel` fires.
    fn suggestions(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Vec<Suggestion>, ApiError>> + Send;

    /// Ask for a growth prediction.
    fn predict(
        &self,
        request: &PredictionRequest,
    ) -> impl Future<Output = Result<PredictOutcome, ApiError>> + Send;
}

/// Prediction service reached over HTTP/JSON.
pub struct HttpPredictionService {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPredictionService {
    /// Create a new client for the service at `base_url`.
    pub fn new(base_url: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn suggestions_url(&self, query: &str) -> String {
        format!(
            "{}/get_stock_suggestions?q={}",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    async fn fetch_suggestions(&self, query: &str) -> Result<Vec<Suggestion>, ApiError> {
        let url = self.suggestions_url(query);
        debug!(%url, "fetching suggestions");

        let response = self.client.get(&url).timeout(self.timeout).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_suggestions(&body)
    }
}

impl PredictionService for HttpPredictionService {
    async fn suggestions(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<Suggestion>, ApiError> {
        // Dropping the request future aborts the connection.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = self.fetch_suggestions(query) => result,
        }
    }

    async fn predict(&self, request: &PredictionRequest) -> Result<PredictOutcome, ApiError> {
        let url = format!("{}/predict", self.base_url);
        info!(symbol = %request.symbol, days = request.horizon_days, "requesting prediction");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_prediction(&body)
    }
}

// Service response structures

#[derive(Debug, Deserialize)]
struct SuggestionsResponse {
    #[serde(default)]
    stocks: Option<Vec<Suggestion>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predicted_growth_percent: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

fn parse_suggestions(body: &str) -> Result<Vec<Suggestion>, ApiError> {
    let data: SuggestionsResponse =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;

    match (data.stocks, data.error) {
        (Some(stocks), _) => Ok(stocks),
        (None, Some(error)) => Err(ApiError::Service(error)),
        (None, None) => Err(ApiError::Decode("missing `stocks` field".to_string())),
    }
}

fn parse_prediction(body: &str) -> Result<PredictOutcome, ApiError> {
    let data: PredictResponse =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;

    // An error payload wins over any growth figure sent alongside it.
    if let Some(error) = data.error {
        return Ok(PredictOutcome::Rejected(error));
    }

    data.predicted_growth_percent
        .map(PredictOutcome::Growth)
        .ok_or_else(|| ApiError::Decode("missing `predicted_growth_percent` field".to_string()))
}
