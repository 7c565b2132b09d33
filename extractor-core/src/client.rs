use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::model::ForecastResponse;

const BASE_URL: &str = "https://api.weatherapi.com/v1";

const ENDPOINT_FORECAST: &str = "forecast.json";
const ENDPOINT_HISTORY: &str = "history.json";

/// Opaque transport-level failure raised by the gateway.
///
/// The HTTP status, when one exists, is exposed through [`GatewayError::status`]
/// so the orchestrator can classify failures without inspecting message text.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to send request to WeatherAPI: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("WeatherAPI request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("failed to parse WeatherAPI response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Http { status, .. } => Some(*status),
            GatewayError::Transport(err) => err.status().map(|s| s.as_u16()),
            GatewayError::Decode(_) => None,
        }
    }
}

/// Abstraction over the remote weather service, so the orchestrator can be
/// exercised against a scripted gateway in tests.
#[async_trait]
pub trait WeatherGateway: Send + Sync {
    async fn fetch_forecast(
        &self,
        location: &str,
        days: i64,
    ) -> Result<ForecastResponse, GatewayError>;

    async fn fetch_history(
        &self,
        location: &str,
        date: &str,
    ) -> Result<ForecastResponse, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    api_token: String,
    http: Client,
}

impl WeatherApiClient {
    pub fn new(api_token: String) -> Self {
        Self { api_token, http: Client::new() }
    }

    async fn get_endpoint(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<ForecastResponse, GatewayError> {
        let url = format!("{BASE_URL}/{endpoint}");

        let res = self.http.get(&url).query(query).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Http {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl WeatherGateway for WeatherApiClient {
    async fn fetch_forecast(
        &self,
        location: &str,
        days: i64,
    ) -> Result<ForecastResponse, GatewayError> {
        let days = days.to_string();
        let query =
            [("key", self.api_token.as_str()), ("q", location), ("days", days.as_str())];
        self.get_endpoint(ENDPOINT_FORECAST, &query).await
    }

    async fn fetch_history(
        &self,
        location: &str,
        date: &str,
    ) -> Result<ForecastResponse, GatewayError> {
        let query = [("key", self.api_token.as_str()), ("q", location), ("dt", date)];
        self.get_endpoint(ENDPOINT_HISTORY, &query).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        let truncated: String = body.chars().take(MAX).collect();
        format!("{truncated}...")
    } else {
        body.to_string()
    }
}
