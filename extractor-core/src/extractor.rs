use chrono::Utc;
use log::{info, warn};
use serde_json::Value;
use std::path::Path;

use crate::client::{GatewayError, WeatherGateway};
use crate::config::{Config, LoadType, RequestType};
use crate::error::ExtractorError;
use crate::flatten::{Row, flatten};
use crate::model::{FetchParameters, ForecastResponse};
use crate::params::ParameterIter;
use crate::sink::TableSink;

pub const TABLE_DAILY: &str = "weather_daily";
pub const TABLE_HOURLY: &str = "weather_hourly";
pub const TABLE_ASTRONOMICAL: &str = "weather_astronomical";
pub const TABLE_FAILED: &str = "failed_fetches";

const FAILED_COLUMNS: &[&str] = &["parameters", "error", "fetching_timestamp"];

/// Sequential fetch loop: one parameter set at a time, success routed to the
/// three data sinks, failure either recorded (continue-on-failure) or
/// escalated to abort the run. Already-written rows are never rolled back.
pub struct Extractor<G> {
    config: Config,
    gateway: G,
    daily: TableSink,
    hourly: TableSink,
    astronomical: TableSink,
    failed: Option<TableSink>,
    extraction_timestamp: i64,
}

impl<G: WeatherGateway> Extractor<G> {
    pub fn new(config: Config, gateway: G, output_dir: &Path) -> Result<Self, ExtractorError> {
        std::fs::create_dir_all(output_dir)?;

        let incremental = config.destination_settings.load_type == LoadType::IncrementalLoad;
        let failed = config.fetching_settings.continue_on_failure.then(|| {
            let mut sink = TableSink::new(output_dir, TABLE_FAILED, incremental);
            sink.seed_columns(FAILED_COLUMNS);
            sink
        });

        Ok(Self {
            config,
            gateway,
            daily: TableSink::new(output_dir, TABLE_DAILY, incremental),
            hourly: TableSink::new(output_dir, TABLE_HOURLY, incremental),
            astronomical: TableSink::new(output_dir, TABLE_ASTRONOMICAL, incremental),
            failed,
            // One instant for the whole run; every row and failure record
            // shares it.
            extraction_timestamp: Utc::now().timestamp(),
        })
    }

    /// Consume the parameter source in order and finalize all output tables.
    ///
    /// Rows written before a strict-mode abort stay on disk: the sinks are
    /// flushed on both the success and the failure path.
    pub async fn run(mut self, parameters: ParameterIter) -> Result<(), ExtractorError> {
        let outcome = self.run_loop(parameters).await;
        let closed = self.close();
        outcome.and(closed)
    }

    async fn run_loop(&mut self, parameters: ParameterIter) -> Result<(), ExtractorError> {
        for item in parameters {
            // Source-level errors (config shape, unreadable rows) always abort.
            let item = item?;

            info!("fetching weather data with parameters: {item}");
            if let Err(err) = self.fetch_and_write(&item).await {
                if self.config.fetching_settings.continue_on_failure {
                    warn!("fetch failed for {item}, recording and continuing: {err}");
                    self.record_failure(&item, &err);
                } else {
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn fetch_and_write(&mut self, parameters: &FetchParameters) -> Result<(), ExtractorError> {
        let response = self.fetch(parameters).await?;
        let tables = flatten(&response, self.extraction_timestamp)
            .map_err(|err| ExtractorError::Fetch(err.to_string()))?;

        self.daily.write_rows(tables.daily);
        self.hourly.write_rows(tables.hourly);
        self.astronomical.write_rows(tables.astronomical);
        Ok(())
    }

    async fn fetch(&self, parameters: &FetchParameters) -> Result<ForecastResponse, ExtractorError> {
        let request_type = self.config.fetching_settings.request_type;

        let result = match request_type {
            RequestType::Forecast => {
                let days = parameters.forecast_days.ok_or_else(|| {
                    ExtractorError::Fetch("missing forecast_days parameter".to_string())
                })?;
                self.gateway.fetch_forecast(&parameters.location, days).await
            }
            RequestType::History => {
                let date = parameters.historical_date.as_deref().ok_or_else(|| {
                    ExtractorError::Fetch("missing historical_date parameter".to_string())
                })?;
                self.gateway.fetch_history(&parameters.location, date).await
            }
        };

        result.map_err(|err| ExtractorError::Fetch(classify_gateway_error(&err, request_type)))
    }

    fn record_failure(&mut self, parameters: &FetchParameters, error: &ExtractorError) {
        if let Some(failed) = self.failed.as_mut() {
            let mut row = Row::new();
            row.insert("parameters".to_string(), Value::String(parameters.to_string()));
            row.insert("error".to_string(), Value::String(error.to_string()));
            row.insert(
                "fetching_timestamp".to_string(),
                Value::from(self.extraction_timestamp),
            );
            failed.write_row(row);
        }
    }

    fn close(self) -> Result<(), ExtractorError> {
        self.daily.close()?;
        self.hourly.close()?;
        self.astronomical.close()?;
        if let Some(failed) = self.failed {
            failed.close()?;
        }
        Ok(())
    }
}

/// Map an opaque gateway failure to a user-facing message. Operates on the
/// typed status code only and falls back to the raw message for anything it
/// does not recognize.
pub fn classify_gateway_error(error: &GatewayError, request_type: RequestType) -> String {
    match (error.status(), request_type) {
        (Some(403), _) => "Authorization Error: Invalid API token".to_string(),
        (Some(400), RequestType::Forecast) => {
            "Parameters Error: Invalid Location or Days parameter".to_string()
        }
        (Some(400), RequestType::History) => {
            "Parameters Error: Invalid Location or Historical Date parameter".to_string()
        }
        _ => format!("Error: {error}"),
    }
}

/// Connectivity check: one minimal forecast fetch, no output written.
/// Authorization failures are reported distinctly from other errors.
pub async fn test_connection<G: WeatherGateway>(gateway: &G) -> Result<(), ExtractorError> {
    match gateway.fetch_forecast("Paris", 1).await {
        Ok(_) => Ok(()),
        Err(err) if err.status() == Some(403) => {
            Err(ExtractorError::Fetch("Authorization Error: Invalid API token".to_string()))
        }
        Err(err) => Err(ExtractorError::Fetch(format!("Error: {err}"))),
    }
}
