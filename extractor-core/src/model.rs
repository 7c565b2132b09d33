use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// One set of fetch parameters, produced per item by the parameter source
/// and consumed once by the orchestrator. Exactly one of `forecast_days` /
/// `historical_date` is populated, depending on the global request type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParameters {
    pub location: String,
    pub forecast_days: Option<i64>,
    pub historical_date: Option<String>,
}

impl FetchParameters {
    pub fn for_forecast(location: impl Into<String>, days: i64) -> Self {
        Self { location: location.into(), forecast_days: Some(days), historical_date: None }
    }

    pub fn for_history(location: impl Into<String>, date: impl Into<String>) -> Self {
        Self { location: location.into(), forecast_days: None, historical_date: Some(date.into()) }
    }
}

impl fmt::Display for FetchParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{location: {}", self.location)?;
        if let Some(days) = self.forecast_days {
            write!(f, ", forecast_days: {days}")?;
        }
        if let Some(date) = &self.historical_date {
            write!(f, ", historical_date: {date}")?;
        }
        write!(f, "}}")
    }
}

/// Response shape shared by the forecast and history endpoints; a history
/// response carries exactly one `forecastday` entry.
///
/// Day aggregates, astro and hour entries are kept as raw JSON maps: the
/// upstream field set varies between calls and every field must survive into
/// the flat output tables.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub location: Location,
    pub forecast: Forecast,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Forecast {
    pub forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastDay {
    pub date: String,
    pub day: Map<String, Value>,
    pub astro: Map<String, Value>,
    #[serde(default)]
    pub hour: Vec<Map<String, Value>>,
}
