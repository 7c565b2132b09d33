use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{ForecastResponse, Location};

/// One flat output row; keys become CSV columns.
pub type Row = Map<String, Value>;

/// The three row-sets produced from one response, in encounter order.
#[derive(Debug, Default)]
pub struct FlatTables {
    pub daily: Vec<Row>,
    pub hourly: Vec<Row>,
    pub astronomical: Vec<Row>,
}

/// A response that violates the expected day/hour shape, e.g. a missing
/// `condition.text`. Treated as a per-item fetch failure by the orchestrator.
#[derive(Debug, Error)]
#[error("malformed forecast response: {0}")]
pub struct FlattenError(String);

/// Flatten one nested forecast/history response into daily, hourly and
/// astronomical rows. Pure function: the shared context (coordinates,
/// location name, run timestamp) is injected into every row, and each day's
/// and hour's nested `condition` object is collapsed to its `text` field.
pub fn flatten(
    response: &ForecastResponse,
    extraction_timestamp: i64,
) -> Result<FlatTables, FlattenError> {
    let mut tables = FlatTables::default();
    let location = &response.location;

    for day in &response.forecast.forecastday {
        let mut day_fields = day.day.clone();
        let condition = take_condition_text(&mut day_fields).ok_or_else(|| {
            FlattenError(format!("day entry for {} has no condition.text", day.date))
        })?;

        let mut daily_row = context_row(location, extraction_timestamp, &day.date);
        daily_row.insert("condition".to_string(), Value::String(condition));
        daily_row.extend(day_fields);
        tables.daily.push(daily_row);

        let mut astro_row = context_row(location, extraction_timestamp, &day.date);
        astro_row.extend(day.astro.clone());
        tables.astronomical.push(astro_row);

        for hour in &day.hour {
            let mut hour_fields = hour.clone();
            let condition = take_condition_text(&mut hour_fields).ok_or_else(|| {
                FlattenError(format!("hour entry for {} has no condition.text", day.date))
            })?;

            let mut hourly_row = context_row(location, extraction_timestamp, &day.date);
            hourly_row.insert("condition".to_string(), Value::String(condition));
            hourly_row.extend(hour_fields);
            tables.hourly.push(hourly_row);
        }
    }

    Ok(tables)
}

fn context_row(location: &Location, extraction_timestamp: i64, date: &str) -> Row {
    let mut row = Row::new();
    row.insert("latitude".to_string(), Value::from(location.lat));
    row.insert("longitude".to_string(), Value::from(location.lon));
    row.insert("location_name".to_string(), Value::String(location.name.clone()));
    row.insert("extraction_timestamp".to_string(), Value::from(extraction_timestamp));
    row.insert("date".to_string(), Value::String(date.to_string()));
    row
}

fn take_condition_text(fields: &mut Row) -> Option<String> {
    let condition = fields.shift_remove("condition")?;
    condition.get("text").and_then(Value::as_str).map(str::to_string)
}
