use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::warn;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::config::{Config, DEFAULT_FORECAST_DAYS, FetchParameterFrom, RequestType};
use crate::error::ExtractorError;
use crate::model::FetchParameters;

/// A finite, single-pass sequence of fetch parameters. Items are `Result`
/// because table-driven rows can fail shape checks mid-stream; such errors
/// abort the run regardless of the continue-on-failure policy.
pub type ParameterIter = Box<dyn Iterator<Item = Result<FetchParameters, ExtractorError>>>;

/// Build the parameter source selected by the configuration.
///
/// `input_tables` are the CSV paths supplied on the command line; they are
/// only consulted in table-driven mode, where exactly one must be present.
pub fn parameter_source(
    config: &Config,
    input_tables: &[PathBuf],
) -> Result<ParameterIter, ExtractorError> {
    match config.fetching_settings.fetch_parameter_from {
        FetchParameterFrom::ConfigParameters => {
            let params = static_parameters(config)?;
            Ok(Box::new(std::iter::once(Ok(params))))
        }
        FetchParameterFrom::InputTable => {
            let table = single_input_table(input_tables)?;
            let iter = TableParameters::open(table, config.fetching_settings.request_type)?;
            Ok(Box::new(iter))
        }
    }
}

fn static_parameters(config: &Config) -> Result<FetchParameters, ExtractorError> {
    let settings = &config.fetching_settings;

    match settings.request_type {
        RequestType::Forecast => {
            Ok(FetchParameters::for_forecast(settings.location_query.clone(), settings.forecast_days))
        }
        RequestType::History => {
            // Strict: an unparseable configured date blocks the whole run.
            let date = parse_flexible_date(&settings.historical_date).ok_or_else(|| {
                ExtractorError::Config(format!(
                    "could not parse '{}' as a date",
                    settings.historical_date
                ))
            })?;
            Ok(FetchParameters::for_history(
                settings.location_query.clone(),
                date.format("%Y-%m-%d").to_string(),
            ))
        }
    }
}

fn single_input_table(input_tables: &[PathBuf]) -> Result<&Path, ExtractorError> {
    match input_tables {
        [table] => Ok(table),
        _ => Err(ExtractorError::Config(
            "exactly one input table must be provided in table-driven mode".to_string(),
        )),
    }
}

struct TableParameters {
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<File>,
    request_type: RequestType,
}

impl TableParameters {
    fn open(path: &Path, request_type: RequestType) -> Result<Self, ExtractorError> {
        let file = File::open(path).map_err(|e| {
            ExtractorError::Config(format!("failed to open input table {}: {e}", path.display()))
        })?;

        let mut reader = csv::Reader::from_reader(file);
        let headers = reader.headers()?.iter().map(str::to_string).collect();

        Ok(Self { headers, records: reader.into_records(), request_type })
    }
}

impl Iterator for TableParameters {
    type Item = Result<FetchParameters, ExtractorError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(err) => return Some(Err(err.into())),
        };

        let row: HashMap<&str, &str> =
            self.headers.iter().map(String::as_str).zip(record.iter()).collect();

        Some(parameters_from_row(&row, self.request_type))
    }
}

fn parameters_from_row(
    row: &HashMap<&str, &str>,
    request_type: RequestType,
) -> Result<FetchParameters, ExtractorError> {
    let location = if let Some(location) = row.get("location") {
        (*location).to_string()
    } else if let (Some(lat), Some(lon)) = (row.get("latitude"), row.get("longitude")) {
        format!("{lat},{lon}")
    } else {
        return Err(ExtractorError::InputTable(
            "input table must contain either a 'location' column or 'latitude'/'longitude' columns"
                .to_string(),
        ));
    };

    let mut params = FetchParameters { location, forecast_days: None, historical_date: None };

    match request_type {
        RequestType::Forecast => {
            params.forecast_days = Some(match row.get("forecast_days") {
                Some(raw) => raw.parse().unwrap_or_else(|_| {
                    warn!(
                        "could not parse forecast_days value '{raw}', \
                         falling back to default {DEFAULT_FORECAST_DAYS}"
                    );
                    DEFAULT_FORECAST_DAYS
                }),
                None => DEFAULT_FORECAST_DAYS,
            });
        }
        RequestType::History => {
            if let Some(raw) = row.get("historical_date") {
                // Tolerant: an unparseable date passes through verbatim and
                // is left for the API to accept or reject per item.
                let date = parse_flexible_date(raw)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| (*raw).to_string());
                params.historical_date = Some(date);
            }
        }
    }

    Ok(params)
}

/// Best-effort date parser: relative keywords, a handful of common formats,
/// and RFC 3339 timestamps.
pub fn parse_flexible_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "today" => return Some(Utc::now().date_naive()),
        "yesterday" => return Some(Utc::now().date_naive() - Duration::days(1)),
        "tomorrow" => return Some(Utc::now().date_naive() + Duration::days(1)),
        _ => {}
    }

    const FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d.%m.%Y",
        "%m/%d/%Y",
        "%d %B %Y",
        "%d %b %Y",
        "%B %d, %Y",
        "%b %d, %Y",
        "%B %d %Y",
    ];

    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchingSettings;
    use std::io::Write;

    fn config_with(settings: FetchingSettings) -> Config {
        let mut config = Config::default();
        config.authentication.api_token = "TOKEN".to_string();
        config.fetching_settings = settings;
        config
    }

    fn row<'a>(pairs: &[(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn static_forecast_mode_yields_one_item() {
        let config = config_with(FetchingSettings {
            location_query: "London".to_string(),
            forecast_days: 3,
            ..FetchingSettings::default()
        });

        let items: Vec<_> = parameter_source(&config, &[])
            .expect("static source must build")
            .collect::<Result<_, _>>()
            .expect("static source must not fail");

        assert_eq!(items, vec![FetchParameters::for_forecast("London", 3)]);
    }

    #[test]
    fn static_history_mode_normalizes_the_date() {
        let config = config_with(FetchingSettings {
            request_type: RequestType::History,
            location_query: "Paris".to_string(),
            historical_date: "09.01.2022".to_string(),
            ..FetchingSettings::default()
        });

        let items: Vec<_> = parameter_source(&config, &[])
            .expect("static source must build")
            .collect::<Result<_, _>>()
            .expect("static source must not fail");

        assert_eq!(items, vec![FetchParameters::for_history("Paris", "2022-01-09")]);
    }

    #[test]
    fn static_history_mode_rejects_unparseable_date() {
        let config = config_with(FetchingSettings {
            request_type: RequestType::History,
            historical_date: "not a date at all".to_string(),
            ..FetchingSettings::default()
        });

        let err = parameter_source(&config, &[]).map(|_| ()).unwrap_err();
        assert!(matches!(err, ExtractorError::Config(_)));
        assert!(err.to_string().contains("could not parse"));
    }

    #[test]
    fn row_location_column_wins_over_coordinates() {
        let params = parameters_from_row(
            &row(&[("location", "Berlin"), ("latitude", "10.0"), ("longitude", "20.0")]),
            RequestType::Forecast,
        )
        .expect("row must resolve");

        assert_eq!(params.location, "Berlin");
    }

    #[test]
    fn row_coordinates_are_joined_into_a_location() {
        let params = parameters_from_row(
            &row(&[("latitude", "10.0"), ("longitude", "20.0")]),
            RequestType::Forecast,
        )
        .expect("row must resolve");

        assert_eq!(params.location, "10.0,20.0");
    }

    #[test]
    fn row_without_location_columns_is_rejected() {
        let err = parameters_from_row(&row(&[("city", "Oslo")]), RequestType::Forecast).unwrap_err();

        assert!(matches!(err, ExtractorError::InputTable(_)));
        assert!(err.to_string().contains("'location' column"));
    }

    #[test]
    fn unparseable_forecast_days_falls_back_to_default() {
        let params = parameters_from_row(
            &row(&[("location", "Oslo"), ("forecast_days", "abc")]),
            RequestType::Forecast,
        )
        .expect("row must resolve despite the bad number");

        assert_eq!(params.forecast_days, Some(DEFAULT_FORECAST_DAYS));
    }

    #[test]
    fn missing_forecast_days_column_uses_default() {
        let params = parameters_from_row(&row(&[("location", "Oslo")]), RequestType::Forecast)
            .expect("row must resolve");

        assert_eq!(params.forecast_days, Some(DEFAULT_FORECAST_DAYS));
    }

    #[test]
    fn unparseable_historical_date_passes_through_raw() {
        let params = parameters_from_row(
            &row(&[("location", "Oslo"), ("historical_date", "gibberish")]),
            RequestType::History,
        )
        .expect("row must resolve despite the bad date");

        assert_eq!(params.historical_date.as_deref(), Some("gibberish"));
    }

    #[test]
    fn parseable_historical_date_is_normalized() {
        let params = parameters_from_row(
            &row(&[("location", "Oslo"), ("historical_date", "2022/09/09")]),
            RequestType::History,
        )
        .expect("row must resolve");

        assert_eq!(params.historical_date.as_deref(), Some("2022-09-09"));
    }

    #[test]
    fn table_source_requires_exactly_one_table() {
        let config = config_with(FetchingSettings {
            fetch_parameter_from: FetchParameterFrom::InputTable,
            ..FetchingSettings::default()
        });

        let err = parameter_source(&config, &[]).map(|_| ()).unwrap_err();
        assert!(err.to_string().contains("exactly one input table"));

        let two = vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")];
        let err = parameter_source(&config, &two).map(|_| ()).unwrap_err();
        assert!(err.to_string().contains("exactly one input table"));
    }

    #[test]
    fn table_source_reads_rows_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("locations.csv");
        let mut file = File::create(&path).expect("create input table");
        writeln!(file, "location,forecast_days").unwrap();
        writeln!(file, "London,2").unwrap();
        writeln!(file, "Paris,5").unwrap();
        drop(file);

        let config = config_with(FetchingSettings {
            fetch_parameter_from: FetchParameterFrom::InputTable,
            ..FetchingSettings::default()
        });

        let items: Vec<_> = parameter_source(&config, &[path])
            .expect("table source must build")
            .collect::<Result<_, _>>()
            .expect("rows must resolve");

        assert_eq!(
            items,
            vec![
                FetchParameters::for_forecast("London", 2),
                FetchParameters::for_forecast("Paris", 5),
            ]
        );
    }

    #[test]
    fn parses_relative_keywords() {
        assert_eq!(parse_flexible_date("today"), Some(Utc::now().date_naive()));
        assert_eq!(
            parse_flexible_date("Yesterday"),
            Some(Utc::now().date_naive() - Duration::days(1))
        );
    }

    #[test]
    fn parses_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2022, 9, 9).unwrap();
        assert_eq!(parse_flexible_date("2022-09-09"), Some(expected));
        assert_eq!(parse_flexible_date("09.09.2022"), Some(expected));
        assert_eq!(parse_flexible_date("September 9, 2022"), Some(expected));
        assert_eq!(parse_flexible_date("9 Sep 2022"), Some(expected));
    }

    #[test]
    fn rejects_gibberish() {
        assert_eq!(parse_flexible_date("gibberish"), None);
        assert_eq!(parse_flexible_date(""), None);
    }
}
