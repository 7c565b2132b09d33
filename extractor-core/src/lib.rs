//! Core library for the WeatherAPI extractor.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The WeatherAPI.com gateway and its trait abstraction
//! - Fetch-parameter resolution (static and table-driven)
//! - The error-tolerant fetch loop and response flattening
//! - Elastic-schema CSV output tables
//!
//! It is used by `extractor-cli`, but can also be reused by other binaries or
//! services.

pub mod client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod flatten;
pub mod model;
pub mod params;
pub mod sink;

pub use client::{GatewayError, WeatherApiClient, WeatherGateway};
pub use config::{Config, FetchParameterFrom, LoadType, RequestType};
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use model::{FetchParameters, ForecastResponse};
pub use params::parameter_source;
