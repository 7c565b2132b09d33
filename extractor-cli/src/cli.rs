use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use extractor_core::{
    Config, Extractor, WeatherApiClient, extractor::test_connection, parameter_source,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherapi-extractor", version, about = "WeatherAPI data extractor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch weather data and write the output tables.
    Run {
        /// Path to the TOML configuration file. Defaults to the platform
        /// config directory.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Input table with per-row fetch parameters (table-driven mode).
        #[arg(long = "input-table")]
        input_tables: Vec<PathBuf>,

        /// Directory the output tables are written to.
        #[arg(long, default_value = "out")]
        output_dir: PathBuf,
    },

    /// Store the WeatherAPI token in the configuration file.
    Configure,

    /// Check connectivity and credentials with one minimal forecast request.
    TestConnection {
        /// Path to the TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Run { config, input_tables, output_dir } => {
                run_extraction(config, &input_tables, &output_dir).await
            }
            Command::Configure => configure(),
            Command::TestConnection { config } => check_connection(config).await,
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None => Config::default_path()?,
    };
    Ok(Config::load_from(&path)?)
}

async fn run_extraction(
    config: Option<PathBuf>,
    input_tables: &[PathBuf],
    output_dir: &PathBuf,
) -> Result<()> {
    let config = load_config(config)?;

    let source = parameter_source(&config, input_tables)?;
    let client = WeatherApiClient::new(config.authentication.api_token.clone());
    let extractor = Extractor::new(config, client, output_dir)?;

    extractor.run(source).await?;
    Ok(())
}

fn configure() -> Result<()> {
    let mut config = Config::load_for_edit()?;

    let token = inquire::Password::new("WeatherAPI token:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API token from prompt")?;
    config.authentication.api_token = token;

    let path = config.save()?;
    println!("Token saved to {}", path.display());
    Ok(())
}

async fn check_connection(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config)?;
    let client = WeatherApiClient::new(config.authentication.api_token.clone());

    test_connection(&client).await?;
    println!("Connection OK");
    Ok(())
}
