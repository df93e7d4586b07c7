//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

/// Feeder Gateway - session and media-relay backend for the feeder app
#[derive(Parser, Debug)]
#[command(name = "feeder-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "FEEDER_GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "FEEDER_GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "FEEDER_GATEWAY_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "FEEDER_GATEWAY_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "FEEDER_GATEWAY_LOG_FORMAT")]
    pub log_format: Option<String>,
}
