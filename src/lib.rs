//! Feeder Gateway Library
//!
//! Session and external-resource access gateway for the pet feeder companion
//! app.
//!
//! # Features
//!
//! - **Provider Login**: OAuth2 authorization-code flow with identity
//!   reconciliation against the local account store
//! - **Direct Login**: username/password accounts with salted slow hashing
//! - **Stateless Sessions**: compact signed tokens, no server-side session
//!   state
//! - **Media Relay**: byte-range streaming of remote drive objects with
//!   chunked open-ended ranges
//! - **Feeder Preferences**: per-account portion and schedule records

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod relay;
pub mod store;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
