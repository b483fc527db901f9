pub mod config;
pub mod convert_time;
pub mod download;
pub mod health;
pub mod inspect;
pub mod run;

use anyhow::{Context, Result};
use chrono_tz::Tz;

use crate::config::Config;

/// Zone from a `--tz` flag, else from configuration
pub(crate) fn resolve_zone(flag: Option<&str>, config: &Config) -> Result<Tz> {
    match flag {
        Some(name) => name
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Unknown time zone '{}'", name)),
        None => config.resolve_time_zone(),
    }
}
