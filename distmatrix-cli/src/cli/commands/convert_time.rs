use anyhow::{Context, Result};
use clap::Args;

use super::resolve_zone;
use crate::cli::AppContext;
use crate::cli::output::conversion_card;
use crate::timeconv::{DepartureSelection, convert_to_utc};

#[derive(Args, Debug)]
pub struct ConvertTimeArgs {
    /// Local departure time, e.g. 2025-03-25T10:30 (defaults to now)
    #[arg(long, value_name = "DATETIME")]
    pub at: Option<String>,

    /// IANA time zone of the local time (defaults to config, then TZ, then UTC)
    #[arg(long, value_name = "ZONE")]
    pub tz: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_convert_time_command(args: ConvertTimeArgs, ctx: &AppContext) -> Result<()> {
    let zone = resolve_zone(args.tz.as_deref(), &ctx.config)?;

    let departure = match args.at.as_deref() {
        Some(text) => DepartureSelection::parse(text, zone).context("Invalid --at value")?,
        None => DepartureSelection::now(zone),
    };

    let conversion = convert_to_utc(&ctx.client, &departure).await;

    if args.json {
        let output =
            serde_json::to_string_pretty(&conversion).context("Failed to format JSON output")?;
        println!("{}", output);
    } else {
        println!("{}", conversion_card(&departure, &conversion));
    }

    Ok(())
}
