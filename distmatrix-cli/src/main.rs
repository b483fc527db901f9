mod api;
mod cli;
mod config;
mod error;
mod ingest;
mod notify;
mod timeconv;
mod upload;
mod workflow;

#[cfg(test)]
mod test_support;

use clap::Parser;
use colored::*;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = match config::load_config() {
        Ok(config) => cli::execute(cli, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        log::debug!("Command failed: {:?}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(hint) = cli::failure_hint(&e) {
            eprintln!("{} {}", "Hint:".cyan().bold(), hint);
        }
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise -v/-vv/-vvv raise the default warn level
fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}
