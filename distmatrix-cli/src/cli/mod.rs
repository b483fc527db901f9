//! Command-line surface
//!
//! clap definitions plus the context every command handler receives.

pub mod commands;
pub mod output;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::sync::Arc;

use crate::api::MatrixClient;
use crate::config::Config;
use crate::error::{AppError, ErrorKind};
use crate::notify::{TerminalRenderer, ToastQueue};
use crate::workflow::WorkflowError;

use commands::{
    config::ConfigCommands, convert_time::ConvertTimeArgs, download::DownloadArgs,
    inspect::InspectArgs, run::RunArgs,
};

#[derive(Parser, Debug)]
#[command(name = "distmatrix-cli")]
#[command(version, about = "Distance matrix client: upload address sheets and fetch travel-time matrices", long_about = None)]
pub struct Cli {
    /// Backend base URL (overrides config file and DISTMATRIX_API_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the backend is reachable
    Health,

    /// Convert a local departure time to UTC
    ConvertTime(ConvertTimeArgs),

    /// List worksheets and preview rows of a spreadsheet
    Inspect(InspectArgs),

    /// Upload a spreadsheet and compute its distance matrix
    Run(RunArgs),

    /// Download a result workbook by name
    Download(DownloadArgs),

    /// Show or initialize the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Shared state handed to command handlers
pub struct AppContext {
    pub config: Config,
    pub client: MatrixClient,
    pub toasts: ToastQueue,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let client = MatrixClient::new(&config.api).context("Failed to create API client")?;
        let toasts =
            ToastQueue::new(&config.notifications).with_renderer(Arc::new(TerminalRenderer));
        Ok(Self {
            config,
            client,
            toasts,
        })
    }
}

/// Dispatch a parsed command line
pub async fn execute(cli: Cli, mut config: Config) -> Result<()> {
    if let Some(url) = cli.api_url {
        log::debug!("API base URL overridden from command line: {}", url);
        config.api.base_url = url;
    }

    match cli.command {
        Commands::Config(cmd) => commands::config::handle_config_command(cmd, &config),
        Commands::ConvertTime(args) => {
            let ctx = AppContext::new(config)?;
            commands::convert_time::handle_convert_time_command(args, &ctx).await
        }
        Commands::Health => {
            let ctx = AppContext::new(config)?;
            commands::health::handle_health_command(&ctx).await
        }
        Commands::Inspect(args) => commands::inspect::handle_inspect_command(args, &config),
        Commands::Run(args) => {
            let ctx = AppContext::new(config)?;
            commands::run::handle_run_command(args, &ctx).await
        }
        Commands::Download(args) => {
            let ctx = AppContext::new(config)?;
            commands::download::handle_download_command(args, &ctx).await
        }
    }
}

/// The backend or file error behind a failed command, if there is one
fn app_error(err: &anyhow::Error) -> Option<&AppError> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<AppError>()
            .or_else(|| match cause.downcast_ref::<WorkflowError>() {
                Some(WorkflowError::App(inner)) => Some(inner),
                _ => None,
            })
    })
}

/// Follow-up advice printed under a failed command's error message
pub fn failure_hint(err: &anyhow::Error) -> Option<String> {
    let app = app_error(err)?;
    log::debug!(
        "Command failed with {:?} (HTTP status {:?})",
        app.kind(),
        app.status_code()
    );
    let status = app
        .status_code()
        .map(|s| format!(" (HTTP {})", s))
        .unwrap_or_default();

    match app.kind() {
        ErrorKind::Network => {
            Some("Check that the backend is running, or point --api-url at it".to_string())
        }
        ErrorKind::Timeout => Some(
            "Large sheets take longer, raise api.upload_timeout_secs in the config file"
                .to_string(),
        ),
        ErrorKind::Server => Some(format!("The backend failed{}, try again later", status)),
        ErrorKind::Auth | ErrorKind::Forbidden => {
            Some(format!("The backend refused the request{}", status))
        }
        ErrorKind::UnsupportedFile | ErrorKind::EmptySheet => {
            Some("Preview the file with `distmatrix-cli inspect <FILE>`".to_string())
        }
        ErrorKind::MissingDepartureTime => {
            Some("Pass --departure, e.g. --departure 2025-03-25T10:30".to_string())
        }
        ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_failure_hint_follows_error_kind() {
        let timeout = anyhow::Error::from(AppError::Timeout).context("Processing failed");
        assert!(failure_hint(&timeout).unwrap().contains("upload_timeout_secs"));

        let server = anyhow::Error::from(AppError::Server {
            status: 503,
            message: None,
        });
        assert!(failure_hint(&server).unwrap().contains("(HTTP 503)"));

        let missing = anyhow::Error::from(WorkflowError::App(AppError::MissingDepartureTime))
            .context("Processing failed");
        assert!(failure_hint(&missing).unwrap().contains("--departure"));
    }

    #[test]
    fn test_failure_hint_absent_for_other_errors() {
        assert!(failure_hint(&anyhow::anyhow!("File does not exist: a.xlsx")).is_none());
        assert!(failure_hint(&anyhow::Error::from(WorkflowError::NoFile)).is_none());
        assert!(failure_hint(&anyhow::Error::from(AppError::NotFound { message: None })).is_none());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "distmatrix-cli",
            "run",
            "addresses.xlsx",
            "--sheet",
            "Addresses",
            "-vv",
            "--api-url",
            "https://matrix.example.com/api",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.api_url.as_deref(), Some("https://matrix.example.com/api"));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.file.to_str(), Some("addresses.xlsx"));
                assert_eq!(args.sheet.as_deref(), Some("Addresses"));
                assert!(!args.download);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_inspect_format_values() {
        let cli = Cli::try_parse_from(["distmatrix-cli", "inspect", "a.csv", "--format", "csv"]).unwrap();
        assert!(matches!(cli.command, Commands::Inspect(_)));
        assert!(Cli::try_parse_from(["distmatrix-cli", "inspect", "a.csv", "--format", "xml"]).is_err());
    }
}
