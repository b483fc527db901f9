//! Guided workflow: load, pick a sheet, convert the departure, process, download

use anyhow::{Context, Result};
use chrono_tz::Tz;
use clap::Args;
use colored::*;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use is_terminal::IsTerminal;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use super::download::download_to;
use super::resolve_zone;
use crate::api::MatrixBackend;
use crate::cli::AppContext;
use crate::cli::output::{OutputFormat, conversion_card, format_rows, progress_line, results_card};
use crate::ingest::SourceFile;
use crate::notify::{ToastKind, ToastQueue};
use crate::timeconv::DepartureSelection;
use crate::upload::JobProgress;
use crate::workflow::Workflow;

const PREVIEW_ROWS: usize = 5;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Spreadsheet with Address Code, Address and Transport Mode columns
    pub file: PathBuf,

    /// Worksheet to process (prompts when omitted and several exist)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Local departure time, e.g. 2025-03-25T10:30 (prompts when omitted, default now)
    #[arg(long, value_name = "DATETIME")]
    pub departure: Option<String>,

    /// IANA time zone of the departure (defaults to config, then TZ, then UTC)
    #[arg(long, value_name = "ZONE")]
    pub tz: Option<String>,

    /// Download the result workbook when processing completes
    #[arg(long)]
    pub download: bool,

    /// Where to save the downloaded result
    #[arg(short, long, value_name = "PATH", requires = "download")]
    pub output: Option<PathBuf>,

    /// Never prompt; use defaults for anything not given on the command line
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn handle_run_command(args: RunArgs, ctx: &AppContext) -> Result<()> {
    let interactive = !args.yes && std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
    let zone = resolve_zone(args.tz.as_deref(), &ctx.config)?;

    let health_warning =
        warn_if_unhealthy(&ctx.client, ctx.client.endpoints().base(), &ctx.toasts).await;

    let departure = match args.departure.as_deref() {
        Some(text) => DepartureSelection::parse(text, zone).context("Invalid --departure value")?,
        None if interactive => prompt_departure(zone)?,
        None => DepartureSelection::now(zone),
    };
    let mut workflow = Workflow::new(departure);

    // Load
    if !args.file.exists() {
        anyhow::bail!("File does not exist: {}", args.file.display());
    }
    let source = SourceFile::from_path(&args.file)
        .with_context(|| format!("Failed to read file: {}", args.file.display()))?;
    match workflow.load_file(source, &ctx.config.ingest) {
        Ok(table) => {
            ctx.toasts.notify(
                format!("Loaded {} rows from \"{}\"", table.len(), table.sheet),
                ToastKind::Success,
            );
        }
        Err(e) => {
            ctx.toasts.notify(e.to_string(), ToastKind::Error);
            return Err(e.into());
        }
    }

    // Worksheet
    let sheet_names = workflow
        .workbook()
        .map(|w| w.sheet_names().to_vec())
        .unwrap_or_default();
    let chosen = match args.sheet {
        Some(sheet) => Some(sheet),
        None if interactive && sheet_names.len() > 1 => Some(pick_sheet(&sheet_names)?),
        None => None,
    };
    if let Some(sheet) = chosen {
        let current = workflow.table().map(|t| t.sheet.clone());
        if current.as_deref() != Some(sheet.as_str()) {
            if let Err(e) = workflow.select_worksheet(&sheet) {
                ctx.toasts.notify(e.to_string(), ToastKind::Error);
                return Err(e.into());
            }
        }
    }

    let table = workflow.table().context("No worksheet loaded")?;
    println!();
    println!("{} {} ({} rows)", "Worksheet:".bold(), table.sheet, table.len());
    let missing = table.missing_required_columns();
    if !missing.is_empty() {
        ctx.toasts.notify(
            format!("Missing expected columns: {}", missing.join(", ")),
            ToastKind::Warning,
        );
    }
    println!("{}", format_rows(table, PREVIEW_ROWS, OutputFormat::Table)?.trim_end());
    if table.len() > PREVIEW_ROWS {
        println!("{}", format!("... {} more rows", table.len() - PREVIEW_ROWS).dimmed());
    }

    // Time conversion, repeated until the departure is accepted
    loop {
        let conversion = workflow.convert_time(&ctx.client).await?.clone();
        println!();
        println!("{}", conversion_card(workflow.departure(), &conversion));
        println!();

        if !interactive || args.departure.is_some() || confirm_departure()? {
            break;
        }
        workflow.set_departure(prompt_departure(zone)?)?;
    }

    // Processing
    if !workflow.can_submit() {
        let reason = workflow
            .submit_blocker()
            .map(|b| b.to_string())
            .unwrap_or_default();
        anyhow::bail!("Cannot process the worksheet: {}", reason);
    }
    let (tx, rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(render_progress(rx, std::io::stderr().is_terminal()));
    let outcome = workflow
        .process(&ctx.client, &ctx.config.progress, &tx, &ctx.toasts)
        .await
        .cloned();
    drop(tx);
    if let Err(e) = renderer.await {
        log::warn!("Progress renderer failed: {}", e);
    }

    let result = outcome.context("Processing failed")?;
    if let Some(id) = health_warning {
        // The backend answered after all
        ctx.toasts.remove(&id);
    }
    println!();
    println!("{}", results_card(&result));

    // Download
    if let Some(filename) = result.result_filename.as_deref() {
        let wanted = args.download
            || (interactive
                && Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt("Download the result file?")
                    .default(true)
                    .interact()
                    .context("Prompt cancelled")?);
        if wanted {
            let path = download_to(ctx, filename, args.output.as_deref()).await?;
            ctx.toasts
                .notify(format!("Saved {}", path.display()), ToastKind::Success);
        }
    } else if args.download {
        ctx.toasts
            .notify("The backend did not return a result file to download", ToastKind::Warning);
    }

    ctx.toasts.remove_all();
    Ok(())
}

/// Raise a warning toast when the backend fails its health check.
/// Returns the toast id so it can be dismissed once the backend responds.
async fn warn_if_unhealthy(
    backend: &dyn MatrixBackend,
    base: &str,
    toasts: &ToastQueue,
) -> Option<String> {
    if backend.check_health().await {
        return None;
    }
    Some(toasts.notify(
        format!("Backend at {} is not responding", base),
        ToastKind::Warning,
    ))
}

fn confirm_departure() -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Use this departure time?")
        .default(true)
        .interact()
        .context("Prompt cancelled")
}

async fn render_progress(mut rx: UnboundedReceiver<JobProgress>, redraw: bool) {
    let mut drew = false;
    while let Some(progress) = rx.recv().await {
        if redraw {
            eprint!("\r{}", progress_line(&progress));
            let _ = std::io::stderr().flush();
            drew = true;
        } else {
            eprintln!("{}", progress_line(&progress));
        }
    }
    if drew {
        eprintln!();
    }
}

fn pick_sheet(names: &[String]) -> Result<String> {
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select worksheet")
        .items(names)
        .default(0)
        .interact()
        .context("Worksheet selection cancelled")?;
    names
        .get(index)
        .cloned()
        .context("Selected worksheet is out of range")
}

fn prompt_departure(zone: Tz) -> Result<DepartureSelection> {
    let default = DepartureSelection::now(zone)
        .local()
        .format("%Y-%m-%d %H:%M")
        .to_string();

    let text: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Departure time ({})", zone.name()))
        .default(default)
        .validate_with(|input: &String| -> Result<(), String> {
            DepartureSelection::parse(input, zone)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .context("Departure prompt cancelled")?;

    DepartureSelection::parse(&text, zone).context("Invalid departure time")
}
