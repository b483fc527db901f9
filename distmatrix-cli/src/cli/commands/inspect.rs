use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use std::path::PathBuf;

use crate::cli::output::{OutputFormat, format_rows};
use crate::config::Config;
use crate::ingest::{SourceFile, Workbook};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Spreadsheet to inspect (.xlsx, .xls, .csv)
    pub file: PathBuf,

    /// Worksheet to preview (defaults to the first)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Maximum number of rows to show
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

pub fn handle_inspect_command(args: InspectArgs, config: &Config) -> Result<()> {
    if !args.file.exists() {
        anyhow::bail!("File does not exist: {}", args.file.display());
    }

    let source = SourceFile::from_path(&args.file)
        .with_context(|| format!("Failed to read file: {}", args.file.display()))?;
    let mut workbook = Workbook::open(source, &config.ingest)?;

    let sheet = match args.sheet {
        Some(sheet) => sheet,
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .context("The workbook has no worksheets")?,
    };

    let table = workbook.read_sheet(&sheet)?;
    let machine_readable = !matches!(args.format, OutputFormat::Table);

    if !machine_readable {
        println!("{} {}", "File:".bold(), workbook.source().name);
        let names: Vec<String> = workbook
            .sheet_names()
            .iter()
            .map(|name| {
                if *name == sheet {
                    name.bright_green().bold().to_string()
                } else {
                    name.clone()
                }
            })
            .collect();
        println!("{} {}", "Worksheets:".bold(), names.join(", "));
        println!(
            "{} {} ({} rows)",
            "Selected:".bold(),
            table.sheet,
            table.len()
        );

        let missing = table.missing_required_columns();
        if !missing.is_empty() {
            println!(
                "{} missing expected columns: {}",
                "Warning:".yellow().bold(),
                missing.join(", ")
            );
        }
        if table.has_transit_rows() {
            println!("{} contains TRANSIT rows, a departure time will be sent", "Note:".cyan());
        }
        println!();
    }

    let formatted = format_rows(&table, args.limit, args.format)?;
    println!("{}", formatted.trim_end());
    if !machine_readable && table.len() > args.limit {
        println!("{}", format!("... {} more rows", table.len() - args.limit).dimmed());
    }

    Ok(())
}
