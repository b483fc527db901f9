//! Terminal rendering: row previews, the progress bar and result cards

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::*;
use serde_json::Value;

use crate::api::MatrixResult;
use crate::ingest::Table;
use crate::timeconv::{DepartureSelection, UtcConversion};
use crate::upload::{JobProgress, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

const BAR_WIDTH: usize = 30;
const MAX_CELL_WIDTH: usize = 40;

/// Format the first `limit` rows of a table
pub fn format_rows(table: &Table, limit: usize, format: OutputFormat) -> Result<String> {
    let rows = &table.rows[..table.rows.len().min(limit)];
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(rows).context("Failed to format JSON output")
        }
        OutputFormat::Csv => rows_to_csv(&table.headers, rows),
        OutputFormat::Table => Ok(rows_to_table(&table.headers, rows)),
    }
}

fn rows_to_csv(headers: &[String], rows: &[crate::ingest::Row]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers).context("Failed to write CSV header")?;
    for row in rows {
        let record = headers
            .iter()
            .map(|h| value_to_string(row.get(h).unwrap_or(&Value::Null)));
        writer.write_record(record).context("Failed to write CSV row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn rows_to_table(headers: &[String], rows: &[crate::ingest::Row]) -> String {
    if headers.is_empty() {
        return "No data\n".to_string();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|h| truncate(&value_to_string(row.get(h).unwrap_or(&Value::Null))))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(truncate(h).chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(&truncate(h), *w))
        .collect();
    out.push_str(&header_line.join("  ").bold().to_string());
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  ").dimmed().to_string());
    out.push('\n');

    for row in &cells {
        let line: Vec<String> = row.iter().zip(&widths).map(|(c, w)| pad(c, *w)).collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

/// Convert a cell value to its display text (null is blank)
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_WIDTH {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(MAX_CELL_WIDTH - 1).collect();
        cut.push('…');
        cut
    }
}

fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    format!("{}{}", s, " ".repeat(width.saturating_sub(len)))
}

/// One-line progress bar, e.g. `[#########.....................]  30%  120/400 pairs`
pub fn progress_line(progress: &JobProgress) -> String {
    let filled = (usize::from(progress.percent.min(100)) * BAR_WIDTH) / 100;
    let bar = format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled));
    let bar = match progress.status {
        JobStatus::Completed => bar.green(),
        JobStatus::Error => bar.red(),
        JobStatus::Processing | JobStatus::Idle => bar.cyan(),
    };
    format!(
        "[{}] {:>3}%  {}/{} pairs",
        bar, progress.percent, progress.completed, progress.total
    )
}

/// Time conversion summary shown before processing
pub fn conversion_card(departure: &DepartureSelection, conversion: &UtcConversion) -> String {
    let mut lines = vec![
        format!("{}", "Time Conversion".bold()),
        format!("  Local time:     {}", departure.display()),
        format!("  UTC time:       {}", conversion.utc_time_iso().bright_green()),
        format!("  Unix timestamp: {}", conversion.unix_timestamp),
        format!("  Source:         {}", conversion.source_label()),
    ];
    if let Some(dst) = conversion.dst_active {
        lines.push(format!("  DST active:     {}", if dst { "yes" } else { "no" }));
    }
    lines.join("\n")
}

/// Processing results summary
pub fn results_card(result: &MatrixResult) -> String {
    let mut lines = vec![
        format!("{}", "Processing Results".bold()),
        format!("  {}", result.message.bright_green()),
        format!("  Total pairs:      {}", result.total_pairs()),
    ];

    if let Some(seconds) = result.processing_time_seconds {
        lines.push(format!("  Processing time:  {:.2}s", seconds));
    }
    if let Some(failed) = result.failed_batch_count {
        let text = failed.to_string();
        lines.push(format!(
            "  Failed batches:   {}",
            if failed > 0 { text.red() } else { text.normal() }
        ));
    }
    if let Some(errors) = result.api_pair_errors {
        let text = errors.to_string();
        lines.push(format!(
            "  Pair errors:      {}",
            if errors > 0 { text.yellow() } else { text.normal() }
        ));
    }
    if let Some(source) = &result.timestamp_source {
        lines.push(format!("  Timestamp source: {}", source));
    }
    if let Some(api) = &result.api_used {
        lines.push(format!("  Routing API:      {}", api));
    }
    if let Some(batch) = &result.batch_size_used {
        lines.push(format!("  Batch size:       {}", value_to_string(batch)));
    }
    if let Some(file) = &result.result_filename {
        lines.push(format!("  Result file:      {}", file.cyan()));
    }
    if let Some(sample) = result.sample_data.as_ref().filter(|s| !s.is_empty()) {
        lines.push(format!("  Sample ({} of {}):", sample.len().min(5), sample.len()));
        for entry in sample.iter().take(5) {
            lines.push(format!("    {}", entry));
        }
    }

    lines.join("\n")
}
