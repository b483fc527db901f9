use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::MatrixBackend;
use crate::cli::AppContext;

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Result file name as reported by the backend
    pub filename: String,

    /// Where to write the file (defaults to the file name in the current directory)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

pub async fn handle_download_command(args: DownloadArgs, ctx: &AppContext) -> Result<()> {
    let path = download_to(ctx, &args.filename, args.output.as_deref()).await?;
    println!("Saved {}", path.display().to_string().bright_green());
    Ok(())
}

/// Fetch a result file and write it to `output` (or `./<filename>`)
pub(crate) async fn download_to(
    ctx: &AppContext,
    filename: &str,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let bytes = ctx
        .client
        .download_result(filename)
        .await
        .with_context(|| format!("Failed to download {}", filename))?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(local_file_name(filename)));

    fs::write(&path, &bytes)
        .with_context(|| format!("Failed to write download to: {}", path.display()))?;
    log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

/// Strip any directory part a backend-provided name might carry
fn local_file_name(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "distance_matrix_result.xlsx".to_string())
}
