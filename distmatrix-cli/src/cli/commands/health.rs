use anyhow::Result;
use colored::*;

use crate::api::MatrixBackend;
use crate::cli::AppContext;

pub async fn handle_health_command(ctx: &AppContext) -> Result<()> {
    let url = ctx.client.endpoints().health();
    println!("Checking {}", url.dimmed());

    if ctx.client.check_health().await {
        println!("{} Connected to backend at {}", "✓".green().bold(), ctx.client.endpoints().base());
        Ok(())
    } else {
        anyhow::bail!(
            "Backend at {} is not reachable. Check the URL with 'distmatrix-cli config show' or pass --api-url.",
            ctx.client.endpoints().base()
        )
    }
}
