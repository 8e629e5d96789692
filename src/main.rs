mod background;
mod cli;
mod commands;
mod config;
mod export;
mod mcp;
mod pdf;
mod plan;
mod session;
mod store;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries command output and the MCP transport, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Mcp { export } => {
            mcp::run_server(export.settings()?).await?;
        }
        Commands::Info { path } => {
            commands::info::run(&path)?;
        }
        Commands::Categories { categories } => {
            commands::categories::run(categories.as_deref())?;
        }
        Commands::Preview {
            path,
            page,
            dpi,
            output,
        } => {
            commands::preview::run(&path, page, dpi, &output)?;
        }
        Commands::Text { path, page } => {
            commands::text::run(&path, page)?;
        }
        Commands::Export {
            path,
            output_dir,
            plan,
            page,
            export,
        } => {
            commands::export::run(&path, &output_dir, &plan, page, export.settings()?).await?;
        }
        Commands::Session {
            path,
            output_dir,
            export,
        } => {
            let settings = export.settings()?;
            // The prompt loop blocks on stdin.
            tokio::task::spawn_blocking(move || {
                commands::session::run(&path, &output_dir, settings)
            })
            .await??;
        }
    }

    Ok(())
}
