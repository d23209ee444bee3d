mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value as JsonValue;
use tracing::info;

use cli::{CartFormat, Cli, Command};
use lcsc_bulk::infrastructure::{ops, Bridge, BridgeFactory, SessionChromeFactory};
use lcsc_bulk::models::cart_table;
use lcsc_bulk::services::Site;
use lcsc_bulk::utils::logging;
use lcsc_bulk::{BatchReport, Config, Orchestrator, ResultSink};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.common.log.as_deref())?;

    let config = cli.resolve_config()?;
    if let Command::OpenCart = cli.command {
        return open_cart(&config).await;
    }

    let factory = cli.factory(&config);
    let jobs = cli.jobs(&config).await?;

    let output = cli.command.output();
    let sink = output.map(ResultSink::new);

    let report = Orchestrator::new(config, factory)
        .run(jobs, sink)
        .await
        .context("batch did not complete")?;
    report.log_summary();

    emit(&cli.command, &report, output.is_some())
}

/// Show the cart in the logged-in browser and wait for Ctrl+C.
/// The tab stays open afterwards.
async fn open_cart(config: &Config) -> Result<()> {
    let factory = SessionChromeFactory::new(config.browser_debug_port);
    let bridge = factory
        .provision(0)
        .await
        .context("could not reach the logged-in browser")?;

    navigate_to_cart(bridge.as_ref(), config).await?;
    info!("✓ Cart page loaded; review it in the browser. Press Ctrl+C when done.");

    tokio::signal::ctrl_c().await?;
    Ok(())
}

async fn navigate_to_cart(bridge: &dyn Bridge, config: &Config) -> Result<()> {
    let url = Site::new(config.base_url.clone()).cart_url();
    info!("Opening {}", url);
    bridge
        .call(ops::NAVIGATE, serde_json::json!({ "url": url }))
        .await
        .context("could not open the cart page")?;
    Ok(())
}

/// Print the result document when it was not written to a file
fn emit(command: &Command, report: &BatchReport, written: bool) -> Result<()> {
    if let Command::ListCart {
        format: CartFormat::Table,
        ..
    } = command
    {
        for record in report.records() {
            match record.get("success").and_then(JsonValue::as_bool) {
                Some(true) => println!("{}", cart_table(&record)),
                _ => info!(
                    "❌ Could not read the cart: {}",
                    record.get("error").and_then(JsonValue::as_str).unwrap_or("unknown error")
                ),
            }
        }
        return Ok(());
    }

    if !written {
        println!("{}", serde_json::to_string_pretty(&report.document())?);
    }
    Ok(())
}
