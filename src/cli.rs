//! Command-line surface

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;

use lcsc_bulk::browser::LaunchOptions;
use lcsc_bulk::error::{AppResult, InputError};
use lcsc_bulk::infrastructure::{BridgeFactory, HeadlessChromeFactory, SessionChromeFactory};
use lcsc_bulk::models::{
    cart_add_specs, cart_list_spec, load_batch, load_item_specs, parse_item_spec, JobKind, JobSpec,
};
use lcsc_bulk::Config;

#[derive(Parser)]
#[command(name = "lcsc-bulk")]
#[command(about = "Bulk LCSC pricing, search and cart automation", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct CommonArgs {
    /// Jobs running at once (and browser instances launched)
    #[arg(long, global = true)]
    pub max_concurrent: Option<usize>,

    /// TOML configuration file
    #[arg(long, global = true, env = "LCSC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write a debug-level log to this file
    #[arg(short, long, global = true)]
    pub log: Option<PathBuf>,

    /// Browser to drive; cart commands default to the logged-in session
    #[arg(long, global = true, value_enum)]
    pub session: Option<Session>,

    /// Remote debugging port of the logged-in browser
    #[arg(long, global = true)]
    pub debug_port: Option<u16>,

    /// Show the launched browser windows
    #[arg(long, global = true)]
    pub headed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Session {
    /// A fresh headless Chrome per pool slot
    Headless,
    /// Tabs in an already running, logged-in Chrome
    Connected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CartFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Look up manufacturer, stock and price breaks for every entry of a JSON batch
    CheckPricing {
        /// JSON array of {lcsc_code | mpn, value?, ...}
        input: PathBuf,
        /// Results file; printed to stdout when omitted
        output: Option<PathBuf>,
    },
    /// Search the catalog for every entry of a JSON batch
    Search {
        /// JSON array of {keywords | mpn | lcsc_code, limit?, max_pages?}
        input: PathBuf,
        output: Option<PathBuf>,
        /// Maximum products kept per query
        #[arg(long)]
        limit: Option<usize>,
        /// Maximum result pages visited per query
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Add items to the cart
    AddToCart {
        /// Items as CODE or CODE:QTY (catalog code or manufacturer part number)
        items: Vec<String>,
        /// Text file with one item per line, or a JSON batch
        #[arg(long)]
        file: Option<PathBuf>,
        /// Quantity for items given without one
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the current cart
    ListCart {
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "table")]
        format: CartFormat,
    },
    /// Open the cart in the logged-in browser for manual review
    OpenCart,
}

impl Command {
    pub fn output(&self) -> Option<&Path> {
        match self {
            Command::CheckPricing { output, .. }
            | Command::Search { output, .. }
            | Command::AddToCart { output, .. }
            | Command::ListCart { output, .. } => output.as_deref(),
            Command::OpenCart => None,
        }
    }

    fn uses_cart(&self) -> bool {
        matches!(
            self,
            Command::AddToCart { .. } | Command::ListCart { .. } | Command::OpenCart
        )
    }
}

impl Cli {
    pub fn session(&self) -> Session {
        match self.common.session {
            Some(session) => session,
            None if self.command.uses_cart() => Session::Connected,
            None => Session::Headless,
        }
    }

    /// Defaults < TOML < environment < command line
    pub fn resolve_config(&self) -> AppResult<Config> {
        let mut config = Config::load(self.common.config.as_deref())?;

        if let Some(port) = self.common.debug_port {
            config.browser_debug_port = port;
        }
        if self.common.headed {
            config.headless = false;
        }
        match &self.command {
            Command::Search { limit, max_pages, .. } => {
                if let Some(limit) = limit {
                    config.search_limit = *limit;
                }
                if let Some(max_pages) = max_pages {
                    config.search_max_pages = *max_pages;
                }
            }
            Command::AddToCart {
                quantity: Some(quantity),
                ..
            } => config.default_quantity = *quantity,
            _ => {}
        }

        let configured = Config::max_concurrent_is_set(self.common.config.as_deref())?;
        match self.common.max_concurrent {
            Some(max_concurrent) => config.max_concurrent = max_concurrent,
            // one tab at a time in a shared browser unless configured otherwise
            None if self.session() == Session::Connected
                && !config.allow_shared_session_concurrency
                && !configured =>
            {
                debug!("Connected session: running one job at a time");
                config.max_concurrent = 1
            }
            None => {}
        }

        config.validate()?;
        Ok(config)
    }

    pub fn factory(&self, config: &Config) -> Arc<dyn BridgeFactory> {
        match self.session() {
            Session::Headless => Arc::new(HeadlessChromeFactory::new(LaunchOptions::from_config(config))),
            Session::Connected => Arc::new(SessionChromeFactory::new(config.browser_debug_port)),
        }
    }

    /// Build the batch for the chosen command
    pub async fn jobs(&self, config: &Config) -> AppResult<Vec<JobSpec>> {
        match &self.command {
            Command::CheckPricing { input, .. } => {
                load_batch(input, JobKind::PricingLookup, config).await
            }
            Command::Search { input, .. } => load_batch(input, JobKind::CatalogSearch, config).await,
            Command::AddToCart { items, file, .. } => {
                if let Some(path) = file.as_deref().filter(|p| is_json(p)) {
                    return load_batch(path, JobKind::CartAdd, config).await;
                }

                let mut specs = items.clone();
                if let Some(path) = file {
                    specs.extend(load_item_specs(path).await?);
                }
                if specs.is_empty() {
                    return Err(InputError::Empty.into());
                }

                let parsed = specs
                    .iter()
                    .map(|spec| parse_item_spec(spec, config.default_quantity))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(cart_add_specs(parsed))
            }
            Command::ListCart { .. } => Ok(vec![cart_list_spec()]),
            // interactive, no batch
            Command::OpenCart => Ok(Vec::new()),
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_commands_default_to_connected_session() {
        let cli = Cli::parse_from(["lcsc-bulk", "list-cart"]);
        assert_eq!(cli.session(), Session::Connected);

        let cli = Cli::parse_from(["lcsc-bulk", "check-pricing", "in.json"]);
        assert_eq!(cli.session(), Session::Headless);

        let cli = Cli::parse_from(["lcsc-bulk", "add-to-cart", "C1", "--session", "headless"]);
        assert_eq!(cli.session(), Session::Headless);

        let cli = Cli::parse_from(["lcsc-bulk", "open-cart"]);
        assert_eq!(cli.session(), Session::Connected);
        assert_eq!(cli.command.output(), None);
    }

    #[test]
    fn test_command_line_overrides_config() {
        let cli = Cli::parse_from([
            "lcsc-bulk",
            "search",
            "in.json",
            "out.json",
            "--limit",
            "5",
            "--max-concurrent",
            "3",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.search_limit, 5);
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(cli.command.output(), Some(Path::new("out.json")));
    }

    #[test]
    fn test_connected_session_runs_one_job_at_a_time_by_default() {
        let cli = Cli::parse_from(["lcsc-bulk", "add-to-cart", "C1:5", "C2"]);
        assert_eq!(cli.resolve_config().unwrap().max_concurrent, 1);
    }

    #[test]
    fn test_configured_pool_size_survives_connected_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lcsc.toml");
        std::fs::write(&path, "max_concurrent = 3\n").unwrap();

        let cli = Cli::parse_from(["lcsc-bulk", "--config", path.to_str().unwrap(), "list-cart"]);
        assert_eq!(cli.resolve_config().unwrap().max_concurrent, 3);
    }

    #[tokio::test]
    async fn test_add_to_cart_items_become_jobs() {
        let cli = Cli::parse_from(["lcsc-bulk", "add-to-cart", "C137394:50", "C137181", "--quantity", "10"]);
        let config = cli.resolve_config().unwrap();
        let jobs = cli.jobs(&config).await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].params.quantity, Some(50));
        assert_eq!(jobs[1].params.quantity, Some(10));
        assert_eq!(jobs[1].index, 1);
    }

    #[tokio::test]
    async fn test_add_to_cart_without_items_is_an_error() {
        let cli = Cli::parse_from(["lcsc-bulk", "add-to-cart"]);
        let config = cli.resolve_config().unwrap();
        assert!(cli.jobs(&config).await.is_err());
    }
}
