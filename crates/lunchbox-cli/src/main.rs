mod cli;
mod logging;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use lunchbox_ai::{GeminiClient, OpenRouterClient};
use lunchbox_core::config::{LunchboxConfig, StoreBackend};
use lunchbox_core::{CarbonTable, Product, UserId};
use lunchbox_host::ScanHost;
use lunchbox_lookup::{Lookup, OpenFoodFactsClient};
use lunchbox_store::{DuckStore, MemoryStore, ScanStore};
use serde::Serialize;
use tracing::info;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = logging::load_config(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    logging::init_tracing(&config.general)?;
    info!(
        config = %cli.config.display(),
        found = cli.config.exists(),
        "lunchbox v{}",
        env!("CARGO_PKG_VERSION")
    );

    let user = UserId::new(cli.user.unwrap_or_else(|| config.general.user.clone()));
    let table = load_table(&config)?;

    // Offline: no clients or store needed.
    if let Command::Carbon { name } = &cli.command {
        print_json(&table.match_item(name))?;
        return Ok(ExitCode::SUCCESS);
    }

    let host = build_host(&config, table)?;
    match cli.command {
        Command::Scan { image } => {
            let record = host.scan_image(&user, encode_image(&image)?).await?;
            print_json(&record)?;
        }
        Command::Live { image } => print_json(&host.live_detect(&encode_image(&image)?).await)?,
        Command::Barcode { code } => {
            let report = BarcodeReport::new(&code, host.lookup_barcode(&code).await?);
            print_json(&report)?;
            if matches!(report, BarcodeReport::NotFound { .. }) {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::History { limit } => print_json(&host.get_history(&user, limit).await)?,
        Command::Ledger => print_json(&host.get_ledger(&user).await)?,
        Command::Recipes { items } => print_json(&host.suggest_recipes(&items).await?)?,
        Command::Carbon { .. } => {}
    }
    Ok(ExitCode::SUCCESS)
}

/// Output of `lunchbox barcode`. A miss is reported explicitly and makes
/// the process exit non-zero.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum BarcodeReport {
    Found { product: Product },
    NotFound { barcode: String, error: String },
}

impl BarcodeReport {
    fn new(barcode: &str, lookup: Lookup) -> Self {
        match lookup {
            Lookup::Found(product) => Self::Found { product },
            Lookup::NotFound => Self::NotFound {
                barcode: barcode.trim().to_string(),
                error: "Product not found".to_string(),
            },
        }
    }
}

fn load_table(config: &LunchboxConfig) -> anyhow::Result<CarbonTable> {
    match &config.carbon.table_path {
        Some(path) => CarbonTable::from_path(Path::new(path))
            .with_context(|| format!("loading carbon table from {path}")),
        None => CarbonTable::builtin().context("loading built-in carbon table"),
    }
}

fn open_store(config: &LunchboxConfig) -> anyhow::Result<Arc<dyn ScanStore>> {
    Ok(match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::DuckDb => Arc::new(
            DuckStore::open_persistent(Path::new(&config.store.path))
                .with_context(|| format!("opening store at {}", config.store.path))?,
        ),
    })
}

fn build_host(config: &LunchboxConfig, table: CarbonTable) -> anyhow::Result<ScanHost> {
    let store = open_store(config)?;

    let gemini = Arc::new(
        GeminiClient::new(
            config.analyzer.base_url.clone(),
            config.analyzer.model.clone(),
            config.analyzer.api_key.clone(),
            Duration::from_secs(config.analyzer.timeout_secs),
        )
        .context("building analyzer client")?,
    );
    let lookup = Arc::new(
        OpenFoodFactsClient::new(
            config.lookup.base_url.clone(),
            Duration::from_secs(config.lookup.timeout_secs),
        )
        .context("building product lookup client")?,
    );

    let mut host = ScanHost::new(table, store, gemini.clone(), lookup).with_recipe_generator(gemini);
    if !config.recipes.fallback_api_key.is_empty() {
        let fallback = OpenRouterClient::new(
            config.recipes.fallback_base_url.clone(),
            config.recipes.fallback_model.clone(),
            config.recipes.fallback_api_key.clone(),
            Duration::from_secs(config.analyzer.timeout_secs),
        )
        .context("building fallback recipe client")?;
        host = host.with_recipe_generator(Arc::new(fallback));
    }
    Ok(host)
}

/// Read an image file and return it base64-encoded.
fn encode_image(path: &Path) -> anyhow::Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading image {}", path.display()))?;
    anyhow::ensure!(!bytes.is_empty(), "image {} is empty", path.display());
    Ok(STANDARD.encode(bytes))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
