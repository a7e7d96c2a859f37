//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "lunchbox", version, about = "Grocery scan enrichment and sustainability tracking")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, value_name = "PATH", default_value = "lunchbox.toml", env = "LUNCHBOX_CONFIG")]
    pub config: PathBuf,

    /// User the scan, history and ledger commands act on (default: general.user)
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyse a JPEG, enrich it with carbon data and record it
    Scan {
        /// Image file to analyse
        image: PathBuf,
    },
    /// Detect up to five produce items in a JPEG without recording anything
    Live {
        image: PathBuf,
    },
    /// Look up a product by barcode
    Barcode {
        code: String,
    },
    /// Show recent scans, newest first
    History {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Show the sustainability ledger
    Ledger,
    /// Suggest recipes that use up the given items
    Recipes {
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Match an item name against the carbon table (offline)
    Carbon {
        name: String,
    },
}
