pub mod config;
pub mod ingest;
pub mod link;
pub mod payees;
pub mod rules;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ledgerlink",
    about = "Reconciles scraped bank transactions into a deduplicated personal CSV ledger."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a raw adapter batch (JSON) into a bank's ledger directory.
    Ingest {
        /// Path to the JSON batch produced by a bank adapter
        file: String,
        /// Bank identifier, used as the ledger subdirectory name
        #[arg(long)]
        bank: String,
        /// Fallback Unique Account ID for records that carry none
        #[arg(long = "account-id")]
        account_id: Option<String>,
        /// Ledger root directory (default: from settings)
        #[arg(long = "ledger-dir")]
        ledger_dir: Option<String>,
        /// Payee rule file or directory (default: from settings)
        #[arg(long)]
        rules: Option<String>,
    },
    /// Detect and link matching transfer pairs across the ledger.
    Link {
        /// Clear all existing transfer links before matching.
        #[arg(long = "clear-transfers")]
        clear_transfers: bool,
        /// Ledger root directory (default: from settings)
        #[arg(long = "ledger-dir")]
        ledger_dir: Option<String>,
    },
    /// Generate payee usage reports (counts and description mappings).
    Payees {
        /// Ledger root directory (default: from settings)
        #[arg(long = "ledger-dir")]
        ledger_dir: Option<String>,
    },
    /// Show or update the stored settings.
    Config {
        /// Set the ledger root directory
        #[arg(long = "ledger-dir")]
        ledger_dir: Option<String>,
        /// Set the payee rule file or directory
        #[arg(long)]
        rules: Option<String>,
    },
    /// Manage payee normalization rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Sort a rule file alphabetically by rule name (keywords and patterns too).
    Sort {
        /// Path to a JSON rule file
        file: String,
    },
    /// Load the rule set and report its size and any invalid patterns.
    Check {
        /// Rule file or directory (default: from settings)
        #[arg(long)]
        path: Option<String>,
    },
}
