use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::error::Result;
use crate::ingest::{ingest_batch, RawBatch};
use crate::payees::PayeeRules;
use crate::settings::load_settings;

pub fn run(
    file: &str,
    bank: &str,
    account_id: Option<&str>,
    ledger_dir: Option<&str>,
    rules_path: Option<&str>,
) -> Result<()> {
    let settings = load_settings();
    let ledger_dir = match ledger_dir {
        Some(d) => PathBuf::from(d),
        None => PathBuf::from(settings.ledger_dir.clone()),
    };
    let rules_path = match rules_path {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(settings.payee_rules_path.clone()),
    };

    let rules = PayeeRules::load(&rules_path)?;
    let batch = RawBatch::load(Path::new(file))?;
    let summary = ingest_batch(batch, &ledger_dir.join(bank), &rules, account_id)?;

    println!();
    println!(
        "{} {} transaction(s) across {} monthly file(s), {} account(s) merged",
        "Done:".green().bold(),
        summary.transactions,
        summary.files_written,
        summary.accounts,
    );
    if summary.skipped_records > 0 {
        println!(
            "{} {} record(s) skipped, see warnings above",
            "Note:".yellow(),
            summary.skipped_records
        );
    }
    Ok(())
}
