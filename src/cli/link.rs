use std::path::PathBuf;

use colored::Colorize;

use crate::error::Result;
use crate::settings::load_settings;
use crate::transfers::link_transfers;

pub fn run(clear_transfers: bool, ledger_dir: Option<&str>) -> Result<()> {
    let dir = match ledger_dir {
        Some(d) => PathBuf::from(d),
        None => PathBuf::from(load_settings().ledger_dir),
    };

    let summary = link_transfers(&dir, clear_transfers)?;

    println!();
    println!(
        "{} {} linked, {} ambiguous, {} pair(s) in report",
        "Done:".green().bold(),
        summary.matches_found,
        summary.ambiguous_groups,
        summary.pairs_reported,
    );
    if summary.files_skipped > 0 {
        println!(
            "{} {} file(s) skipped, see warnings above",
            "Note:".yellow(),
            summary.files_skipped
        );
    }
    if summary.mismatched_pairs > 0 {
        println!(
            "{} {} linked pair(s) excluded from the report (amounts do not cancel)",
            "Note:".yellow(),
            summary.mismatched_pairs
        );
    }
    Ok(())
}
