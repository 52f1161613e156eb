use std::path::PathBuf;

use colored::Colorize;

use crate::error::Result;
use crate::payee_report::write_payee_reports;
use crate::settings::load_settings;

pub fn run(ledger_dir: Option<&str>) -> Result<()> {
    let dir = match ledger_dir {
        Some(d) => PathBuf::from(d),
        None => PathBuf::from(load_settings().ledger_dir),
    };

    let summary = write_payee_reports(&dir)?;

    println!();
    println!(
        "{} {} row(s) across {} file(s): {} payee(s), {} mapping(s)",
        "Done:".green().bold(),
        summary.rows_counted,
        summary.files_scanned,
        summary.distinct_payees,
        summary.distinct_mappings,
    );
    Ok(())
}
