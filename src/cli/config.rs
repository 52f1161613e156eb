use colored::Colorize;

use crate::error::Result;
use crate::settings::{load_settings, save_settings};

/// Show the stored settings, updating any field a flag was given for.
pub fn run(ledger_dir: Option<&str>, rules: Option<&str>) -> Result<()> {
    let mut settings = load_settings();
    let mut changed = false;

    if let Some(dir) = ledger_dir {
        settings.ledger_dir = dir.to_string();
        changed = true;
    }
    if let Some(path) = rules {
        settings.payee_rules_path = path.to_string();
        changed = true;
    }
    if changed {
        save_settings(&settings)?;
        println!("{} settings saved", "Done:".green().bold());
    }

    println!("Ledger directory: {}", settings.ledger_dir);
    println!("Payee rules path: {}", settings.payee_rules_path);
    Ok(())
}
