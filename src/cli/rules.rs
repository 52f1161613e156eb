use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::error::{LedgerError, Result};
use crate::payees::{PayeeRules, RuleFile};
use crate::settings::load_settings;

/// Rewrite a rule file with rules in alphabetical name order, each rule's
/// keyword and pattern lists sorted too. Keeps hand-edited files tidy.
///
/// Sorting changes match precedence; that is the point of running it on files
/// whose rules are meant to be order-independent.
pub fn sort(file: &str) -> Result<()> {
    let path = Path::new(file);
    if path.is_dir() {
        return Err(LedgerError::Rules(format!(
            "{} is a directory; sort one file at a time",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    let mut rule_file: RuleFile = serde_json::from_str(&content)?;

    for rule in &mut rule_file.rules {
        rule.keywords.sort();
        rule.regex.sort();
    }
    rule_file
        .rules
        .sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    let json = serde_json::to_string_pretty(&rule_file)?;
    std::fs::write(path, format!("{json}\n"))?;

    println!(
        "{} sorted {} rule(s) in {}",
        "Done:".green().bold(),
        rule_file.rules.len(),
        path.display()
    );
    Ok(())
}

pub fn check(path: Option<&str>) -> Result<()> {
    let path = match path {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(load_settings().payee_rules_path),
    };
    let rules = PayeeRules::load(&path)?;

    if rules.is_empty() {
        println!("{} no rules loaded from {}", "Note:".yellow(), path.display());
        return Ok(());
    }
    if rules.skipped_patterns() > 0 {
        println!(
            "{} {} rule(s) loaded, {} invalid pattern(s) skipped",
            "Warning:".yellow().bold(),
            rules.len(),
            rules.skipped_patterns()
        );
    } else {
        println!("{} {} rule(s) loaded", "OK:".green().bold(), rules.len());
    }
    Ok(())
}
