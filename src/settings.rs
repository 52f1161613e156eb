use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root of the ledger tree: per-bank subdirectories of monthly CSVs.
    pub ledger_dir: String,
    /// Payee rule file or directory of rule files.
    #[serde(default = "default_rules_path")]
    pub payee_rules_path: String,
}

fn default_rules_path() -> String {
    config_dir().join("payee_rules").to_string_lossy().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ledger_dir: default_ledger_dir().to_string_lossy().to_string(),
            payee_rules_path: default_rules_path(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ledgerlink")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_ledger_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("ledger")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| LedgerError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}
