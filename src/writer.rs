use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{Account, Row, Transaction, ACCOUNT_FIELDS, TRANSACTION_FIELDS};

/// Writes canonical rows to CSV files under one bank's ledger directory.
pub struct LedgerWriter {
    output_dir: PathBuf,
}

impl LedgerWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write rows as a full overwrite of `filename`.
    ///
    /// Header = required fields that are active, then remaining active keys in
    /// first-encounter order. A column is active when at least one row has a
    /// non-empty, non-"nan" value; inactive columns are dropped entirely.
    pub fn write(&self, rows: &[Row], filename: &str, required: &[&str]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut all_keys: Vec<String> = Vec::new();
        for row in rows {
            for key in row.keys() {
                if !all_keys.iter().any(|k| k == key) {
                    all_keys.push(key.to_string());
                }
            }
        }

        let is_active = |key: &str| {
            rows.iter().any(|row| {
                row.get(key).map_or(false, |v| {
                    let v = v.trim();
                    !v.is_empty() && !v.eq_ignore_ascii_case("nan")
                })
            })
        };

        let mut header: Vec<&str> = required
            .iter()
            .copied()
            .filter(|k| is_active(k))
            .collect();
        for key in &all_keys {
            if !required.contains(&key.as_str()) && is_active(key) {
                header.push(key.as_str());
            }
        }

        let path = self.output_dir.join(filename);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(&header)?;
        for row in rows {
            let record: Vec<&str> = header.iter().map(|k| row.get(k).unwrap_or("")).collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;

        println!("Saved {} rows to {}", rows.len(), path.display());
        Ok(())
    }

    /// Persist transactions grouped into per-month files (`YYYY-MM.csv`),
    /// each a full overwrite so re-downloading a period is idempotent.
    pub fn write_monthly(&self, transactions: &[Transaction]) -> Result<Vec<PathBuf>> {
        let mut by_month: BTreeMap<String, Vec<Row>> = BTreeMap::new();
        for txn in transactions {
            if txn.date.len() < 7 {
                eprintln!(
                    "Warning: transaction {} has unusable date '{}', not saved",
                    txn.unique_transaction_id, txn.date
                );
                continue;
            }
            by_month
                .entry(txn.date[..7].to_string())
                .or_default()
                .push(txn.to_row());
        }

        let mut written = Vec::new();
        for (month, rows) in &by_month {
            let filename = format!("{month}.csv");
            self.write(rows, &filename, TRANSACTION_FIELDS)?;
            written.push(self.output_dir.join(filename));
        }
        Ok(written)
    }

    /// Upsert accounts into this bank's accounts.csv. Existing records are
    /// refreshed in place; a stored account number is only replaced when the
    /// newly observed one is judged better. Accounts are never deleted.
    pub fn merge_accounts(&self, accounts: &[Account]) -> Result<()> {
        let path = self.output_dir.join("accounts.csv");
        let mut rows: Vec<Row> = if path.exists() { read_rows(&path)? } else { Vec::new() };

        for account in accounts {
            let mut new_row = account.to_row();
            let existing = rows
                .iter_mut()
                .find(|r| r.get("Unique Account ID") == Some(account.unique_account_id.as_str()));
            match existing {
                Some(row) => {
                    let stored = row.get("Account Number").unwrap_or("").to_string();
                    if !is_better_account_number(
                        &stored,
                        &account.account_number,
                        &account.unique_account_id,
                    ) {
                        new_row.set("Account Number", stored);
                    }
                    *row = new_row;
                }
                None => rows.push(new_row),
            }
        }

        self.write(&rows, "accounts.csv", ACCOUNT_FIELDS)
    }
}

/// Read a CSV back into ordered rows, header names as keys.
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = Row::new();
        for (key, value) in headers.iter().zip(record.iter()) {
            row.set(key, value.to_string());
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Decide whether a newly observed account number should replace the stored
/// one. The stored canonical unique-id string is never downgraded.
pub fn is_better_account_number(existing: &str, candidate: &str, unique_id: &str) -> bool {
    let existing = existing.trim();
    let candidate = candidate.trim();

    if existing.is_empty() {
        return !candidate.is_empty();
    }
    if candidate.is_empty() {
        return false;
    }
    if existing == unique_id {
        return false;
    }
    let masked = |s: &str| s.chars().any(|c| matches!(c, '*' | 'x' | 'X' | '\u{2022}'));
    if masked(existing) && !masked(candidate) {
        return true;
    }
    if !masked(existing) && !masked(candidate) && candidate.len() > existing.len() {
        return true;
    }
    false
}
