use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{LedgerError, Result};
use crate::models::{Account, Transaction};
use crate::payees::PayeeRules;
use crate::writer::LedgerWriter;

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub transactions: usize,
    pub accounts: usize,
    pub skipped_records: usize,
    pub files_written: usize,
}

/// A batch of raw records handed over by a bank adapter: either a bare JSON
/// array of transaction records, or `{"transactions": [...], "accounts": [...]}`.
pub struct RawBatch {
    pub transactions: Vec<Map<String, Value>>,
    pub accounts: Vec<Map<String, Value>>,
}

impl RawBatch {
    pub fn parse(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(Self {
                transactions: collect_objects(items),
                accounts: Vec::new(),
            }),
            Value::Object(mut map) => {
                let transactions = match map.remove("transactions") {
                    Some(Value::Array(items)) => collect_objects(items),
                    _ => Vec::new(),
                };
                let accounts = match map.remove("accounts") {
                    Some(Value::Array(items)) => collect_objects(items),
                    _ => Vec::new(),
                };
                Ok(Self {
                    transactions,
                    accounts,
                })
            }
            _ => Err(LedgerError::Other(
                "batch must be a JSON array or object".to_string(),
            )),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(serde_json::from_str(&content)?)
    }
}

fn collect_objects(items: Vec<Value>) -> Vec<Map<String, Value>> {
    items
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// Run one adapter batch through the canonical model and persist it under the
/// bank's ledger directory: per-month transaction files plus accounts.csv.
///
/// A record with no resolvable account id is skipped with a warning; one bad
/// record never fails the batch.
pub fn ingest_batch(
    batch: RawBatch,
    bank_dir: &Path,
    rules: &PayeeRules,
    default_account_id: Option<&str>,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    let writer = LedgerWriter::new(bank_dir)?;

    let mut transactions: Vec<Transaction> = Vec::new();
    for raw in batch.transactions {
        let Some(account_id) = record_account_id(&raw, default_account_id) else {
            eprintln!("Warning: transaction record has no Unique Account ID, skipped");
            summary.skipped_records += 1;
            continue;
        };
        let mut txn = Transaction::from_raw(raw, &account_id);
        txn.resolve_payee(rules);
        transactions.push(txn);
    }
    summary.transactions = transactions.len();
    summary.files_written = writer.write_monthly(&transactions)?.len();

    let mut accounts: Vec<Account> = Vec::new();
    for raw in batch.accounts {
        let Some(account_id) = record_account_id(&raw, default_account_id) else {
            eprintln!("Warning: account record has no Unique Account ID, skipped");
            summary.skipped_records += 1;
            continue;
        };
        accounts.push(Account::from_raw(raw, &account_id));
    }
    if !accounts.is_empty() {
        summary.accounts = accounts.len();
        writer.merge_accounts(&accounts)?;
    }

    Ok(summary)
}

fn record_account_id(raw: &Map<String, Value>, fallback: Option<&str>) -> Option<String> {
    match raw.get("Unique Account ID") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => fallback.map(|s| s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payees::{PayeeRule, PayeeRules};
    use crate::writer::read_rows;
    use serde_json::json;

    fn rules() -> PayeeRules {
        PayeeRules::from_rules(vec![PayeeRule {
            name: "Coffee Co".to_string(),
            keywords: vec!["coffee".to_string()],
            regex: vec![],
        }])
    }

    #[test]
    fn test_ingest_writes_monthly_files_and_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let batch = RawBatch::parse(json!({
            "transactions": [
                {"Unique Account ID": "acct-1", "Date": "2024-03-01",
                 "Description": "COFFEE  SHOP", "Amount": -4.5, "Currency": "CAD"},
                {"Unique Account ID": "acct-1", "Date": "04/02/2024",
                 "Description": "PAYROLL", "Amount": 1500.0, "Currency": "CAD"},
            ],
            "accounts": [
                {"Unique Account ID": "acct-1", "Account Name": "Chequing",
                 "Type": "Chequing", "Current Balance": 2000.0},
            ],
        }))
        .unwrap();

        let summary = ingest_batch(batch, dir.path(), &rules(), None).unwrap();
        assert_eq!(summary.transactions, 2);
        assert_eq!(summary.accounts, 1);
        assert_eq!(summary.files_written, 2);

        let march = read_rows(&dir.path().join("2024-03.csv")).unwrap();
        assert_eq!(march.len(), 1);
        assert_eq!(march[0].get("Payee Name"), Some("Coffee Co"));
        let april = read_rows(&dir.path().join("2024-04.csv")).unwrap();
        assert_eq!(april[0].get("Date"), Some("2024-04-02"));
        assert!(dir.path().join("accounts.csv").exists());
    }

    #[test]
    fn test_reingest_same_batch_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let record = json!([{ "Unique Account ID": "acct-1", "Date": "2024-03-01",
            "Description": "SHOP", "Amount": -10.0 }]);
        let first = ingest_batch(
            RawBatch::parse(record.clone()).unwrap(),
            dir.path(),
            &rules(),
            None,
        )
        .unwrap();
        assert_eq!(first.transactions, 1);
        ingest_batch(RawBatch::parse(record).unwrap(), dir.path(), &rules(), None).unwrap();

        let rows = read_rows(&dir.path().join("2024-03.csv")).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_record_without_account_id_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let batch = RawBatch::parse(json!([
            {"Date": "2024-03-01", "Description": "NO ACCOUNT", "Amount": -1.0},
        ]))
        .unwrap();
        let summary = ingest_batch(batch, dir.path(), &rules(), None).unwrap();
        assert_eq!(summary.transactions, 0);
        assert_eq!(summary.skipped_records, 1);
    }

    #[test]
    fn test_default_account_id_applies() {
        let dir = tempfile::tempdir().unwrap();
        let batch = RawBatch::parse(json!([
            {"Date": "2024-03-01", "Description": "X", "Amount": -1.0},
        ]))
        .unwrap();
        let summary = ingest_batch(batch, dir.path(), &rules(), Some("acct-9")).unwrap();
        assert_eq!(summary.transactions, 1);
        let rows = read_rows(&dir.path().join("2024-03.csv")).unwrap();
        assert_eq!(rows[0].get("Unique Account ID"), Some("acct-9"));
    }
}
