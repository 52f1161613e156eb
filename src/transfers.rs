use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::format_amount;
use crate::normalize;

pub const AMBIGUOUS_LOG: &str = "ambiguous_transfers.log";
pub const MATCHED_REPORT: &str = "matched_transfers.csv";

/// Amounts closer than this are considered cancelling when a linked pair is
/// verified for the matched report.
const AMOUNT_TOLERANCE: f64 = 0.01;

const REQUIRED_COLUMNS: &[&str] = &["Unique Transaction ID", "Date", "Amount", "Unique Account ID"];

/// Outcome of one reconciliation run.
#[derive(Debug, Default)]
pub struct LinkSummary {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub rows_loaded: usize,
    pub matches_found: usize,
    pub ambiguous_groups: usize,
    pub pairs_reported: usize,
    pub mismatched_pairs: usize,
    pub files_updated: usize,
}

struct Columns {
    txn_id: usize,
    date: usize,
    amount: usize,
    acct_id: usize,
    transfer_id: usize,
    description: Option<usize>,
    account_name: Option<usize>,
}

struct LedgerFile {
    path: PathBuf,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    col: Columns,
    changed: bool,
}

struct Candidate {
    file: usize,
    row: usize,
    txn_id: String,
    acct_id: String,
    date: NaiveDate,
    amount: f64,
    cents: i64,
}

struct AmbiguousGroup {
    date: NaiveDate,
    abs_amount: f64,
    pos_ids: Vec<String>,
    neg_ids: Vec<String>,
}

/// Scan every per-account transaction CSV under `ledger_root`, link matching
/// transfer pairs, rewrite changed files in place, and emit the ambiguous and
/// matched reports at the root.
///
/// Idempotent: already-linked rows are frozen, and `clear_existing` makes the
/// whole computation re-runnable from scratch.
pub fn link_transfers(ledger_root: &Path, clear_existing: bool) -> Result<LinkSummary> {
    let mut summary = LinkSummary::default();

    println!("Scanning for transaction files in {}...", ledger_root.display());
    let paths = collect_transaction_files(ledger_root)?;
    summary.files_scanned = paths.len();
    if paths.is_empty() {
        println!("No transaction files found.");
        return Ok(summary);
    }
    println!("Found {} files. Loading data...", paths.len());

    let mut files: Vec<LedgerFile> = Vec::new();
    for path in paths {
        match load_ledger_file(&path) {
            Ok(Some(file)) => files.push(file),
            Ok(None) => summary.files_skipped += 1,
            Err(e) => {
                eprintln!("Warning: error reading {}: {e}", path.display());
                summary.files_skipped += 1;
            }
        }
    }
    summary.rows_loaded = files.iter().map(|f| f.rows.len()).sum();
    println!("Loaded {} transactions.", summary.rows_loaded);

    if clear_existing {
        println!("Clearing all existing transfer links...");
        for file in &mut files {
            for row in &mut file.rows {
                row[file.col.transfer_id].clear();
            }
            file.changed = true;
        }
    }

    // Candidates: unlinked rows with a parseable date and a non-zero amount.
    // Rows that fail to parse are excluded from matching but stay in the file.
    let mut groups: BTreeMap<(NaiveDate, i64), Vec<Candidate>> = BTreeMap::new();
    for (file_idx, file) in files.iter().enumerate() {
        for (row_idx, row) in file.rows.iter().enumerate() {
            if !row[file.col.transfer_id].trim().is_empty() {
                continue;
            }
            let Some(date) = parse_date(&row[file.col.date]) else {
                continue;
            };
            let Ok(amount) = row[file.col.amount].trim().parse::<f64>() else {
                continue;
            };
            if amount == 0.0 {
                continue;
            }
            let cents = (amount.abs() * 100.0).round() as i64;
            groups.entry((date, cents)).or_default().push(Candidate {
                file: file_idx,
                row: row_idx,
                txn_id: row[file.col.txn_id].clone(),
                acct_id: row[file.col.acct_id].clone(),
                date,
                amount,
                cents,
            });
        }
    }

    let mut ambiguous: Vec<AmbiguousGroup> = Vec::new();
    for candidates in groups.values() {
        let positives: Vec<&Candidate> = candidates.iter().filter(|c| c.amount > 0.0).collect();
        let negatives: Vec<&Candidate> = candidates.iter().filter(|c| c.amount < 0.0).collect();

        if positives.is_empty() || negatives.is_empty() {
            continue;
        }

        if positives.len() == 1 && negatives.len() == 1 {
            let pos = positives[0];
            let neg = negatives[0];
            if pos.acct_id == neg.acct_id {
                // Intra-account offset or refund, not a transfer. Skipped
                // without logging to keep the ambiguous report quiet.
                continue;
            }
            let pos_id = pos.txn_id.clone();
            let neg_id = neg.txn_id.clone();
            set_transfer_id(&mut files, pos.file, pos.row, &neg_id);
            set_transfer_id(&mut files, neg.file, neg.row, &pos_id);
            summary.matches_found += 1;
        } else {
            ambiguous.push(AmbiguousGroup {
                date: candidates[0].date,
                abs_amount: candidates[0].cents as f64 / 100.0,
                pos_ids: positives.iter().map(|c| c.txn_id.clone()).collect(),
                neg_ids: negatives.iter().map(|c| c.txn_id.clone()).collect(),
            });
        }
    }
    summary.ambiguous_groups = ambiguous.len();
    write_ambiguous_log(ledger_root, &ambiguous)?;

    write_matched_report(ledger_root, &files, &mut summary)?;

    println!("Found and linked {} new pair(s) of transfers.", summary.matches_found);

    if summary.matches_found > 0 || clear_existing {
        for file in files.iter().filter(|f| f.changed) {
            match rewrite_file(file) {
                Ok(()) => summary.files_updated += 1,
                Err(e) => eprintln!("Warning: error saving {}: {e}", file.path.display()),
            }
        }
        println!("Updated {} file(s).", summary.files_updated);
    } else {
        println!("No changes to save.");
    }

    Ok(summary)
}

/// Transaction files live one level down (per-bank subdirectories). Files
/// directly at the root and any accounts.csv are account/summary files.
fn collect_transaction_files(root: &Path) -> Result<Vec<PathBuf>> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                walk(&path, root, out)?;
            } else if path.extension().map_or(false, |e| e == "csv") {
                if path.parent() == Some(root) {
                    continue;
                }
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("")
                    .to_lowercase();
                if name == "accounts.csv" {
                    continue;
                }
                out.push(path);
            }
        }
        Ok(())
    }
    let mut out = Vec::new();
    if root.is_dir() {
        walk(root, root, &mut out)?;
    }
    out.sort();
    Ok(out)
}

/// Returns Ok(None) for a structurally unusable file (missing a required
/// column), which is reported and skipped rather than failing the run.
fn load_ledger_file(path: &Path) -> Result<Option<LedgerFile>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut header: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
    let declared_columns = header.len();

    let find = |name: &str, header: &[String]| header.iter().position(|h| h == name);
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| find(c, &header).is_none())
        .collect();
    if !missing.is_empty() {
        eprintln!(
            "Warning: skipping {}: missing columns {missing:?}",
            path.display()
        );
        return Ok(None);
    }

    let transfer_id = match find("Transfer Id", &header) {
        Some(idx) => idx,
        None => {
            header.push("Transfer Id".to_string());
            header.len() - 1
        }
    };

    let col = Columns {
        txn_id: find("Unique Transaction ID", &header).unwrap_or(0),
        date: find("Date", &header).unwrap_or(0),
        amount: find("Amount", &header).unwrap_or(0),
        acct_id: find("Unique Account ID", &header).unwrap_or(0),
        transfer_id,
        description: find("Description", &header),
        account_name: find("Account Name", &header),
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        // A row wider than the declared header is a structural problem: the
        // surplus fields have no column and a rewrite would drop them. Leave
        // the whole file untouched.
        if record.len() > declared_columns {
            eprintln!(
                "Warning: skipping {}: row with {} fields exceeds the {}-column header",
                path.display(),
                record.len(),
                declared_columns
            );
            return Ok(None);
        }
        let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        row.resize(header.len(), String::new());
        rows.push(row);
    }

    Ok(Some(LedgerFile {
        path: path.to_path_buf(),
        header,
        rows,
        col,
        changed: false,
    }))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let normalized = normalize::normalize_date(raw.trim());
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d").ok()
}

fn set_transfer_id(files: &mut [LedgerFile], file: usize, row: usize, id: &str) {
    let idx = files[file].col.transfer_id;
    files[file].rows[row][idx] = id.to_string();
    files[file].changed = true;
}

fn rewrite_file(file: &LedgerFile) -> Result<()> {
    let mut writer = csv::Writer::from_path(&file.path)?;
    writer.write_record(&file.header)?;
    for row in &file.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// One row per ambiguous (date, amount) group, with both candidate ID lists.
/// A stale log from an earlier run is removed when nothing remains ambiguous.
fn write_ambiguous_log(root: &Path, groups: &[AmbiguousGroup]) -> Result<()> {
    let log_path = root.join(AMBIGUOUS_LOG);
    if groups.is_empty() {
        if log_path.exists() {
            std::fs::remove_file(&log_path)?;
        }
        return Ok(());
    }

    println!("Found {} ambiguous group(s). Writing {}", groups.len(), log_path.display());
    let mut out = String::from("Date,Amount,Pos_Count,Neg_Count,Details\n");
    for group in groups {
        out.push_str(&format!(
            "{},{},{},{},\"Pos: [{}] | Neg: [{}]\"\n",
            group.date.format("%Y-%m-%d"),
            format_amount(group.abs_amount),
            group.pos_ids.len(),
            group.neg_ids.len(),
            group.pos_ids.join(", "),
            group.neg_ids.join(", "),
        ));
    }
    std::fs::write(&log_path, out)?;
    Ok(())
}

/// Join every linked pair into one report row, negative side as Source.
/// A pair whose amounts do not cancel within tolerance is excluded with a
/// warning; its link is left in place for manual review.
fn write_matched_report(root: &Path, files: &[LedgerFile], summary: &mut LinkSummary) -> Result<()> {
    // Index every transaction so links can resolve across files.
    let mut by_id: HashMap<&str, (usize, usize)> = HashMap::new();
    for (file_idx, file) in files.iter().enumerate() {
        for (row_idx, row) in file.rows.iter().enumerate() {
            let id = row[file.col.txn_id].as_str();
            if !id.is_empty() {
                by_id.insert(id, (file_idx, row_idx));
            }
        }
    }

    fn opt_field(row: &[String], idx: Option<usize>) -> String {
        idx.and_then(|i| row.get(i)).cloned().unwrap_or_default()
    }

    let mut pairs: Vec<Vec<String>> = Vec::new();
    for file in files {
        for row in &file.rows {
            let transfer_id = row[file.col.transfer_id].trim();
            if transfer_id.is_empty() {
                continue;
            }
            let source_amount: f64 = match row[file.col.amount].trim().parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            // Each pair appears twice (A->B and B->A); keep the negative side.
            if source_amount >= 0.0 {
                continue;
            }
            let Some(&(tf, tr)) = by_id.get(transfer_id) else {
                continue;
            };
            let target_file = &files[tf];
            let target_row = &target_file.rows[tr];
            let target_amount: f64 = match target_row[target_file.col.amount].trim().parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            if (source_amount + target_amount).abs() > AMOUNT_TOLERANCE {
                eprintln!(
                    "Warning: excluding linked pair {} / {}: amounts {} and {} do not cancel",
                    row[file.col.txn_id],
                    target_row[target_file.col.txn_id],
                    row[file.col.amount],
                    target_row[target_file.col.amount],
                );
                summary.mismatched_pairs += 1;
                continue;
            }
            pairs.push(vec![
                row[file.col.acct_id].clone(),
                opt_field(row, file.col.account_name),
                row[file.col.txn_id].clone(),
                row[file.col.date].clone(),
                opt_field(row, file.col.description),
                row[file.col.amount].clone(),
                target_row[target_file.col.acct_id].clone(),
                opt_field(target_row, target_file.col.account_name),
                target_row[target_file.col.txn_id].clone(),
                target_row[target_file.col.date].clone(),
                opt_field(target_row, target_file.col.description),
                target_row[target_file.col.amount].clone(),
            ]);
        }
    }

    if pairs.is_empty() {
        println!("No matched transfers found to report.");
        return Ok(());
    }

    let report_path = root.join(MATCHED_REPORT);
    let mut writer = csv::Writer::from_path(&report_path)?;
    writer.write_record([
        "Source Account ID",
        "Source Account Name",
        "Source Transaction Id",
        "Source Date",
        "Source Description",
        "Source Amount",
        "Target Account ID",
        "Target Account Name",
        "Target Transaction Id",
        "Target Date",
        "Target Description",
        "Target Amount",
    ])?;
    for pair in &pairs {
        writer.write_record(pair)?;
    }
    writer.flush()?;
    summary.pairs_reported = pairs.len();
    println!("Saved {} matched transfer pair(s) to {}", pairs.len(), report_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::read_rows;
    use std::path::Path;

    fn write_file(root: &Path, bank: &str, name: &str, body: &str) -> PathBuf {
        let dir = root.join(bank);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn txn_header() -> &'static str {
        "Unique Transaction ID,Unique Account ID,Account Name,Date,Description,Amount,Transfer Id\n"
    }

    fn transfer_id_of(path: &Path, txn_id: &str) -> String {
        read_rows(path)
            .unwrap()
            .into_iter()
            .find(|r| r.get("Unique Transaction ID") == Some(txn_id))
            .and_then(|r| r.get("Transfer Id").map(|s| s.to_string()))
            .unwrap_or_default()
    }

    #[test]
    fn test_links_one_to_one_pair_across_accounts() {
        let root = tempfile::tempdir().unwrap();
        let a = write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            &format!("{}t-a,acct-a,Chequing,2024-03-01,TRANSFER OUT,-100.0,\n", txn_header()),
        );
        let b = write_file(
            root.path(),
            "bank_b",
            "2024-03.csv",
            &format!("{}t-b,acct-b,Savings,2024-03-01,TRANSFER IN,100.0,\n", txn_header()),
        );

        let summary = link_transfers(root.path(), false).unwrap();
        assert_eq!(summary.matches_found, 1);
        assert_eq!(summary.ambiguous_groups, 0);
        assert_eq!(summary.pairs_reported, 1);
        assert_eq!(transfer_id_of(&a, "t-a"), "t-b");
        assert_eq!(transfer_id_of(&b, "t-b"), "t-a");

        let report = read_rows(&root.path().join(MATCHED_REPORT)).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].get("Source Amount"), Some("-100.0"));
        assert_eq!(report[0].get("Target Amount"), Some("100.0"));
        assert_eq!(report[0].get("Source Account ID"), Some("acct-a"));
        assert_eq!(report[0].get("Target Account ID"), Some("acct-b"));
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            &format!("{}t-a,acct-a,,2024-03-01,OUT,-100.0,\n", txn_header()),
        );
        write_file(
            root.path(),
            "bank_b",
            "2024-03.csv",
            &format!("{}t-b,acct-b,,2024-03-01,IN,100.0,\n", txn_header()),
        );

        let first = link_transfers(root.path(), false).unwrap();
        assert_eq!(first.matches_found, 1);
        let report_before =
            std::fs::read_to_string(root.path().join(MATCHED_REPORT)).unwrap();

        let second = link_transfers(root.path(), false).unwrap();
        assert_eq!(second.matches_found, 0);
        assert_eq!(second.files_updated, 0);
        assert_eq!(second.pairs_reported, 1);
        let report_after = std::fs::read_to_string(root.path().join(MATCHED_REPORT)).unwrap();
        assert_eq!(report_before, report_after);
    }

    #[test]
    fn test_clear_and_relink_rediscovers_pairs() {
        let root = tempfile::tempdir().unwrap();
        let a = write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            &format!("{}t-a,acct-a,,2024-03-01,OUT,-100.0,\n", txn_header()),
        );
        link_transfers(root.path(), false).unwrap();
        let b = write_file(
            root.path(),
            "bank_b",
            "2024-03.csv",
            &format!("{}t-b,acct-b,,2024-03-01,IN,100.0,\n", txn_header()),
        );
        let linked = link_transfers(root.path(), false).unwrap();
        assert_eq!(linked.matches_found, 1);

        let relinked = link_transfers(root.path(), true).unwrap();
        assert_eq!(relinked.matches_found, 1);
        assert_eq!(transfer_id_of(&a, "t-a"), "t-b");
        assert_eq!(transfer_id_of(&b, "t-b"), "t-a");
    }

    #[test]
    fn test_ambiguous_group_logged_not_guessed() {
        let root = tempfile::tempdir().unwrap();
        let a = write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            &format!("{}t-1,acct-1,,2024-03-01,IN,50.0,\n", txn_header()),
        );
        let b = write_file(
            root.path(),
            "bank_b",
            "2024-03.csv",
            &format!("{}t-2,acct-2,,2024-03-01,IN,50.0,\n", txn_header()),
        );
        let c = write_file(
            root.path(),
            "bank_c",
            "2024-03.csv",
            &format!("{}t-3,acct-3,,2024-03-01,OUT,-50.0,\n", txn_header()),
        );

        let summary = link_transfers(root.path(), false).unwrap();
        assert_eq!(summary.matches_found, 0);
        assert_eq!(summary.ambiguous_groups, 1);
        assert_eq!(transfer_id_of(&a, "t-1"), "");
        assert_eq!(transfer_id_of(&b, "t-2"), "");
        assert_eq!(transfer_id_of(&c, "t-3"), "");

        let log = std::fs::read_to_string(root.path().join(AMBIGUOUS_LOG)).unwrap();
        assert!(log.contains("2024-03-01,50.0,2,1"));
        assert!(log.contains("t-1"));
        assert!(log.contains("t-3"));
    }

    #[test]
    fn test_same_account_pair_skipped_silently() {
        let root = tempfile::tempdir().unwrap();
        let a = write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            &format!(
                "{}t-1,acct-1,,2024-03-01,CHARGE,-25.0,\nt-2,acct-1,,2024-03-01,REFUND,25.0,\n",
                txn_header()
            ),
        );
        let summary = link_transfers(root.path(), false).unwrap();
        assert_eq!(summary.matches_found, 0);
        assert_eq!(summary.ambiguous_groups, 0);
        assert!(!root.path().join(AMBIGUOUS_LOG).exists());
        assert_eq!(transfer_id_of(&a, "t-1"), "");
        assert_eq!(transfer_id_of(&a, "t-2"), "");
    }

    #[test]
    fn test_stale_ambiguous_log_removed() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join(AMBIGUOUS_LOG), "old content").unwrap();
        write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            &format!("{}t-1,acct-1,,2024-03-01,X,-10.0,\n", txn_header()),
        );
        link_transfers(root.path(), false).unwrap();
        assert!(!root.path().join(AMBIGUOUS_LOG).exists());
    }

    #[test]
    fn test_missing_required_column_skips_file() {
        let root = tempfile::tempdir().unwrap();
        write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            "Unique Transaction ID,Date,Amount\nt-1,2024-03-01,-10.0\n",
        );
        write_file(
            root.path(),
            "bank_b",
            "2024-03.csv",
            &format!("{}t-2,acct-b,,2024-03-01,IN,10.0,\n", txn_header()),
        );
        let summary = link_transfers(root.path(), false).unwrap();
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.rows_loaded, 1);
        assert_eq!(summary.matches_found, 0);
    }

    #[test]
    fn test_root_files_and_accounts_csv_ignored() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join("summary.csv"),
            format!("{}t-x,acct-x,,2024-03-01,X,-10.0,\n", txn_header()),
        )
        .unwrap();
        write_file(
            root.path(),
            "bank_a",
            "accounts.csv",
            "Unique Account ID,Account Name\nacct-a,Chequing\n",
        );
        write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            &format!("{}t-1,acct-a,,2024-03-01,X,-10.0,\n", txn_header()),
        );
        let summary = link_transfers(root.path(), false).unwrap();
        assert_eq!(summary.files_scanned, 1);
        assert_eq!(summary.rows_loaded, 1);
    }

    #[test]
    fn test_unparseable_amount_and_date_excluded() {
        let root = tempfile::tempdir().unwrap();
        write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            &format!(
                "{}t-1,acct-a,,2024-03-01,OUT,-100.0,\nt-2,acct-a,,garbage,BAD DATE,100.0,\nt-3,acct-a,,2024-03-01,BAD AMT,abc,\n",
                txn_header()
            ),
        );
        write_file(
            root.path(),
            "bank_b",
            "2024-03.csv",
            &format!("{}t-4,acct-b,,2024-03-01,IN,100.0,\n", txn_header()),
        );
        let summary = link_transfers(root.path(), false).unwrap();
        // Only t-1 and t-4 participate, so they pair cleanly.
        assert_eq!(summary.matches_found, 1);
    }

    #[test]
    fn test_zero_amount_rows_never_candidates() {
        let root = tempfile::tempdir().unwrap();
        write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            &format!(
                "{}t-1,acct-a,,2024-03-01,ZERO,0.0,\nt-2,acct-b,,2024-03-01,ZERO,0.0,\n",
                txn_header()
            ),
        );
        let summary = link_transfers(root.path(), false).unwrap();
        assert_eq!(summary.matches_found, 0);
        assert_eq!(summary.ambiguous_groups, 0);
    }

    #[test]
    fn test_existing_links_are_frozen() {
        let root = tempfile::tempdir().unwrap();
        // t-1 already linked elsewhere; only t-2 and t-3 are free to pair.
        write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            &format!(
                "{}t-1,acct-a,,2024-03-01,OLD LINK,-100.0,t-9\nt-2,acct-a,,2024-03-01,OUT,-100.0,\n",
                txn_header()
            ),
        );
        let b = write_file(
            root.path(),
            "bank_b",
            "2024-03.csv",
            &format!("{}t-3,acct-b,,2024-03-01,IN,100.0,\n", txn_header()),
        );
        let summary = link_transfers(root.path(), false).unwrap();
        assert_eq!(summary.matches_found, 1);
        assert_eq!(transfer_id_of(&b, "t-3"), "t-2");
    }

    #[test]
    fn test_mismatched_pair_excluded_from_report_but_link_kept() {
        let root = tempfile::tempdir().unwrap();
        // Pre-existing (corrupt) link: amounts do not cancel.
        let a = write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            &format!("{}t-1,acct-a,,2024-03-01,OUT,-100.0,t-2\n", txn_header()),
        );
        write_file(
            root.path(),
            "bank_b",
            "2024-03.csv",
            &format!("{}t-2,acct-b,,2024-03-01,IN,90.0,t-1\n", txn_header()),
        );
        let summary = link_transfers(root.path(), false).unwrap();
        assert_eq!(summary.mismatched_pairs, 1);
        assert_eq!(summary.pairs_reported, 0);
        assert!(!root.path().join(MATCHED_REPORT).exists());
        // Link preserved for manual review.
        assert_eq!(transfer_id_of(&a, "t-1"), "t-2");
    }

    #[test]
    fn test_ragged_row_skips_file_and_preserves_content() {
        let root = tempfile::tempdir().unwrap();
        // Second row carries a field past the header; the file must be left
        // exactly as it is, not rewritten with the surplus field dropped.
        let body = format!(
            "{}t-1,acct-a,,2024-03-01,OUT,-100.0,\nt-2,acct-a,,2024-03-02,RAGGED,-5.0,,EXTRA-FIELD\n",
            txn_header()
        );
        let a = write_file(root.path(), "bank_a", "2024-03.csv", &body);
        write_file(
            root.path(),
            "bank_b",
            "2024-03.csv",
            &format!("{}t-3,acct-b,,2024-03-01,IN,100.0,\n", txn_header()),
        );
        let summary = link_transfers(root.path(), false).unwrap();
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.matches_found, 0);
        assert_eq!(std::fs::read_to_string(&a).unwrap(), body);
    }

    #[test]
    fn test_ragged_file_untouched_by_clear() {
        let root = tempfile::tempdir().unwrap();
        let body = format!(
            "{}t-1,acct-a,,2024-03-01,OUT,-100.0,t-9,EXTRA-FIELD\n",
            txn_header()
        );
        let a = write_file(root.path(), "bank_a", "2024-03.csv", &body);
        link_transfers(root.path(), true).unwrap();
        assert_eq!(std::fs::read_to_string(&a).unwrap(), body);
    }

    #[test]
    fn test_missing_transfer_id_column_added_on_link() {
        let root = tempfile::tempdir().unwrap();
        let a = write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            "Unique Transaction ID,Unique Account ID,Date,Amount\nt-1,acct-a,2024-03-01,-42.0\n",
        );
        write_file(
            root.path(),
            "bank_b",
            "2024-03.csv",
            &format!("{}t-2,acct-b,,2024-03-01,IN,42.0,\n", txn_header()),
        );
        let summary = link_transfers(root.path(), false).unwrap();
        assert_eq!(summary.matches_found, 1);
        assert_eq!(transfer_id_of(&a, "t-1"), "t-2");
    }

    #[test]
    fn test_row_order_preserved_on_rewrite() {
        let root = tempfile::tempdir().unwrap();
        let a = write_file(
            root.path(),
            "bank_a",
            "2024-03.csv",
            &format!(
                "{}t-1,acct-a,,2024-03-05,FIVE,-1.0,\nt-2,acct-a,,2024-03-01,OUT,-100.0,\nt-3,acct-a,,2024-03-02,TWO,-2.0,\n",
                txn_header()
            ),
        );
        write_file(
            root.path(),
            "bank_b",
            "2024-03.csv",
            &format!("{}t-4,acct-b,,2024-03-01,IN,100.0,\n", txn_header()),
        );
        link_transfers(root.path(), false).unwrap();
        let ids: Vec<String> = read_rows(&a)
            .unwrap()
            .iter()
            .map(|r| r.get("Unique Transaction ID").unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["t-1", "t-2", "t-3"]);
    }
}
