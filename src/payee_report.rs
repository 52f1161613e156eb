use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const COUNTS_REPORT: &str = "payee_counts.csv";
pub const MAPPINGS_REPORT: &str = "payee_mappings.csv";

// Our own outputs and non-transaction files, never scanned as input.
const EXCLUDED_FILES: &[&str] = &[
    "accounts.csv",
    "payees.csv",
    "payee_counts.csv",
    "payee_mappings.csv",
    "matched_transfers.csv",
];

#[derive(Debug, Default)]
pub struct PayeeReportSummary {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub rows_counted: usize,
    pub distinct_payees: usize,
    pub distinct_mappings: usize,
}

/// Scan every transaction CSV under the ledger root and write two audit
/// reports: how often each normalized payee occurs, and which raw
/// descriptions map to which payee. Useful for tuning the rule files.
pub fn write_payee_reports(ledger_root: &Path) -> Result<PayeeReportSummary> {
    let mut summary = PayeeReportSummary::default();

    let mut payee_counts: HashMap<String, u64> = HashMap::new();
    let mut mapping_counts: HashMap<(String, String), u64> = HashMap::new();

    for path in collect_csv_files(ledger_root)? {
        summary.files_scanned += 1;
        match tally_file(&path, &mut payee_counts, &mut mapping_counts) {
            Ok(rows) => summary.rows_counted += rows,
            Err(e) => {
                eprintln!("Warning: skipping {}: {e}", path.display());
                summary.files_skipped += 1;
            }
        }
    }

    if payee_counts.is_empty() {
        println!("No payee data found.");
        return Ok(summary);
    }

    let mut counts: Vec<(&String, &u64)> = payee_counts.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    summary.distinct_payees = counts.len();

    let counts_path = ledger_root.join(COUNTS_REPORT);
    let mut writer = csv::Writer::from_path(&counts_path)?;
    writer.write_record(["Payee", "Count"])?;
    for (payee, count) in &counts {
        writer.write_record([payee.as_str(), &count.to_string()])?;
    }
    writer.flush()?;
    println!("Saved payee counts to {}", counts_path.display());

    let mut mappings: Vec<(&(String, String), &u64)> = mapping_counts.iter().collect();
    mappings.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    summary.distinct_mappings = mappings.len();

    let mappings_path = ledger_root.join(MAPPINGS_REPORT);
    let mut writer = csv::Writer::from_path(&mappings_path)?;
    writer.write_record(["Description", "Payee", "Count"])?;
    for ((description, payee), count) in &mappings {
        writer.write_record([description.as_str(), payee.as_str(), &count.to_string()])?;
    }
    writer.flush()?;
    println!("Saved payee mappings to {}", mappings_path.display());

    Ok(summary)
}

fn collect_csv_files(root: &Path) -> Result<Vec<PathBuf>> {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                walk(&path, out)?;
            } else if path.extension().map_or(false, |e| e == "csv") {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("")
                    .to_lowercase();
                if !EXCLUDED_FILES.contains(&name.as_str()) {
                    out.push(path);
                }
            }
        }
        Ok(())
    }
    let mut out = Vec::new();
    if root.is_dir() {
        walk(root, &mut out)?;
    }
    out.sort();
    Ok(out)
}

fn tally_file(
    path: &Path,
    payee_counts: &mut HashMap<String, u64>,
    mapping_counts: &mut HashMap<(String, String), u64>,
) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let desc_idx = headers.iter().position(|h| h == "Description");
    let payee_idx = headers
        .iter()
        .position(|h| h == "Payee Name")
        .or_else(|| headers.iter().position(|h| h == "Payee"));

    let (Some(desc_idx), Some(payee_idx)) = (desc_idx, payee_idx) else {
        println!(
            "  Note: {} has no Description/Payee columns, skipped.",
            path.display()
        );
        return Ok(0);
    };

    let mut rows = 0usize;
    for record in reader.records() {
        let record = record?;
        let description = record.get(desc_idx).unwrap_or("").trim();
        let payee = record.get(payee_idx).unwrap_or("").trim();
        if description.is_empty() || payee.is_empty() {
            continue;
        }
        *payee_counts.entry(payee.to_string()).or_default() += 1;
        *mapping_counts
            .entry((description.to_string(), payee.to_string()))
            .or_default() += 1;
        rows += 1;
    }
    Ok(rows)
}
