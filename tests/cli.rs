use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn ledgerlink() -> Command {
    Command::cargo_bin("ledgerlink").unwrap()
}

fn write_ledger_file(root: &Path, bank: &str, name: &str, body: &str) {
    let dir = root.join(bank);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), body).unwrap();
}

const TXN_HEADER: &str =
    "Unique Transaction ID,Unique Account ID,Account Name,Date,Description,Amount,Transfer Id\n";

#[test]
fn link_matches_pair_and_writes_report() {
    let root = tempfile::tempdir().unwrap();
    write_ledger_file(
        root.path(),
        "bank_a",
        "2024-03.csv",
        &format!("{TXN_HEADER}t-a,acct-a,Chequing,2024-03-01,TRANSFER OUT,-100.0,\n"),
    );
    write_ledger_file(
        root.path(),
        "bank_b",
        "2024-03.csv",
        &format!("{TXN_HEADER}t-b,acct-b,Savings,2024-03-01,TRANSFER IN,100.0,\n"),
    );

    ledgerlink()
        .args(["link", "--ledger-dir"])
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 linked"));

    assert!(root.path().join("matched_transfers.csv").exists());
    let a = std::fs::read_to_string(root.path().join("bank_a/2024-03.csv")).unwrap();
    assert!(a.contains("t-b"));
}

#[test]
fn link_clear_transfers_relinks() {
    let root = tempfile::tempdir().unwrap();
    write_ledger_file(
        root.path(),
        "bank_a",
        "2024-03.csv",
        &format!("{TXN_HEADER}t-a,acct-a,,2024-03-01,OUT,-50.0,\n"),
    );
    write_ledger_file(
        root.path(),
        "bank_b",
        "2024-03.csv",
        &format!("{TXN_HEADER}t-b,acct-b,,2024-03-01,IN,50.0,\n"),
    );

    ledgerlink()
        .args(["link", "--ledger-dir"])
        .arg(root.path())
        .assert()
        .success();
    ledgerlink()
        .args(["link", "--clear-transfers", "--ledger-dir"])
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 linked"));
}

#[test]
fn ingest_builds_monthly_ledger() {
    let root = tempfile::tempdir().unwrap();
    let batch = root.path().join("batch.json");
    std::fs::write(
        &batch,
        r#"{"transactions": [
            {"Unique Account ID": "acct-1", "Date": "2024-03-01",
             "Description": "COFFEE SHOP", "Amount": -4.5, "Currency": "CAD"}
        ]}"#,
    )
    .unwrap();
    let rules = root.path().join("rules.json");
    std::fs::write(
        &rules,
        r#"{"rules": [{"name": "Coffee Co", "keywords": ["coffee"]}]}"#,
    )
    .unwrap();
    let ledger = root.path().join("ledger");

    ledgerlink()
        .arg("ingest")
        .arg(&batch)
        .args(["--bank", "testbank"])
        .arg("--ledger-dir")
        .arg(&ledger)
        .arg("--rules")
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 transaction(s)"));

    let out = std::fs::read_to_string(ledger.join("testbank/2024-03.csv")).unwrap();
    assert!(out.contains("Coffee Co"));
}

#[test]
fn payees_report_runs() {
    let root = tempfile::tempdir().unwrap();
    write_ledger_file(
        root.path(),
        "bank_a",
        "2024-03.csv",
        "Description,Payee Name\nSTARBUCKS 1,Starbucks\n",
    );
    ledgerlink()
        .args(["payees", "--ledger-dir"])
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 payee(s)"));
    assert!(root.path().join("payee_counts.csv").exists());
}

#[test]
fn rules_check_reports_count() {
    let root = tempfile::tempdir().unwrap();
    let rules = root.path().join("rules.json");
    std::fs::write(
        &rules,
        r#"{"rules": [
            {"name": "A", "keywords": ["a"]},
            {"name": "B", "regex": ["b+"]}
        ]}"#,
    )
    .unwrap();
    ledgerlink()
        .args(["rules", "check", "--path"])
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 rule(s) loaded"));
}

#[test]
fn rules_sort_orders_by_name() {
    let root = tempfile::tempdir().unwrap();
    let rules = root.path().join("rules.json");
    std::fs::write(
        &rules,
        r#"{"rules": [
            {"name": "Zed", "keywords": ["z"]},
            {"name": "Alpha", "keywords": ["b", "a"]}
        ]}"#,
    )
    .unwrap();
    ledgerlink()
        .args(["rules", "sort"])
        .arg(&rules)
        .assert()
        .success();

    let sorted = std::fs::read_to_string(&rules).unwrap();
    let alpha = sorted.find("Alpha").unwrap();
    let zed = sorted.find("Zed").unwrap();
    assert!(alpha < zed);
}
