//! Core of a personal-ledger pipeline: bank adapters (browser automation,
//! out of tree) hand over raw record batches; this crate normalizes them into
//! canonical transactions and accounts, persists per-bank monthly CSV files,
//! and reconciles money transfers across the whole ledger.

pub mod cli;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod payee_report;
pub mod payees;
pub mod settings;
pub mod transfers;
pub mod writer;
