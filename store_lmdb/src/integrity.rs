//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the ledger accepts
//! votes. Besides opening every database, the check recomputes each
//! materialised balance from the event log and reports any drift.

use std::collections::HashMap;
use std::path::Path;

use heed::types::Bytes;

use tabcoin_store::{BalanceEventStore, MetaStore};
use tabcoin_types::{BalanceType, RecipientId};

use crate::environment::{
    LmdbEnvironment, BALANCES_DB, CONTENTS_DB, EVENTS_DB, META_DB, OWNER_INDEX_DB,
    RECIPIENT_INDEX_DB, VOTE_INDEX_DB,
};
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Debug)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub balances_checked: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Database names that we expect to exist in a valid environment.
const EXPECTED_DATABASES: &[&str] = &[
    EVENTS_DB,
    RECIPIENT_INDEX_DB,
    VOTE_INDEX_DB,
    BALANCES_DB,
    CONTENTS_DB,
    OWNER_INDEX_DB,
    META_DB,
];

/// Check LMDB database integrity.
///
/// Opens each expected database and counts entries, then verifies that every
/// materialised balance equals the sum of its events. Read failures and
/// mismatches are recorded in the report rather than causing a hard error.
pub fn check_integrity(environment: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport {
        databases_checked: 0,
        total_entries: 0,
        balances_checked: 0,
        errors: Vec::new(),
    };

    {
        let env = environment.env();
        let rtxn = env.read_txn()?;
        for &db_name in EXPECTED_DATABASES {
            match env.open_database::<Bytes, Bytes>(&rtxn, Some(db_name)) {
                Ok(Some(db)) => {
                    report.databases_checked += 1;
                    match db.len(&rtxn) {
                        Ok(count) => report.total_entries += count,
                        Err(e) => report
                            .errors
                            .push(format!("failed to read database '{}': {}", db_name, e)),
                    }
                }
                Ok(None) => report
                    .errors
                    .push(format!("database '{}' is missing", db_name)),
                Err(e) => report
                    .errors
                    .push(format!("failed to open database '{}': {}", db_name, e)),
            }
        }
    }

    verify_balances(environment, &mut report)?;
    Ok(report)
}

/// Recompute every account's sum from the event log and compare it with the
/// materialised balance.
fn verify_balances(
    environment: &LmdbEnvironment,
    report: &mut IntegrityReport,
) -> Result<(), LmdbError> {
    let store = environment.balance_store();
    let events = store
        .iter_events()
        .map_err(|e| LmdbError::Heed(e.to_string()))?;

    let last_id = events.iter().map(|e| e.id).max();
    match environment.meta_store().next_event_id() {
        Ok(next) if last_id.map_or(true, |last| next > last) => {}
        Ok(next) => report.errors.push(format!(
            "event id counter {next} does not exceed last event id {}",
            last_id.map_or(0, |id| id.value())
        )),
        Err(e) => report.errors.push(format!("event id counter: {e}")),
    }

    let mut expected: HashMap<(BalanceType, RecipientId), i64> = HashMap::new();
    for event in events {
        let sum = expected
            .entry((event.balance_type, event.recipient.clone()))
            .or_insert(0);
        *sum = sum.saturating_add(event.amount);
    }

    for ((balance_type, recipient), sum) in expected {
        report.balances_checked += 1;
        match store.sum_balance(&recipient, balance_type) {
            Ok(stored) if stored == sum => {}
            Ok(stored) => report.errors.push(format!(
                "balance {balance_type} {recipient}: stored {stored}, events sum to {sum}"
            )),
            Err(e) => report
                .errors
                .push(format!("balance {balance_type} {recipient}: {e}")),
        }
    }
    Ok(())
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
