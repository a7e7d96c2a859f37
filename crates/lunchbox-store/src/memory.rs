//! In-process store. Nothing survives a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lunchbox_core::{CarbonFootprint, ScanId, ScanRecord, UserId, UserLedger, ledger};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{ScanStore, StoreError};

#[derive(Default)]
struct State {
    scans: HashMap<UserId, Vec<ScanRecord>>,
    ledgers: HashMap<UserId, UserLedger>,
}

/// Mutex-guarded maps of scan history and ledgers.
///
/// A single async lock covers both maps, so a ledger read-modify-write can
/// never interleave with another one. [`set_available`](Self::set_available)
/// simulates an outage: while unavailable every call fails with
/// [`StoreError::Unavailable`].
pub struct MemoryStore {
    state: Mutex<State>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".into()))
        }
    }
}

#[async_trait]
impl ScanStore for MemoryStore {
    async fn append(&self, user: &UserId, mut record: ScanRecord) -> Result<ScanRecord, StoreError> {
        self.check()?;
        record.id = Some(ScanId::new());
        let mut state = self.state.lock().await;
        state
            .scans
            .entry(user.clone())
            .or_default()
            .push(record.clone());
        debug!(user = %user, item = %record.item_name, "scan appended");
        Ok(record)
    }

    async fn list_recent(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<ScanRecord>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        let Some(scans) = state.scans.get(user) else {
            return Ok(Vec::new());
        };
        // Reverse first so the stable sort keeps later inserts ahead on equal timestamps.
        let mut recent: Vec<ScanRecord> = scans.iter().rev().cloned().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit);
        Ok(recent)
    }

    async fn apply_scan(
        &self,
        user: &UserId,
        carbon: Option<&CarbonFootprint>,
        now: DateTime<Utc>,
    ) -> Result<UserLedger, StoreError> {
        self.check()?;
        let mut state = self.state.lock().await;
        let updated = ledger::apply_scan(state.ledgers.get(user).cloned(), carbon, now);
        state.ledgers.insert(user.clone(), updated.clone());
        Ok(updated)
    }

    async fn ledger(&self, user: &UserId) -> Result<Option<UserLedger>, StoreError> {
        self.check()?;
        Ok(self.state.lock().await.ledgers.get(user).cloned())
    }
}
