//! Storage layer: append-only scan history and per-user ledgers.
//!
//! [`MemoryStore`] is always available; [`DuckStore`] persists to a DuckDB
//! file behind the `duckdb` feature.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lunchbox_core::{CarbonFootprint, ScanRecord, UserId, UserLedger};

mod error;
pub use error::StoreError;

mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

/// Durable home of scan records and ledgers.
///
/// Records are never updated or deleted. [`apply_scan`](Self::apply_scan)
/// must be atomic per user: implementations run
/// [`lunchbox_core::ledger::apply_scan`] while holding whatever lock or
/// transaction serializes that user's ledger.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Persist `record` for `user` and return it with its assigned id.
    async fn append(&self, user: &UserId, record: ScanRecord) -> Result<ScanRecord, StoreError>;

    /// Up to `limit` of `user`'s records, newest first.
    async fn list_recent(&self, user: &UserId, limit: usize)
    -> Result<Vec<ScanRecord>, StoreError>;

    /// Fold one scan into `user`'s ledger and return the new state.
    async fn apply_scan(
        &self,
        user: &UserId,
        carbon: Option<&CarbonFootprint>,
        now: DateTime<Utc>,
    ) -> Result<UserLedger, StoreError>;

    /// `None` if `user` has never scanned.
    async fn ledger(&self, user: &UserId) -> Result<Option<UserLedger>, StoreError>;
}
