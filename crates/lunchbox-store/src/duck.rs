//! DuckDB document store for scan history and ledgers.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{Connection, params};
use lunchbox_core::{CarbonFootprint, ScanId, ScanRecord, UserId, UserLedger, ledger};
use tracing::{debug, info};

use crate::{ScanStore, StoreError};

const SCHEMA: &str = "
    CREATE SEQUENCE IF NOT EXISTS scan_seq;
    CREATE TABLE IF NOT EXISTS scans (
        seq            BIGINT  NOT NULL DEFAULT nextval('scan_seq'),
        id             VARCHAR PRIMARY KEY,
        user_id        VARCHAR NOT NULL,
        created_at_ms  BIGINT  NOT NULL,
        payload        VARCHAR NOT NULL
    );
    CREATE TABLE IF NOT EXISTS ledgers (
        user_id  VARCHAR PRIMARY KEY,
        payload  VARCHAR NOT NULL
    );
";

/// DuckDB-backed store.
///
/// Records and ledgers are stored as JSON documents; only the columns needed
/// for ordering and keying are broken out. `scans` is append-only.
///
/// The connection sits behind a mutex, and each ledger update additionally
/// runs inside a transaction, so concurrent scans for one user serialize.
/// Every statement runs on tokio's blocking pool, never on a runtime worker.
/// Use [`open`](Self::open) for in-memory and
/// [`open_persistent`](Self::open_persistent) for a file that survives
/// restarts.
pub struct DuckStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckStore {
    /// Open an in-memory database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a database file at `path`.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened duckdb store");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the locked connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("duckdb connection poisoned".into()))?;
            f(&mut guard)
        })
        .await?
    }
}

fn insert_scan(conn: &Connection, user: &UserId, mut record: ScanRecord) -> Result<ScanRecord, StoreError> {
    let id = ScanId::new();
    record.id = Some(id);
    let payload = serde_json::to_string(&record)?;

    conn.execute(
        "INSERT INTO scans (id, user_id, created_at_ms, payload) VALUES (?, ?, ?, ?)",
        params![
            id.to_string(),
            user.as_str(),
            record.created_at.timestamp_millis(),
            payload
        ],
    )?;
    debug!(user = %user, id = %id, "scan appended");
    Ok(record)
}

fn select_recent(conn: &Connection, user: &UserId, limit: usize) -> Result<Vec<ScanRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT payload FROM scans WHERE user_id = ?
         ORDER BY created_at_ms DESC, seq DESC
         LIMIT ?",
    )?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map(params![user.as_str(), limit], |row| row.get::<_, String>(0))?;

    let mut records = Vec::new();
    for payload in rows {
        records.push(serde_json::from_str(&payload?)?);
    }
    Ok(records)
}

fn update_ledger(
    conn: &mut Connection,
    user: &UserId,
    carbon: Option<&CarbonFootprint>,
    now: DateTime<Utc>,
) -> Result<UserLedger, StoreError> {
    let tx = conn.transaction()?;

    let current = read_ledger(&tx, user)?;
    let updated = ledger::apply_scan(current, carbon, now);
    tx.execute(
        "INSERT OR REPLACE INTO ledgers (user_id, payload) VALUES (?, ?)",
        params![user.as_str(), serde_json::to_string(&updated)?],
    )?;
    tx.commit()?;
    Ok(updated)
}

fn read_ledger(conn: &Connection, user: &UserId) -> Result<Option<UserLedger>, StoreError> {
    let mut stmt = conn.prepare("SELECT payload FROM ledgers WHERE user_id = ?")?;
    let mut rows = stmt.query_map(params![user.as_str()], |row| row.get::<_, String>(0))?;
    match rows.next() {
        Some(payload) => Ok(Some(serde_json::from_str(&payload?)?)),
        None => Ok(None),
    }
}

#[async_trait]
impl ScanStore for DuckStore {
    async fn append(&self, user: &UserId, record: ScanRecord) -> Result<ScanRecord, StoreError> {
        let user = user.clone();
        self.with_conn(move |conn| insert_scan(conn, &user, record))
            .await
    }

    async fn list_recent(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<ScanRecord>, StoreError> {
        let user = user.clone();
        self.with_conn(move |conn| select_recent(conn, &user, limit))
            .await
    }

    async fn apply_scan(
        &self,
        user: &UserId,
        carbon: Option<&CarbonFootprint>,
        now: DateTime<Utc>,
    ) -> Result<UserLedger, StoreError> {
        let user = user.clone();
        let carbon = carbon.cloned();
        self.with_conn(move |conn| update_ledger(conn, &user, carbon.as_ref(), now))
            .await
    }

    async fn ledger(&self, user: &UserId) -> Result<Option<UserLedger>, StoreError> {
        let user = user.clone();
        self.with_conn(move |conn| read_ledger(conn, &user)).await
    }
}
