//! SQLite-backed record store.
//!
//! One `licenses` table; the `row_version` column carries the record's
//! version token and every write is conditional on it.

use super::LicenseStore;
use crate::error::{StoreError, StoreResult};
use crate::record::{LicenseRecord, PendingNonce, VersionToken};
use chrono::{DateTime, SubsecRound, Utc};
use licensecore_crypto::PqSecretKey;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SELECT_COLUMNS: &str = "key, classical_public_key, pq_public_key, pq_private_key, \
     integrity_hash, nonce, nonce_expires_at, row_version";

/// Persistent record store backed by SQLite.
pub struct SqliteLicenseStore {
    conn: Mutex<Connection>,
}

/// A row as read, before invariants are checked.
struct StoredRow {
    key: String,
    classical_public_key: Vec<u8>,
    pq_public_key: Vec<u8>,
    pq_private_key: Vec<u8>,
    integrity_hash: Vec<u8>,
    nonce: Option<Vec<u8>>,
    nonce_expires_at: Option<i64>,
    row_version: String,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            classical_public_key: row.get(1)?,
            pq_public_key: row.get(2)?,
            pq_private_key: row.get(3)?,
            integrity_hash: row.get(4)?,
            nonce: row.get(5)?,
            nonce_expires_at: row.get(6)?,
            row_version: row.get(7)?,
        })
    }

    fn into_record(self) -> StoreResult<LicenseRecord> {
        let pending = match (self.nonce, self.nonce_expires_at) {
            (None, None) => None,
            (Some(nonce), Some(millis)) => {
                let expires_at = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
                    StoreError::Corrupt(format!("{}: nonce expiry out of range", self.key))
                })?;
                Some(PendingNonce::new(nonce, expires_at))
            }
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "{}: nonce and expiry must be set together",
                    self.key
                )));
            }
        };
        let version = VersionToken::parse(&self.row_version)
            .map_err(|e| StoreError::Corrupt(format!("{}: bad row version: {e}", self.key)))?;
        let pq_secret_key = PqSecretKey::from_bytes(self.pq_private_key)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.key)))?;

        Ok(LicenseRecord::restore(
            self.key,
            self.classical_public_key,
            self.pq_public_key,
            pq_secret_key,
            self.integrity_hash,
            pending,
            version,
        ))
    }
}

impl SqliteLicenseStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Corrupt("connection lock poisoned".to_string()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS licenses (
                key TEXT PRIMARY KEY NOT NULL,
                classical_public_key BLOB NOT NULL,
                pq_public_key BLOB NOT NULL,
                pq_private_key BLOB NOT NULL,
                integrity_hash BLOB NOT NULL,
                nonce BLOB,
                nonce_expires_at INTEGER,
                row_version TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_licenses_nonce_expiry
                ON licenses (nonce_expires_at)
                WHERE nonce_expires_at IS NOT NULL;
            ",
        )?;
        Ok(())
    }
}

fn pending_columns(record: &LicenseRecord) -> (Option<&[u8]>, Option<i64>) {
    match record.pending() {
        Some(p) => (Some(p.nonce()), Some(p.expires_at().timestamp_millis())),
        None => (None, None),
    }
}

impl LicenseStore for SqliteLicenseStore {
    fn load(&self, key: &str) -> StoreResult<Option<LicenseRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM licenses WHERE key = ?1"),
                params![key],
                StoredRow::from_row,
            )
            .optional()?;
        row.map(StoredRow::into_record).transpose()
    }

    fn insert(&self, record: &LicenseRecord) -> StoreResult<()> {
        let conn = self.conn()?;
        let (nonce, expires_at) = pending_columns(record);
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO licenses (key, classical_public_key, pq_public_key, \
             pq_private_key, integrity_hash, nonce, nonce_expires_at, row_version) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.key(),
                record.classical_public_key(),
                record.pq_public_key(),
                record.pq_secret_key().as_bytes(),
                record.integrity_hash(),
                nonce,
                expires_at,
                record.version().to_string(),
            ],
        )?;
        if inserted == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    fn replace(&self, record: &LicenseRecord, expected: VersionToken) -> StoreResult<()> {
        let conn = self.conn()?;
        let (nonce, expires_at) = pending_columns(record);
        let updated = conn.execute(
            "UPDATE licenses SET classical_public_key = ?2, pq_public_key = ?3, \
             pq_private_key = ?4, integrity_hash = ?5, nonce = ?6, nonce_expires_at = ?7, \
             row_version = ?8 \
             WHERE key = ?1 AND row_version = ?9",
            params![
                record.key(),
                record.classical_public_key(),
                record.pq_public_key(),
                record.pq_secret_key().as_bytes(),
                record.integrity_hash(),
                nonce,
                expires_at,
                record.version().to_string(),
                expected.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    fn clear_expired_nonces(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.conn()?;
        let cleared = conn.execute(
            "UPDATE licenses SET nonce = NULL, nonce_expires_at = NULL, row_version = ?1 \
             WHERE nonce_expires_at IS NOT NULL AND nonce_expires_at < ?2",
            params![
                VersionToken::new().to_string(),
                now.trunc_subsecs(3).timestamp_millis()
            ],
        )?;
        Ok(cleared)
    }

    fn len(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM licenses", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
