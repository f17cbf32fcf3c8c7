//! Persistence for license records.
//!
//! Stores expose compare-and-swap writes keyed on the record's
//! version token; the service layer retries on `Conflict`.

mod memory;
mod sqlite;

pub use memory::MemoryLicenseStore;
pub use sqlite::SqliteLicenseStore;

use crate::error::StoreResult;
use crate::record::{LicenseRecord, VersionToken};
use chrono::{DateTime, Utc};

/// A record store keyed by license identifier with optimistic concurrency.
pub trait LicenseStore: Send + Sync {
    /// Loads the record for `key`.
    fn load(&self, key: &str) -> StoreResult<Option<LicenseRecord>>;

    /// Inserts a new record. Fails with `Conflict` if the key exists.
    fn insert(&self, record: &LicenseRecord) -> StoreResult<()>;

    /// Overwrites a record if its stored version is still `expected`.
    /// Fails with `Conflict` otherwise, including when the row is gone.
    fn replace(&self, record: &LicenseRecord, expected: VersionToken) -> StoreResult<()>;

    /// Clears every pending nonce that expired strictly before `now`.
    /// Returns how many were cleared.
    ///
    /// Expiries are stored at millisecond precision, so `now` is truncated
    /// to the millisecond before comparing.
    fn clear_expired_nonces(&self, now: DateTime<Utc>) -> StoreResult<usize>;

    /// Number of stored records.
    fn len(&self) -> StoreResult<usize>;

    /// Returns true if no records are stored.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::record::PendingNonce;
    use chrono::{Duration, SubsecRound};
    use licensecore_crypto::PqKeyPair;

    fn record(key: &str) -> LicenseRecord {
        let (server_public, server_secret) = PqKeyPair::generate().into_parts();
        LicenseRecord::new(
            key.to_string(),
            vec![0x30; 91],
            server_public,
            server_secret,
            vec![0xAB; 32],
        )
    }

    fn now_ms() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }

    fn for_each_store(check: impl Fn(&dyn LicenseStore)) {
        check(&MemoryLicenseStore::new());
        check(&SqliteLicenseStore::open_in_memory().unwrap());
    }

    /// Inserts `key` with a pending nonce expiring at `expires_at`.
    fn insert_pending(store: &dyn LicenseStore, key: &str, expires_at: DateTime<Utc>) {
        store.insert(&record(key)).unwrap();
        let mut current = store.load(key).unwrap().unwrap();
        let expected = current.version();
        current.set_pending(PendingNonce::new(vec![1; 32], expires_at));
        store.replace(&current, expected).unwrap();
    }

    #[test]
    fn replace_requires_current_version() {
        for_each_store(|store| {
            store.insert(&record("LIC-1")).unwrap();
            let mut current = store.load("LIC-1").unwrap().unwrap();
            let stale = current.version();
            current.set_pending(PendingNonce::new(vec![1; 32], now_ms() + Duration::seconds(30)));
            store.replace(&current, stale).unwrap();

            let mut racer = current.clone();
            racer.clear_pending();
            assert!(matches!(store.replace(&racer, stale), Err(StoreError::Conflict)));

            let loaded = store.load("LIC-1").unwrap().unwrap();
            assert_eq!(loaded.version(), current.version());
            assert!(loaded.pending().is_some());
        });
    }

    #[test]
    fn pending_nonce_round_trips() {
        for_each_store(|store| {
            let expires_at = now_ms() + Duration::seconds(30);
            insert_pending(store, "LIC-1", expires_at);

            let loaded = store.load("LIC-1").unwrap().unwrap();
            let pending = loaded.pending().unwrap();
            assert_eq!(pending.nonce(), &[1; 32][..]);
            assert_eq!(pending.expires_at(), expires_at);
        });
    }

    #[test]
    fn clearing_pending_changes_version() {
        let mut current = record("LIC-1");
        let initial = current.version();
        current.set_pending(PendingNonce::new(vec![1; 32], now_ms()));
        let pending = current.version();
        current.clear_pending();

        assert!(current.pending().is_none());
        assert_ne!(initial, pending);
        assert_ne!(pending, current.version());
    }

    #[test]
    fn clear_expired_nonces_is_strict() {
        for_each_store(|store| {
            let now = now_ms();
            insert_pending(store, "LIC-PAST", now - Duration::seconds(1));
            insert_pending(store, "LIC-EDGE", now);
            insert_pending(store, "LIC-FUTURE", now + Duration::seconds(30));
            let before = store.load("LIC-PAST").unwrap().unwrap().version();

            assert_eq!(store.clear_expired_nonces(now).unwrap(), 1);

            let past = store.load("LIC-PAST").unwrap().unwrap();
            assert!(past.pending().is_none());
            assert_ne!(past.version(), before);
            assert!(store.load("LIC-EDGE").unwrap().unwrap().pending().is_some());
            assert!(store.load("LIC-FUTURE").unwrap().unwrap().pending().is_some());
        });
    }

    #[test]
    fn sweep_ignores_sub_millisecond_overshoot() {
        for_each_store(|store| {
            let expires_at = now_ms();
            insert_pending(store, "LIC-1", expires_at);

            let within = expires_at + Duration::microseconds(500);
            assert_eq!(store.clear_expired_nonces(within).unwrap(), 0);
            assert!(store.load("LIC-1").unwrap().unwrap().pending().is_some());

            let past = expires_at + Duration::milliseconds(1);
            assert_eq!(store.clear_expired_nonces(past).unwrap(), 1);
            assert!(store.load("LIC-1").unwrap().unwrap().pending().is_none());
        });
    }
}
