use super::LicenseStore;
use crate::error::{StoreError, StoreResult};
use crate::record::{LicenseRecord, VersionToken};
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-process record store.
#[derive(Debug, Default)]
pub struct MemoryLicenseStore {
    records: RwLock<HashMap<String, LicenseRecord>>,
}

impl MemoryLicenseStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, LicenseRecord>>> {
        self.records
            .read()
            .map_err(|_| StoreError::Corrupt("record map lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, LicenseRecord>>> {
        self.records
            .write()
            .map_err(|_| StoreError::Corrupt("record map lock poisoned".to_string()))
    }
}

impl LicenseStore for MemoryLicenseStore {
    fn load(&self, key: &str) -> StoreResult<Option<LicenseRecord>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn insert(&self, record: &LicenseRecord) -> StoreResult<()> {
        let mut records = self.write()?;
        if records.contains_key(record.key()) {
            return Err(StoreError::Conflict);
        }
        records.insert(record.key().to_string(), record.clone());
        Ok(())
    }

    fn replace(&self, record: &LicenseRecord, expected: VersionToken) -> StoreResult<()> {
        let mut records = self.write()?;
        match records.get_mut(record.key()) {
            Some(current) if current.version() == expected => {
                *current = record.clone();
                Ok(())
            }
            _ => Err(StoreError::Conflict),
        }
    }

    fn clear_expired_nonces(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let now = now.trunc_subsecs(3);
        let mut records = self.write()?;
        let mut cleared = 0;
        for record in records.values_mut() {
            if record.pending().is_some_and(|p| p.is_expired_at(now)) {
                record.clear_pending();
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }
}
