//! In-memory ordered store with snapshot reads.

use std::collections::BTreeMap;
use std::fs;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::{KvStore, ReadTxn, StoreError, WriteTxn};

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

fn scan(map: &Map, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    map.range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Copy-on-write ordered map.
///
/// Readers clone the current `Arc` and never block writers; writers are
/// serialized and publish a new map on commit.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Arc<Map>>,
    writer: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Write a CBOR snapshot of the current state to `path`.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let snapshot = self.data.read().clone();
        let entries: Vec<(&Vec<u8>, &Vec<u8>)> = snapshot.iter().collect();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("cbor.tmp");
        let mut f = fs::File::create(&tmp)?;
        ciborium::ser::into_writer(&entries, &mut f)
            .map_err(|e| StoreError::Codec(e.to_string()))?;
        fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), entries = entries.len(), "saved store snapshot");
        Ok(())
    }

    /// Load a store previously written by [`MemoryStore::save`].
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let f = fs::File::open(path)?;
        let entries: Vec<(Vec<u8>, Vec<u8>)> =
            ciborium::de::from_reader(f).map_err(|e| StoreError::Codec(e.to_string()))?;
        let map: Map = entries.into_iter().collect();
        Ok(Self {
            data: RwLock::new(Arc::new(map)),
            writer: Mutex::new(()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MemorySnapshot {
    data: Arc<Map>,
}

impl ReadTxn for MemorySnapshot {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(scan(&self.data, prefix))
    }
}

struct MemoryTxn {
    base: Arc<Map>,
    /// Pending writes; `None` marks a delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl ReadTxn for MemoryTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.writes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => Ok(self.base.get(key).cloned()),
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut merged: Map = scan(&self.base, prefix).into_iter().collect();
        let pending = self
            .writes
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix));
        for (k, v) in pending {
            match v {
                Some(v) => {
                    merged.insert(k.clone(), v.clone());
                }
                None => {
                    merged.remove(k);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

impl WriteTxn for MemoryTxn {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
        self.writes.insert(key, Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }
}

impl KvStore for MemoryStore {
    type Snapshot = MemorySnapshot;

    fn view(&self) -> Result<MemorySnapshot, StoreError> {
        Ok(MemorySnapshot {
            data: self.data.read().clone(),
        })
    }

    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.writer.lock();
        let base = self.data.read().clone();
        let mut txn = MemoryTxn {
            base,
            writes: BTreeMap::new(),
        };
        let out = f(&mut txn)?;
        if txn.writes.is_empty() {
            return Ok(out);
        }

        let mut next: Map = (*txn.base).clone();
        for (k, v) in txn.writes {
            match v {
                Some(v) => {
                    next.insert(k, v);
                }
                None => {
                    next.remove(&k);
                }
            }
        }
        *self.data.write() = Arc::new(next);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_does_not_see_later_commits() {
        let store = MemoryStore::new();
        store
            .update(|txn| txn.put(b"a1".to_vec(), b"x".to_vec()))
            .unwrap();
        let snap = store.view().unwrap();
        store
            .update(|txn| txn.put(b"a2".to_vec(), b"y".to_vec()))
            .unwrap();

        assert_eq!(snap.scan_prefix(b"a").unwrap().len(), 1);
        assert_eq!(store.view().unwrap().scan_prefix(b"a").unwrap().len(), 2);
    }

    #[test]
    fn failed_update_discards_writes() {
        let store = MemoryStore::new();
        let res: Result<(), StoreError> = store.update(|txn| {
            txn.put(b"k".to_vec(), b"v".to_vec())?;
            Err(StoreError::Codec("abort".into()))
        });
        assert!(res.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn txn_reads_its_own_writes() {
        let store = MemoryStore::new();
        store
            .update(|txn| {
                txn.put(b"p/1".to_vec(), b"a".to_vec())?;
                txn.put(b"p/2".to_vec(), b"b".to_vec())
            })
            .unwrap();
        store
            .update(|txn| {
                txn.delete(b"p/1")?;
                txn.put(b"p/3".to_vec(), b"c".to_vec())?;
                assert_eq!(txn.get(b"p/1")?, None);
                let keys: Vec<Vec<u8>> =
                    txn.scan_prefix(b"p/")?.into_iter().map(|(k, _)| k).collect();
                assert_eq!(keys, vec![b"p/2".to_vec(), b"p/3".to_vec()]);
                Ok::<_, StoreError>(())
            })
            .unwrap();
        assert_eq!(store.len(), 2);
    }
}
