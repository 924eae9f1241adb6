//! Styx store: the ordered key-value substrate the planner probes.
//!
//! The planner only needs three things from storage:
//!
//! - point reads of 8-byte counters ([`read_count`]),
//! - ascending prefix scans over value keys ([`candidate_values`]), and
//! - one consistent snapshot for the whole compilation ([`KvStore::view`]).
//!
//! [`MemoryStore`] is a copy-on-write ordered map that satisfies all three and
//! can be persisted as a CBOR snapshot. [`IndexWriter`] fills a store from
//! ground statements using the layout in [`styx_core::key`].

mod memory;
mod probe;
mod writer;

pub use memory::{MemorySnapshot, MemoryStore};
pub use probe::{candidate_values, read_count};
pub use writer::{IndexReport, IndexWriter};

use styx_core::KeyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("count entry {key} holds {len} bytes, expected 8")]
    CorruptCounter { key: String, len: usize },

    #[error("corrupt key: {0}")]
    Key(#[from] KeyError),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ============================================================================
// Transactions
// ============================================================================

/// Read access to one consistent state of the store.
pub trait ReadTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

impl<T: ReadTxn + ?Sized> ReadTxn for &T {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        (**self).scan_prefix(prefix)
    }
}

/// A read-modify-write transaction. Reads observe the transaction's own writes.
pub trait WriteTxn: ReadTxn {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError>;
    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;
}

pub trait KvStore {
    type Snapshot: ReadTxn;

    /// Open a read snapshot. Later commits are not visible through it.
    fn view(&self) -> Result<Self::Snapshot, StoreError>;

    /// Run `f` atomically: its writes commit only if it returns `Ok`.
    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, E>,
        E: From<StoreError>;
}
