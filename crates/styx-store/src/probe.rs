use styx_core::key::{value_of_key, value_prefix};
use styx_core::{encode_node, Node, Position};

use crate::{hex, ReadTxn, StoreError};

/// Point-read an 8-byte big-endian counter. A missing key counts as zero.
pub fn read_count<T: ReadTxn + ?Sized>(txn: &T, key: &[u8]) -> Result<u64, StoreError> {
    let Some(value) = txn.get(key)? else {
        return Ok(0);
    };
    let bytes: [u8; 8] = value
        .as_slice()
        .try_into()
        .map_err(|_| StoreError::CorruptCounter {
            key: hex(key),
            len: value.len(),
        })?;
    Ok(u64::from_be_bytes(bytes))
}

/// Encoded values `U` completing `(m, n)` in the rotation of `unknown`,
/// in ascending byte order.
pub fn candidate_values<T: ReadTxn + ?Sized>(
    txn: &T,
    unknown: Position,
    m: &Node,
    n: &Node,
) -> Result<Vec<Vec<u8>>, StoreError> {
    let prefix = value_prefix(unknown, m, n);
    let mut out = Vec::new();
    for (key, _) in txn.scan_prefix(&prefix)? {
        // Round-trip through the codec so a malformed tail surfaces here.
        let node = value_of_key(&key, prefix.len())?;
        out.push(encode_node(&node));
    }
    Ok(out)
}
