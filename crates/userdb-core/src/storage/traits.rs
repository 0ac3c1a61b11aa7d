//! Key-value engine trait definition.

use std::ops::Bound;

use crate::error::Result;

/// A raw key/value pair as stored by the engine.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Lazy range iterator returned by [`KvEngine::range`].
pub type KvIter<'a> = Box<dyn Iterator<Item = Result<KvPair>> + Send + 'a>;

/// One operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOp {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOp::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOp::Delete { key: key.into() }
    }
}

/// Ordered key-value engine interface.
///
/// All implementations must ensure:
/// - Keys are ordered lexicographically by bytes
/// - `put` and `delete` are atomic per key; readers never see a partial value
/// - `batch` applies all of its operations or none of them
/// - `delete` of an absent key succeeds
///
/// There are no multi-key transactions. Callers that need a read followed
/// by a dependent write must serialize those sequences themselves.
pub trait KvEngine: Send + Sync + 'static {
    /// Get the value stored under `key`.
    ///
    /// # Returns
    ///
    /// Returns `Ok(Some(value))` if found, `Ok(None)` if not found.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove `key`. Idempotent.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Apply several operations atomically, in order.
    fn batch(&self, ops: Vec<BatchOp>) -> Result<()>;

    /// Iterate the pairs between `lower` and `upper`.
    ///
    /// Ascending key order, or descending when `reverse` is set. The
    /// iterator is lazy; an engine error is yielded in place of a pair.
    fn range(&self, lower: Bound<Vec<u8>>, upper: Bound<Vec<u8>>, reverse: bool) -> KvIter<'_>;

    /// Persist buffered writes. A no-op for engines without buffering.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Whether `lower..upper` can contain no key at all.
///
/// Ordered maps panic on inverted ranges, so engines check this first.
pub(crate) fn is_empty_range(lower: &Bound<Vec<u8>>, upper: &Bound<Vec<u8>>) -> bool {
    let (low, low_inclusive) = match lower {
        Bound::Included(key) => (key, true),
        Bound::Excluded(key) => (key, false),
        Bound::Unbounded => return false,
    };
    let (high, high_inclusive) = match upper {
        Bound::Included(key) => (key, true),
        Bound::Excluded(key) => (key, false),
        Bound::Unbounded => return false,
    };
    low > high || (low == high && !(low_inclusive && high_inclusive))
}
