//! In-memory ordered engine.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::traits::{is_empty_range, BatchOp, KvEngine, KvIter, KvPair};
use crate::error::{Result, UserDbError};

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// A `BTreeMap` engine. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    map: Arc<RwLock<Map>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys, across all namespaces.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_map()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read_map()?.is_empty())
    }

    fn read_map(&self) -> Result<RwLockReadGuard<'_, Map>> {
        self.map
            .read()
            .map_err(|_| UserDbError::Storage("Memory engine lock poisoned".to_string()))
    }

    fn write_map(&self) -> Result<RwLockWriteGuard<'_, Map>> {
        self.map
            .write()
            .map_err(|_| UserDbError::Storage("Memory engine lock poisoned".to_string()))
    }
}

impl KvEngine for MemoryEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_map()?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.write_map()?.remove(key);
        Ok(())
    }

    fn batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        // One write guard for the whole batch; readers see all or nothing.
        let mut map = self.write_map()?;
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    map.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn range(&self, lower: Bound<Vec<u8>>, upper: Bound<Vec<u8>>, reverse: bool) -> KvIter<'_> {
        Box::new(MemoryRange {
            engine: self,
            lower,
            upper,
            reverse,
            done: false,
        })
    }
}

/// Lazy cursor over a [`MemoryEngine`].
///
/// The read lock is held for one step at a time; after each pair the
/// consumed side of the range is narrowed past the returned key.
struct MemoryRange<'a> {
    engine: &'a MemoryEngine,
    lower: Bound<Vec<u8>>,
    upper: Bound<Vec<u8>>,
    reverse: bool,
    done: bool,
}

impl MemoryRange<'_> {
    fn step(&mut self) -> Result<Option<KvPair>> {
        if is_empty_range(&self.lower, &self.upper) {
            return Ok(None);
        }
        let map = self.engine.read_map()?;
        let mut range = map.range((self.lower.clone(), self.upper.clone()));
        let entry = if self.reverse {
            range.next_back()
        } else {
            range.next()
        };
        let Some((key, value)) = entry else {
            return Ok(None);
        };
        let pair = (key.clone(), value.clone());
        drop(map);

        if self.reverse {
            self.upper = Bound::Excluded(pair.0.clone());
        } else {
            self.lower = Bound::Excluded(pair.0.clone());
        }
        Ok(Some(pair))
    }
}

impl Iterator for MemoryRange<'_> {
    type Item = Result<KvPair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(pair)) => Some(Ok(pair)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
