//! Persistent engine backed by `sled`.

use std::ops::Bound;
use std::path::Path;

use super::traits::{is_empty_range, BatchOp, KvEngine, KvIter};
use crate::error::{Result, UserDbError};

/// A `sled` database used as a key-value engine.
#[derive(Debug, Clone)]
pub struct SledEngine {
    db: sled::Db,
}

impl SledEngine {
    /// Open (or create) a database directory.
    ///
    /// # Errors
    ///
    /// Returns `UserDbError::Storage` if the directory cannot be opened,
    /// including when another process holds its lock.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "Opened sled database");
        Ok(Self { db })
    }

    /// Open a database that is removed when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }
}

impl KvEngine for SledEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|value| value.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.insert(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db.remove(key)?;
        Ok(())
    }

    fn batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for op in ops {
            match op {
                BatchOp::Put { key, value } => batch.insert(key, value),
                BatchOp::Delete { key } => batch.remove(key),
            }
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    fn range(&self, lower: Bound<Vec<u8>>, upper: Bound<Vec<u8>>, reverse: bool) -> KvIter<'_> {
        if is_empty_range(&lower, &upper) {
            return Box::new(std::iter::empty());
        }
        let iter = self.db.range::<Vec<u8>, _>((lower, upper));
        let iter = iter.map(|item| {
            item.map(|(key, value)| (key.to_vec(), value.to_vec()))
                .map_err(UserDbError::from)
        });
        if reverse {
            Box::new(iter.rev())
        } else {
            Box::new(iter)
        }
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
