//! Storage engine abstraction and implementations.
//!
//! The account store only needs an ordered key-value engine with single-key
//! atomic writes, an atomic batch, and range iteration. Two engines are
//! provided:
//!
//! - [`MemoryEngine`]: a `BTreeMap` behind a lock, for tests and ephemeral use
//! - [`SledEngine`]: persistent, backed by `sled`

mod memory;
mod sled_engine;
mod traits;

pub use memory::MemoryEngine;
pub use sled_engine::SledEngine;
pub use traits::{BatchOp, KvEngine, KvIter, KvPair};
