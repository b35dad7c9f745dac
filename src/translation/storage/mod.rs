//! 存储模块
//!
//! 字典缓存与快照持久化。

pub mod cache;
pub mod persist;

pub use cache::{CacheEntry, CacheStats, CacheStatsSnapshot, DictionaryCache, SharedDictionary};
pub use persist::{
    decode_snapshot, encode_snapshot, JsonFileStorage, MemoryStorage, RedbStorage, Snapshot,
    SnapshotStorage,
};
