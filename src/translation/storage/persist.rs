//! 字典快照的持久化存储
//!
//! 快照是单个键下的 JSON：`{语言代码: [新鲜度令牌, 字典]}`。
//! 快照不具权威性，载入后每个条目仍要经过清单令牌校验。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use redb::{Database, ReadableTable, TableDefinition};

use crate::network::store::Dictionary;
use crate::translation::config::constants::STORAGE_KEY;
use crate::translation::error::{helpers::storage_error, TranslationResult};

/// 快照内容：语言代码 → (令牌, 字典)
pub type Snapshot = HashMap<String, (Option<String>, Dictionary)>;

const SNAPSHOT_TABLE: TableDefinition<&str, &str> = TableDefinition::new("translify");

/// 单键持久化存储
pub trait SnapshotStorage: Send + Sync {
    /// 读取快照原文，不存在时返回 `None`
    fn load(&self) -> TranslationResult<Option<String>>;

    /// 覆盖写入快照
    fn store(&self, snapshot: &str) -> TranslationResult<()>;
}

pub fn encode_snapshot(snapshot: &Snapshot) -> TranslationResult<String> {
    Ok(serde_json::to_string(snapshot)?)
}

pub fn decode_snapshot(raw: &str) -> TranslationResult<Snapshot> {
    Ok(serde_json::from_str(raw)?)
}

/// 进程内存储
#[derive(Debug, Default)]
pub struct MemoryStorage {
    value: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已有快照内容初始化
    pub fn with_contents(raw: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(raw.into())),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// 已发生的写入次数
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self) -> TranslationResult<Option<String>> {
        Ok(self.contents())
    }

    fn store(&self, snapshot: &str) -> TranslationResult<()> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 普通 JSON 文件
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStorage for JsonFileStorage {
    fn load(&self) -> TranslationResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, snapshot: &str) -> TranslationResult<()> {
        ensure_parent(&self.path)?;
        // 原子替换：先写临时文件再改名
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, snapshot)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// redb 磁盘数据库
pub struct RedbStorage {
    db: Database,
}

impl RedbStorage {
    pub fn open(path: impl AsRef<Path>) -> TranslationResult<Self> {
        ensure_parent(path.as_ref())?;
        let db = Database::create(path.as_ref()).map_err(storage_error)?;
        Ok(Self { db })
    }
}

impl SnapshotStorage for RedbStorage {
    fn load(&self) -> TranslationResult<Option<String>> {
        let txn = self.db.begin_read().map_err(storage_error)?;
        let table = match txn.open_table(SNAPSHOT_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(storage_error(e)),
        };

        let value = table.get(STORAGE_KEY).map_err(storage_error)?;
        Ok(value.map(|guard| guard.value().to_string()))
    }

    fn store(&self, snapshot: &str) -> TranslationResult<()> {
        let txn = self.db.begin_write().map_err(storage_error)?;
        {
            let mut table = txn.open_table(SNAPSHOT_TABLE).map_err(storage_error)?;
            table.insert(STORAGE_KEY, snapshot).map_err(storage_error)?;
        }
        txn.commit().map_err(storage_error)?;
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> TranslationResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
