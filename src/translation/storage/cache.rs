//! 字典缓存
//!
//! 每种语言一个条目：`(新鲜度令牌, 共享的字典 future)`。
//!
//! - 令牌与清单当前令牌一致时直接复用已有 future（可能仍在加载中），不会重复请求；
//! - 否则立即发起一次请求并替换旧条目，在请求完成前到来的并发调用共享同一个 future；
//! - 请求失败退化为空字典，不自动重试；
//! - 每次插入和每次加载完成后，异步、去抖地把已就绪的条目写入持久化存储，
//!   仍在加载中的条目不会阻塞写入。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::network::manifest::Manifest;
use crate::network::store::{Dictionary, DictionaryStore};
use crate::translation::error::TranslationResult;

use super::persist::{decode_snapshot, encode_snapshot, Snapshot, SnapshotStorage};

/// 可被任意多个读者共享的字典 future
pub type SharedDictionary = Shared<BoxFuture<'static, Arc<Dictionary>>>;

/// 缓存条目
#[derive(Clone)]
pub struct CacheEntry {
    pub token: Option<String>,
    pub dictionary: SharedDictionary,
}

impl CacheEntry {
    fn ready(token: Option<String>, dictionary: Dictionary) -> Self {
        Self {
            token,
            dictionary: futures::future::ready(Arc::new(dictionary)).boxed().shared(),
        }
    }
}

type Entries = Arc<Mutex<HashMap<String, CacheEntry>>>;

/// 缓存统计信息
#[derive(Debug, Default)]
pub struct CacheStats {
    requests: AtomicUsize,
    hits: AtomicUsize,
    fetches: AtomicUsize,
    failures: AtomicUsize,
    snapshot_writes: AtomicUsize,
}

/// 统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub requests: usize,
    pub hits: usize,
    pub fetches: usize,
    pub failures: usize,
    pub snapshot_writes: usize,
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            snapshot_writes: self.snapshot_writes.load(Ordering::Relaxed),
        }
    }
}

impl CacheStatsSnapshot {
    /// 命中率
    pub fn hit_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.requests as f64
        }
    }
}

/// 字典缓存
pub struct DictionaryCache {
    store: Arc<dyn DictionaryStore>,
    manifest: Manifest,
    entries: Entries,
    persister: Option<Persister>,
    stats: Arc<CacheStats>,
}

impl DictionaryCache {
    /// 创建缓存；令牌取自清单的 `hashes`
    pub fn new(store: Arc<dyn DictionaryStore>, manifest: &Manifest) -> Self {
        Self {
            store,
            manifest: manifest.clone(),
            entries: Arc::new(Mutex::new(HashMap::new())),
            persister: None,
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// 挂载持久化存储并用其中的快照预填缓存
    pub fn with_storage(mut self, storage: Arc<dyn SnapshotStorage>, debounce: Duration) -> Self {
        match storage.load().and_then(|raw| raw.map(|raw| decode_snapshot(&raw)).transpose()) {
            Ok(Some(snapshot)) => {
                let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
                for (language, (token, dictionary)) in snapshot {
                    tracing::debug!("从快照预填字典: {} ({} 条)", language, dictionary.len());
                    entries.insert(language, CacheEntry::ready(token, dictionary));
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("读取字典快照失败，忽略: {}", e),
        }

        self.persister = Some(Persister {
            storage,
            entries: Arc::clone(&self.entries),
            pending: Arc::new(AtomicBool::new(false)),
            stats: Arc::clone(&self.stats),
            debounce,
        });
        self
    }

    /// 获取指定语言的字典 future
    pub fn get(&self, language: &str) -> SharedDictionary {
        self.stats.requests.fetch_add(1, Ordering::Relaxed);
        let token = self.manifest.freshness_token(language).map(str::to_string);

        let shared = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

            if let Some(entry) = entries.get(language) {
                if entry.token == token {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return entry.dictionary.clone();
                }
                tracing::debug!("字典令牌已过期，重新获取: {}", language);
            }

            let shared = self.fetch(language);
            entries.insert(
                language.to_string(),
                CacheEntry {
                    token,
                    dictionary: shared.clone(),
                },
            );
            shared
        };

        if let Some(persister) = &self.persister {
            persister.schedule();
        }
        shared
    }

    /// 语言是否已有条目（不论是否新鲜）
    pub fn contains(&self, language: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(language)
    }

    /// 条目是否与清单令牌一致
    pub fn is_fresh(&self, language: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(language)
            .is_some_and(|entry| entry.token.as_deref() == self.manifest.freshness_token(language))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// 立即写入快照；仍在加载中的条目不写入
    pub async fn flush(&self) -> TranslationResult<()> {
        match &self.persister {
            Some(persister) => persister.write(),
            None => Ok(()),
        }
    }

    fn fetch(&self, language: &str) -> SharedDictionary {
        self.stats.fetches.fetch_add(1, Ordering::Relaxed);
        let request = self.store.fetch(language);
        let language = language.to_string();
        let stats = Arc::clone(&self.stats);
        let persister = self.persister.clone();

        async move {
            let dictionary = match request.await {
                Ok(dictionary) => {
                    tracing::debug!("字典已加载: {} ({} 条)", language, dictionary.len());
                    dictionary
                }
                Err(e) => {
                    tracing::warn!("字典获取失败，退化为空字典 {}: {}", language, e);
                    stats.failures.fetch_add(1, Ordering::Relaxed);
                    Dictionary::new()
                }
            };

            // 加载完成的条目在下一次去抖写入中落盘
            if let Some(persister) = persister {
                persister.schedule();
            }
            Arc::new(dictionary)
        }
        .boxed()
        .shared()
    }
}

/// 去抖的快照写入器
#[derive(Clone)]
struct Persister {
    storage: Arc<dyn SnapshotStorage>,
    entries: Entries,
    pending: Arc<AtomicBool>,
    stats: Arc<CacheStats>,
    debounce: Duration,
}

impl Persister {
    /// 窗口内的多次调度合并为一次写入
    fn schedule(&self) {
        if self.pending.swap(true, Ordering::SeqCst) {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("没有可用的异步运行时，跳过快照写入");
            self.pending.store(false, Ordering::SeqCst);
            return;
        };

        let persister = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(persister.debounce).await;
            persister.pending.store(false, Ordering::SeqCst);

            if let Err(e) = persister.write() {
                tracing::warn!("写入字典快照失败: {}", e);
            }
        });
    }

    /// 写入所有已就绪的条目
    fn write(&self) -> TranslationResult<()> {
        let snapshot: Snapshot = {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .filter_map(|(language, entry)| {
                    let dictionary = entry.dictionary.peek()?;
                    Some((language.clone(), (entry.token.clone(), dictionary.as_ref().clone())))
                })
                .collect()
        };

        self.storage.store(&encode_snapshot(&snapshot)?)?;
        self.stats.snapshot_writes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("字典快照已写入 ({} 种语言)", snapshot.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::store::StaticDictionaryStore;
    use crate::translation::storage::persist::MemoryStorage;

    fn manifest(hash: Option<&str>) -> Manifest {
        Manifest {
            default_language: "en".to_string(),
            languages: vec!["en".to_string(), "fr".to_string()],
            terms: vec!["Hello".to_string()],
            hashes: hash.map(|h| [("fr".to_string(), h.to_string())].into()),
        }
    }

    fn store() -> Arc<dyn DictionaryStore> {
        let fr: Dictionary = [("Hello".to_string(), "Bonjour".to_string())].into();
        Arc::new(StaticDictionaryStore::new([("fr".to_string(), fr)].into()))
    }

    #[tokio::test]
    async fn test_get_loads_and_reuses() {
        let cache = DictionaryCache::new(store(), &manifest(Some("v1")));

        let first = cache.get("fr").await;
        assert_eq!(first.get("Hello").map(String::as_str), Some("Bonjour"));

        let _ = cache.get("fr").await;
        let stats = cache.stats();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.hits, 1);
        assert!(cache.is_fresh("fr"));
    }

    #[tokio::test]
    async fn test_failed_fetch_degrades_to_empty() {
        let cache = DictionaryCache::new(store(), &manifest(None));
        let dictionary = cache.get("de").await;
        assert!(dictionary.is_empty());
        assert_eq!(cache.stats().failures, 1);

        // 不自动重试
        let _ = cache.get("de").await;
        assert_eq!(cache.stats().fetches, 1);
    }

    #[tokio::test]
    async fn test_stale_snapshot_entry_is_refetched() {
        let storage = Arc::new(MemoryStorage::with_contents(
            r#"{"fr":["old",{"Hello":"Salut"}]}"#,
        ));
        let cache = DictionaryCache::new(store(), &manifest(Some("new")))
            .with_storage(storage, Duration::from_millis(0));

        assert!(cache.contains("fr"));
        assert!(!cache.is_fresh("fr"));
        assert_eq!(cache.get("fr").await.get("Hello").map(String::as_str), Some("Bonjour"));
        assert_eq!(cache.stats().fetches, 1);
    }

    #[tokio::test]
    async fn test_fresh_snapshot_entry_is_trusted() {
        let storage = Arc::new(MemoryStorage::with_contents(
            r#"{"fr":["v1",{"Hello":"Salut"}]}"#,
        ));
        let cache = DictionaryCache::new(store(), &manifest(Some("v1")))
            .with_storage(storage, Duration::from_millis(0));

        assert_eq!(cache.get("fr").await.get("Hello").map(String::as_str), Some("Salut"));
        assert_eq!(cache.stats().fetches, 0);
    }

    #[tokio::test]
    async fn test_flush_writes_resolved_entries() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = DictionaryCache::new(store(), &manifest(Some("v1")))
            .with_storage(storage.clone(), Duration::from_secs(60));

        let _ = cache.get("fr").await;
        cache.flush().await.unwrap();

        let snapshot = decode_snapshot(&storage.contents().unwrap()).unwrap();
        let (token, dictionary) = snapshot.get("fr").unwrap();
        assert_eq!(token.as_deref(), Some("v1"));
        assert_eq!(dictionary.get("Hello").map(String::as_str), Some("Bonjour"));
    }

    #[tokio::test]
    async fn test_debounced_writes_are_coalesced() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = DictionaryCache::new(store(), &manifest(None))
            .with_storage(storage.clone(), Duration::from_millis(20));

        let _ = futures::join!(cache.get("fr"), cache.get("de"), cache.get("es"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(storage.writes(), 1);

        let snapshot = decode_snapshot(&storage.contents().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 3);
    }

    /// `de` 永远不会返回
    struct StalledStore {
        inner: Arc<dyn DictionaryStore>,
    }

    impl DictionaryStore for StalledStore {
        fn fetch(&self, language: &str) -> BoxFuture<'static, TranslationResult<Dictionary>> {
            if language == "de" {
                futures::future::pending().boxed()
            } else {
                self.inner.fetch(language)
            }
        }
    }

    #[tokio::test]
    async fn test_stalled_fetch_does_not_block_persistence() {
        let storage = Arc::new(MemoryStorage::new());
        let manifest = Manifest {
            languages: vec!["en".to_string(), "fr".to_string(), "de".to_string()],
            ..manifest(None)
        };
        let cache = DictionaryCache::new(Arc::new(StalledStore { inner: store() }), &manifest)
            .with_storage(storage.clone(), Duration::from_millis(20));

        let stalled = cache.get("de");
        assert!(tokio::time::timeout(Duration::from_millis(10), stalled).await.is_err());
        let _ = cache.get("fr").await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(storage.writes() >= 1);

        let flushed = tokio::time::timeout(Duration::from_millis(100), cache.flush()).await;
        assert!(matches!(flushed, Ok(Ok(()))));

        let snapshot = decode_snapshot(&storage.contents().unwrap()).unwrap();
        assert!(snapshot.contains_key("fr"));
        assert!(!snapshot.contains_key("de"));
    }
}
