//! 语言切换控制器
//!
//! 运行时的公共入口。启动时获取清单、用快照预填缓存、根据环境语言完成首次
//! 正向扫描；之后负责 `set_language` 与新插入节点的增量翻译。
//!
//! 切换通过一个异步互斥锁串行化（按到达顺序排队），
//! 当前语言只在反向、正向两遍扫描都完成后才更新。

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use markup5ever_rcdom::Handle;
use tokio::sync::Mutex as AsyncMutex;

use crate::network::manifest::{
    HttpManifestProvider, LocalManifestProvider, Manifest, ManifestProvider,
};
use crate::network::store::{DictionaryStore, HttpDictionaryStore, LocalDictionaryStore};
use crate::translation::config::{constants, RuntimeConfig, StorageBackend};
use crate::translation::document::{Document, MutationStream};
use crate::translation::error::helpers::{config_error, manifest_error};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::locale::{primary_subtag, EnvLocale, FixedLocale, LocaleSource};
use crate::translation::resolver::{Direction, Resolver};
use crate::translation::storage::{
    CacheStatsSnapshot, DictionaryCache, JsonFileStorage, MemoryStorage, RedbStorage,
    SnapshotStorage,
};
use crate::translation::sync::Synchronizer;

/// 运行时依赖的外部协作者
pub struct Collaborators {
    pub manifest: Arc<dyn ManifestProvider>,
    pub dictionaries: Arc<dyn DictionaryStore>,
    pub storage: Option<Arc<dyn SnapshotStorage>>,
    pub locale: Arc<dyn LocaleSource>,
}

impl Collaborators {
    pub fn new(manifest: Arc<dyn ManifestProvider>, dictionaries: Arc<dyn DictionaryStore>) -> Self {
        Self {
            manifest,
            dictionaries,
            storage: None,
            locale: Arc::new(EnvLocale),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn SnapshotStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_locale(mut self, locale: Arc<dyn LocaleSource>) -> Self {
        self.locale = locale;
        self
    }

    /// 按配置组装：有 `project_file` 时使用本地模式，否则使用清单地址
    pub fn from_config(config: &RuntimeConfig) -> TranslationResult<Self> {
        let (manifest, dictionaries): (Arc<dyn ManifestProvider>, Arc<dyn DictionaryStore>) =
            if let Some(project_file) = &config.project_file {
                (
                    Arc::new(LocalManifestProvider::new(project_file, &config.locales_dir)),
                    Arc::new(LocalDictionaryStore::new(&config.locales_dir)),
                )
            } else if let Some(manifest_url) = &config.manifest_url {
                let store = match &config.locales_url {
                    Some(locales_url) => HttpDictionaryStore::new(locales_url)?,
                    None => HttpDictionaryStore::next_to_manifest(manifest_url)?,
                };
                (Arc::new(HttpManifestProvider::new(manifest_url)?), Arc::new(store))
            } else {
                return Err(config_error("either manifest_url or project_file must be set"));
            };

        let locale: Arc<dyn LocaleSource> = match &config.locale {
            Some(locale) => Arc::new(FixedLocale(locale.clone())),
            None => Arc::new(EnvLocale),
        };

        Ok(Self {
            manifest,
            dictionaries,
            storage: open_storage(config),
            locale,
        })
    }
}

/// 打开配置的快照存储；失败时记录日志并在没有持久化的情况下继续
fn open_storage(config: &RuntimeConfig) -> Option<Arc<dyn SnapshotStorage>> {
    let path = config.expanded_storage_path();
    match config.storage {
        StorageBackend::Memory => Some(Arc::new(MemoryStorage::new())),
        StorageBackend::Json => Some(Arc::new(JsonFileStorage::new(path))),
        StorageBackend::Redb => match RedbStorage::open(&path) {
            Ok(storage) => Some(Arc::new(storage)),
            Err(e) => {
                tracing::warn!("无法打开快照存储 {}，不做持久化: {}", path, e);
                None
            }
        },
    }
}

/// 启动选项
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// 快照写入的去抖窗口
    pub persist_debounce: Duration,
    /// 优先于环境语言信号的语言
    pub locale: Option<String>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            persist_debounce: constants::DEFAULT_PERSIST_DEBOUNCE,
            locale: None,
        }
    }
}

impl From<&RuntimeConfig> for RuntimeOptions {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            persist_debounce: config.persist_debounce(),
            locale: config.locale.clone(),
        }
    }
}

/// 当前应用在文档上的语言
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeState {
    pub current_language: String,
    pub switches: usize,
    pub rewrites: usize,
}

/// 运行时统计
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeStats {
    pub current_language: String,
    pub switches: usize,
    pub rewrites: usize,
    pub cache: CacheStatsSnapshot,
}

/// 翻译运行时
pub struct Translify {
    manifest: Arc<Manifest>,
    cache: Arc<DictionaryCache>,
    synchronizer: Synchronizer,
    state: RefCell<RuntimeState>,
    switch_lock: AsyncMutex<()>,
}

impl Translify {
    /// 启动运行时：清单获取失败是致命的
    pub async fn start(
        options: RuntimeOptions,
        collaborators: Collaborators,
        document: Rc<Document>,
    ) -> TranslationResult<Self> {
        let manifest = collaborators
            .manifest
            .fetch_manifest()
            .await
            .map_err(|e| match e {
                TranslationError::Manifest(_) => e,
                other => manifest_error(other),
            })
            .inspect_err(|e| tracing::error!("运行时初始化失败 ({:?}): {}", e.category(), e))?;

        tracing::info!(
            "清单已加载: 默认语言 {}, {} 种语言, {} 个术语",
            manifest.default_language,
            manifest.languages.len(),
            manifest.terms.len()
        );

        let mut cache = DictionaryCache::new(collaborators.dictionaries, &manifest);
        if let Some(storage) = collaborators.storage {
            cache = cache.with_storage(storage, options.persist_debounce);
        }
        let cache = Arc::new(cache);

        let resolver = Resolver::new(&manifest.terms)?;
        let synchronizer = Synchronizer::new(
            document,
            resolver,
            Arc::clone(&cache),
            manifest.default_language.clone(),
        );

        let runtime = Self {
            state: RefCell::new(RuntimeState {
                current_language: manifest.default_language.clone(),
                switches: 0,
                rewrites: 0,
            }),
            manifest: Arc::new(manifest),
            cache,
            synchronizer,
            switch_lock: AsyncMutex::new(()),
        };

        let ambient = options
            .locale
            .or_else(|| collaborators.locale.preferred_locale())
            .map(|tag| primary_subtag(&tag))
            .filter(|language| !language.is_empty());

        match ambient {
            Some(language) if language == runtime.manifest.default_language => {}
            Some(language) if runtime.manifest.is_supported(&language) => {
                let rewrites = runtime
                    .synchronizer
                    .scan_document(Direction::Forward, &language)
                    .await?;
                tracing::info!("按环境语言初始翻译: {} ({} 处改写)", language, rewrites);

                let mut state = runtime.state.borrow_mut();
                state.current_language = language;
                state.rewrites += rewrites;
            }
            Some(language) => {
                tracing::info!("环境语言 {} 不受支持，保持默认语言", language);
            }
            None => {}
        }

        Ok(runtime)
    }

    /// 切换语言
    ///
    /// 语言代码按主子标签校验；不受支持时返回 `InvalidLocale`，文档不做任何修改。
    pub async fn set_language(&self, code: &str) -> TranslationResult<bool> {
        let language = primary_subtag(code);
        if !self.manifest.is_supported(&language) {
            tracing::warn!("拒绝切换到不受支持的语言: {}", code);
            return Err(TranslationError::InvalidLocale(code.to_string()));
        }

        let _guard = self.switch_lock.lock().await;
        let current = self.current_language();
        let default = self.default_language();
        let mut rewrites = 0;

        if current != default {
            rewrites += self
                .synchronizer
                .scan_document(Direction::Reverse, &current)
                .await?;
        }

        if language != default {
            rewrites += self
                .synchronizer
                .scan_document(Direction::Forward, &language)
                .await?;
        }

        let mut state = self.state.borrow_mut();
        state.current_language = language;
        state.switches += 1;
        state.rewrites += rewrites;
        tracing::info!("语言已切换: {} → {} ({} 处改写)", current, state.current_language, rewrites);

        Ok(true)
    }

    /// 翻译一批新插入的子树
    pub async fn handle_mutations(&self, batch: &[Handle]) -> TranslationResult<usize> {
        let _guard = self.switch_lock.lock().await;
        let language = self.current_language();

        let rewrites = self
            .synchronizer
            .scan_batch(batch, Direction::Forward, &language)
            .await?;
        self.state.borrow_mut().rewrites += rewrites;
        Ok(rewrites)
    }

    /// 处理订阅中的每一批变更，直到订阅结束；返回改写总数
    pub async fn observe(&self, mut stream: MutationStream) -> usize {
        let mut total = 0;
        while let Some(batch) = stream.next().await {
            match self.handle_mutations(&batch).await {
                Ok(rewrites) => total += rewrites,
                Err(e) => tracing::warn!("处理插入节点失败: {}", e),
            }
        }
        total
    }

    pub fn current_language(&self) -> String {
        self.state.borrow().current_language.clone()
    }

    pub fn default_language(&self) -> &str {
        &self.manifest.default_language
    }

    pub fn supported_languages(&self) -> &[String] {
        &self.manifest.languages
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn document(&self) -> &Rc<Document> {
        self.synchronizer.document()
    }

    /// 立即写入字典快照
    pub async fn flush(&self) -> TranslationResult<()> {
        self.cache.flush().await
    }

    pub fn stats(&self) -> RuntimeStats {
        let state = self.state.borrow();
        RuntimeStats {
            current_language: state.current_language.clone(),
            switches: state.switches,
            rewrites: state.rewrites,
            cache: self.cache.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::manifest::StaticManifestProvider;
    use crate::network::store::{Dictionary, StaticDictionaryStore};

    fn collaborators(locale: &str) -> Collaborators {
        let manifest = Manifest {
            default_language: "en".to_string(),
            languages: vec!["en".to_string(), "fr".to_string()],
            terms: vec!["Hello".to_string()],
            hashes: None,
        };
        let fr: Dictionary = [("Hello".to_string(), "Bonjour".to_string())].into();

        Collaborators::new(
            Arc::new(StaticManifestProvider::new(manifest)),
            Arc::new(StaticDictionaryStore::new([("fr".to_string(), fr)].into())),
        )
        .with_locale(Arc::new(FixedLocale(locale.to_string())))
    }

    fn document() -> Rc<Document> {
        Rc::new(Document::parse("<body><p>Hello</p></body>").unwrap())
    }

    #[tokio::test]
    async fn test_start_applies_ambient_language() {
        let runtime = Translify::start(RuntimeOptions::default(), collaborators("fr-CA"), document())
            .await
            .unwrap();
        assert_eq!(runtime.current_language(), "fr");
        assert!(runtime.document().to_html().unwrap().contains("Bonjour"));
    }

    #[tokio::test]
    async fn test_start_with_unsupported_ambient_language() {
        let runtime = Translify::start(RuntimeOptions::default(), collaborators("ja_JP.UTF-8"), document())
            .await
            .unwrap();
        assert_eq!(runtime.current_language(), "en");
        assert_eq!(runtime.stats().cache.requests, 0);
    }

    #[tokio::test]
    async fn test_options_locale_overrides_ambient() {
        let options = RuntimeOptions {
            locale: Some("fr".to_string()),
            ..RuntimeOptions::default()
        };
        let runtime = Translify::start(options, collaborators("en-US"), document())
            .await
            .unwrap();
        assert_eq!(runtime.current_language(), "fr");
    }

    #[test]
    fn test_from_config_requires_source() {
        let config = RuntimeConfig {
            storage: StorageBackend::Memory,
            ..RuntimeConfig::default()
        };
        assert!(matches!(
            Collaborators::from_config(&config),
            Err(TranslationError::Config(_))
        ));
    }
}
