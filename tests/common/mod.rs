// 集成测试公共模块
//
// 提供清单、字典、HTML 夹具，以及可计数的字典存储

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

use translify::network::{
    Dictionary, DictionaryStore, Manifest, StaticDictionaryStore, StaticManifestProvider,
};
use translify::translation::storage::MemoryStorage;
use translify::translation::{
    Collaborators, Document, FixedLocale, RuntimeOptions, TranslationResult, Translify,
};

/// 记录每种语言请求次数的字典存储
pub struct CountingStore {
    inner: StaticDictionaryStore,
    delay: Duration,
    requests: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl CountingStore {
    pub fn new(dictionaries: HashMap<String, Dictionary>) -> Self {
        Self {
            inner: StaticDictionaryStore::new(dictionaries),
            delay: Duration::ZERO,
            requests: Mutex::new(HashMap::new()),
            total: AtomicUsize::new(0),
        }
    }

    /// 每次请求先等待 `delay`，用于构造并发场景
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self, language: &str) -> usize {
        self.requests.lock().unwrap().get(language).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl DictionaryStore for CountingStore {
    fn fetch(&self, language: &str) -> BoxFuture<'static, TranslationResult<Dictionary>> {
        *self.requests.lock().unwrap().entry(language.to_string()).or_default() += 1;
        self.total.fetch_add(1, Ordering::SeqCst);

        let request = self.inner.fetch(language);
        let delay = self.delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            request.await
        }
        .boxed()
    }
}

/// 测试夹具
pub struct Fixtures;

impl Fixtures {
    /// 默认语言 `en`，支持 `en` 与 `fr`，不带哈希
    pub fn manifest() -> Manifest {
        Self::manifest_with_hash(None)
    }

    pub fn manifest_with_hash(fr_hash: Option<&str>) -> Manifest {
        Manifest {
            default_language: "en".to_string(),
            languages: vec!["en".to_string(), "fr".to_string()],
            terms: vec![
                "Hello".to_string(),
                "Welcome [...]!".to_string(),
                "Your email".to_string(),
                "[...] of [...] items".to_string(),
            ],
            hashes: fr_hash.map(|hash| [("fr".to_string(), hash.to_string())].into()),
        }
    }

    pub fn fr_dictionary() -> Dictionary {
        [
            ("Hello", "Bonjour"),
            ("Welcome [...]!", "Bienvenue [...]!"),
            ("Your email", "Votre courriel"),
            ("[...] of [...] items", "[...] sur [...] éléments"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    pub fn dictionaries() -> HashMap<String, Dictionary> {
        [("fr".to_string(), Self::fr_dictionary())].into()
    }

    pub fn page() -> &'static str {
        r#"<html><head><title>Hello</title></head><body>
<h1>Welcome Alice!</h1>
<p>Hello</p>
<label title="Your email">Your email</label>
<input placeholder="Your email" alt="Hello">
<span>3 of 10 items</span>
<p>Untranslated text</p>
</body></html>"#
    }
}

/// 一次运行时启动所需的全部部件
pub struct TestEnvironment {
    pub store: Arc<CountingStore>,
    pub storage: Arc<MemoryStorage>,
    pub manifest: Manifest,
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new(Fixtures::manifest())
    }
}

impl TestEnvironment {
    pub fn new(manifest: Manifest) -> Self {
        Self {
            store: Arc::new(CountingStore::new(Fixtures::dictionaries())),
            storage: Arc::new(MemoryStorage::new()),
            manifest,
        }
    }

    pub fn with_store(mut self, store: CountingStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    pub fn with_storage(mut self, storage: Arc<MemoryStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn collaborators(&self, locale: &str) -> Collaborators {
        Collaborators::new(
            Arc::new(StaticManifestProvider::new(self.manifest.clone())),
            self.store.clone(),
        )
        .with_storage(self.storage.clone())
        .with_locale(Arc::new(FixedLocale(locale.to_string())))
    }

    pub async fn start(&self, html: &str, locale: &str) -> (Translify, Rc<Document>) {
        let document = Rc::new(Document::parse(html).expect("fixture HTML should parse"));
        let options = RuntimeOptions {
            persist_debounce: Duration::from_millis(5),
            ..RuntimeOptions::default()
        };
        let runtime = Translify::start(options, self.collaborators(locale), Rc::clone(&document))
            .await
            .expect("runtime should start");
        (runtime, document)
    }
}

/// 把文档序列化为字符串
pub fn html_of(document: &Document) -> String {
    document.to_html().expect("document should serialize")
}
