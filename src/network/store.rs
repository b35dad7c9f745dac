//! 字典存储
//!
//! 每种语言一个扁平的 `{术语: 译文}` JSON 映射。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};

/// 单一语言的字典
pub type Dictionary = HashMap<String, String>;

/// 字典存储
pub trait DictionaryStore: Send + Sync {
    fn fetch(&self, language: &str) -> BoxFuture<'static, TranslationResult<Dictionary>>;
}

/// 通过 HTTP 获取 `<base>/<code>.json`
#[derive(Debug, Clone)]
pub struct HttpDictionaryStore {
    client: reqwest::Client,
    base: url::Url,
}

impl HttpDictionaryStore {
    pub fn new(base: &str) -> TranslationResult<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            base: directory_url(url::Url::parse(base)?),
        })
    }

    /// 默认字典位置：清单所在目录下的 `locales/`
    pub fn next_to_manifest(manifest_url: &str) -> TranslationResult<Self> {
        let manifest = url::Url::parse(manifest_url)?;
        Ok(Self {
            client: reqwest::Client::new(),
            base: manifest.join(constants::LOCALES_PATH)?,
        })
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn dictionary_url(&self, language: &str) -> TranslationResult<url::Url> {
        Ok(self.base.join(&format!("{language}.json"))?)
    }
}

impl DictionaryStore for HttpDictionaryStore {
    fn fetch(&self, language: &str) -> BoxFuture<'static, TranslationResult<Dictionary>> {
        let client = self.client.clone();
        let url = self.dictionary_url(language);

        async move {
            let url = url?;
            tracing::debug!("获取字典: {}", url);
            let body = client
                .get(url.clone())
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            serde_json::from_slice(&body)
                .map_err(|e| TranslationError::Parse(format!("{url}: {e}")))
        }
        .boxed()
    }
}

/// 从本地目录读取 `<dir>/<code>.json`
#[derive(Debug, Clone)]
pub struct LocalDictionaryStore {
    dir: Arc<PathBuf>,
}

impl LocalDictionaryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Arc::new(dir.into()),
        }
    }
}

impl DictionaryStore for LocalDictionaryStore {
    fn fetch(&self, language: &str) -> BoxFuture<'static, TranslationResult<Dictionary>> {
        let path = self.dir.join(format!("{language}.json"));

        async move {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| TranslationError::Io(format!("{}: {e}", path.display())))?;
            serde_json::from_slice(&bytes)
                .map_err(|e| TranslationError::Parse(format!("{}: {e}", path.display())))
        }
        .boxed()
    }
}

/// 内存中的字典集合
#[derive(Debug, Clone, Default)]
pub struct StaticDictionaryStore {
    dictionaries: Arc<HashMap<String, Dictionary>>,
}

impl StaticDictionaryStore {
    pub fn new(dictionaries: HashMap<String, Dictionary>) -> Self {
        Self {
            dictionaries: Arc::new(dictionaries),
        }
    }
}

impl DictionaryStore for StaticDictionaryStore {
    fn fetch(&self, language: &str) -> BoxFuture<'static, TranslationResult<Dictionary>> {
        let result = self
            .dictionaries
            .get(language)
            .cloned()
            .ok_or_else(|| TranslationError::Network(format!("no dictionary for {language}")));
        futures::future::ready(result).boxed()
    }
}

/// 保证 URL 以 `/` 结尾，使 `join` 追加而不是替换最后一段
fn directory_url(mut url: url::Url) -> url::Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_url_next_to_manifest() {
        let store = HttpDictionaryStore::next_to_manifest("https://example.com/app/translify.json")
            .unwrap();
        assert_eq!(
            store.dictionary_url("fr").unwrap().as_str(),
            "https://example.com/app/locales/fr.json"
        );
    }

    #[test]
    fn test_dictionary_url_without_trailing_slash() {
        let store = HttpDictionaryStore::new("https://cdn.example.com/i18n").unwrap();
        assert_eq!(
            store.dictionary_url("de").unwrap().as_str(),
            "https://cdn.example.com/i18n/de.json"
        );
    }

    #[tokio::test]
    async fn test_local_store_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fr.json"), r#"{"Hello":"Bonjour"}"#).unwrap();

        let store = LocalDictionaryStore::new(dir.path());
        let dictionary = store.fetch("fr").await.unwrap();
        assert_eq!(dictionary.get("Hello").map(String::as_str), Some("Bonjour"));
        assert!(store.fetch("de").await.is_err());
    }

    #[tokio::test]
    async fn test_static_store_missing_language() {
        let store = StaticDictionaryStore::default();
        assert!(matches!(
            store.fetch("fr").await,
            Err(TranslationError::Network(_))
        ));
    }
}
