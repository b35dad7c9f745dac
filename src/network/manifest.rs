//! 站点清单及其提供者
//!
//! 清单描述默认语言、支持的语言、可翻译术语，以及可选的每种语言字典哈希。
//! 清单在每次页面加载时只获取一次，之后不可变。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::locale::primary_subtag;

fn default_language() -> String {
    constants::DEFAULT_LANGUAGE.to_string()
}

/// 站点清单
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Manifest {
    #[serde(rename = "default", default = "default_language")]
    pub default_language: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub terms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashes: Option<BTreeMap<String, String>>,
}

impl Manifest {
    /// 从 JSON 字节解析并规范化
    pub fn from_slice(bytes: &[u8]) -> TranslationResult<Self> {
        let manifest: Manifest = serde_json::from_slice(bytes)
            .map_err(|e| TranslationError::Manifest(format!("invalid manifest JSON: {e}")))?;
        Ok(manifest.normalized())
    }

    /// 语言代码统一为小写主子标签，去掉重复语言
    pub fn normalized(mut self) -> Self {
        self.default_language = primary_subtag(&self.default_language);

        let mut languages: Vec<String> = Vec::with_capacity(self.languages.len());
        for language in self.languages.iter().map(|code| primary_subtag(code)) {
            if !language.is_empty() && !languages.contains(&language) {
                languages.push(language);
            }
        }
        self.languages = languages;

        self.hashes = self.hashes.map(|hashes| {
            hashes
                .into_iter()
                .map(|(code, digest)| (primary_subtag(&code), digest))
                .collect()
        });

        self
    }

    /// 默认语言总是被视为受支持
    pub fn is_supported(&self, language: &str) -> bool {
        language == self.default_language || self.languages.iter().any(|code| code == language)
    }

    /// 指定语言当前的新鲜度令牌
    pub fn freshness_token(&self, language: &str) -> Option<&str> {
        self.hashes
            .as_ref()
            .and_then(|hashes| hashes.get(language))
            .map(String::as_str)
    }
}

/// 清单提供者
pub trait ManifestProvider: Send + Sync {
    fn fetch_manifest(&self) -> BoxFuture<'static, TranslationResult<Manifest>>;
}

/// 通过 HTTP 获取清单
#[derive(Debug, Clone)]
pub struct HttpManifestProvider {
    client: reqwest::Client,
    url: url::Url,
}

impl HttpManifestProvider {
    pub fn new(url: &str) -> TranslationResult<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            url: url::Url::parse(url)?,
        })
    }

    pub fn with_client(client: reqwest::Client, url: url::Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

impl ManifestProvider for HttpManifestProvider {
    fn fetch_manifest(&self) -> BoxFuture<'static, TranslationResult<Manifest>> {
        let client = self.client.clone();
        let url = self.url.clone();

        async move {
            tracing::debug!("获取清单: {}", url);
            let response = client
                .get(url.clone())
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|e| TranslationError::Manifest(format!("{url}: {e}")))?;
            let body = response
                .bytes()
                .await
                .map_err(|e| TranslationError::Manifest(format!("{url}: {e}")))?;
            Manifest::from_slice(&body)
        }
        .boxed()
    }
}

/// 内存中的固定清单
#[derive(Debug, Clone)]
pub struct StaticManifestProvider {
    manifest: Manifest,
}

impl StaticManifestProvider {
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest: manifest.normalized(),
        }
    }
}

impl ManifestProvider for StaticManifestProvider {
    fn fetch_manifest(&self) -> BoxFuture<'static, TranslationResult<Manifest>> {
        futures::future::ready(Ok(self.manifest.clone())).boxed()
    }
}

/// 项目文件中的翻译声明
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectConfig {
    #[serde(rename = "default", default = "default_language")]
    pub default_language: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub terms: Vec<String>,
}

impl ProjectConfig {
    /// 读取项目文件。
    ///
    /// 文件可以直接是 `{default, languages, terms}`，也可以是带 `translify`
    /// 字段的 package 文件；该字段为字符串时表示相对项目文件目录的另一个 JSON 文件。
    pub async fn load(path: &Path) -> TranslationResult<Self> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| TranslationError::Manifest(format!("{}: {e}", path.display())))?;
        let value: serde_json::Value = serde_json::from_slice(&content)
            .map_err(|e| TranslationError::Manifest(format!("{}: {e}", path.display())))?;

        match value.get("translify") {
            Some(serde_json::Value::String(reference)) => {
                let base = path.parent().unwrap_or_else(|| Path::new("."));
                let referenced = base.join(reference);
                let content = tokio::fs::read(&referenced).await.map_err(|e| {
                    TranslationError::Manifest(format!("{}: {e}", referenced.display()))
                })?;
                serde_json::from_slice(&content).map_err(|e| {
                    TranslationError::Manifest(format!("{}: {e}", referenced.display()))
                })
            }
            Some(section) => serde_json::from_value(section.clone())
                .map_err(|e| TranslationError::Manifest(format!("{}: {e}", path.display()))),
            None => serde_json::from_value(value)
                .map_err(|e| TranslationError::Manifest(format!("{}: {e}", path.display()))),
        }
    }
}

/// 由项目文件与本地字典目录生成清单，为每种语言计算内容哈希
#[derive(Debug, Clone)]
pub struct LocalManifestProvider {
    project_file: Arc<PathBuf>,
    locales_dir: Arc<PathBuf>,
}

impl LocalManifestProvider {
    pub fn new(project_file: impl Into<PathBuf>, locales_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_file: Arc::new(project_file.into()),
            locales_dir: Arc::new(locales_dir.into()),
        }
    }

    /// 生成清单
    pub async fn build(&self) -> TranslationResult<Manifest> {
        let project = ProjectConfig::load(&self.project_file).await?;
        let mut hashes = BTreeMap::new();

        // 哈希与字典存储读取的是同一个文件：`<dir>/<主子标签>.json`
        for language in project.languages.iter().map(|code| primary_subtag(code)) {
            if language.is_empty() || hashes.contains_key(&language) {
                continue;
            }
            let path = self.locales_dir.join(format!("{language}.json"));
            let entries = match tokio::fs::read(&path).await {
                Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                    tracing::warn!("字典文件无法解析，按空字典计算哈希 {}: {}", path.display(), e);
                    BTreeMap::new()
                }),
                Err(e) => {
                    tracing::warn!("字典文件不可读，按空字典计算哈希 {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            };
            hashes.insert(language, dictionary_digest(&entries));
        }

        Ok(Manifest {
            default_language: project.default_language,
            languages: project.languages,
            terms: project.terms,
            hashes: Some(hashes),
        }
        .normalized())
    }
}

impl ManifestProvider for LocalManifestProvider {
    fn fetch_manifest(&self) -> BoxFuture<'static, TranslationResult<Manifest>> {
        let provider = self.clone();
        async move { provider.build().await }.boxed()
    }
}

/// 字典内容摘要：按键排序后的 `[[key, value], ...]` JSON 的 SHA-256 十六进制
pub fn dictionary_digest(entries: &BTreeMap<String, String>) -> String {
    let sorted: Vec<(&String, &String)> = entries.iter().collect();
    let json = serde_json::to_string(&sorted).unwrap_or_else(|_| "[]".to_string());

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parsing_and_normalization() {
        let manifest = Manifest::from_slice(
            br#"{"default":"EN","languages":["en","fr-CA","fr","de_DE"],"terms":["Hello"],"hashes":{"fr":"abc"}}"#,
        )
        .unwrap();

        assert_eq!(manifest.default_language, "en");
        assert_eq!(manifest.languages, vec!["en", "fr", "de"]);
        assert!(manifest.is_supported("de"));
        assert!(!manifest.is_supported("es"));
        assert_eq!(manifest.freshness_token("fr"), Some("abc"));
        assert_eq!(manifest.freshness_token("de"), None);
    }

    #[test]
    fn test_manifest_defaults() {
        let manifest = Manifest::from_slice(b"{}").unwrap();
        assert_eq!(manifest.default_language, "en");
        assert!(manifest.is_supported("en"));
        assert!(manifest.hashes.is_none());
    }

    #[test]
    fn test_invalid_manifest_is_manifest_error() {
        assert!(matches!(
            Manifest::from_slice(b"[1, 2]"),
            Err(TranslationError::Manifest(_))
        ));
    }

    #[test]
    fn test_digest_is_order_independent() {
        let a: BTreeMap<String, String> = [("b", "2"), ("a", "1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let b: BTreeMap<String, String> = [("a", "1"), ("b", "2")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert_eq!(dictionary_digest(&a), dictionary_digest(&b));
        assert_eq!(dictionary_digest(&a).len(), 64);
        assert_ne!(dictionary_digest(&a), dictionary_digest(&BTreeMap::new()));
    }

    fn write(path: &Path, content: &str) {
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_project_section_may_reference_another_file() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("package.json"),
            r#"{"name":"site","translify":"i18n/translify.json"}"#,
        );
        std::fs::create_dir_all(dir.path().join("i18n")).unwrap();
        write(
            &dir.path().join("i18n").join("translify.json"),
            r#"{"default":"fr","languages":["fr","en"],"terms":["Bonjour"]}"#,
        );

        let project = ProjectConfig::load(&dir.path().join("package.json")).await.unwrap();
        assert_eq!(project.default_language, "fr");
        assert_eq!(project.languages, vec!["fr", "en"]);
        assert_eq!(project.terms, vec!["Bonjour"]);
    }

    #[tokio::test]
    async fn test_missing_referenced_project_file_is_manifest_error() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("package.json"), r#"{"translify":"missing.json"}"#);

        assert!(matches!(
            ProjectConfig::load(&dir.path().join("package.json")).await,
            Err(TranslationError::Manifest(_))
        ));
    }

    #[tokio::test]
    async fn test_local_hash_covers_the_file_the_store_reads() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("project.json"),
            r#"{"default":"en","languages":["en","fr-CA"],"terms":["Hello"]}"#,
        );
        let locales = dir.path().join("locales");
        std::fs::create_dir_all(&locales).unwrap();
        write(&locales.join("fr.json"), r#"{"Hello":"Bonjour"}"#);
        write(&locales.join("fr-CA.json"), r#"{"Hello":"Allô"}"#);

        let manifest = LocalManifestProvider::new(dir.path().join("project.json"), locales.clone())
            .build()
            .await
            .unwrap();

        let fr: BTreeMap<String, String> = [("Hello".to_string(), "Bonjour".to_string())].into();
        assert_eq!(manifest.languages, vec!["en", "fr"]);
        assert_eq!(manifest.freshness_token("fr"), Some(dictionary_digest(&fr).as_str()));
    }
}
