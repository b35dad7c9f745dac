//! 配置管理器
//!
//! 加载顺序：`.env` 文件 → 配置文件（按 `CONFIG_PATHS` 顺序查找）→ 环境变量覆盖 → 校验

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::error::{TranslationError, TranslationResult};

/// 快照存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Redb,
    Json,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = TranslationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "redb" => Ok(StorageBackend::Redb),
            "json" => Ok(StorageBackend::Json),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(TranslationError::Config(format!("unknown storage backend: {other}"))),
        }
    }
}

/// 运行时配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    // 远程模式
    pub manifest_url: Option<String>,
    pub locales_url: Option<String>,

    // 本地模式
    pub project_file: Option<String>,
    pub locales_dir: String,

    // 持久化
    pub storage: StorageBackend,
    pub storage_path: String,
    pub persist_debounce_ms: u64,

    /// 覆盖环境中的偏好语言
    pub locale: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            manifest_url: None,
            locales_url: None,
            project_file: None,
            locales_dir: constants::DEFAULT_LOCALES_DIR.to_string(),
            storage: StorageBackend::default(),
            storage_path: constants::DEFAULT_STORAGE_PATH.to_string(),
            persist_debounce_ms: constants::DEFAULT_PERSIST_DEBOUNCE.as_millis() as u64,
            locale: None,
        }
    }
}

impl RuntimeConfig {
    /// 校验配置
    pub fn validate(&self) -> TranslationResult<()> {
        if let Some(url) = &self.manifest_url {
            url::Url::parse(url)?;
        }

        if let Some(url) = &self.locales_url {
            url::Url::parse(url)?;
        }

        if self.storage != StorageBackend::Memory && self.storage_path.trim().is_empty() {
            return Err(TranslationError::Config(
                "storage_path must be set for persistent storage".to_string(),
            ));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{runtime, storage, EnvVar};

        if let Ok(url) = runtime::ManifestUrl::get() {
            tracing::info!("环境变量覆盖清单地址: {}", url);
            self.manifest_url = Some(url);
        }

        if let Ok(url) = runtime::LocalesUrl::get() {
            self.locales_url = Some(url);
        }

        if let Ok(locale) = runtime::Locale::get() {
            self.locale = Some(locale);
        }

        if let Ok(backend) = storage::Backend::get() {
            if let Ok(backend) = backend.parse() {
                self.storage = backend;
            }
        }

        if let Ok(path) = storage::Path::get() {
            self.storage_path = path;
        }

        if std::env::var(storage::PersistDebounce::NAME).is_ok() {
            if let Ok(debounce) = storage::PersistDebounce::get() {
                self.persist_debounce_ms = debounce.as_millis() as u64;
            }
        }
    }

    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }

    /// 展开 `~` 之后的存储路径
    pub fn expanded_storage_path(&self) -> String {
        shellexpand::tilde(&self.storage_path).into_owned()
    }
}

/// 配置管理器
pub struct ConfigManager {
    config: RuntimeConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> TranslationResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件创建，仍然应用环境变量覆盖
    pub fn from_file(path: &str) -> TranslationResult<Self> {
        Self::load_dotenv();
        let mut config = Self::load_from_file(&shellexpand::tilde(path))?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn into_config(self) -> RuntimeConfig {
        self.config
    }

    /// 从文件加载配置
    fn load_config() -> TranslationResult<RuntimeConfig> {
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(RuntimeConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &str) -> TranslationResult<RuntimeConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::Config(format!("读取配置文件失败 {path}: {e}")))?;

        Self::parse(path, &content)
    }

    /// 按扩展名解析配置内容，`.toml` 以外的文件按 JSON 处理
    pub fn parse(path: &str, content: &str) -> TranslationResult<RuntimeConfig> {
        if path.ends_with(".toml") {
            Ok(toml::from_str(content)?)
        } else {
            serde_json::from_str(content)
                .map_err(|e| TranslationError::Config(format!("解析JSON配置失败: {e}")))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }
}
