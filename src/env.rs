//! 统一的环境变量管理系统
//!
//! 所有 `TRANSLIFY_*` 变量都通过实现了 [`EnvVar`] 的零大小类型读取，
//! 解析与校验集中在这里，配置层只负责把结果覆盖到配置结构上。

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "TRANSLIFY_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 运行时相关环境变量
pub mod runtime {
    use super::*;

    /// 清单地址
    pub struct ManifestUrl;
    impl EnvVar<String> for ManifestUrl {
        const NAME: &'static str = "TRANSLIFY_MANIFEST_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "URL of the translify.json manifest";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    /// 字典存储地址
    pub struct LocalesUrl;
    impl EnvVar<String> for LocalesUrl {
        const NAME: &'static str = "TRANSLIFY_LOCALES_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Base URL of the per-language dictionaries";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    /// 偏好语言（覆盖 LANG 等系统变量）
    pub struct Locale;
    impl EnvVar<String> for Locale {
        const NAME: &'static str = "TRANSLIFY_LOCALE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Preferred locale tag, e.g. fr-CA";

        fn parse(value: &str) -> EnvResult<String> {
            let tag = value.trim();
            if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@')) {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid locale tag '{}'", value),
                });
            }
            Ok(tag.to_string())
        }
    }
}

/// 持久化相关环境变量
pub mod storage {
    use super::*;

    /// 存储后端
    pub struct Backend;
    impl EnvVar<String> for Backend {
        const NAME: &'static str = "TRANSLIFY_STORAGE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Snapshot storage backend: redb, json, memory";

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                backend @ ("redb" | "json" | "memory") => Ok(backend.to_string()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid backend '{}'. Use: redb, json, memory", value),
                }),
            }
        }
    }

    /// 存储路径
    pub struct Path;
    impl EnvVar<String> for Path {
        const NAME: &'static str = "TRANSLIFY_STORAGE_PATH";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Path of the persisted dictionary snapshot";

        fn parse(value: &str) -> EnvResult<String> {
            let path = value.trim();
            if path.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path must not be empty".to_string(),
                });
            }
            Ok(shellexpand::tilde(path).into_owned())
        }
    }

    /// 持久化去抖间隔
    pub struct PersistDebounce;
    impl EnvVar<Duration> for PersistDebounce {
        const NAME: &'static str = "TRANSLIFY_PERSIST_DEBOUNCE_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(50));
        const DESCRIPTION: &'static str = "Delay used to coalesce snapshot writes, in milliseconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let millis: u64 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of milliseconds".to_string(),
            })?;

            if millis > 60_000 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Debounce too long (max 60000 ms)".to_string(),
                });
            }

            Ok(Duration::from_millis(millis))
        }
    }
}

fn parse_http_url(value: &str, var_name: &str) -> EnvResult<String> {
    let url = value.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Err(EnvError {
            variable: var_name.to_string(),
            message: "URL must start with http:// or https://".to_string(),
        })
    }
}
