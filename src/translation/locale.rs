//! 环境语言信号
//!
//! 只使用语言标签的主子标签（区域后缀之前的部分）。

use crate::env::{runtime, EnvVar};

/// 提取主子标签：`fr-CA` → `fr`，`pt_BR.UTF-8` → `pt`
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_', '.', '@'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// 用户偏好语言的只读来源
pub trait LocaleSource: Send + Sync {
    fn preferred_locale(&self) -> Option<String>;
}

/// 固定语言，供宿主或测试注入
#[derive(Debug, Clone)]
pub struct FixedLocale(pub String);

impl LocaleSource for FixedLocale {
    fn preferred_locale(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// 从进程环境读取：`TRANSLIFY_LOCALE`，然后 `LC_ALL`、`LC_MESSAGES`、`LANG`
#[derive(Debug, Clone, Default)]
pub struct EnvLocale;

impl LocaleSource for EnvLocale {
    fn preferred_locale(&self) -> Option<String> {
        if let Ok(locale) = runtime::Locale::get() {
            return Some(locale);
        }

        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty() && value != "C" && value != "POSIX")
    }
}
