//! 运行时配置管理模块
//!
//! 支持 `.env`、配置文件（TOML / JSON）、环境变量覆盖与默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, RuntimeConfig, StorageBackend};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    /// 模板术语中的占位符
    pub const PLACEHOLDER: &str = "[...]";

    /// 未声明默认语言时使用的语言
    pub const DEFAULT_LANGUAGE: &str = "en";

    /// 持久化快照使用的唯一键
    pub const STORAGE_KEY: &str = "locales";

    /// 字典相对清单所在目录的默认路径
    pub const LOCALES_PATH: &str = "locales/";

    /// 需要额外检查属性的交互元素
    pub const INTERACTIVE_ELEMENTS: &[&str] = &["label", "button", "input", "textarea"];

    /// 交互元素上可翻译的属性
    pub const TRANSLATABLE_ATTRS: &[&str] = &["title", "placeholder"];

    pub const DEFAULT_PERSIST_DEBOUNCE: Duration = Duration::from_millis(50);
    pub const DEFAULT_STORAGE_PATH: &str = "~/.cache/translify/locales.redb";
    pub const DEFAULT_LOCALES_DIR: &str = "locales";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "translify.toml",
        ".translify.toml",
        "~/.config/translify/config.toml",
    ];
}
