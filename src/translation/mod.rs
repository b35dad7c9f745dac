//! 翻译运行时
//!
//! 按需加载每种语言的字典，把文档中的文本与字面术语、模板术语（含 `[...]`
//! 占位符）匹配并就地改写，包括之后新插入的内容：
//! - **pattern** / **resolver**: 模板术语编译与正反向解析
//! - **indent**: 缩进提取与恢复
//! - **storage**: 字典缓存与快照持久化
//! - **document** / **sync**: 文档变更订阅与同步扫描
//! - **controller**: 语言切换与运行时入口
//! - **config** / **error** / **locale**: 配置、错误与环境语言
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use translify::translation::{Collaborators, Document, RuntimeConfig, RuntimeOptions, Translify};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RuntimeConfig {
//!     manifest_url: Some("https://example.com/translify.json".to_string()),
//!     ..RuntimeConfig::default()
//! };
//! let document = Rc::new(Document::parse("<p>Hello</p>")?);
//! let runtime = Translify::start(
//!     RuntimeOptions::from(&config),
//!     Collaborators::from_config(&config)?,
//!     Rc::clone(&document),
//! )
//! .await?;
//!
//! runtime.set_language("fr").await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 配置管理模块 - 运行时配置、常量与配置文件加载
pub mod config;

/// 语言切换控制器 - 运行时公共入口
pub mod controller;

/// 被翻译的文档与变更订阅
pub mod document;

/// 错误处理模块 - 统一的错误类型和处理机制
pub mod error;

/// 缩进编解码
pub mod indent;

/// 环境语言信号
pub mod locale;

/// 模板术语编译
pub mod pattern;

/// 正反向解析
pub mod resolver;

/// 存储管理模块 - 字典缓存和快照持久化
pub mod storage;

/// 文档同步器
pub mod sync;

// ============================================================================
// 核心API导出
// ============================================================================

pub use config::{constants, ConfigManager, RuntimeConfig, StorageBackend};
pub use controller::{Collaborators, RuntimeOptions, RuntimeState, RuntimeStats, Translify};
pub use document::{Document, MutationBatch, MutationStream};
pub use error::{ErrorCategory, TranslationError, TranslationResult};
pub use locale::{EnvLocale, FixedLocale, LocaleSource};
pub use resolver::{Direction, ResolutionTable, Resolver};
pub use storage::{CacheStatsSnapshot, DictionaryCache, SnapshotStorage};
pub use sync::{apply_rewrites, collect_rewrites, Rewrite, RewriteTarget, Synchronizer};
