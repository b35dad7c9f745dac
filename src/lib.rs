//! # Translify
//!
//! 文档的增量翻译运行时：按需加载字典，匹配字面术语与模板术语，
//! 就地改写文本，并能把已应用的语言还原回默认语言。
//!
//! ## 模块组织
//!
//! - `core` - 命令行使用的整文档翻译流程
//! - `env` - 类型化的环境变量
//! - `network` - 清单与字典的获取
//! - `parsers` - HTML 解析与 DOM 操作
//! - `translation` - 翻译运行时

pub mod core;
pub mod env;
pub mod network;
pub mod parsers;
pub mod translation;

pub use core::{translate_document, TranslifyError, TranslifyOptions};
pub use network::{Dictionary, DictionaryStore, Manifest, ManifestProvider};
pub use translation::{
    Collaborators, Document, RuntimeConfig, RuntimeOptions, TranslationError, TranslationResult,
    Translify,
};
