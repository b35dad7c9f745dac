//! # 网络模块
//!
//! 运行时依赖的两个外部协作者：
//!
//! - `manifest` - 站点清单及其提供者（HTTP、本地项目文件、内存）
//! - `store` - 按语言代码寻址的字典存储（HTTP、本地目录、内存）

pub mod manifest;
pub mod store;

// Re-export commonly used items for convenience
pub use manifest::{
    dictionary_digest, HttpManifestProvider, LocalManifestProvider, Manifest, ManifestProvider,
    ProjectConfig, StaticManifestProvider,
};
pub use store::{
    Dictionary, DictionaryStore, HttpDictionaryStore, LocalDictionaryStore, StaticDictionaryStore,
};
