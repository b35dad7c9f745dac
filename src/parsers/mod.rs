//! # 解析器模块
//!
//! - `html` - HTML 文档解析、DOM 操作、元数据处理

pub mod html;

pub use html::{
    find_nodes, get_charset, get_node_attr, get_title, html_fragment_to_nodes, html_to_dom,
    serialize_document, set_node_attr, set_title,
};
