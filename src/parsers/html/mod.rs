//! HTML 解析和 DOM 操作
//!
//! - `dom`: 解析、节点查找、属性与文本读写
//! - `metadata`: 标题与字符编码
//! - `serializer`: 序列化

pub mod dom;
pub mod metadata;
pub mod serializer;

pub use dom::{
    append_child, find_nodes, get_child_node_by_name, get_node_attr, get_node_name,
    get_node_text, get_parent_node, html_fragment_to_nodes, html_to_dom, set_node_attr,
    set_node_text,
};
pub use metadata::{get_charset, get_title, get_title_node, set_title};
pub use serializer::serialize_document;
