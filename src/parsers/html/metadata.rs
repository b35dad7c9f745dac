//! HTML 文档元数据
//!
//! 标题与字符编码声明。标题不是 `<body>` 的一部分，同步器把它当作
//! 一个独立的虚拟节点处理。

use html5ever::interface::QualName;
use html5ever::tendril::StrTendril;
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData};

use super::dom::{append_child, find_nodes, get_node_attr};

/// 获取文档字符编码
///
/// 支持 `<meta charset="...">` 和
/// `<meta http-equiv="content-type" content="text/html; charset=...">` 两种写法。
pub fn get_charset(node: &Handle) -> Option<String> {
    for meta_node in find_nodes(node, &["html", "head", "meta"]).iter() {
        if let Some(charset) = get_node_attr(meta_node, "charset") {
            return Some(charset);
        }

        if get_node_attr(meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
        {
            if let Some(content) = get_node_attr(meta_node, "content") {
                return content_type_charset(&content);
            }
        }
    }

    None
}

fn content_type_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_string())
        })
}

/// 文档的 `<title>` 元素
pub fn get_title_node(node: &Handle) -> Option<Handle> {
    find_nodes(node, &["html", "head", "title"]).into_iter().next()
}

/// 获取文档标题（`<title>` 下的第一个文本节点）
pub fn get_title(node: &Handle) -> Option<String> {
    let title_node = get_title_node(node)?;
    let children = title_node.children.borrow();
    children.iter().find_map(|child_node| match &child_node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    })
}

/// 设置文档标题；没有 `<title>` 时在 `<head>` 中创建
///
/// 返回是否写入成功（文档缺少 `<head>` 时失败）。
pub fn set_title(node: &Handle, title: &str) -> bool {
    let title_node = match get_title_node(node) {
        Some(title_node) => title_node,
        None => {
            let Some(head) = find_nodes(node, &["html", "head"]).into_iter().next() else {
                return false;
            };
            let title_node = Node::new(NodeData::Element {
                name: QualName::new(None, ns!(html), LocalName::from("title")),
                attrs: Default::default(),
                template_contents: Default::default(),
                mathml_annotation_xml_integration_point: false,
            });
            append_child(&head, title_node.clone());
            title_node
        }
    };

    let existing = title_node
        .children
        .borrow()
        .iter()
        .find(|child_node| matches!(child_node.data, NodeData::Text { .. }))
        .cloned();

    match existing {
        Some(text_node) => {
            if let NodeData::Text { contents } = &text_node.data {
                *contents.borrow_mut() = StrTendril::from_slice(title);
            }
        }
        None => {
            let text_node = Node::new(NodeData::Text {
                contents: StrTendril::from_slice(title).into(),
            });
            append_child(&title_node, text_node);
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;

    #[test]
    fn test_get_and_set_title() {
        let dom = html_to_dom(b"<html><head><title>Hello</title></head><body></body></html>", "utf-8")
            .unwrap();
        assert_eq!(get_title(&dom.document).as_deref(), Some("Hello"));

        assert!(set_title(&dom.document, "Bonjour"));
        assert_eq!(get_title(&dom.document).as_deref(), Some("Bonjour"));
    }

    #[test]
    fn test_set_title_creates_element() {
        let dom = html_to_dom(b"<p>no title</p>", "utf-8").unwrap();
        assert_eq!(get_title(&dom.document), None);
        assert!(set_title(&dom.document, "Created"));
        assert_eq!(get_title(&dom.document).as_deref(), Some("Created"));
    }

    #[test]
    fn test_get_charset() {
        let dom = html_to_dom(br#"<html><head><meta charset="windows-1252"></head></html>"#, "utf-8")
            .unwrap();
        assert_eq!(get_charset(&dom.document).as_deref(), Some("windows-1252"));

        let dom = html_to_dom(
            br#"<html><head><meta http-equiv="Content-Type" content="text/html; charset=iso-8859-1"></head></html>"#,
            "utf-8",
        )
        .unwrap();
        assert_eq!(get_charset(&dom.document).as_deref(), Some("iso-8859-1"));
    }
}
