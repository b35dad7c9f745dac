use std::io;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::tendril::{format_tendril, TendrilSink};
use html5ever::{local_name, namespace_url, ns, parse_document, parse_fragment, LocalName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> io::Result<RcDom> {
    let s = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => encoding.decode(data).0.into_owned(),
        None => String::from_utf8_lossy(data).into_owned(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
}

/// 以 `<body>` 为上下文解析 HTML 片段，返回片段的顶层节点（已与临时文档断开）
pub fn html_fragment_to_nodes(html: &str) -> Vec<Handle> {
    let dom = parse_fragment(
        RcDom::default(),
        Default::default(),
        QualName::new(None, ns!(html), local_name!("body")),
        Vec::new(),
    )
    .one(html);

    // 片段解析器把结果放在一个合成的 <html> 元素下
    let Some(root) = dom.document.children.borrow().first().cloned() else {
        return Vec::new();
    };

    let nodes: Vec<Handle> = root.children.borrow_mut().drain(..).collect();
    for node in &nodes {
        node.parent.set(None);
    }
    nodes
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let Some((&node_name, rest)) = node_names.split_first() else {
        return Vec::new();
    };

    let mut found_nodes = Vec::new();
    let matches = get_node_name(node) == Some(node_name);

    if rest.is_empty() {
        if matches {
            found_nodes.push(node.clone());
        }
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names));
        }
    } else if matches {
        found_nodes.append(&mut find_nodes_in_children(node, rest));
    } else {
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names));
        }
    }

    found_nodes
}

fn find_nodes_in_children(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .flat_map(|child_node| find_nodes(child_node, node_names))
        .collect()
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    parent
        .children
        .borrow()
        .iter()
        .find(|child| get_node_name(child) == Some(node_name))
        .cloned()
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 设置节点属性，`None` 表示删除
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    let NodeData::Element { attrs, .. } = &node.data else {
        return;
    };

    let mut attrs_mut = attrs.borrow_mut();
    match attr_value {
        Some(attr_value) => {
            if let Some(attr) = attrs_mut.iter_mut().find(|attr| &*attr.name.local == attr_name) {
                attr.value.clear();
                attr.value.push_slice(&attr_value);
            } else {
                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
        None => attrs_mut.retain(|attr| &*attr.name.local != attr_name),
    }
}

/// 文本节点的内容
pub fn get_node_text(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 覆盖文本节点的内容；非文本节点返回 `false`
pub fn set_node_text(node: &Handle, text: &str) -> bool {
    match &node.data {
        NodeData::Text { contents } => {
            let mut contents = contents.borrow_mut();
            contents.clear();
            contents.push_slice(text);
            true
        }
        _ => false,
    }
}

/// 把 `child` 追加为 `parent` 的最后一个子节点
pub fn append_child(parent: &Handle, child: Handle) {
    if let Some(previous) = get_parent_node(&child) {
        previous.children.borrow_mut().retain(|node| !Rc::ptr_eq(node, &child));
    }
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}
