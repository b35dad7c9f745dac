//! 被翻译的文档
//!
//! 包装一棵 `RcDom`，作为运行时唯一观察的变更入口：通过 `append_*`
//! 插入的子树会以批次形式推送给所有订阅者。直接修改 `Handle`
//! 不会产生通知。

use std::cell::RefCell;

use markup5ever_rcdom::{Handle, RcDom};
use tokio::sync::mpsc;

use crate::parsers::html::{
    append_child, find_nodes, get_child_node_by_name, get_title, html_fragment_to_nodes,
    html_to_dom, serialize_document, set_title,
};
use crate::translation::error::TranslationResult;

/// 一批新插入的子树根节点
pub type MutationBatch = Vec<Handle>;

/// 变更订阅，`disconnect` 或文档被丢弃后结束
pub struct MutationStream {
    receiver: mpsc::UnboundedReceiver<MutationBatch>,
}

impl MutationStream {
    /// 等待下一批变更
    pub async fn next(&mut self) -> Option<MutationBatch> {
        self.receiver.recv().await
    }

    /// 非阻塞地取出一批已排队的变更
    pub fn try_next(&mut self) -> Option<MutationBatch> {
        self.receiver.try_recv().ok()
    }
}

pub struct Document {
    dom: RcDom,
    subscribers: RefCell<Vec<mpsc::UnboundedSender<MutationBatch>>>,
}

impl Document {
    pub fn new(dom: RcDom) -> Self {
        Self {
            dom,
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// 解析 UTF-8 HTML
    pub fn parse(html: &str) -> TranslationResult<Self> {
        Ok(Self::new(html_to_dom(html.as_bytes(), "utf-8")?))
    }

    /// 文档根节点
    pub fn root(&self) -> &Handle {
        &self.dom.document
    }

    /// `<body>`；片段文档没有 body 时返回根节点
    pub fn body(&self) -> Handle {
        get_child_node_by_name(&self.dom.document, "html")
            .and_then(|html| get_child_node_by_name(&html, "body"))
            .or_else(|| find_nodes(&self.dom.document, &["body"]).into_iter().next())
            .unwrap_or_else(|| self.dom.document.clone())
    }

    pub fn title_text(&self) -> Option<String> {
        get_title(&self.dom.document)
    }

    pub fn set_title_text(&self, title: &str) -> bool {
        set_title(&self.dom.document, title)
    }

    /// 追加一个节点并通知订阅者
    pub fn append_child(&self, parent: &Handle, child: Handle) {
        append_child(parent, child.clone());
        self.notify(vec![child]);
    }

    /// 解析 HTML 片段并追加到 `parent` 末尾，整个片段作为一批通知
    pub fn append_html(&self, parent: &Handle, html: &str) -> Vec<Handle> {
        let nodes = html_fragment_to_nodes(html);
        for node in &nodes {
            append_child(parent, node.clone());
        }
        if !nodes.is_empty() {
            self.notify(nodes.clone());
        }
        nodes
    }

    /// 订阅后续插入
    pub fn subscribe(&self) -> MutationStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.borrow_mut().push(sender);
        MutationStream { receiver }
    }

    /// 断开所有订阅，正在等待的观察循环随之结束
    pub fn disconnect(&self) {
        self.subscribers.borrow_mut().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub fn serialize(&self, document_encoding: &str) -> TranslationResult<Vec<u8>> {
        Ok(serialize_document(&self.dom.document, document_encoding)?)
    }

    pub fn to_html(&self) -> TranslationResult<String> {
        let bytes = self.serialize("utf-8")?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn notify(&self, batch: MutationBatch) {
        self.subscribers
            .borrow_mut()
            .retain(|sender| sender.send(batch.clone()).is_ok());
    }
}

impl From<RcDom> for Document {
    fn from(dom: RcDom) -> Self {
        Self::new(dom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::get_node_name;

    #[test]
    fn test_body_and_title() {
        let document =
            Document::parse("<html><head><title>Hi</title></head><body><p>x</p></body></html>")
                .unwrap();
        assert_eq!(get_node_name(&document.body()), Some("body"));
        assert_eq!(document.title_text().as_deref(), Some("Hi"));
    }

    #[test]
    fn test_append_html_notifies_subscribers() {
        let document = Document::parse("<body><div id=\"root\"></div></body>").unwrap();
        let mut stream = document.subscribe();
        let body = document.body();

        let nodes = document.append_html(&body, "<p>Hello</p><p>World</p>");
        assert_eq!(nodes.len(), 2);

        let batch = stream.try_next().unwrap();
        assert_eq!(batch.len(), 2);
        assert!(stream.try_next().is_none());
        assert!(document.to_html().unwrap().contains("<p>World</p>"));
    }

    #[tokio::test]
    async fn test_disconnect_ends_stream() {
        let document = Document::parse("<body></body>").unwrap();
        let mut stream = document.subscribe();
        document.disconnect();
        assert_eq!(document.subscriber_count(), 0);
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_dropped_stream_is_pruned() {
        let document = Document::parse("<body></body>").unwrap();
        drop(document.subscribe());
        document.append_html(&document.body(), "<span>x</span>");
        assert_eq!(document.subscriber_count(), 0);
    }
}
