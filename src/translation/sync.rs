//! 文档同步器
//!
//! 把文档中的可见文本与当前语言保持一致。一次扫描分两步：
//!
//! - `collect_rewrites`：纯函数，从子树和查找表计算出一组改写，不修改文档；
//! - `apply_rewrites`：把改写写回文档。
//!
//! 遍历从根开始深度优先、先父后子、保持兄弟顺序，无条件进入每个子节点。
//! 文本节点修剪后非空才参与匹配；交互元素额外检查固定的几个属性；
//! 文档标题作为虚拟节点，每次整文档扫描处理一次。

use std::rc::Rc;
use std::sync::Arc;

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::{
    get_node_attr, get_node_name, get_parent_node, set_node_attr, set_node_text,
};
use crate::translation::config::constants::{INTERACTIVE_ELEMENTS, TRANSLATABLE_ATTRS};
use crate::translation::document::Document;
use crate::translation::error::TranslationResult;
use crate::translation::indent;
use crate::translation::resolver::{Direction, ResolutionTable, Resolver};
use crate::translation::storage::DictionaryCache;

/// 改写目标
#[derive(Clone)]
pub enum RewriteTarget {
    /// 文本节点
    Text(Handle),
    /// 元素属性
    Attribute { node: Handle, name: &'static str },
    /// 文档标题
    Title,
}

/// 一次节点改写
#[derive(Clone)]
pub struct Rewrite {
    pub target: RewriteTarget,
    pub original: String,
    pub replacement: String,
}

impl std::fmt::Debug for Rewrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = match &self.target {
            RewriteTarget::Text(_) => "text".to_string(),
            RewriteTarget::Attribute { name, .. } => format!("@{name}"),
            RewriteTarget::Title => "title".to_string(),
        };
        f.debug_struct("Rewrite")
            .field("target", &target)
            .field("original", &self.original)
            .field("replacement", &self.replacement)
            .finish()
    }
}

/// 解析一段原文并恢复其缩进；无匹配或结果与原文相同时返回 `None`
fn rewrite_text(table: &ResolutionTable, original: &str) -> Option<String> {
    if original.trim().is_empty() {
        return None;
    }

    let translated = table.resolve(original)?;
    let replacement = indent::apply(&translated, &indent::extract(original));
    (replacement != original).then_some(replacement)
}

/// 计算子树 `root` 中所有需要的改写
pub fn collect_rewrites(root: &Handle, table: &ResolutionTable) -> Vec<Rewrite> {
    let mut rewrites = Vec::new();
    if table.is_empty() {
        return rewrites;
    }
    visit(root, table, &mut rewrites);
    rewrites
}

fn visit(node: &Handle, table: &ResolutionTable, rewrites: &mut Vec<Rewrite>) {
    match &node.data {
        NodeData::Text { contents } => {
            let original = contents.borrow().to_string();
            if let Some(replacement) = rewrite_text(table, &original) {
                rewrites.push(Rewrite {
                    target: RewriteTarget::Text(node.clone()),
                    original,
                    replacement,
                });
            }
        }
        NodeData::Element { .. } => {
            let is_interactive = get_node_name(node)
                .is_some_and(|name| INTERACTIVE_ELEMENTS.contains(&name));

            if is_interactive {
                for &name in TRANSLATABLE_ATTRS {
                    let Some(original) = get_node_attr(node, name) else {
                        continue;
                    };
                    if let Some(replacement) = rewrite_text(table, &original) {
                        rewrites.push(Rewrite {
                            target: RewriteTarget::Attribute {
                                node: node.clone(),
                                name,
                            },
                            original,
                            replacement,
                        });
                    }
                }
            }
        }
        _ => {}
    }

    for child in node.children.borrow().iter() {
        visit(child, table, rewrites);
    }
}

/// 计算标题改写
pub fn collect_title_rewrite(document: &Document, table: &ResolutionTable) -> Option<Rewrite> {
    let original = document.title_text()?;
    let replacement = rewrite_text(table, &original)?;
    Some(Rewrite {
        target: RewriteTarget::Title,
        original,
        replacement,
    })
}

/// 写回改写，返回实际生效的数量
pub fn apply_rewrites(document: &Document, rewrites: &[Rewrite]) -> usize {
    let mut applied = 0;
    for rewrite in rewrites {
        tracing::debug!("改写 {:?} → {:?}", rewrite.original, rewrite.replacement);
        let written = match &rewrite.target {
            RewriteTarget::Text(node) => set_node_text(node, &rewrite.replacement),
            RewriteTarget::Attribute { node, name } => {
                set_node_attr(node, name, Some(rewrite.replacement.clone()));
                true
            }
            RewriteTarget::Title => document.set_title_text(&rewrite.replacement),
        };
        applied += usize::from(written);
    }
    applied
}

/// 绑定到一个文档的同步器
pub struct Synchronizer {
    document: Rc<Document>,
    resolver: Resolver,
    cache: Arc<DictionaryCache>,
    default_language: String,
}

impl Synchronizer {
    pub fn new(
        document: Rc<Document>,
        resolver: Resolver,
        cache: Arc<DictionaryCache>,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            document,
            resolver,
            cache,
            default_language: default_language.into(),
        }
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    /// 整文档扫描：`<body>` 子树加标题
    pub async fn scan_document(
        &self,
        direction: Direction,
        language: &str,
    ) -> TranslationResult<usize> {
        let Some(table) = self.table(direction, language).await? else {
            return Ok(0);
        };

        let mut rewrites = collect_rewrites(&self.document.body(), &table);
        rewrites.extend(collect_title_rewrite(&self.document, &table));

        let applied = apply_rewrites(&self.document, &rewrites);
        tracing::debug!("整文档扫描 {:?} {}: {} 处改写", direction, language, applied);
        Ok(applied)
    }

    /// 只扫描子树 `root`
    pub async fn scan(
        &self,
        root: &Handle,
        direction: Direction,
        language: &str,
    ) -> TranslationResult<usize> {
        let Some(table) = self.table(direction, language).await? else {
            return Ok(0);
        };

        let rewrites = collect_rewrites(root, &table);
        Ok(apply_rewrites(&self.document, &rewrites))
    }

    /// 逐个扫描一批新插入的子树（共用一张查找表），之后再解析一次标题
    pub async fn scan_batch(
        &self,
        roots: &[Handle],
        direction: Direction,
        language: &str,
    ) -> TranslationResult<usize> {
        let Some(table) = self.table(direction, language).await? else {
            return Ok(0);
        };

        let mut applied = 0;
        for root in roots {
            // 已经从文档中移除的节点不再处理
            if !is_attached(root, self.document.root()) {
                continue;
            }
            applied += apply_rewrites(&self.document, &collect_rewrites(root, &table));
        }

        if let Some(title) = collect_title_rewrite(&self.document, &table) {
            applied += apply_rewrites(&self.document, &[title]);
        }
        Ok(applied)
    }

    /// 正向且目标为默认语言时无事可做；反向扫描总是执行
    async fn table(
        &self,
        direction: Direction,
        language: &str,
    ) -> TranslationResult<Option<ResolutionTable>> {
        if direction == Direction::Forward && language == self.default_language {
            return Ok(None);
        }

        let dictionary = self.cache.get(language).await;
        let table = self.resolver.table(&dictionary, direction)?;
        Ok((!table.is_empty()).then_some(table))
    }
}

fn is_attached(node: &Handle, root: &Handle) -> bool {
    let mut current = node.clone();
    loop {
        if Rc::ptr_eq(&current, root) {
            return true;
        }
        match get_parent_node(&current) {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::store::Dictionary;
    use crate::parsers::html::find_nodes;

    fn table(direction: Direction) -> ResolutionTable {
        let terms = vec![
            "Hello".to_string(),
            "Welcome [...]!".to_string(),
            "Your name".to_string(),
        ];
        let dictionary: Dictionary = [
            ("Hello", "Bonjour"),
            ("Welcome [...]!", "Bienvenue [...]!"),
            ("Your name", "Votre nom"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Resolver::new(&terms)
            .unwrap()
            .table(&Arc::new(dictionary), direction)
            .unwrap()
    }

    #[test]
    fn test_collect_is_pure() {
        let document = Document::parse("<body><p>Hello</p></body>").unwrap();
        let rewrites = collect_rewrites(&document.body(), &table(Direction::Forward));
        assert_eq!(rewrites.len(), 1);
        assert_eq!(rewrites[0].replacement, "Bonjour");
        assert!(document.to_html().unwrap().contains("<p>Hello</p>"));
    }

    #[test]
    fn test_text_and_interactive_attributes() {
        let document = Document::parse(
            r#"<body><p>Welcome Alice!</p>
               <input placeholder="Your name" title="Hello" alt="Hello">
               <div title="Hello">Goodbye</div></body>"#,
        )
        .unwrap();

        let rewrites = collect_rewrites(&document.body(), &table(Direction::Forward));
        assert_eq!(apply_rewrites(&document, &rewrites), 3);

        let input = find_nodes(document.root(), &["input"]).remove(0);
        assert_eq!(get_node_attr(&input, "placeholder").as_deref(), Some("Votre nom"));
        assert_eq!(get_node_attr(&input, "title").as_deref(), Some("Bonjour"));
        assert_eq!(get_node_attr(&input, "alt").as_deref(), Some("Hello"));

        let div = find_nodes(document.root(), &["div"]).remove(0);
        assert_eq!(get_node_attr(&div, "title").as_deref(), Some("Hello"));

        let html = document.to_html().unwrap();
        assert!(html.contains("<p>Bienvenue Alice!</p>"));
        assert!(html.contains("Goodbye"));
    }

    #[test]
    fn test_indentation_is_preserved() {
        let document = Document::parse("<body><pre>\n    Hello\n</pre></body>").unwrap();
        let rewrites = collect_rewrites(&document.body(), &table(Direction::Forward));
        assert_eq!(rewrites.len(), 1);
        assert_eq!(rewrites[0].replacement, "    Bonjour");
    }

    #[test]
    fn test_title_rewrite() {
        let document =
            Document::parse("<html><head><title>Hello</title></head><body></body></html>").unwrap();
        let rewrite = collect_title_rewrite(&document, &table(Direction::Forward)).unwrap();
        apply_rewrites(&document, &[rewrite]);
        assert_eq!(document.title_text().as_deref(), Some("Bonjour"));
    }

    #[test]
    fn test_reverse_restores() {
        let document = Document::parse("<body><p>Welcome Bob!</p><button>Hello</button></body>").unwrap();
        let before = document.to_html().unwrap();

        let forward = collect_rewrites(&document.body(), &table(Direction::Forward));
        apply_rewrites(&document, &forward);
        assert_ne!(document.to_html().unwrap(), before);

        let reverse = collect_rewrites(&document.body(), &table(Direction::Reverse));
        apply_rewrites(&document, &reverse);
        assert_eq!(document.to_html().unwrap(), before);
    }

    #[test]
    fn test_whitespace_only_text_is_skipped() {
        let document = Document::parse("<body><p>   </p></body>").unwrap();
        assert!(collect_rewrites(&document.body(), &table(Direction::Forward)).is_empty());
    }
}
