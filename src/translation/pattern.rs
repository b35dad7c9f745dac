//! 占位符术语编译器
//!
//! 将包含 `[...]` 占位符的模板术语编译为锚定的正则表达式，
//! 每个占位符对应一个捕获组。不含占位符的字面术语不会生成模式，
//! 它们只通过字典的精确查找匹配。

use regex::Regex;

use crate::translation::config::constants::PLACEHOLDER;
use crate::translation::error::TranslationResult;

/// 编译后的模板术语
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// 原始模板术语（也是字典中的键）
    source: String,
    /// 以占位符切分得到的字面片段
    literal_parts: Vec<String>,
    /// 占位符替换为空格后按空格切分的预过滤片段
    fragments: Vec<String>,
    /// `^part(.+)part...$`
    matcher: Regex,
}

impl CompiledPattern {
    /// 编译单个术语；不含占位符时返回 `None`
    pub fn compile(term: &str) -> TranslationResult<Option<Self>> {
        if !term.contains(PLACEHOLDER) {
            return Ok(None);
        }

        let literal_parts: Vec<String> = term.split(PLACEHOLDER).map(str::to_string).collect();

        if literal_parts
            .iter()
            .skip(1)
            .take(literal_parts.len().saturating_sub(2))
            .any(String::is_empty)
        {
            tracing::warn!("模板术语包含相邻占位符，捕获边界不确定: {:?}", term);
        }

        let escaped: Vec<String> = literal_parts.iter().map(|part| regex::escape(part)).collect();
        let matcher = Regex::new(&format!("^{}$", escaped.join("(.+)")))?;

        let fragments = term
            .replace(PLACEHOLDER, " ")
            .split(' ')
            .filter(|fragment| !fragment.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Some(Self {
            source: term.to_string(),
            literal_parts,
            fragments,
            matcher,
        }))
    }

    /// 原始模板术语
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 字面片段
    pub fn literal_parts(&self) -> &[String] {
        &self.literal_parts
    }

    /// 占位符数量
    pub fn placeholder_count(&self) -> usize {
        self.literal_parts.len() - 1
    }

    /// 廉价预过滤：每个字面片段都必须作为子串出现在候选文本中
    pub fn prefilter(&self, text: &str) -> bool {
        self.fragments.iter().all(|fragment| text.contains(fragment.as_str()))
    }

    /// 预过滤与锚定正则同时通过时返回按从左到右顺序排列的捕获
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        if !self.prefilter(text) {
            return None;
        }

        let captures = self.matcher.captures(text)?;
        Some(
            captures
                .iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }
}

/// 按声明顺序排列的已编译模式集合
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

impl PatternSet {
    /// 编译术语序列中所有模板术语，保持原有顺序
    pub fn compile<'a, I>(terms: I) -> TranslationResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut patterns = Vec::new();

        for term in terms {
            if let Some(pattern) = CompiledPattern::compile(term)? {
                patterns.push(pattern);
            }
        }

        Ok(Self { patterns })
    }

    /// 查找第一个匹配的模式。`accept` 用于排除字典中没有译文的模式
    pub fn find<F>(&self, text: &str, accept: F) -> Option<(&CompiledPattern, Vec<String>)>
    where
        F: Fn(&CompiledPattern) -> bool,
    {
        self.patterns
            .iter()
            .filter(|pattern| accept(pattern))
            .find_map(|pattern| pattern.captures(text).map(|captures| (pattern, captures)))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// 用捕获从左到右依次填充模板中的占位符。
///
/// 捕获多于占位符时多余的捕获被丢弃；占位符多于捕获时，
/// 剩余占位符原样保留为 `[...]`。
pub fn fill_placeholders(template: &str, captures: &[String]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut captures = captures.iter();
    let mut pieces = template.split(PLACEHOLDER).peekable();

    while let Some(piece) = pieces.next() {
        output.push_str(piece);

        if pieces.peek().is_some() {
            match captures.next() {
                Some(capture) => output.push_str(capture),
                None => output.push_str(PLACEHOLDER),
            }
        }
    }

    if captures.next().is_some() {
        tracing::debug!("译文模板占位符少于捕获数量，多余捕获被丢弃: {:?}", template);
    }

    output
}
