//! 翻译解析器
//!
//! 给定文本与字典，返回译文或"无匹配"。解析顺序：
//!
//! 1. 修剪后全文精确查找；
//! 2. 按声明顺序扫描模板模式，取第一个预过滤与锚定正则都通过的；
//! 3. 都不匹配则返回 `None`，调用方保持原文不变。
//!
//! 反向解析把字典反转（译文作为键）。同一译文对应多个术语时，
//! 保留哪一个取决于反转时的遍历顺序，不作保证。

use std::sync::Arc;

use crate::network::store::Dictionary;
use crate::translation::config::constants::PLACEHOLDER;
use crate::translation::error::TranslationResult;
use crate::translation::pattern::{fill_placeholders, PatternSet};

/// 解析方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// 默认语言 → 目标语言
    Forward,
    /// 目标语言 → 默认语言
    Reverse,
}

/// 单次扫描使用的查找表：精确查找映射 + 对应方向的模板模式
#[derive(Debug, Clone)]
pub struct ResolutionTable {
    lookup: Arc<Dictionary>,
    patterns: Arc<PatternSet>,
}

impl ResolutionTable {
    /// 解析一段文本；`text` 会先被修剪
    pub fn resolve(&self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(translated) = self.lookup.get(text) {
            return Some(translated.clone());
        }

        let (pattern, captures) = self
            .patterns
            .find(text, |pattern| self.lookup.contains_key(pattern.source()))?;
        let template = self.lookup.get(pattern.source())?;

        if pattern.placeholder_count() != template.matches(PLACEHOLDER).count() {
            tracing::debug!(
                "模板占位符数量不一致: {:?} ({}) → {:?}",
                pattern.source(),
                pattern.placeholder_count(),
                template
            );
        }

        Some(fill_placeholders(template, &captures))
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

/// 解析器：持有清单术语与其编译后的正向模式
#[derive(Debug, Clone)]
pub struct Resolver {
    terms: Arc<[String]>,
    forward: Arc<PatternSet>,
}

impl Resolver {
    /// 编译清单术语中的模板术语
    pub fn new(terms: &[String]) -> TranslationResult<Self> {
        let forward = PatternSet::compile(terms.iter().map(String::as_str))?;
        tracing::debug!("已编译 {} 个模板术语（共 {} 个术语）", forward.len(), terms.len());

        Ok(Self {
            terms: terms.into(),
            forward: Arc::new(forward),
        })
    }

    /// 为某个方向构建查找表
    pub fn table(
        &self,
        dictionary: &Arc<Dictionary>,
        direction: Direction,
    ) -> TranslationResult<ResolutionTable> {
        match direction {
            Direction::Forward => Ok(ResolutionTable {
                lookup: Arc::clone(dictionary),
                patterns: Arc::clone(&self.forward),
            }),
            Direction::Reverse => {
                let inverted: Dictionary = dictionary
                    .iter()
                    .map(|(term, translated)| (translated.clone(), term.clone()))
                    .collect();
                let patterns = self.reverse_patterns(dictionary, &inverted)?;

                Ok(ResolutionTable {
                    lookup: Arc::new(inverted),
                    patterns: Arc::new(patterns),
                })
            }
        }
    }

    /// 一次性解析
    pub fn resolve(
        &self,
        text: &str,
        dictionary: &Arc<Dictionary>,
        direction: Direction,
    ) -> TranslationResult<Option<String>> {
        Ok(self.table(dictionary, direction)?.resolve(text))
    }

    /// 反向模式来自字典中的译文模板：先按清单术语顺序，再按字典序补上清单之外的
    fn reverse_patterns(
        &self,
        dictionary: &Dictionary,
        inverted: &Dictionary,
    ) -> TranslationResult<PatternSet> {
        let mut ordered: Vec<&str> = Vec::new();

        for term in self.terms.iter() {
            if let Some(translated) = dictionary.get(term) {
                if translated.contains(PLACEHOLDER) && !ordered.contains(&translated.as_str()) {
                    ordered.push(translated);
                }
            }
        }

        let mut rest: Vec<&str> = inverted
            .keys()
            .map(String::as_str)
            .filter(|key| key.contains(PLACEHOLDER) && !ordered.contains(key))
            .collect();
        rest.sort_unstable();
        ordered.extend(rest);

        PatternSet::compile(ordered)
    }
}
