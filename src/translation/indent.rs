//! 缩进编解码
//!
//! 译文不携带原文周围的空白。翻译前从原文首个非空行提取首尾空白，
//! 翻译后再把它重新套到译文的每个非空行上，空行保持不变。

/// 首个非空行的首尾空白
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Indent {
    pub leading: String,
    pub trailing: String,
}

/// 提取首个非空行的首尾空白；全部为空行时返回空对
pub fn extract(text: &str) -> Indent {
    match text.split('\n').find(|line| !line.trim().is_empty()) {
        Some(line) => {
            let leading_len = line.len() - line.trim_start().len();
            let trailing_start = line.trim_end().len();
            Indent {
                leading: line[..leading_len].to_string(),
                trailing: line[trailing_start..].to_string(),
            }
        }
        None => Indent::default(),
    }
}

/// 把首尾空白套到每个非空行上
pub fn apply(text: &str, indent: &Indent) -> String {
    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{}{}{}", indent.leading, line, indent.trailing)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
