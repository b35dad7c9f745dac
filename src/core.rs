use std::error::Error;
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::rc::Rc;

use encoding_rs::Encoding;
use markup5ever_rcdom::RcDom;

use crate::parsers::html::{get_charset, html_to_dom};
use crate::translation::{
    Collaborators, Document, RuntimeConfig, RuntimeOptions, RuntimeStats, Translify,
};

/// Represents errors that can occur while translating a document from the CLI
#[derive(Debug)]
pub struct TranslifyError {
    details: String,
}

impl TranslifyError {
    pub fn new(msg: &str) -> TranslifyError {
        TranslifyError {
            details: msg.to_string(),
        }
    }
}

impl fmt::Display for TranslifyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl Error for TranslifyError {}

impl From<io::Error> for TranslifyError {
    fn from(error: io::Error) -> Self {
        TranslifyError::new(&error.to_string())
    }
}

/// Options for translating a whole document in one shot
#[derive(Debug, Clone, Default)]
pub struct TranslifyOptions {
    pub config: RuntimeConfig,
    /// 目标语言；为空时按环境语言
    pub language: Option<String>,
    pub input_encoding: Option<String>,
}

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";

/// 解析文档；文档内声明了有效字符集时按该字符集重新解析
pub fn parse_with_encoding(
    input_data: &[u8],
    input_encoding: Option<String>,
) -> Result<(RcDom, String), TranslifyError> {
    let mut document_encoding = input_encoding.unwrap_or_else(|| "utf-8".to_string());
    let mut dom = html_to_dom(input_data, &document_encoding)?;

    if let Some(html_charset) = get_charset(&dom.document) {
        if let Some(charset) = Encoding::for_label_no_replacement(html_charset.as_bytes()) {
            if !charset.name().eq_ignore_ascii_case(&document_encoding) {
                document_encoding = charset.name().to_string();
                dom = html_to_dom(input_data, &document_encoding)?;
            }
        }
    }

    Ok((dom, document_encoding))
}

/// 翻译整份文档：启动运行时、按需切换语言、写出快照，返回序列化结果与统计
pub async fn translate_document(
    input_data: &[u8],
    options: &TranslifyOptions,
) -> Result<(Vec<u8>, RuntimeStats), TranslifyError> {
    options.config.validate()?;

    let (dom, document_encoding) = parse_with_encoding(input_data, options.input_encoding.clone())?;
    let document = Rc::new(Document::new(dom));

    let mut runtime_options = RuntimeOptions::from(&options.config);
    if let Some(language) = &options.language {
        runtime_options.locale = Some(language.clone());
    }

    let collaborators = Collaborators::from_config(&options.config)?;
    let runtime = Translify::start(runtime_options, collaborators, Rc::clone(&document)).await?;

    if let Some(language) = &options.language {
        runtime.set_language(language).await?;
    }

    if let Err(e) = runtime.flush().await {
        tracing::warn!("写入字典快照失败: {}", e);
    }

    let output = document.serialize(&document_encoding)?;
    Ok((output, runtime.stats()))
}

/// 读取输入：`-` 表示标准输入
pub fn read_input(path: &str) -> Result<Vec<u8>, TranslifyError> {
    if path == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(path).map_err(|e| TranslifyError::new(&format!("{path}: {e}")))
    }
}

/// 写出结果：未指定或 `-` 时写到标准输出
pub fn write_output(path: Option<&str>, data: &[u8]) -> Result<(), TranslifyError> {
    match path {
        None | Some("-") => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
        }
        Some(path) => fs::write(path, data)
            .map_err(|e| TranslifyError::new(&format!("{path}: {e}")))?,
    }
    Ok(())
}

/// Prints an error message to stderr
pub fn print_error_message(msg: &str) {
    eprintln!("{ANSI_COLOR_RED}{msg}{ANSI_COLOR_RESET}");
}
