use std::io;

use encoding_rs::Encoding;
use html5ever::serialize::{serialize, SerializeOpts};
use markup5ever_rcdom::{Handle, SerializableHandle};

/// 序列化文档，按 `document_encoding` 重新编码（空或未知编码时输出 UTF-8）
pub fn serialize_document(document: &Handle, document_encoding: &str) -> io::Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();

    let serializable: SerializableHandle = document.clone().into();
    serialize(&mut buf, &serializable, SerializeOpts::default())?;

    if !document_encoding.is_empty() {
        if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
            if encoding != encoding_rs::UTF_8 {
                let s = String::from_utf8_lossy(&buf);
                let (data, _, _) = encoding.encode(&s);
                buf = data.into_owned();
            }
        }
    }

    Ok(buf)
}
