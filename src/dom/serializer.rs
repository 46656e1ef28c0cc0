use encoding_rs::Encoding;
use html5ever::serialize::{serialize, SerializeOpts};
use markup5ever_rcdom::{Handle, SerializableHandle};

use crate::error::ReaderResult;

/// 序列化文档，按 `document_encoding` 重新编码（为空或未知时输出 UTF-8）
pub fn serialize_document(document: &Handle, document_encoding: &str) -> ReaderResult<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();

    let serializable: SerializableHandle = document.clone().into();
    serialize(&mut buf, &serializable, SerializeOpts::default())?;

    if !document_encoding.is_empty() {
        if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
            if encoding != encoding_rs::UTF_8 {
                let s: &str = &String::from_utf8_lossy(&buf);
                let (data, _, _) = encoding.encode(s);
                buf = data.to_vec();
            }
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::html_to_dom;

    #[test]
    fn test_serialize_round_trip() {
        let dom = html_to_dom(b"<html><head></head><body><p>hi</p></body></html>", "").unwrap();
        let out = serialize_document(&dom.document, "").unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<html><head></head><body><p>hi</p></body></html>"
        );
    }

    #[test]
    fn test_serialize_reencodes() {
        let dom = html_to_dom("<p>тест</p>".as_bytes(), "utf-8").unwrap();
        let out = serialize_document(&dom.document, "windows-1251").unwrap();
        let (decoded, _, _) = encoding_rs::WINDOWS_1251.decode(&out);
        assert!(decoded.contains("<p>тест</p>"));
    }
}
