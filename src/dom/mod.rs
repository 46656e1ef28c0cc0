//! DOM 模块
//!
//! - `page`: 持有文档并记录变更的 [`Page`]
//! - `mutation`: 变更记录
//! - `serializer`: 序列化
//!
//! 这里的自由函数是对 `markup5ever_rcdom` 节点的基础操作。

pub mod mutation;
pub mod page;
pub mod serializer;

use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::error::ReaderResult;

pub use mutation::MutationRecord;
pub use page::{ObserverId, Page};
pub use serializer::serialize_document;

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> ReaderResult<RcDom> {
    let s: String = if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
        let (string, _, _) = encoding.decode(data);
        string.to_string()
    } else {
        String::from_utf8_lossy(data).to_string()
    };

    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())?;
    Ok(dom)
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let mut found_nodes = Vec::new();
    let Some((node_name, rest)) = node_names.split_first() else {
        return found_nodes;
    };

    match get_node_name(node) {
        Some(name) if name == *node_name => {
            if rest.is_empty() {
                found_nodes.push(node.clone());
            } else {
                for child_node in node.children.borrow().iter() {
                    found_nodes.append(&mut find_nodes(child_node, rest));
                }
            }
        }
        _ => {
            for child_node in node.children.borrow().iter() {
                found_nodes.append(&mut find_nodes(child_node, node_names));
            }
        }
    }

    found_nodes
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    children
        .iter()
        .find(|child| get_node_name(child) == Some(node_name))
        .cloned()
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点；`parent` 是 `Cell`，取出后必须放回
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

pub fn is_text(node: &Handle) -> bool {
    matches!(node.data, NodeData::Text { .. })
}

/// 节点及其后代的全部文本，相当于 `textContent`
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } | NodeData::Document => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
        _ => {}
    }
}

/// `ancestor` 是否为 `node` 本身或其祖先
pub fn is_inclusive_ancestor(ancestor: &Handle, node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if Rc::ptr_eq(&candidate, ancestor) {
            return true;
        }
        current = get_parent_node(&candidate);
    }
    false
}

/// 节点是否仍挂在 `document` 之下
pub fn is_connected(node: &Handle, document: &Handle) -> bool {
    is_inclusive_ancestor(document, node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_dom_and_find_nodes() {
        let dom = html_to_dom(b"<html><body><p>one</p><div><p>two</p></div></body></html>", "")
            .unwrap();
        let paragraphs = find_nodes(&dom.document, &["html", "body", "p"]);
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(text_content(&paragraphs[1]), "two");
    }

    #[test]
    fn test_html_to_dom_decodes_charset() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode("<p>тест</p>");
        let dom = html_to_dom(&bytes, "windows-1251").unwrap();
        assert_eq!(text_content(&dom.document), "тест");
    }

    #[test]
    fn test_get_parent_node_keeps_link() {
        let dom = html_to_dom(b"<p>text</p>", "utf-8").unwrap();
        let p = find_nodes(&dom.document, &["p"]).remove(0);
        let text = p.children.borrow()[0].clone();

        let parent = get_parent_node(&text).unwrap();
        assert!(Rc::ptr_eq(&parent, &p));
        // 第二次读取仍然可用
        assert!(get_parent_node(&text).is_some());
        assert!(is_connected(&text, &dom.document));
    }

    #[test]
    fn test_get_child_node_by_name() {
        let dom = html_to_dom(b"<html><head></head><body></body></html>", "").unwrap();
        let html = get_child_node_by_name(&dom.document, "html").unwrap();
        assert!(get_child_node_by_name(&html, "body").is_some());
        assert!(get_child_node_by_name(&html, "main").is_none());
    }
}
