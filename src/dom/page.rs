//! 页面文档
//!
//! [`Page`] 持有 `RcDom`，所有结构和文本修改都经由它完成，每次修改都会生成
//! [`MutationRecord`] 并投递给根节点覆盖该修改位置的订阅者（类似浏览器的 MutationObserver）。
//! 单线程使用：节点是 `Rc`，订阅者列表放在 `RefCell` 里。

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use html5ever::interface::QualName;
use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{create_element, NodeOrText, TreeSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};
use tokio::sync::mpsc;

use crate::error::{ReaderError, ReaderResult};

use super::mutation::MutationRecord;
use super::{
    get_child_node_by_name, get_parent_node, html_to_dom, is_inclusive_ancestor,
    serialize_document,
};

/// 订阅者标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Subscriber {
    id: ObserverId,
    root: Weak<Node>,
    sender: mpsc::UnboundedSender<MutationRecord>,
}

/// 可变更、可观察的 HTML 页面
pub struct Page {
    dom: RcDom,
    subscribers: RefCell<Vec<Subscriber>>,
    next_id: Cell<u64>,
}

impl Page {
    pub fn new(dom: RcDom) -> Self {
        Self {
            dom,
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    pub fn parse(html: &str) -> ReaderResult<Self> {
        Self::from_bytes(html.as_bytes(), "utf-8")
    }

    pub fn from_bytes(data: &[u8], document_encoding: &str) -> ReaderResult<Self> {
        Ok(Self::new(html_to_dom(data, document_encoding)?))
    }

    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    /// 可见内容的根：`<body>`，没有时退回文档节点
    pub fn body(&self) -> Handle {
        get_child_node_by_name(&self.dom.document, "html")
            .and_then(|html| get_child_node_by_name(&html, "body"))
            .unwrap_or_else(|| self.dom.document.clone())
    }

    pub fn create_element(&self, tag: &str) -> Handle {
        create_element(
            &self.dom,
            QualName::new(None, ns!(html), LocalName::from(tag)),
            vec![],
        )
    }

    pub fn create_text(&self, text: &str) -> Handle {
        Node::new(NodeData::Text {
            contents: RefCell::new(StrTendril::from_slice(text)),
        })
    }

    /// 追加子节点；已挂在别处的节点会先被移除
    pub fn append_child(&self, parent: &Handle, child: &Handle) {
        if get_parent_node(child).is_some() {
            self.remove(child);
        }
        self.dom.append(parent, NodeOrText::AppendNode(child.clone()));
        self.notify(MutationRecord::ChildList {
            target: parent.clone(),
            added: vec![child.clone()],
            removed: vec![],
        });
    }

    /// 把节点从父节点上摘下
    pub fn remove(&self, node: &Handle) {
        let Some(parent) = get_parent_node(node) else {
            return;
        };
        self.dom.remove_from_parent(node);
        self.notify(MutationRecord::ChildList {
            target: parent,
            added: vec![],
            removed: vec![node.clone()],
        });
    }

    /// 用新的子节点整体替换元素内容，只产生一条记录
    pub fn replace_children(&self, element: &Handle, children: Vec<Handle>) {
        let removed: Vec<Handle> = std::mem::take(&mut *element.children.borrow_mut());
        for old in &removed {
            old.parent.set(None);
        }

        for child in &children {
            if get_parent_node(child).is_some() {
                self.dom.remove_from_parent(child);
            }
            self.dom.append(element, NodeOrText::AppendNode(child.clone()));
        }

        self.notify(MutationRecord::ChildList {
            target: element.clone(),
            added: children,
            removed,
        });
    }

    /// 把元素内容替换为单个文本节点
    pub fn set_text_content(&self, element: &Handle, text: &str) {
        let children = if text.is_empty() {
            vec![]
        } else {
            vec![self.create_text(text)]
        };
        self.replace_children(element, children);
    }

    /// 修改文本节点内容
    pub fn set_text(&self, text_node: &Handle, text: &str) -> ReaderResult<()> {
        match &text_node.data {
            NodeData::Text { contents } => {
                *contents.borrow_mut() = StrTendril::from_slice(text);
            }
            _ => return Err(ReaderError::Dom("set_text 的目标不是文本节点".to_string())),
        }
        self.notify(MutationRecord::CharacterData {
            target: text_node.clone(),
        });
        Ok(())
    }

    /// 订阅 `root` 子树内的变更
    pub fn subscribe(
        &self,
        root: &Handle,
    ) -> (ObserverId, mpsc::UnboundedReceiver<MutationRecord>) {
        let id = ObserverId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            root: Rc::downgrade(root),
            sender,
        });
        (id, receiver)
    }

    /// 取消订阅，接收端随后会被关闭
    pub fn unsubscribe(&self, id: ObserverId) {
        self.subscribers.borrow_mut().retain(|s| s.id != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    fn notify(&self, record: MutationRecord) {
        let subscribers = self.subscribers.borrow();
        for subscriber in subscribers.iter() {
            let Some(root) = subscriber.root.upgrade() else {
                continue;
            };
            if is_inclusive_ancestor(&root, record.target()) {
                // 接收端已经丢弃时忽略
                let _ = subscriber.sender.send(record.clone());
            }
        }
    }

    /// 序列化整个文档
    pub fn serialize(&self, document_encoding: &str) -> ReaderResult<Vec<u8>> {
        serialize_document(&self.dom.document, document_encoding)
    }
}
