//! 已处理元素集合
//!
//! 以节点地址为键保存 `Weak<Node>`，不延长节点寿命。节点被释放后条目成为死引用，
//! 地址也可能被新节点复用，因此查询时同时校验弱引用仍指向同一个节点。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node};

fn key(node: &Handle) -> usize {
    Rc::as_ptr(node) as usize
}

/// 已处理元素的弱引用集合
#[derive(Debug, Default)]
pub struct ProcessedSet {
    entries: RefCell<HashMap<usize, Weak<Node>>>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, node: &Handle) {
        self.entries
            .borrow_mut()
            .insert(key(node), Rc::downgrade(node));
    }

    pub fn is_marked(&self, node: &Handle) -> bool {
        self.entries
            .borrow()
            .get(&key(node))
            .and_then(Weak::upgrade)
            .is_some_and(|marked| Rc::ptr_eq(&marked, node))
    }

    pub fn unmark(&self, node: &Handle) {
        self.entries.borrow_mut().remove(&key(node));
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// 移除 `root` 及其所有后代，返回移除的条目数
    pub fn evict(&self, root: &Handle) -> usize {
        let mut entries = self.entries.borrow_mut();
        if entries.is_empty() {
            return 0;
        }

        let before = entries.len();
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            entries.remove(&key(&node));
            stack.extend(node.children.borrow().iter().cloned());
        }
        before - entries.len()
    }

    /// 丢弃已释放节点的条目
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|_, weak| weak.strong_count() > 0);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
