//! DOM 变更记录

use markup5ever_rcdom::Handle;

use super::{get_parent_node, is_element};

/// 一次 DOM 变更
#[derive(Debug, Clone)]
pub enum MutationRecord {
    /// 子节点增删
    ChildList {
        target: Handle,
        added: Vec<Handle>,
        removed: Vec<Handle>,
    },
    /// 文本节点内容变化
    CharacterData { target: Handle },
}

impl MutationRecord {
    pub fn target(&self) -> &Handle {
        match self {
            MutationRecord::ChildList { target, .. } | MutationRecord::CharacterData { target } => {
                target
            }
        }
    }

    /// 需要重新处理的子树根：新增的元素、新增文本的父元素、变化文本的父元素
    pub fn affected_roots(&self) -> Vec<Handle> {
        match self {
            MutationRecord::ChildList { target, added, .. } => {
                let mut roots: Vec<Handle> = added.iter().filter(|n| is_element(n)).cloned().collect();
                if added.iter().any(|n| !is_element(n)) {
                    roots.push(target.clone());
                }
                roots
            }
            MutationRecord::CharacterData { target } => {
                get_parent_node(target).into_iter().collect()
            }
        }
    }

    pub fn removed(&self) -> &[Handle] {
        match self {
            MutationRecord::ChildList { removed, .. } => removed,
            MutationRecord::CharacterData { .. } => &[],
        }
    }
}
