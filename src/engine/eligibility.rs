//! 元素资格判断
//!
//! 只有内容是纯文本的元素才会被改写：子节点都是文本节点，或者是只含文本的强调标记元素
//! （即已经处理过的元素）。排除标签对整个子树生效，强调标记标签总是被排除，
//! 因此改写产生的标记元素不会被再次处理。

use std::collections::HashSet;

use markup5ever_rcdom::{Handle, NodeData};

use crate::config::ReaderConfig;
use crate::dom::{get_node_name, get_parent_node, is_text};

use super::tracker::ProcessedSet;

/// 资格过滤器
#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    excluded_tags: HashSet<String>,
    marker_tag: String,
    max_recursion_depth: usize,
}

impl EligibilityFilter {
    pub fn new(config: &ReaderConfig) -> Self {
        let mut excluded_tags: HashSet<String> = config
            .dom
            .excluded_tags
            .iter()
            .map(|tag| tag.to_lowercase())
            .collect();
        let marker_tag = config.dom.marker_tag.to_lowercase();
        excluded_tags.insert(marker_tag.clone());

        Self {
            excluded_tags,
            marker_tag,
            max_recursion_depth: config.processing.max_recursion_depth,
        }
    }

    pub fn marker_tag(&self) -> &str {
        &self.marker_tag
    }

    pub fn is_excluded_tag(&self, tag: &str) -> bool {
        self.excluded_tags.contains(&tag.to_lowercase())
    }

    pub fn is_marker(&self, node: &Handle) -> bool {
        get_node_name(node).is_some_and(|name| name.eq_ignore_ascii_case(&self.marker_tag))
    }

    /// 文本节点解析为其父元素，其他节点原样返回
    pub fn resolve(&self, node: &Handle) -> Option<Handle> {
        if is_text(node) {
            get_parent_node(node)
        } else {
            Some(node.clone())
        }
    }

    /// 强调标记本身不会被处理，标记（及其中的文本）向上归属到拥有它的元素
    pub fn owner(&self, node: &Handle) -> Handle {
        let mut current = node.clone();
        loop {
            let Some(parent) = get_parent_node(&current) else {
                return current;
            };
            if is_text(&current) || self.is_marker(&current) {
                current = parent;
            } else {
                return current;
            }
        }
    }

    /// 判断节点是否应被改写
    pub fn is_eligible(&self, node: &Handle, tracker: &ProcessedSet) -> bool {
        let Some(element) = self.resolve(node) else {
            return false;
        };
        let Some(tag) = get_node_name(&element) else {
            return false;
        };

        !self.is_excluded_tag(tag)
            && self.has_plain_content(&element)
            && self.has_text(&element)
            && !self.has_excluded_ancestor(&element)
            && !tracker.is_marked(&element)
    }

    /// 子节点只有文本和只含文本的强调标记
    pub fn has_plain_content(&self, element: &Handle) -> bool {
        let children = element.children.borrow();
        !children.is_empty()
            && children.iter().all(|child| {
                is_text(child)
                    || (self.is_marker(child) && child.children.borrow().iter().all(is_text))
            })
    }

    fn has_text(&self, element: &Handle) -> bool {
        fn any_visible(node: &Handle) -> bool {
            match &node.data {
                NodeData::Text { contents } => !contents.borrow().trim().is_empty(),
                _ => node.children.borrow().iter().any(any_visible),
            }
        }
        any_visible(element)
    }

    /// 向上扫描祖先，深度受 `max_recursion_depth` 限制，到文档节点为止
    pub fn has_excluded_ancestor(&self, element: &Handle) -> bool {
        let mut current = get_parent_node(element);
        let mut depth = 0;

        while let Some(ancestor) = current {
            if depth >= self.max_recursion_depth {
                tracing::debug!("祖先扫描达到最大深度 {}", self.max_recursion_depth);
                break;
            }
            match &ancestor.data {
                NodeData::Document => break,
                NodeData::Element { name, .. } => {
                    if self.is_excluded_tag(name.local.as_ref()) {
                        return true;
                    }
                }
                _ => {}
            }
            current = get_parent_node(&ancestor);
            depth += 1;
        }

        false
    }
}
