//! 遍历控制器
//!
//! 先序深度优先遍历子树：排除标签的子树整体跳过，符合条件的元素被收集（不再向下），
//! 每次最多收集 `batch_size` 个。收集后逐个改写并标记为已处理，
//! 因此同一棵子树重复运行时不会重复改写。

use std::rc::Rc;
use std::time::{Duration, Instant};

use markup5ever_rcdom::Handle;

use crate::config::ReaderConfig;
use crate::dom::{
    get_node_name, is_connected, is_element, is_inclusive_ancestor, is_text, text_content, Page,
};
use crate::text::{Segment, WordTransformer};

use super::eligibility::EligibilityFilter;
use super::tracker::ProcessedSet;

/// 一次遍历的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// 处理（并标记）的元素数
    pub processed: usize,
    /// 其中内容实际被改写的元素数
    pub rewritten: usize,
    /// 处理前已从文档中移除而被跳过的元素数
    pub skipped: usize,
    pub elapsed: Duration,
    /// 子树中还有未处理的元素
    pub has_more: bool,
}

impl PassReport {
    /// 合并多个批次的结果
    pub fn merge(&mut self, other: PassReport) {
        self.processed += other.processed;
        self.rewritten += other.rewritten;
        self.skipped += other.skipped;
        self.elapsed += other.elapsed;
        self.has_more = other.has_more;
    }
}

/// 遍历控制器
pub struct TraversalController {
    page: Rc<Page>,
    filter: EligibilityFilter,
    transformer: WordTransformer,
    tracker: Rc<ProcessedSet>,
    batch_size: usize,
}

impl TraversalController {
    pub fn new(page: Rc<Page>, config: &ReaderConfig, tracker: Rc<ProcessedSet>) -> Self {
        Self {
            page,
            filter: EligibilityFilter::new(config),
            transformer: WordTransformer::new(config),
            tracker,
            batch_size: config.processing.batch_size.max(1),
        }
    }

    /// 按新配置（例如语言加粗长度覆盖）重建变换器
    pub fn reconfigure(&mut self, config: &ReaderConfig) {
        self.filter = EligibilityFilter::new(config);
        self.transformer = WordTransformer::new(config);
        self.batch_size = config.processing.batch_size.max(1);
    }

    pub fn transformer(&self) -> &WordTransformer {
        &self.transformer
    }

    pub fn filter(&self) -> &EligibilityFilter {
        &self.filter
    }

    pub fn tracker(&self) -> &Rc<ProcessedSet> {
        &self.tracker
    }

    /// 处理 `root` 子树中的一批元素
    pub fn run(&self, root: &Handle) -> PassReport {
        let start = Instant::now();
        let (candidates, has_more) = self.collect(root);
        let mut report = PassReport {
            has_more,
            ..Default::default()
        };

        self.process_elements(&candidates, &mut report);

        report.elapsed = start.elapsed();
        tracing::debug!(
            "遍历完成: 处理 {} 个，改写 {} 个，跳过 {} 个，耗时 {:?}",
            report.processed,
            report.rewritten,
            report.skipped,
            report.elapsed
        );
        report
    }

    /// 收集最多 `batch_size` 个符合条件的元素，第二个返回值表示是否还有剩余
    pub fn collect(&self, root: &Handle) -> (Vec<Handle>, bool) {
        let mut candidates = Vec::new();
        let Some(root) = self.filter.resolve(root) else {
            return (candidates, false);
        };

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if is_text(&node) {
                continue;
            }
            if get_node_name(&node).is_some_and(|tag| self.filter.is_excluded_tag(tag)) {
                continue;
            }

            if is_element(&node) && self.filter.is_eligible(&node, &self.tracker) {
                if candidates.len() == self.batch_size {
                    return (candidates, true);
                }
                candidates.push(node);
                continue;
            }

            // 逆序入栈以保持先序
            stack.extend(node.children.borrow().iter().rev().cloned());
        }

        (candidates, false)
    }

    /// 改写并标记给定的元素
    pub fn process_elements(&self, elements: &[Handle], report: &mut PassReport) {
        for element in elements {
            if !is_connected(element, self.page.document()) {
                tracing::debug!("元素已从文档中移除，跳过");
                report.skipped += 1;
                continue;
            }

            if self.process_element(element) {
                report.rewritten += 1;
            }
            report.processed += 1;
        }
    }

    /// 改写单个元素，返回内容是否发生变化
    fn process_element(&self, element: &Handle) -> bool {
        let text = text_content(element);
        let segments = self.transformer.segments(&text);

        let changed = segments != self.current_segments(element);
        if changed {
            let children = segments
                .iter()
                .map(|segment| self.build_node(segment))
                .collect();
            self.page.replace_children(element, children);
        }

        self.tracker.mark(element);
        changed
    }

    fn build_node(&self, segment: &Segment) -> Handle {
        match segment {
            Segment::Plain(text) => self.page.create_text(text),
            Segment::Emphasis(text) => {
                let marker = self.page.create_element(self.transformer.marker_tag());
                self.page.append_child(&marker, &self.page.create_text(text));
                marker
            }
        }
    }

    /// 元素当前内容对应的片段
    fn current_segments(&self, element: &Handle) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::new();
        for child in element.children.borrow().iter() {
            if self.filter.is_marker(child) {
                segments.push(Segment::Emphasis(text_content(child)));
            } else {
                let text = text_content(child);
                if text.is_empty() {
                    continue;
                }
                match segments.last_mut() {
                    Some(Segment::Plain(last)) => last.push_str(&text),
                    _ => segments.push(Segment::Plain(text)),
                }
            }
        }
        segments
    }

    /// 去除 `root` 下所有强调标记并合并相邻文本，清空已处理集合；返回移除的标记数
    pub fn strip(&self, root: &Handle) -> usize {
        let mut parents = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            let children = node.children.borrow();
            if children.iter().any(|child| self.filter.is_marker(child)) {
                parents.push(node.clone());
            }
            stack.extend(children.iter().rev().cloned());
        }

        let mut removed = 0;
        for parent in parents {
            // 外层标记展开时内层节点可能已被移走
            if !is_inclusive_ancestor(root, &parent) {
                continue;
            }
            let old_children: Vec<Handle> = parent.children.borrow().clone();
            let mut rebuilt = Vec::new();
            let mut run = String::new();
            for child in &old_children {
                removed += self.flatten(child, &mut run, &mut rebuilt);
            }
            self.flush_text(&mut run, &mut rebuilt);
            self.page.replace_children(&parent, rebuilt);
        }

        self.tracker.clear();
        tracing::debug!("移除了 {} 个强调标记", removed);
        removed
    }

    fn flatten(&self, node: &Handle, run: &mut String, rebuilt: &mut Vec<Handle>) -> usize {
        if is_text(node) {
            run.push_str(&text_content(node));
            return 0;
        }
        if self.filter.is_marker(node) {
            let children: Vec<Handle> = node.children.borrow().clone();
            return 1 + children
                .iter()
                .map(|child| self.flatten(child, run, rebuilt))
                .sum::<usize>();
        }
        self.flush_text(run, rebuilt);
        rebuilt.push(node.clone());
        0
    }

    fn flush_text(&self, run: &mut String, rebuilt: &mut Vec<Handle>) {
        if !run.is_empty() {
            rebuilt.push(self.page.create_text(run));
            run.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::find_nodes;

    fn controller(html: &str, config: &ReaderConfig) -> (Rc<Page>, TraversalController) {
        let page = Rc::new(Page::parse(html).unwrap());
        let controller =
            TraversalController::new(page.clone(), config, Rc::new(ProcessedSet::new()));
        (page, controller)
    }

    fn inner(page: &Page, tag: &str) -> String {
        let node = find_nodes(page.document(), &[tag]).remove(0);
        let out = crate::dom::serialize_document(&node, "").unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_run_rewrites_paragraph() {
        let (page, controller) = controller("<p>read this</p>", &ReaderConfig::default());
        let report = controller.run(&page.body());

        assert_eq!(report.processed, 1);
        assert_eq!(report.rewritten, 1);
        assert!(!report.has_more);
        assert_eq!(inner(&page, "p"), "<b>re</b>ad <b>th</b>is");
    }

    #[test]
    fn test_excluded_subtrees_are_skipped() {
        let (page, controller) = controller(
            "<p>one</p><pre><span>two</span></pre><script>var x</script>",
            &ReaderConfig::default(),
        );
        let report = controller.run(&page.body());

        assert_eq!(report.processed, 1);
        assert_eq!(inner(&page, "span"), "two");
    }

    #[test]
    fn test_second_run_is_noop() {
        let (page, controller) = controller("<p>one</p><div>two</div>", &ReaderConfig::default());
        controller.run(&page.body());
        let before = String::from_utf8(page.serialize("").unwrap()).unwrap();

        let report = controller.run(&page.body());
        assert_eq!(report.processed, 0);
        assert_eq!(String::from_utf8(page.serialize("").unwrap()).unwrap(), before);
    }

    #[test]
    fn test_batch_size_limits_pass() {
        let mut config = ReaderConfig::default();
        config.processing.batch_size = 2;
        let (page, controller) = controller("<p>a</p><p>b</p><p>c</p>", &config);

        let first = controller.run(&page.body());
        assert_eq!(first.processed, 2);
        assert!(first.has_more);

        let second = controller.run(&page.body());
        assert_eq!(second.processed, 1);
        assert!(!second.has_more);
    }

    #[test]
    fn test_detached_element_is_skipped() {
        let (page, controller) = controller("<p>a</p><p>b</p>", &ReaderConfig::default());
        let (candidates, _) = controller.collect(&page.body());
        page.remove(&candidates[0]);

        let mut report = PassReport::default();
        controller.process_elements(&candidates, &mut report);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.processed, 1);
    }

    #[test]
    fn test_strip_restores_text() {
        let (page, controller) = controller("<p>Hello  world</p>", &ReaderConfig::default());
        let p = find_nodes(page.document(), &["p"]).remove(0);
        controller.run(&page.body());
        assert_ne!(inner(&page, "p"), "Hello  world");

        let removed = controller.strip(&page.body());
        assert_eq!(removed, 2);
        assert_eq!(text_content(&p), "Hello  world");
        assert_eq!(p.children.borrow().len(), 1);
        assert!(controller.tracker().is_empty());
    }
}
