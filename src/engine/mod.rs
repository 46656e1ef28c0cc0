//! 处理引擎
//!
//! - `eligibility`: 元素资格判断
//! - `tracker`: 已处理元素的弱引用集合
//! - `traversal`: 遍历与改写、去除标记
//! - `observer`: 防抖的变更观察器
//! - `stats`: 处理统计
//!
//! [`SmartReader`] 把它们组装在一起，响应页面加载、变更批次和控制消息。
//! 所有状态都是单线程的（`Rc` / `RefCell`），需要在 tokio 的 current-thread 运行时或
//! `LocalSet` 中使用。

pub mod eligibility;
pub mod observer;
pub mod stats;
pub mod tracker;
pub mod traversal;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};

use crate::config::ReaderConfig;
use crate::dom::Page;
use crate::messages::{Message, Response};
use crate::storage::{self, KeyValueStore};

pub use eligibility::EligibilityFilter;
pub use observer::{ChangeObserver, MutationBatch, ObserverHandle};
pub use stats::{format_session_time, Stats, StatsCollector};
pub use tracker::ProcessedSet;
pub use traversal::{PassReport, TraversalController};

/// 一次完整处理（可能跨多个批次）的摘要
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    pub processed: usize,
    pub rewritten: usize,
    pub skipped: usize,
    pub elapsed_ms: f64,
    /// 是否计入了统计
    pub recorded: bool,
}

/// SmartReader 引擎
pub struct SmartReader<S: KeyValueStore> {
    page: Rc<Page>,
    config: ReaderConfig,
    controller: RefCell<TraversalController>,
    tracker: Rc<ProcessedSet>,
    store: S,
    stats: RefCell<StatsCollector>,
    in_pass: Cell<bool>,
    pending: RefCell<Vec<Handle>>,
    /// 每次去除标记时递增，正在进行的处理据此在让出后放弃剩余批次
    generation: Cell<u64>,
}

impl<S: KeyValueStore> SmartReader<S> {
    pub fn new(page: Rc<Page>, config: ReaderConfig, store: S) -> Self {
        Self::with_tracker(page, config, store, Rc::new(ProcessedSet::new()))
    }

    pub fn with_tracker(
        page: Rc<Page>,
        config: ReaderConfig,
        store: S,
        tracker: Rc<ProcessedSet>,
    ) -> Self {
        let controller = TraversalController::new(page.clone(), &config, tracker.clone());
        let stats = StatsCollector::new(config.processing_time_threshold());

        Self {
            page,
            config,
            controller: RefCell::new(controller),
            tracker,
            store,
            stats: RefCell::new(stats),
            in_pass: Cell::new(false),
            pending: RefCell::new(Vec::new()),
            generation: Cell::new(0),
        }
    }

    pub fn page(&self) -> &Rc<Page> {
        &self.page
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tracker(&self) -> &Rc<ProcessedSet> {
        &self.tracker
    }

    pub fn stats(&self) -> Stats {
        self.stats.borrow().stats()
    }

    pub async fn is_enabled(&self) -> bool {
        storage::load_enabled(&self.store, self.config.storage.default_state).await
    }

    /// 观察 `<body>` 的变更
    pub fn observe(&self) -> (ChangeObserver, ObserverHandle) {
        ChangeObserver::observe(&self.page, &self.page.body(), self.config.debounce())
    }

    /// 页面加载：恢复统计，启用时处理整个文档
    pub async fn on_load(&self) -> Option<PassSummary> {
        if let Some(stats) = storage::load_stats(&self.store).await {
            *self.stats.borrow_mut() =
                StatsCollector::with_stats(stats, self.config.processing_time_threshold());
        }

        let generation = self.generation.get();
        if !self.is_enabled().await {
            tracing::info!("SmartReader 未启用，跳过初始处理");
            return None;
        }
        Some(self.run_pass(vec![self.page.body()], generation).await)
    }

    /// 处理一个变更批次
    pub async fn handle_mutations(&self, batch: MutationBatch) -> Option<PassSummary> {
        for node in &batch.removed {
            self.tracker.evict(node);
        }
        let generation = self.generation.get();
        if batch.targets.is_empty() || !self.is_enabled().await {
            return None;
        }

        // 内容被外部修改的元素需要重新判断；标记内的修改归属到拥有标记的元素
        let mut roots: Vec<Handle> = Vec::with_capacity(batch.targets.len());
        {
            let controller = self.controller.borrow();
            for target in &batch.targets {
                let owner = controller.filter().owner(target);
                if !roots.iter().any(|seen| Rc::ptr_eq(seen, &owner)) {
                    roots.push(owner);
                }
            }
        }
        for root in &roots {
            self.tracker.unmark(root);
        }
        Some(self.run_pass(roots, generation).await)
    }

    /// 持续消费观察器的批次，直到断开
    pub async fn watch(&self, mut observer: ChangeObserver) {
        while let Some(batch) = observer.next_batch().await {
            self.handle_mutations(batch).await;
        }
        tracing::debug!("变更观察结束");
    }

    /// 处理控制消息
    pub async fn handle_message(&self, message: Message) -> Response {
        tracing::debug!("收到消息: {:?}", message);
        match message {
            Message::RequestReprocess => Response::Pass(self.reprocess().await),
            Message::RequestDisable => {
                self.disable().await;
                Response::Ack
            }
            Message::RequestEnable => Response::Pass(self.enable().await),
            Message::RequestState => Response::State {
                enabled: self.is_enabled().await,
            },
            Message::GetStats => Response::Stats(self.stats()),
            Message::ResetStats => Response::Stats(self.reset_stats().await),
            Message::UpdateLanguageSettings {
                language,
                bold_length,
            } => {
                if let Err(e) = storage::update_language_settings(
                    &self.store,
                    &self.config,
                    &language,
                    bold_length,
                )
                .await
                {
                    tracing::error!("保存语言设置失败: {}", e);
                }
                Response::Ack
            }
        }
    }

    /// 清空已处理集合并重新处理整个文档
    pub async fn reprocess(&self) -> PassSummary {
        self.tracker.clear();
        self.process_roots(vec![self.page.body()]).await
    }

    /// 保存关闭状态并移除所有强调标记，返回移除的标记数
    pub async fn disable(&self) -> usize {
        if let Err(e) = storage::set_enabled(&self.store, false).await {
            tracing::error!("保存启用标志失败: {}", e);
        }
        let removed = self.strip();
        tracing::info!("SmartReader 已关闭，移除 {} 个标记", removed);
        removed
    }

    /// 移除 `<body>` 下所有强调标记，不改变保存的启用标志
    ///
    /// 正在进行的处理会在下一次让出后停止，排队的子树一并丢弃。
    pub fn strip(&self) -> usize {
        self.generation.set(self.generation.get().wrapping_add(1));
        self.pending.borrow_mut().clear();
        self.controller.borrow().strip(&self.page.body())
    }

    /// 保存启用状态并处理整个文档
    pub async fn enable(&self) -> PassSummary {
        if let Err(e) = storage::set_enabled(&self.store, true).await {
            tracing::error!("保存启用标志失败: {}", e);
        }
        tracing::info!("SmartReader 已启用");
        self.reprocess().await
    }

    pub async fn reset_stats(&self) -> Stats {
        let stats = self.stats.borrow_mut().reset();
        if let Err(e) = storage::save_stats(&self.store, &stats).await {
            tracing::error!("保存统计记录失败: {}", e);
        }
        stats
    }

    /// 依次处理各子树，多批次之间让出执行权；处理中到达的子树排队由当前处理消化
    pub async fn process_roots(&self, roots: Vec<Handle>) -> PassSummary {
        self.run_pass(roots, self.generation.get()).await
    }

    /// `generation` 在调用方检查启用状态之前取得，其后发生的去除标记会让本次处理失效
    async fn run_pass(&self, roots: Vec<Handle>, generation: u64) -> PassSummary {
        if self.generation.get() != generation {
            return PassSummary::default();
        }
        if self.in_pass.get() {
            tracing::debug!("处理进行中，{} 个子树排队", roots.len());
            self.pending.borrow_mut().extend(roots);
            return PassSummary::default();
        }

        self.in_pass.set(true);
        self.refresh_settings().await;

        let mut report = PassReport::default();
        let mut queue: VecDeque<Handle> = roots.into();
        let mut generation = generation;
        let mut cancelled = false;
        loop {
            while let Some(root) = queue.pop_front() {
                loop {
                    if self.generation.get() != generation {
                        // 去除标记之前的子树作废，之后排队的子树属于新的一轮
                        tracing::info!("标记已被移除，放弃 {} 个未完成的子树", queue.len() + 1);
                        generation = self.generation.get();
                        queue.clear();
                        report = PassReport::default();
                        cancelled = true;
                        break;
                    }
                    let batch = self.controller.borrow().run(&root);
                    report.merge(batch);
                    if !batch.has_more {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
            }

            let pending: Vec<Handle> = self.pending.borrow_mut().drain(..).collect();
            if pending.is_empty() {
                break;
            }
            cancelled = false;
            queue.extend(pending);
        }
        self.in_pass.set(false);

        if cancelled {
            return summarize(&report, false);
        }
        self.finish_pass(report).await
    }

    async fn refresh_settings(&self) {
        let settings = storage::load_settings(&self.store, &self.config).await;
        let config = self.config.with_language_overrides(&settings);
        self.controller.borrow_mut().reconfigure(&config);
    }

    async fn finish_pass(&self, report: PassReport) -> PassSummary {
        let recorded = report.rewritten > 0
            && self
                .stats
                .borrow_mut()
                .record(report.rewritten, report.elapsed);

        if recorded {
            let stats = self.stats();
            if let Err(e) = storage::save_stats(&self.store, &stats).await {
                tracing::warn!("保存统计记录失败: {}", e);
            }
        }

        if report.processed > 0 {
            tracing::info!(
                "处理了 {} 个元素（改写 {} 个），耗时 {:?}",
                report.processed,
                report.rewritten,
                report.elapsed
            );
        }
        self.tracker.prune();

        summarize(&report, recorded)
    }
}

fn summarize(report: &PassReport, recorded: bool) -> PassSummary {
    PassSummary {
        processed: report.processed,
        rewritten: report.rewritten,
        skipped: report.skipped,
        elapsed_ms: report.elapsed.as_secs_f64() * 1000.0,
        recorded,
    }
}
