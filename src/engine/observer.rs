//! 变更观察器
//!
//! 订阅 [`Page`] 上某棵子树的变更记录，按尾沿防抖合并为批次：收到第一条记录后持续收集，
//! 直到 `debounce` 时间内不再有新记录。断开后不会再交付任何批次，包括正在防抖中的批次。

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use markup5ever_rcdom::Handle;
use tokio::sync::mpsc;

use crate::dom::{is_inclusive_ancestor, MutationRecord, ObserverId, Page};

/// 合并后的变更批次
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    /// 需要重新处理的子树根，已去重，且不包含其他根的后代
    pub targets: Vec<Handle>,
    /// 被移除的节点
    pub removed: Vec<Handle>,
}

impl MutationBatch {
    pub fn from_records(records: &[MutationRecord]) -> Self {
        let mut candidates: Vec<Handle> = Vec::new();
        let mut removed: Vec<Handle> = Vec::new();

        for record in records {
            for root in record.affected_roots() {
                if !candidates.iter().any(|seen| Rc::ptr_eq(seen, &root)) {
                    candidates.push(root);
                }
            }
            removed.extend(record.removed().iter().cloned());
        }

        let targets = candidates
            .iter()
            .filter(|target| {
                !candidates.iter().any(|other| {
                    !Rc::ptr_eq(other, *target) && is_inclusive_ancestor(other, target)
                })
            })
            .cloned()
            .collect();

        Self { targets, removed }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.removed.is_empty()
    }
}

/// 变更观察器
pub struct ChangeObserver {
    receiver: mpsc::UnboundedReceiver<MutationRecord>,
    debounce: Duration,
    active: Rc<Cell<bool>>,
}

/// 观察器的控制端，用于断开
pub struct ObserverHandle {
    page: Rc<Page>,
    id: ObserverId,
    active: Rc<Cell<bool>>,
}

impl ChangeObserver {
    pub fn observe(page: &Rc<Page>, root: &Handle, debounce: Duration) -> (Self, ObserverHandle) {
        let (id, receiver) = page.subscribe(root);
        let active = Rc::new(Cell::new(true));
        tracing::debug!("开始观察变更，防抖 {:?}", debounce);

        (
            Self {
                receiver,
                debounce,
                active: active.clone(),
            },
            ObserverHandle {
                page: page.clone(),
                id,
                active,
            },
        )
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// 等待下一个批次；断开后返回 `None`
    pub async fn next_batch(&mut self) -> Option<MutationBatch> {
        if !self.active.get() {
            return None;
        }

        let first = self.receiver.recv().await?;
        let mut records = vec![first];

        loop {
            match tokio::time::timeout(self.debounce, self.receiver.recv()).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) | Err(_) => break,
            }
        }

        if !self.active.get() {
            tracing::debug!("观察器已断开，丢弃 {} 条记录", records.len());
            return None;
        }

        let batch = MutationBatch::from_records(&records);
        tracing::debug!(
            "合并 {} 条变更记录为 {} 个目标",
            records.len(),
            batch.targets.len()
        );
        Some(batch)
    }
}

impl ObserverHandle {
    pub fn disconnect(&self) {
        if self.active.replace(false) {
            self.page.unsubscribe(self.id);
            tracing::debug!("观察器已断开");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.active.get()
    }
}
