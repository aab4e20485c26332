//! 通知通道
//!
//! 四条相互独立的 broadcast 通道，内存变更完成后立即发出（落盘可能仍在途中）：
//!
//! | 通道 | 载荷 | 触发 |
//! |------|------|------|
//! | added | [`Checkpoint`] | 新建 checkpoint |
//! | removed | [`Removed`] | 移除单个 / 整个文件 / 全部 |
//! | updated | [`Updated`] | 重命名、选中变化 |
//! | context_changed | `Option<String>` | 关注的文件切换 |
//!
//! 没有订阅者时发送不算错误。

use crate::store::model::{Checkpoint, CheckpointStore, FileEntry};
use tokio::sync::broadcast;

/// broadcast 通道的默认缓冲容量
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// removed 通道的载荷：被移除的实体，整体清空时携带清空前的完整快照
#[derive(Debug, Clone)]
pub enum Removed {
    Checkpoint(Checkpoint),
    File(FileEntry),
    All(CheckpointStore),
}

/// updated 通道的载荷：重命名携带 Checkpoint，选中变化携带 File
#[derive(Debug, Clone)]
pub enum Updated {
    Checkpoint(Checkpoint),
    File(FileEntry),
}

/// 引擎的四条通知通道
#[derive(Debug, Clone)]
pub struct StoreEvents {
    added: broadcast::Sender<Checkpoint>,
    removed: broadcast::Sender<Removed>,
    updated: broadcast::Sender<Updated>,
    context_changed: broadcast::Sender<Option<String>>,
}

impl StoreEvents {
    pub fn new(buffer: usize) -> Self {
        let (added, _) = broadcast::channel(buffer);
        let (removed, _) = broadcast::channel(buffer);
        let (updated, _) = broadcast::channel(buffer);
        let (context_changed, _) = broadcast::channel(buffer);
        Self {
            added,
            removed,
            updated,
            context_changed,
        }
    }

    pub fn subscribe_added(&self) -> broadcast::Receiver<Checkpoint> {
        self.added.subscribe()
    }

    pub fn subscribe_removed(&self) -> broadcast::Receiver<Removed> {
        self.removed.subscribe()
    }

    pub fn subscribe_updated(&self) -> broadcast::Receiver<Updated> {
        self.updated.subscribe()
    }

    pub fn subscribe_context_changed(&self) -> broadcast::Receiver<Option<String>> {
        self.context_changed.subscribe()
    }

    pub(crate) fn emit_added(&self, checkpoint: Checkpoint) {
        let _ = self.added.send(checkpoint);
    }

    pub(crate) fn emit_removed(&self, removed: Removed) {
        let _ = self.removed.send(removed);
    }

    pub(crate) fn emit_updated(&self, updated: Updated) {
        let _ = self.updated.send(updated);
    }

    pub(crate) fn emit_context_changed(&self, context: Option<String>) {
        let _ = self.context_changed.send(context);
    }
}

impl Default for StoreEvents {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}
