//! Checkpoint 引擎
//!
//! 规范化 store 的唯一变更入口。所有操作同步修改内存状态，随后异步落盘；
//! 通知在内存变更完成后、落盘完成前发出。引擎是显式对象，由会话构造一次，
//! 按引用传给各协作方，没有任何全局状态。

use crate::events::{Removed, StoreEvents, Updated, DEFAULT_EVENT_BUFFER};
use crate::persist::{StateSlot, TracingWarnings, WarningSink};
use crate::store::migration;
use crate::store::model::{
    base_name, default_checkpoint_name, extra_name, Checkpoint, CheckpointStore, FileEntry,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 预览文档使用的内部 URI scheme，设置 context 时被忽略
pub const PREVIEW_SCHEME: &str = "checkpoint-preview";

/// 移除操作的目标，由调用方显式指定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveTarget {
    /// 清空整个 store
    All,
    /// 移除一个文件及其全部 checkpoint
    File(String),
    /// 移除单个 checkpoint
    Checkpoint(String),
}

/// Checkpoint 存储引擎
///
/// 查询一律返回共享引用：变更必须走引擎的操作，绕过引擎直接改写实体
/// 会跳过通知和落盘。
///
/// 落盘任务派发到加载引擎时所在的 tokio runtime 上，变更操作本身
/// 可以在任意线程同步调用。
pub struct CheckpointEngine {
    store: CheckpointStore,
    slot: Arc<dyn StateSlot>,
    events: StoreEvents,
    warnings: Arc<dyn WarningSink>,
    context: Option<String>,
    handle: tokio::runtime::Handle,
}

impl CheckpointEngine {
    /// 从槽位加载 store 并构造引擎，使用默认告警出口和通道容量
    pub async fn load(slot: Arc<dyn StateSlot>) -> Self {
        Self::load_with(slot, Arc::new(TracingWarnings), DEFAULT_EVENT_BUFFER).await
    }

    /// 从槽位加载 store 并构造引擎
    ///
    /// 槽位为空时从空 store 开始；blob 版本落后时先就地迁移再解析，
    /// 迁移发生过则立即回写一次。blob 损坏时告警并从空 store 开始，
    /// 引擎本身永不因持久化数据而失败。
    pub async fn load_with(
        slot: Arc<dyn StateSlot>,
        warnings: Arc<dyn WarningSink>,
        event_buffer: usize,
    ) -> Self {
        let mut migrated = false;
        let store = match slot.get().await {
            Ok(Some(mut value)) => {
                migrated = migration::run(&mut value);
                match serde_json::from_value::<CheckpointStore>(value) {
                    Ok(store) => store,
                    Err(e) => {
                        warn!(error = %e, "持久化数据解析失败，从空 store 开始");
                        // 槽位里的原始数据保留，等下一次真正的变更再覆盖
                        migrated = false;
                        CheckpointStore::default()
                    }
                }
            }
            Ok(None) => CheckpointStore::default(),
            Err(e) => {
                warn!(error = %e, "读取持久化槽位失败，从空 store 开始");
                CheckpointStore::default()
            }
        };
        let engine = Self {
            store,
            slot,
            events: StoreEvents::new(event_buffer),
            warnings,
            context: None,
            handle: tokio::runtime::Handle::current(),
        };
        if migrated {
            if let Err(e) = engine.flush().await {
                warn!(error = %e, "迁移结果回写失败");
            }
        }
        info!(
            files = engine.store.file_count(),
            checkpoints = engine.store.checkpoint_count(),
            "🗂️ checkpoint 引擎已加载"
        );
        engine
    }

    // ── 变更操作 ─────────────────────────────────────────────────────────────

    /// 新建 checkpoint
    ///
    /// 文件条目不存在则创建（幂等复用已有条目），展示名和区分片段取自路径，
    /// 并与所有既有文件做重名登记。checkpoint id 由时间戳导出，与既有 id
    /// 冲突时时间戳逐毫秒递增直到唯一。返回新建的 checkpoint。
    pub fn add(
        &mut self,
        file_id: &str,
        file_path: &Path,
        text: String,
        name: Option<String>,
        timestamp: u64,
    ) -> Checkpoint {
        if !self.store.files.contains(file_id) {
            self.create_file(file_id, file_path);
        }

        let mut timestamp = timestamp;
        while self.store.checkpoints.contains(&timestamp.to_string()) {
            timestamp += 1;
        }
        let id = timestamp.to_string();

        let checkpoint = Checkpoint {
            id: id.clone(),
            parent: file_id.to_string(),
            timestamp,
            name: name.unwrap_or_else(|| default_checkpoint_name(timestamp)),
            text,
        };
        self.store
            .checkpoints
            .insert(id.clone(), checkpoint.clone());
        if let Some(file) = self.store.files.get_mut(file_id) {
            file.checkpoint_ids.push(id);
        }

        info!(file = %file_id, checkpoint = %checkpoint.id, "🔖 新建 checkpoint");
        self.events.emit_added(checkpoint.clone());
        self.persist();
        checkpoint
    }

    /// 移除：整个 store / 一个文件 / 单个 checkpoint
    ///
    /// 目标不存在时记 warning 并放弃，不发通知也不落盘。
    pub fn remove(&mut self, target: RemoveTarget) {
        match target {
            RemoveTarget::All => {
                let snapshot = self.store.clone();
                self.store.files.clear();
                self.store.checkpoints.clear();
                info!("🗑️ 已清空全部 checkpoint");
                self.events.emit_removed(Removed::All(snapshot));
                self.persist();
            }
            RemoveTarget::File(id) => {
                let Some(file) = self.store.files.get(&id).cloned() else {
                    warn!(file = %id, "移除失败：文件不存在");
                    return;
                };
                for checkpoint_id in &file.checkpoint_ids {
                    self.remove_checkpoint_entry(checkpoint_id);
                }
                info!(file = %id, removed = file.checkpoint_ids.len(), "🗑️ 已移除文件的全部 checkpoint");
                self.events.emit_removed(Removed::File(file));
                self.persist();
            }
            RemoveTarget::Checkpoint(id) => {
                let Some(checkpoint) = self.remove_checkpoint_entry(&id) else {
                    warn!(checkpoint = %id, "移除失败：checkpoint 不存在");
                    return;
                };
                info!(checkpoint = %id, "🗑️ 已移除 checkpoint");
                self.events.emit_removed(Removed::Checkpoint(checkpoint));
                self.persist();
            }
        }
    }

    /// 重命名 checkpoint 的展示名，名字不要求唯一
    pub fn rename_checkpoint(&mut self, id: &str, new_name: &str) {
        let Some(checkpoint) = self.store.checkpoints.get_mut(id) else {
            warn!(checkpoint = %id, "重命名失败：checkpoint 不存在");
            return;
        };
        checkpoint.name = new_name.to_string();
        let checkpoint = checkpoint.clone();
        debug!(checkpoint = %id, name = %new_name, "checkpoint 已重命名");
        self.events.emit_updated(Updated::Checkpoint(checkpoint));
        self.persist();
    }

    /// 把 checkpoint 设为其所属文件的选中项，替换该文件此前的选中
    pub fn select_checkpoint(&mut self, id: &str) {
        let Some(parent) = self.store.checkpoints.get(id).map(|cp| cp.parent.clone()) else {
            warn!(checkpoint = %id, "选中失败：checkpoint 不存在");
            return;
        };
        let Some(file) = self.store.files.get_mut(&parent) else {
            error!(checkpoint = %id, file = %parent, "数据不一致：checkpoint 的 parent 不存在");
            return;
        };
        file.selection = id.to_string();
        let file = file.clone();
        debug!(file = %file.id, checkpoint = %id, "已选中 checkpoint");
        self.events.emit_updated(Updated::File(file));
        self.persist();
    }

    /// 清除文件的选中项
    pub fn clear_selection(&mut self, file_id: &str) {
        let Some(file) = self.store.files.get_mut(file_id) else {
            warn!(file = %file_id, "清除选中失败：文件不存在");
            return;
        };
        file.selection.clear();
        let file = file.clone();
        debug!(file = %file_id, "已清除选中");
        self.events.emit_updated(Updated::File(file));
        self.persist();
    }

    // ── 查询 ─────────────────────────────────────────────────────────────────

    /// 一个文件的 checkpoint（创建顺序），或省略 file_id 时全 store 的
    /// checkpoint（插入顺序）。未知文件返回空序列。
    pub fn checkpoints(&self, file_id: Option<&str>) -> Vec<&Checkpoint> {
        match file_id {
            None => self.store.checkpoints.iter().collect(),
            Some(file_id) => match self.store.files.get(file_id) {
                Some(file) => file
                    .checkpoint_ids
                    .iter()
                    .filter_map(|id| self.store.checkpoints.get(id))
                    .collect(),
                None => Vec::new(),
            },
        }
    }

    pub fn checkpoint(&self, id: &str) -> Option<&Checkpoint> {
        self.store.checkpoints.get(id)
    }

    pub fn file(&self, id: &str) -> Option<&FileEntry> {
        self.store.files.get(id)
    }

    /// 只读访问完整的规范化 store（展示层渲染用）
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// 订阅入口
    pub fn events(&self) -> &StoreEvents {
        &self.events
    }

    // ── context ──────────────────────────────────────────────────────────────

    /// 展示层当前关注的文件标识
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// 切换关注的文件
    ///
    /// 与当前值相同、或属于内部预览 scheme 的值不触发任何动作
    /// （抑制多余的重渲染）。context 不持久化。
    pub fn set_context(&mut self, value: Option<String>) {
        if value == self.context {
            return;
        }
        if let Some(id) = &value {
            if url::Url::parse(id).is_ok_and(|uri| uri.scheme() == PREVIEW_SCHEME) {
                return;
            }
        }
        self.context = value.clone();
        debug!(context = ?value, "上下文已切换");
        self.events.emit_context_changed(value);
    }

    // ── 持久化 ───────────────────────────────────────────────────────────────

    /// 同步落盘当前 store（测试和迁移回写用）
    pub async fn flush(&self) -> crate::error::Result<()> {
        let value = serde_json::to_value(&self.store)?;
        self.slot.set(value).await
    }

    /// 异步落盘：内存状态为准，写失败只告警不回滚
    fn persist(&self) {
        let value = match serde_json::to_value(&self.store) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "store 序列化失败，跳过本次落盘");
                return;
            }
        };
        let slot = Arc::clone(&self.slot);
        let warnings = Arc::clone(&self.warnings);
        self.handle.spawn(async move {
            match slot.set(value).await {
                Ok(()) => debug!("💾 checkpoint 已持久化"),
                Err(e) => {
                    warn!(error = %e, "checkpoint 落盘失败，内存状态保持有效");
                    warnings.persist_failed(&e);
                }
            }
        });
    }

    // ── 内部路径 ─────────────────────────────────────────────────────────────

    /// 创建文件条目并与所有既有文件做重名登记（对称写入双方）
    fn create_file(&mut self, file_id: &str, file_path: &Path) {
        let mut entry = FileEntry {
            id: file_id.to_string(),
            name: base_name(file_path),
            extra_name: extra_name(file_path),
            file_name_duplicates: Vec::new(),
            checkpoint_ids: Vec::new(),
            selection: String::new(),
        };
        let duplicate_ids: Vec<String> = self
            .store
            .files
            .iter()
            .filter(|existing| existing.name == entry.name)
            .map(|existing| existing.id.clone())
            .collect();
        for duplicate_id in duplicate_ids {
            if let Some(existing) = self.store.files.get_mut(&duplicate_id) {
                existing.file_name_duplicates.push(entry.id.clone());
            }
            entry.file_name_duplicates.push(duplicate_id);
        }
        debug!(file = %entry.id, name = %entry.name, duplicates = entry.file_name_duplicates.len(), "新建文件条目");
        self.store.files.insert(entry.id.clone(), entry);
    }

    /// 单个 checkpoint 的删除路径
    ///
    /// 同步维护父文件的 `checkpoint_ids` 与选中项；父文件因此清空时
    /// 连同文件一起删除并做重名登记的对称拆除。不发通知、不落盘，
    /// 由调用方统一处理。
    fn remove_checkpoint_entry(&mut self, id: &str) -> Option<Checkpoint> {
        let checkpoint = self.store.checkpoints.remove(id)?;
        let mut file_now_empty = false;
        if let Some(file) = self.store.files.get_mut(&checkpoint.parent) {
            file.checkpoint_ids.retain(|existing| existing != id);
            if file.selection == id {
                file.selection.clear();
            }
            file_now_empty = file.checkpoint_ids.is_empty();
        }
        if file_now_empty {
            if let Some(file) = self.store.files.remove(&checkpoint.parent) {
                self.teardown_duplicates(&file);
            }
        }
        Some(checkpoint)
    }

    /// 对称拆除重名登记；反向引用缺失说明数据不一致，记 error 但不中断
    fn teardown_duplicates(&mut self, file: &FileEntry) {
        for duplicate_id in &file.file_name_duplicates {
            match self.store.files.get_mut(duplicate_id) {
                Some(other) => {
                    let before = other.file_name_duplicates.len();
                    other.file_name_duplicates.retain(|id| id != &file.id);
                    if other.file_name_duplicates.len() == before {
                        error!(file = %file.id, duplicate = %duplicate_id, "重名登记不对称：反向引用缺失");
                    }
                }
                None => {
                    error!(file = %file.id, duplicate = %duplicate_id, "重名登记指向不存在的文件");
                }
            }
        }
    }
}

impl std::fmt::Debug for CheckpointEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointEngine")
            .field("files", &self.store.file_count())
            .field("checkpoints", &self.store.checkpoint_count())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
