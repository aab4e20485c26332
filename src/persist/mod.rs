//! 持久化槽位
//!
//! 整个 store 序列化为单个 JSON blob，写入一个异步 get/set 的键值槽位。
//!
//! ## 内置实现
//!
//! | 类型 | 说明 |
//! |------|------|
//! | [`InMemorySlot`] | 进程内存，重启即清空，适合测试 |
//! | [`FileSlot`] | JSON 文件持久化，适合本地单机场景 |
//!
//! 写失败不影响内存状态：引擎记录日志并通过 [`WarningSink`] 通知用户，
//! 本次会话继续以内存为准。

use crate::error::{CheckpointError, PersistError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

// ── StateSlot trait ───────────────────────────────────────────────────────────

/// 单槽位键值持久化接口
///
/// 实现方可替换为任意存储后端（内存、文件、宿主编辑器的全局状态等）。
#[async_trait]
pub trait StateSlot: Send + Sync {
    /// 读取槽位中的整个 blob（不存在返回 `None`）
    async fn get(&self) -> Result<Option<Value>>;

    /// 整体覆盖写入
    async fn set(&self, value: Value) -> Result<()>;
}

// ── WarningSink trait ─────────────────────────────────────────────────────────

/// 面向用户的告警出口，落盘失败时通知
pub trait WarningSink: Send + Sync {
    fn persist_failed(&self, error: &CheckpointError);
}

/// 默认告警出口：仅写 tracing 日志
pub struct TracingWarnings;

impl WarningSink for TracingWarnings {
    fn persist_failed(&self, error: &CheckpointError) {
        warn!(error = %error, "⚠️ checkpoint 落盘失败，本次会话以内存状态为准");
    }
}

// ── InMemorySlot ──────────────────────────────────────────────────────────────

/// 进程内存槽位，不持久化，适合测试和短生命周期使用
pub struct InMemorySlot {
    data: RwLock<Option<Value>>,
}

impl Default for InMemorySlot {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySlot {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(None),
        }
    }

    /// 预置初始 blob（模拟已有持久化数据的会话）
    pub fn with_value(value: Value) -> Self {
        Self {
            data: RwLock::new(Some(value)),
        }
    }
}

#[async_trait]
impl StateSlot for InMemorySlot {
    async fn get(&self) -> Result<Option<Value>> {
        Ok(self.data.read().await.clone())
    }

    async fn set(&self, value: Value) -> Result<()> {
        *self.data.write().await = Some(value);
        Ok(())
    }
}

// ── FileSlot ──────────────────────────────────────────────────────────────────

/// 基于 JSON 文件的持久化槽位
pub struct FileSlot {
    path: PathBuf,
    pretty: bool,
}

impl FileSlot {
    /// 打开或创建槽位文件，自动建父目录
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_tilde(path.as_ref());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PersistError::Io(format!("创建目录失败: {e}")))?;
        }
        Ok(Self { path, pretty: true })
    }

    /// 改用紧凑 JSON 落盘
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }
}

#[async_trait]
impl StateSlot for FileSlot {
    async fn get(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| PersistError::Io(format!("读取槽位文件失败: {e}")))?;
        let value = serde_json::from_str(&raw)
            .map_err(|e| PersistError::Serialization(e.to_string()))?;
        Ok(Some(value))
    }

    async fn set(&self, value: Value) -> Result<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
        .map_err(|e| PersistError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| PersistError::Io(format!("写入槽位文件失败: {e}")))?;
        debug!(path = %self.path.display(), "💾 槽位已写入");
        Ok(())
    }
}

// ── 私有工具函数 ──────────────────────────────────────────────────────────────

fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if s.starts_with("~/") {
        if let Some(home) = std::env::var("HOME")
            .ok()
            .or_else(|| std::env::var("USERPROFILE").ok())
        {
            return PathBuf::from(home).join(&s[2..]);
        }
    }
    path.to_path_buf()
}
