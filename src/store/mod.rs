//! 规范化 checkpoint 存储
//!
//! 分三块，职责各不相同：
//!
//! | 模块 | 作用 |
//! |------|------|
//! | [`model`] | 规范化数据形态（File / Checkpoint / 两张 id 索引表） |
//! | [`engine`] | 唯一变更入口：增删改查、选中、重名登记、context |
//! | `migration` | 加载时按版本顺序执行的 schema 迁移 |
//!
//! ## 快速上手
//!
//! ```rust,no_run
//! use checkpoint_store::persist::InMemorySlot;
//! use checkpoint_store::store::{CheckpointEngine, RemoveTarget};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let mut engine = CheckpointEngine::load(Arc::new(InMemorySlot::new())).await;
//! let checkpoint = engine.add(
//!     "file:///a/b.txt",
//!     Path::new("/a/b.txt"),
//!     "file contents".to_string(),
//!     Some("v1".to_string()),
//!     1000,
//! );
//! engine.select_checkpoint(&checkpoint.id);
//! engine.remove(RemoveTarget::Checkpoint(checkpoint.id));
//! # }
//! ```

pub mod engine;
mod migration;
pub mod model;

pub use engine::{CheckpointEngine, RemoveTarget, PREVIEW_SCHEME};
pub use model::{Checkpoint, CheckpointStore, FileEntry, STORE_VERSION};
