//! Checkpoint 存储的数据模型
//!
//! 规范化的两张表（files / checkpoints），每张表由 `byId` 映射和保持插入顺序的
//! `allIds` 序列组成，二者必须时刻一致。serde 字段名使用 camelCase，
//! 与持久化 blob 的布局一一对应。

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 当前持久化 schema 版本
pub const STORE_VERSION: u64 = 1;

/// `extra_name` 的最大长度（字符数），超出时截断并加省略号前缀
const EXTRA_NAME_MAX: usize = 15;

// ── 实体 ─────────────────────────────────────────────────────────────────────

/// 一个源文件的条目：聚合它的所有 checkpoint 及展示/选中元数据
///
/// 首个 checkpoint 创建时建立；最后一个 checkpoint 被移除时整体删除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// 稳定唯一标识（规范 URI 字符串形式，不是展示名）
    pub id: String,
    /// 展示名（文件 base name）
    pub name: String,
    /// 同名文件的区分片段，取自目录路径
    #[serde(default)]
    pub extra_name: String,
    /// 当前与本文件同 `name` 的其他文件 id（对称关系）
    #[serde(default)]
    pub file_name_duplicates: Vec<String>,
    /// 所属 checkpoint id 序列，插入顺序即创建顺序
    pub checkpoint_ids: Vec<String>,
    /// 当前选中的 checkpoint id，空字符串表示无选中
    #[serde(default)]
    pub selection: String,
}

/// 某一时刻的文件全文快照，内容不可变，展示名可改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// 由创建时间戳导出的 id，全 store 唯一
    pub id: String,
    /// 所属文件 id
    pub parent: String,
    /// 创建时间（epoch 毫秒）
    pub timestamp: u64,
    /// 展示名，可由用户改写
    pub name: String,
    /// 创建时捕获的完整文件内容
    pub text: String,
}

// ── 规范化表 ─────────────────────────────────────────────────────────────────

/// id 索引表：`by_id` 映射 + 插入顺序的 `all_ids` 序列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table<T> {
    pub by_id: HashMap<String, T>,
    pub all_ids: Vec<String>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            all_ids: Vec::new(),
        }
    }
}

impl<T> Table<T> {
    pub fn get(&self, id: &str) -> Option<&T> {
        self.by_id.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.by_id.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// 插入或覆盖；仅首次插入时追加到 `all_ids`
    pub fn insert(&mut self, id: String, value: T) {
        if self.by_id.insert(id.clone(), value).is_none() {
            self.all_ids.push(id);
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let value = self.by_id.remove(id)?;
        self.all_ids.retain(|existing| existing != id);
        Some(value)
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.all_ids.clear();
    }

    pub fn len(&self) -> usize {
        self.all_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_ids.is_empty()
    }

    /// 按插入顺序迭代
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.all_ids.iter().filter_map(|id| self.by_id.get(id))
    }
}

/// 根聚合：版本号 + 两张规范化表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointStore {
    pub version: u64,
    pub files: Table<FileEntry>,
    pub checkpoints: Table<Checkpoint>,
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            files: Table::default(),
            checkpoints: Table::default(),
        }
    }
}

impl CheckpointStore {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.checkpoints.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }
}

// ── 路径/名称辅助 ─────────────────────────────────────────────────────────────

/// 文件展示名：路径的 base name
pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// 同名区分片段：目录路径尾部，超过 15 个字符时截断并加 `…` 前缀
pub(crate) fn extra_name(path: &Path) -> String {
    let dir = path
        .parent()
        .map(|parent| parent.to_string_lossy().into_owned())
        .unwrap_or_default();
    let chars: Vec<char> = dir.chars().collect();
    if chars.len() > EXTRA_NAME_MAX {
        let tail: String = chars[chars.len() - EXTRA_NAME_MAX..].iter().collect();
        format!("…{tail}")
    } else {
        dir
    }
}

/// 默认 checkpoint 展示名：本地时区格式化的创建时间
pub(crate) fn default_checkpoint_name(timestamp_ms: u64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms as i64).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => timestamp_ms.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_table_insert_keeps_order() {
        let mut table: Table<u32> = Table::default();
        table.insert("b".to_string(), 2);
        table.insert("a".to_string(), 1);
        table.insert("c".to_string(), 3);
        assert_eq!(table.all_ids, vec!["b", "a", "c"]);
        assert_eq!(table.iter().copied().collect::<Vec<_>>(), vec![2, 1, 3]);
    }

    #[test]
    fn test_table_overwrite_does_not_duplicate_id() {
        let mut table: Table<u32> = Table::default();
        table.insert("a".to_string(), 1);
        table.insert("a".to_string(), 9);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a"), Some(&9));
    }

    #[test]
    fn test_table_remove_keeps_bijection() {
        let mut table: Table<u32> = Table::default();
        table.insert("a".to_string(), 1);
        table.insert("b".to_string(), 2);
        assert_eq!(table.remove("a"), Some(1));
        assert!(!table.contains("a"));
        assert_eq!(table.all_ids, vec!["b"]);
        assert_eq!(table.remove("a"), None);
    }

    #[test]
    fn test_base_and_extra_name() {
        let path = Path::new("/a/b.txt");
        assert_eq!(base_name(path), "b.txt");
        assert_eq!(extra_name(path), "/a");
    }

    #[test]
    fn test_extra_name_truncated() {
        let path = Path::new("/very/long/directory/structure/b.txt");
        let extra = extra_name(path);
        assert!(extra.starts_with('…'), "超长目录应以省略号开头");
        assert_eq!(extra.chars().count(), 16, "省略号 + 15 个字符");
        assert_eq!(extra, "…ctory/structure");
    }

    #[test]
    fn test_persisted_layout_is_camel_case() {
        let mut store = CheckpointStore::default();
        store.files.insert(
            "file:///a/b.txt".to_string(),
            FileEntry {
                id: "file:///a/b.txt".to_string(),
                name: "b.txt".to_string(),
                extra_name: "/a".to_string(),
                file_name_duplicates: vec![],
                checkpoint_ids: vec!["1000".to_string()],
                selection: String::new(),
            },
        );
        let value = serde_json::to_value(&store).unwrap();
        assert!(value["files"]["byId"].is_object());
        assert!(value["files"]["allIds"].is_array());
        assert!(value["checkpoints"]["byId"].is_object());
        let entry = &value["files"]["byId"]["file:///a/b.txt"];
        assert!(entry["extraName"].is_string());
        assert!(entry["fileNameDuplicates"].is_array());
        assert!(entry["checkpointIds"].is_array());
        assert!(entry["selection"].is_string());
    }
}
