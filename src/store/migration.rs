//! 持久化 schema 的版本迁移
//!
//! 迁移以有序步骤列表表达：下标 `i` 的步骤负责 `version == i` 到 `i + 1`，
//! 每步都是对原始 JSON blob 的纯改写，可单独测试。加载时按存储版本依次执行，
//! 之后把 `version` 提升到当前值。

use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};
use url::Url;

use super::model::STORE_VERSION;

/// 单个迁移步骤：旧形态 → 新形态，就地改写
type Step = fn(&mut Value);

/// 按版本顺序排列的迁移步骤
const STEPS: &[Step] = &[paths_to_uris];

/// 把 blob 从其自带版本迁移到当前版本，返回是否发生改写
///
/// `version` 字段缺失视为 0。已是当前版本（或更高）的 blob 不做任何改动。
pub(crate) fn run(value: &mut Value) -> bool {
    let from = value.get("version").and_then(Value::as_u64).unwrap_or(0);
    if from >= STORE_VERSION {
        return false;
    }
    for (version, step) in STEPS.iter().enumerate().skip(from as usize) {
        info!(from = version, to = version + 1, "执行 schema 迁移");
        step(value);
    }
    if let Some(map) = value.as_object_mut() {
        map.insert("version".to_string(), Value::from(STORE_VERSION));
    }
    true
}

// ── v0 → v1 ──────────────────────────────────────────────────────────────────

/// v0 → v1：文件 id 从裸文件系统路径改为规范 URI 字符串形式
///
/// `files.byId` 的键、条目内的 `id` 字段、`files.allIds`、以及每个 checkpoint
/// 的 `parent` 引用统一改写。单个 id 转换失败只记日志并保留旧形式，
/// 不中断整体迁移。
fn paths_to_uris(value: &mut Value) {
    let mut renames: HashMap<String, String> = HashMap::new();

    if let Some(files) = value
        .pointer_mut("/files/byId")
        .and_then(Value::as_object_mut)
    {
        let old_ids: Vec<String> = files
            .keys()
            .filter(|id| !has_uri_form(id))
            .cloned()
            .collect();
        for old in old_ids {
            match Url::from_file_path(&old) {
                Ok(uri) => {
                    renames.insert(old, uri.to_string());
                }
                Err(()) => warn!(id = %old, "路径无法转换为 URI，保留旧形式"),
            }
        }
        for (old, new) in &renames {
            if let Some(mut entry) = files.remove(old) {
                if let Some(fields) = entry.as_object_mut() {
                    fields.insert("id".to_string(), Value::from(new.clone()));
                }
                files.insert(new.clone(), entry);
            }
        }
    }

    if let Some(all_ids) = value
        .pointer_mut("/files/allIds")
        .and_then(Value::as_array_mut)
    {
        for id in all_ids.iter_mut() {
            if let Some(new) = id.as_str().and_then(|old| renames.get(old)) {
                *id = Value::from(new.clone());
            }
        }
    }

    if let Some(checkpoints) = value
        .pointer_mut("/checkpoints/byId")
        .and_then(Value::as_object_mut)
    {
        for checkpoint in checkpoints.values_mut() {
            let parent = checkpoint.get("parent").and_then(Value::as_str);
            if let Some(new) = parent.and_then(|old| renames.get(old)) {
                let new = Value::from(new.clone());
                if let Some(fields) = checkpoint.as_object_mut() {
                    fields.insert("parent".to_string(), new);
                }
            }
        }
    }
}

/// 已是 URI 形式：能解析且 scheme 多于一个字符
/// （单字符 scheme 会把 Windows 盘符 `C:` 误判为已迁移）
fn has_uri_form(id: &str) -> bool {
    Url::parse(id).is_ok_and(|url| url.scheme().len() > 1)
}
