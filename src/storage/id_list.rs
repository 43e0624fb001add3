//! 逗号拼接的外键列表
//!
//! volunteer_assignments.camper_ids 以 "3,7,12" 的形式保存。
//! 写入前统一规范化为升序去重，读取时容忍空白和空段。

use std::fmt;

/// 解析失败：包含无法识别的片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdListError {
    pub segment: String,
}

impl fmt::Display for IdListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid id segment '{}'", self.segment)
    }
}

impl std::error::Error for IdListError {}

/// 解析逗号拼接的 ID 列表，结果已规范化
pub fn parse_id_list(raw: &str) -> Result<Vec<i32>, IdListError> {
    let mut ids = Vec::new();
    for segment in raw.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let id = segment.parse::<i32>().map_err(|_| IdListError {
            segment: segment.to_string(),
        })?;
        ids.push(id);
    }
    Ok(normalize_ids(ids))
}

/// 规范化后以逗号拼接
pub fn join_id_list(ids: &[i32]) -> String {
    normalize_ids(ids.to_vec())
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// 升序 + 去重
pub fn normalize_ids(mut ids: Vec<i32>) -> Vec<i32> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// 合并两个列表
pub fn merge_ids(existing: &[i32], added: &[i32]) -> Vec<i32> {
    let mut merged = Vec::with_capacity(existing.len() + added.len());
    merged.extend_from_slice(existing);
    merged.extend_from_slice(added);
    normalize_ids(merged)
}

/// 移除单个 ID，返回 (新列表, 是否实际移除)
pub fn remove_id(existing: &[i32], id: i32) -> (Vec<i32>, bool) {
    let before = existing.len();
    let remaining: Vec<i32> = existing.iter().copied().filter(|&x| x != id).collect();
    let removed = remaining.len() != before;
    (normalize_ids(remaining), removed)
}
