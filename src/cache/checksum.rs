//! MD5 checksums over canonical JSON
//!
//! 对象的键按字典序输出，与 serde_json 是否保留插入顺序无关。
//! 同样内容在任何进程中都得到同样的 checksum。

use md5::{Digest, Md5};
use serde::Serialize;
use serde_json::Value;

use crate::errors::Result;

/// 规范化 JSON：键排序、无多余空白
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(v) = map.get(key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

/// 序列化记录，返回 (payload, checksum)
pub fn record_checksum<T: Serialize>(record: &T) -> Result<(String, String)> {
    let value = serde_json::to_value(record)?;
    let payload = canonical_json(&value);
    let checksum = md5_hex(payload.as_bytes());
    Ok((payload, checksum))
}

/// 集合摘要：按 key 排序后对 "key:checksum\n" 逐行求 MD5
pub fn collection_digest<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut lines: Vec<(&str, &str)> = entries.into_iter().collect();
    lines.sort_unstable();

    let mut hasher = Md5::new();
    for (key, checksum) in lines {
        hasher.update(key.as_bytes());
        hasher.update(b":");
        hasher.update(checksum.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
