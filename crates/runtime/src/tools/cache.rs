//! In-memory, TTL + LRU result cache keyed on a canonical argument fingerprint.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::types::ToolResult;

pub const DEFAULT_TTL_SECS: u64 = 60;
pub const DEFAULT_MAX_ENTRIES: usize = 512;

/// Canonicalize `args` (drop nulls, sort object keys, trim string whitespace)
/// and return a stable hex digest suitable as a cache key.
pub fn fingerprint(tool_name: &str, args: &Value) -> String {
    let canonical = canonicalize(args);
    let mut hasher = Sha256::new();
    hasher.update(tool_name.as_bytes());
    hasher.update(b"\0");
    hasher.update(canonical.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<String, Value> = std::collections::BTreeMap::new();
            for (k, v) in map {
                if v.is_null() {
                    continue;
                }
                sorted.insert(k.clone(), canonicalize(v));
            }
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::String(s) => Value::String(s.split_whitespace().collect::<Vec<_>>().join(" ")),
        other => other.clone(),
    }
}

struct Entry {
    result: ToolResult,
    inserted_at: Instant,
}

struct Inner {
    entries: HashMap<String, Entry>,
    /// Most-recently-used key at the back.
    order: Vec<String>,
}

/// TTL-bounded, LRU-evicted cache of [`ToolResult`]s.
pub struct ToolCache {
    ttl: Duration,
    max_entries: usize,
    inner: Mutex<Inner>,
}

impl ToolCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<ToolResult> {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
            return None;
        }
        inner.order.retain(|k| k != key);
        inner.order.push(key.to_string());
        inner.entries.get(key).map(|e| e.result.clone())
    }

    pub fn put(&self, key: String, result: ToolResult) {
        let mut inner = self.inner.lock();
        inner.order.retain(|k| k != &key);
        inner.order.push(key.clone());
        inner.entries.insert(
            key,
            Entry {
                result,
                inserted_at: Instant::now(),
            },
        );
        while inner.entries.len() > self.max_entries {
            if inner.order.is_empty() {
                break;
            }
            let oldest = inner.order.remove(0);
            inner.entries.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ToolCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECS), DEFAULT_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fingerprint_ignores_key_order_and_null_and_whitespace() {
        let a = json!({"x": "hi  there", "y": null, "z": 1});
        let b = json!({"z": 1, "x": "hi there"});
        assert_eq!(fingerprint("echo", &a), fingerprint("echo", &b));
    }

    #[test]
    fn different_tool_names_produce_different_fingerprints() {
        let args = json!({"x": 1});
        assert_ne!(fingerprint("a", &args), fingerprint("b", &args));
    }

    #[test]
    fn put_then_get_within_ttl_hits() {
        let cache = ToolCache::new(Duration::from_secs(60), 8);
        cache.put("k".into(), ToolResult::ok("out", None, 1));
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = ToolCache::new(Duration::from_millis(1), 8);
        cache.put("k".into(), ToolResult::ok("out", None, 1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn lru_evicts_least_recently_used_over_cap() {
        let cache = ToolCache::new(Duration::from_secs(60), 2);
        cache.put("a".into(), ToolResult::ok("a", None, 1));
        cache.put("b".into(), ToolResult::ok("b", None, 1));
        cache.get("a");
        cache.put("c".into(), ToolResult::ok("c", None, 1));
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }
}
