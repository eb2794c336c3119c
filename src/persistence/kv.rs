//! Typed key-value store abstraction with an in-memory fallback.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::error::{AgentError, Result};
use crate::utils::OrderedSet;

/// A typed key-value interface covering the operations the core needs:
/// scalar get/set/del, hash ops, list ops, set ops, sorted-set ops, integer
/// and float increments, and per-key TTL.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a scalar value.
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// Write a scalar value, optionally with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;
    /// Delete a key (of any type).
    async fn del(&self, key: &str) -> Result<()>;
    /// List every live key starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
    /// Set (or refresh) a TTL on an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Read one field of a hash.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;
    /// Write one field of a hash.
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;
    /// Read every field of a hash.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Push a value to the tail of a list.
    async fn rpush(&self, key: &str, value: &str) -> Result<u64>;
    /// Read a contiguous range of a list (inclusive, negative indices count from the end).
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>>;
    /// Trim a list down to the given inclusive range.
    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<()>;
    /// Length of a list.
    async fn llen(&self, key: &str) -> Result<u64>;

    /// Add a member to a set.
    async fn sadd(&self, key: &str, member: &str) -> Result<()>;
    /// All members of a set, insertion order.
    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    /// Insert or update a member's score in a sorted set.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()>;
    /// Read members ordered by score (descending when `desc` is set).
    async fn zrange(&self, key: &str, limit: usize, desc: bool) -> Result<Vec<(String, f64)>>;

    /// Atomically increment an integer counter, returning the new value.
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64>;
    /// Atomically increment a float accumulator, returning the new value.
    async fn incr_by_float(&self, key: &str, delta: f64) -> Result<f64>;
}

#[derive(Clone)]
enum Stored {
    Scalar(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
    Set(OrderedSet<String>),
    ZSet(Vec<(String, f64)>),
}

struct Record {
    value: Stored,
    expires_at: Option<Instant>,
}

impl Record {
    fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if Instant::now() >= at)
    }
}

/// In-memory `KvStore` implementation backed by a sharded map. TTLs are
/// checked lazily on access, the same semantics a real TTL-backed store
/// exposes to callers that only ever read through the trait.
#[derive(Default)]
pub struct InMemoryKv {
    data: DashMap<String, Record>,
}

impl InMemoryKv {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn live<'a>(&'a self, key: &str) -> Option<dashmap::mapref::one::Ref<'a, String, Record>> {
        let entry = self.data.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.data.remove(key);
            return None;
        }
        Some(entry)
    }

    fn with_list<F, R>(&self, key: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut VecDeque<String>) -> Result<R>,
    {
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Record {
                value: Stored::List(VecDeque::new()),
                expires_at: None,
            });
        if entry.is_expired() {
            entry.value = Stored::List(VecDeque::new());
            entry.expires_at = None;
        }
        match &mut entry.value {
            Stored::List(list) => f(list),
            _ => Err(AgentError::Persistence(format!(
                "key {key} does not hold a list"
            ))),
        }
    }
}

fn normalize_range(len: usize, start: i64, stop: i64) -> (usize, usize) {
    let len_i = len as i64;
    let norm = |i: i64| -> i64 {
        if i < 0 {
            (len_i + i).max(0)
        } else {
            i
        }
    };
    let start = norm(start).min(len_i);
    let stop = norm(stop).min(len_i - 1);
    if stop < start || len == 0 {
        (0, 0)
    } else {
        (start as usize, stop as usize)
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.live(key).and_then(|e| match &e.value {
            Stored::Scalar(s) => Some(s.clone()),
            _ => None,
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.data.insert(
            key.to_string(),
            Record {
                value: Stored::Scalar(value.to_string()),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let now_live: Vec<String> = self
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && !entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect();
        Ok(now_live)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        if let Some(mut entry) = self.data.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self.live(key).and_then(|e| match &e.value {
            Stored::Hash(h) => h.get(field).cloned(),
            _ => None,
        }))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Record {
                value: Stored::Hash(HashMap::new()),
                expires_at: None,
            });
        if entry.is_expired() {
            entry.value = Stored::Hash(HashMap::new());
            entry.expires_at = None;
        }
        match &mut entry.value {
            Stored::Hash(h) => {
                h.insert(field.to_string(), value.to_string());
                Ok(())
            }
            _ => Err(AgentError::Persistence(format!(
                "key {key} does not hold a hash"
            ))),
        }
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self
            .live(key)
            .and_then(|e| match &e.value {
                Stored::Hash(h) => Some(h.clone()),
                _ => None,
            })
            .unwrap_or_default())
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<u64> {
        self.with_list(key, |list| {
            list.push_back(value.to_string());
            Ok(list.len() as u64)
        })
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let items = self
            .live(key)
            .and_then(|e| match &e.value {
                Stored::List(list) => Some(list.clone()),
                _ => None,
            })
            .unwrap_or_default();
        let (lo, hi) = normalize_range(items.len(), start, stop);
        if items.is_empty() || lo > hi {
            return Ok(vec![]);
        }
        Ok(items.iter().skip(lo).take(hi - lo + 1).cloned().collect())
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<()> {
        self.with_list(key, |list| {
            let (lo, hi) = normalize_range(list.len(), start, stop);
            if list.is_empty() {
                return Ok(());
            }
            let trimmed: VecDeque<String> = list
                .iter()
                .skip(lo)
                .take(hi.saturating_sub(lo) + 1)
                .cloned()
                .collect();
            *list = trimmed;
            Ok(())
        })
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        Ok(self
            .live(key)
            .and_then(|e| match &e.value {
                Stored::List(list) => Some(list.len() as u64),
                _ => None,
            })
            .unwrap_or(0))
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Record {
                value: Stored::Set(OrderedSet::default()),
                expires_at: None,
            });
        if entry.is_expired() {
            entry.value = Stored::Set(OrderedSet::default());
            entry.expires_at = None;
        }
        match &mut entry.value {
            Stored::Set(set) => {
                set.insert(member.to_string());
                Ok(())
            }
            _ => Err(AgentError::Persistence(format!(
                "key {key} does not hold a set"
            ))),
        }
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .live(key)
            .and_then(|e| match &e.value {
                Stored::Set(set) => Some(set.iter().cloned().collect()),
                _ => None,
            })
            .unwrap_or_default())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Record {
                value: Stored::ZSet(Vec::new()),
                expires_at: None,
            });
        if entry.is_expired() {
            entry.value = Stored::ZSet(Vec::new());
            entry.expires_at = None;
        }
        match &mut entry.value {
            Stored::ZSet(members) => {
                if let Some(existing) = members.iter_mut().find(|(m, _)| m == member) {
                    existing.1 = score;
                } else {
                    members.push((member.to_string(), score));
                }
                Ok(())
            }
            _ => Err(AgentError::Persistence(format!(
                "key {key} does not hold a sorted set"
            ))),
        }
    }

    async fn zrange(&self, key: &str, limit: usize, desc: bool) -> Result<Vec<(String, f64)>> {
        let mut members = self
            .live(key)
            .and_then(|e| match &e.value {
                Stored::ZSet(members) => Some(members.clone()),
                _ => None,
            })
            .unwrap_or_default();
        members.sort_by(|a, b| {
            if desc {
                b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
            } else {
                a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
            }
        });
        members.truncate(limit);
        Ok(members)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Record {
                value: Stored::Scalar("0".to_string()),
                expires_at: None,
            });
        if entry.is_expired() {
            entry.value = Stored::Scalar("0".to_string());
            entry.expires_at = None;
        }
        match &mut entry.value {
            Stored::Scalar(s) => {
                let current: i64 = s.parse().unwrap_or(0);
                let next = current + delta;
                *s = next.to_string();
                Ok(next)
            }
            _ => Err(AgentError::Persistence(format!(
                "key {key} does not hold a scalar counter"
            ))),
        }
    }

    async fn incr_by_float(&self, key: &str, delta: f64) -> Result<f64> {
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Record {
                value: Stored::Scalar("0".to_string()),
                expires_at: None,
            });
        if entry.is_expired() {
            entry.value = Stored::Scalar("0".to_string());
            entry.expires_at = None;
        }
        match &mut entry.value {
            Stored::Scalar(s) => {
                let current: f64 = s.parse().unwrap_or(0.0);
                let next = current + delta;
                *s = next.to_string();
                Ok(next)
            }
            _ => Err(AgentError::Persistence(format!(
                "key {key} does not hold a scalar counter"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_roundtrip() {
        let kv = InMemoryKv::new();
        kv.set("agent:a1:state", "hello", None).await.unwrap();
        assert_eq!(
            kv.get("agent:a1:state").await.unwrap(),
            Some("hello".to_string())
        );
    }

    #[tokio::test]
    async fn ttl_expiry_is_lazy_but_honest() {
        let kv = InMemoryKv::new();
        kv.set("k", "v", Some(Duration::from_millis(5)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_bounded_via_ltrim() {
        let kv = InMemoryKv::new();
        for i in 0..10 {
            kv.rpush("log", &i.to_string()).await.unwrap();
        }
        kv.ltrim("log", -5, -1).await.unwrap();
        let items = kv.lrange("log", 0, -1).await.unwrap();
        assert_eq!(items, vec!["5", "6", "7", "8", "9"]);
    }

    #[tokio::test]
    async fn prefix_delete_scan() {
        let kv = InMemoryKv::new();
        kv.set("agent:a1:state", "x", None).await.unwrap();
        kv.set("agent:a1:heartbeat", "y", None).await.unwrap();
        kv.set("agent:a2:state", "z", None).await.unwrap();
        let keys = kv.keys_with_prefix("agent:a1:").await.unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn zset_orders_by_score_descending() {
        let kv = InMemoryKv::new();
        kv.zadd("leaderboard:badges", "agent-1", 3.0).await.unwrap();
        kv.zadd("leaderboard:badges", "agent-2", 7.0).await.unwrap();
        let top = kv.zrange("leaderboard:badges", 10, true).await.unwrap();
        assert_eq!(top[0].0, "agent-2");
    }

    #[tokio::test]
    async fn incr_by_accumulates() {
        let kv = InMemoryKv::new();
        kv.incr_by("agent:a1:decisions", 1).await.unwrap();
        let n = kv.incr_by("agent:a1:decisions", 1).await.unwrap();
        assert_eq!(n, 2);
    }
}
