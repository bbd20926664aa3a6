//! 槽位记忆的存储后端
//!
//! 以 `namespace / key / value` 三元组组织数据，namespace 是 `&[&str]` 切片
//! （如 `&["weather", "session-1"]`），天然支持多技能/多会话隔离。
//!
//! ## 内置实现
//!
//! - [`InMemoryStore`]：进程内存，适合测试
//! - [`FileStore`]：JSON 文件持久化，零额外依赖
//!
//! ## 快速上手
//!
//! ```rust,no_run
//! use echo_weather::memory::store::{FileStore, Store};
//! use std::sync::Arc;
//!
//! # async fn example() -> echo_weather::error::Result<()> {
//! let store = Arc::new(FileStore::new("~/.echo-weather/store.json")?);
//!
//! store.put(&["weather", "alice"], "city", serde_json::json!({
//!     "name": "Los Angeles"
//! })).await?;
//!
//! let item = store.get(&["weather", "alice"], "city").await?;
//! assert!(item.is_some());
//! # Ok(())
//! # }
//! ```

use crate::error::{MemoryError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// namespace_key → (key → item)
type Buckets = HashMap<String, HashMap<String, StoreItem>>;

// ── StoreItem ────────────────────────────────────────────────────────────────

/// Store 中的单条记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreItem {
    /// 命名空间（如 `["weather", "session-1"]`）
    pub namespace: Vec<String>,
    /// 条目唯一键
    pub key: String,
    /// 任意 JSON 值
    pub value: Value,
    /// 创建时间（Unix 秒）
    pub created_at: u64,
    /// 最后更新时间（Unix 秒）
    pub updated_at: u64,
}

impl StoreItem {
    fn new(namespace: &[&str], key: &str, value: Value) -> Self {
        let now = now_secs();
        Self {
            namespace: namespace.iter().map(|s| s.to_string()).collect(),
            key: key.to_string(),
            value,
            created_at: now,
            updated_at: now,
        }
    }
}

// ── Store trait ───────────────────────────────────────────────────────────────

/// 槽位记忆的统一存储接口
///
/// 单个操作是原子的（内部持锁），跨操作的一致性由上层的会话锁保证。
#[async_trait]
pub trait Store: Send + Sync {
    /// 写入或更新一条记录（upsert）
    async fn put(&self, namespace: &[&str], key: &str, value: Value) -> Result<()>;

    /// 按 key 精确获取
    async fn get(&self, namespace: &[&str], key: &str) -> Result<Option<StoreItem>>;

    /// 删除指定 key，返回是否存在并删除
    async fn delete(&self, namespace: &[&str], key: &str) -> Result<bool>;

    /// 列举满足 `prefix` 前缀的所有命名空间
    async fn list_namespaces(&self, prefix: Option<&[&str]>) -> Result<Vec<Vec<String>>>;
}

// ── InMemoryStore ─────────────────────────────────────────────────────────────

/// 进程内存 Store，不持久化，适合测试和短生命周期使用
pub struct InMemoryStore {
    data: RwLock<Buckets>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn put(&self, namespace: &[&str], key: &str, value: Value) -> Result<()> {
        upsert(&mut *self.data.write().await, namespace, key, value);
        Ok(())
    }

    async fn get(&self, namespace: &[&str], key: &str) -> Result<Option<StoreItem>> {
        Ok(lookup(&*self.data.read().await, namespace, key))
    }

    async fn delete(&self, namespace: &[&str], key: &str) -> Result<bool> {
        Ok(remove(&mut *self.data.write().await, namespace, key))
    }

    async fn list_namespaces(&self, prefix: Option<&[&str]>) -> Result<Vec<Vec<String>>> {
        Ok(namespaces(&*self.data.read().await, prefix))
    }
}

// ── FileStore ─────────────────────────────────────────────────────────────────

/// 基于 JSON 文件的持久化 Store
///
/// 写时立即落盘，读时从内存缓存返回。存储格式：
/// ```json
/// {
///   "weather/session-1": {
///     "city": { "namespace": [...], "key": "city", "value": {...}, "created_at": 123, "updated_at": 456 }
///   }
/// }
/// ```
pub struct FileStore {
    path: PathBuf,
    data: RwLock<Buckets>,
}

impl FileStore {
    /// 打开或创建 Store 文件，自动建父目录
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_tilde(path.as_ref());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MemoryError::IoError(format!("创建目录失败: {e}")))?;
        }
        let data: Buckets = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| MemoryError::IoError(format!("读取 store 文件失败: {e}")))?;
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Store 文件解析失败，从空状态开始: {e}");
                HashMap::new()
            })
        } else {
            HashMap::new()
        };
        let item_count: usize = data.values().map(HashMap::len).sum();
        info!(path = %path.display(), namespaces = data.len(), items = item_count, "🗄️ FileStore 初始化");
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// 在持有写锁的情况下落盘，保证文件内容与本次变更一致
    async fn flush(&self, data: &Buckets) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| MemoryError::SerializationError(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| MemoryError::IoError(format!("写入 store 文件失败: {e}")))?;
        debug!(path = %self.path.display(), "💾 Store 已持久化");
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn put(&self, namespace: &[&str], key: &str, value: Value) -> Result<()> {
        let mut data = self.data.write().await;
        upsert(&mut data, namespace, key, value);
        self.flush(&data).await
    }

    async fn get(&self, namespace: &[&str], key: &str) -> Result<Option<StoreItem>> {
        Ok(lookup(&*self.data.read().await, namespace, key))
    }

    async fn delete(&self, namespace: &[&str], key: &str) -> Result<bool> {
        let mut data = self.data.write().await;
        let found = remove(&mut data, namespace, key);
        if found {
            self.flush(&data).await?;
        }
        Ok(found)
    }

    async fn list_namespaces(&self, prefix: Option<&[&str]>) -> Result<Vec<Vec<String>>> {
        Ok(namespaces(&*self.data.read().await, prefix))
    }
}

// ── 私有工具函数 ──────────────────────────────────────────────────────────────

fn upsert(data: &mut Buckets, namespace: &[&str], key: &str, value: Value) {
    data.entry(namespace.join("/"))
        .or_default()
        .entry(key.to_string())
        .and_modify(|item| {
            item.value = value.clone();
            item.updated_at = now_secs();
        })
        .or_insert_with(|| StoreItem::new(namespace, key, value));
}

fn lookup(data: &Buckets, namespace: &[&str], key: &str) -> Option<StoreItem> {
    data.get(&namespace.join("/"))
        .and_then(|b| b.get(key))
        .cloned()
}

fn remove(data: &mut Buckets, namespace: &[&str], key: &str) -> bool {
    let ns_key = namespace.join("/");
    let found = data
        .get_mut(&ns_key)
        .map(|b| b.remove(key).is_some())
        .unwrap_or(false);
    if data.get(&ns_key).is_some_and(HashMap::is_empty) {
        data.remove(&ns_key);
    }
    found
}

fn namespaces(data: &Buckets, prefix: Option<&[&str]>) -> Vec<Vec<String>> {
    let prefix: Vec<&str> = prefix.unwrap_or(&[]).to_vec();
    let mut out: Vec<Vec<String>> = data
        .keys()
        .map(|k| k.split('/').map(String::from).collect::<Vec<_>>())
        .filter(|ns| ns.len() >= prefix.len() && ns.iter().zip(&prefix).all(|(a, b)| a == b))
        .collect();
    out.sort();
    out
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/")
        && let Some(home) = std::env::var("HOME")
            .ok()
            .or_else(|| std::env::var("USERPROFILE").ok())
    {
        return PathBuf::from(home).join(rest);
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("echo-weather-test-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[tokio::test]
    async fn test_put_overwrites_and_keeps_created_at() {
        let store = InMemoryStore::new();
        store.put(&["weather", "s1"], "city", json!({"name": "LA"})).await.unwrap();
        let first = store.get(&["weather", "s1"], "city").await.unwrap().unwrap();

        store.put(&["weather", "s1"], "city", json!({"name": "Paris"})).await.unwrap();
        let second = store.get(&["weather", "s1"], "city").await.unwrap().unwrap();

        assert_eq!(second.value, json!({"name": "Paris"}));
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = InMemoryStore::new();
        store.put(&["weather", "s1"], "city", json!("LA")).await.unwrap();

        // 另一个会话、另一个技能都看不到
        assert!(store.get(&["weather", "s2"], "city").await.unwrap().is_none());
        assert!(store.get(&["calendar", "s1"], "city").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_list_namespaces() {
        let store = InMemoryStore::new();
        store.put(&["weather", "s1"], "city", json!("LA")).await.unwrap();
        store.put(&["weather", "s2"], "city", json!("NYC")).await.unwrap();
        store.put(&["calendar", "s1"], "event", json!("standup")).await.unwrap();

        let weather = store.list_namespaces(Some(&["weather"])).await.unwrap();
        assert_eq!(
            weather,
            vec![
                vec!["weather".to_string(), "s1".to_string()],
                vec!["weather".to_string(), "s2".to_string()],
            ]
        );

        assert!(store.delete(&["weather", "s1"], "city").await.unwrap());
        assert!(!store.delete(&["weather", "s1"], "city").await.unwrap());
        // 空命名空间被回收
        assert_eq!(store.list_namespaces(Some(&["weather"])).await.unwrap().len(), 1);
        assert_eq!(store.list_namespaces(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let path = temp_store_path("store.json");
        {
            let store = FileStore::new(&path).unwrap();
            store.put(&["weather", "s1"], "city", json!({"name": "LA"})).await.unwrap();
        }

        let reopened = FileStore::new(&path).unwrap();
        let item = reopened.get(&["weather", "s1"], "city").await.unwrap();
        assert_eq!(item.map(|i| i.value), Some(json!({"name": "LA"})));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_starts_empty() {
        let path = temp_store_path("store.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStore::new(&path).unwrap();
        assert!(store.list_namespaces(None).await.unwrap().is_empty());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
