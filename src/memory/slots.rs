//! 会话级槽位记忆
//!
//! [`SlotMemory`] 在 [`Store`] 之上加了两层约定：
//!
//! - 命名空间固定为 `[plugin_id, session_id]`，不同技能、不同会话互不可见；
//! - 值以 JSON 存储，按调用方期望的类型反序列化。类型不匹配或数据损坏
//!   一律视为"未命中"（记 warn 日志），不会让本轮对话失败。

use crate::error::{MemoryError, Result};
use crate::memory::store::Store;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct SlotMemory {
    store: Arc<dyn Store>,
    plugin_id: String,
}

impl SlotMemory {
    pub fn new(store: Arc<dyn Store>, plugin_id: impl Into<String>) -> Self {
        Self {
            store,
            plugin_id: plugin_id.into(),
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    fn namespace<'a>(&'a self, session_id: &'a str) -> [&'a str; 2] {
        [self.plugin_id.as_str(), session_id]
    }

    /// 写入（覆盖）一个槽位
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        session_id: &str,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| MemoryError::SerializationError(e.to_string()))?;
        debug!(plugin = %self.plugin_id, session_id = %session_id, key = %key, "📝 写入槽位");
        self.store
            .put(&self.namespace(session_id), key, value)
            .await
    }

    /// 读取原始 JSON 值
    pub async fn get(&self, session_id: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .store
            .get(&self.namespace(session_id), key)
            .await?
            .map(|item| item.value))
    }

    /// 按类型读取槽位；存储出错、缺失或反序列化失败都返回 `None`
    pub async fn get_as<T: DeserializeOwned>(&self, session_id: &str, key: &str) -> Option<T> {
        let value = match self.get(session_id, key).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!(session_id = %session_id, key = %key, "⚠️ 读取槽位失败: {e}");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(session_id = %session_id, key = %key, "⚠️ 槽位反序列化失败，按未命中处理: {e}");
                None
            }
        }
    }

    pub async fn has(&self, session_id: &str, key: &str) -> Result<bool> {
        Ok(self.get(session_id, key).await?.is_some())
    }

    /// 删除一个槽位，返回是否存在
    pub async fn clear(&self, session_id: &str, key: &str) -> Result<bool> {
        debug!(plugin = %self.plugin_id, session_id = %session_id, key = %key, "🧹 清除槽位");
        self.store.delete(&self.namespace(session_id), key).await
    }
}
