//! 记忆系统
//!
//! | 层次 | 实现 | 作用域 |
//! |------|------|--------|
//! | 存储后端 | [`Store`] / [`InMemoryStore`] / [`FileStore`] | 任意命名空间 |
//! | 槽位记忆 | [`SlotMemory`] | `[plugin_id, session_id]` |
//! | 会话锁 | [`SessionLocks`] | 单个会话的一整轮对话 |
//!
//! ```rust,no_run
//! use echo_weather::memory::{FileStore, SlotMemory};
//! use echo_weather::services::City;
//! use std::sync::Arc;
//!
//! # async fn example() -> echo_weather::error::Result<()> {
//! let store = Arc::new(FileStore::new("~/.echo-weather/store.json")?);
//! let memory = SlotMemory::new(store, "weather");
//! memory.set("alice", "city", &City::new("Los Angeles")).await?;
//! let city: Option<City> = memory.get_as("alice", "city").await;
//! # Ok(())
//! # }
//! ```

pub mod locks;
pub mod slots;
pub mod store;

pub use locks::{SessionGuard, SessionLocks};
pub use slots::SlotMemory;
pub use store::{FileStore, InMemoryStore, Store, StoreItem};
