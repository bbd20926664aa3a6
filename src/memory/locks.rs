use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

type LockTable = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// 按会话划分的互斥锁表
///
/// 同一会话的两轮对话（例如宿主重复投递）必须串行执行，否则游标和槽位会出现
/// 丢失更新；不同会话之间互不阻塞。
///
/// 表项只在有轮次持有或等待时存在：最后一个守卫释放时把它从表里移除。
#[derive(Default)]
pub struct SessionLocks {
    locks: Arc<Mutex<LockTable>>,
}

/// 会话锁守卫，释放时顺带清理不再使用的表项
pub struct SessionGuard {
    session_id: String,
    table: Arc<Mutex<LockTable>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取会话锁，守卫释放前同一会话的其他轮次会在此等待
    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        let lock = {
            // 表锁只在查找/插入时短暂持有，中毒时沿用内部数据
            let mut locks = lock_table(&self.locks);
            locks
                .entry(session_id.to_string())
                .or_default()
                .clone()
        };
        SessionGuard {
            session_id: session_id.to_string(),
            table: self.locks.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// 当前有轮次持有或等待锁的会话数量
    pub fn len(&self) -> usize {
        lock_table(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        // 新的等待者只会在表锁下克隆 Arc，所以在表锁下看引用计数是准确的：
        // 表本身 + 本守卫 = 2，说明没有其他轮次在等
        let mut table = lock_table(&self.table);
        let idle = table.get(&self.session_id).is_some_and(|entry| {
            Arc::ptr_eq(entry, OwnedMutexGuard::mutex(&guard)) && Arc::strong_count(entry) == 2
        });
        if idle {
            table.remove(&self.session_id);
        }
        drop(guard);
    }
}

fn lock_table(table: &Mutex<LockTable>) -> std::sync::MutexGuard<'_, LockTable> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
