//! 槽位填充状态机
//!
//! 状态机是一串有序的 [`DialogueState`]，游标（cursor）指向当前状态，按
//! `[plugin_id, session_id]` 持久化在槽位记忆里，跨轮次保留。
//!
//! 每次 [`StateMachine::next`] 恰好推进一步：
//!
//! ```text
//! on_input ──▶ is_complete ─┬─ response 非空 ──▶ 直接返回（游标不动）
//!                           ├─ done = false ──▶ on_entry（重新提问）
//!                           └─ done = true  ──▶ cursor += 1
//!                                                 │ 上一状态 skip_if_complete 且
//!                                                 │ 新状态已完成 → 继续前进
//!                                                 ▼
//!                                          新状态 on_entry / 流程结束返回 ""
//! ```
//!
//! 状态之间互不引用，也不持有状态机本身；所需的上下文、记忆和消息都以参数传入。

use crate::error::Result;
use crate::memory::SlotMemory;
use crate::message::Msg;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// 游标在槽位记忆中的保留键
pub const CURSOR_KEY: &str = "__state";

/// `is_complete` 的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// 本状态需要的信息是否已齐全
    pub done: bool,
    /// 非空时直接作为本轮回答返回，游标不前进
    pub response: String,
}

impl Completion {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn done() -> Self {
        Self {
            done: true,
            response: String::new(),
        }
    }

    pub fn answer(response: impl Into<String>) -> Self {
        Self {
            done: false,
            response: response.into(),
        }
    }
}

/// 对话状态
#[async_trait]
pub trait DialogueState<C: Sync>: Send + Sync {
    /// 状态名（仅用于日志）
    fn name(&self) -> &str;

    /// 进入本状态（或信息仍不足需要重新提问）时的回答
    async fn on_entry(&self, ctx: &C, memory: &SlotMemory, msg: &Msg) -> String;

    /// 尽力从消息中抽取信息并写入记忆；失败只记日志，不会中断本轮
    async fn on_input(&self, ctx: &C, memory: &SlotMemory, msg: &Msg) -> Result<()>;

    async fn is_complete(&self, ctx: &C, memory: &SlotMemory, msg: &Msg) -> Completion;

    /// 本状态完成后，若下一个状态已经满足，则直接跳过它
    fn skip_if_complete(&self) -> bool {
        false
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CursorRecord {
    cursor: usize,
}

pub struct StateMachine<C: Sync> {
    states: Vec<Box<dyn DialogueState<C>>>,
    /// `reset` 时需要清除的槽位键
    reset_keys: Vec<String>,
}

impl<C: Sync> Default for StateMachine<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Sync> StateMachine<C> {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            reset_keys: Vec::new(),
        }
    }

    pub fn with_states(mut self, states: Vec<Box<dyn DialogueState<C>>>) -> Self {
        self.states = states;
        self
    }

    /// 声明本技能拥有、`reset` 时要清除的槽位键，其余记忆不受影响
    pub fn on_reset(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.reset_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// 读取会话游标；不存在或损坏按 0 处理，越界则截断到 `len()`
    pub async fn cursor(&self, memory: &SlotMemory, session_id: &str) -> usize {
        memory
            .get_as::<CursorRecord>(session_id, CURSOR_KEY)
            .await
            .map(|r| r.cursor.min(self.states.len()))
            .unwrap_or(0)
    }

    async fn save_cursor(&self, memory: &SlotMemory, session_id: &str, cursor: usize) -> Result<()> {
        memory
            .set(session_id, CURSOR_KEY, &CursorRecord { cursor })
            .await
    }

    /// 流程是否已走完（或根本没有状态）
    pub async fn is_finished(&self, memory: &SlotMemory, session_id: &str) -> bool {
        self.cursor(memory, session_id).await >= self.states.len()
    }

    /// 推进一步并返回本轮回答；流程已结束时返回空字符串
    pub async fn next(&self, ctx: &C, memory: &SlotMemory, msg: &Msg) -> Result<String> {
        let session_id = msg.session_id.as_str();
        let mut cursor = self.cursor(memory, session_id).await;
        let Some(current) = self.states.get(cursor) else {
            debug!(session_id = %session_id, "流程已结束，无可推进的状态");
            return Ok(String::new());
        };

        if let Err(e) = current.on_input(ctx, memory, msg).await {
            warn!(session_id = %session_id, state = %current.name(), "⚠️ on_input 失败: {e}");
        }

        let completion = current.is_complete(ctx, memory, msg).await;
        if !completion.response.is_empty() {
            debug!(session_id = %session_id, state = %current.name(), "状态直接给出回答");
            return Ok(completion.response);
        }
        if !completion.done {
            debug!(session_id = %session_id, state = %current.name(), "🔁 信息不足，重新提问");
            return Ok(current.on_entry(ctx, memory, msg).await);
        }

        let mut completed = current;
        let next = loop {
            cursor += 1;
            let Some(next) = self.states.get(cursor) else {
                break None;
            };
            if completed.skip_if_complete() && next.is_complete(ctx, memory, msg).await.done {
                debug!(session_id = %session_id, state = %next.name(), "⏭️ 状态已满足，跳过");
                completed = next;
                continue;
            }
            break Some(next);
        };
        self.save_cursor(memory, session_id, cursor).await?;

        match next {
            Some(state) => {
                info!(session_id = %session_id, cursor, state = %state.name(), "➡️ 进入新状态");
                Ok(state.on_entry(ctx, memory, msg).await)
            }
            None => {
                info!(session_id = %session_id, "🏁 流程完成");
                Ok(String::new())
            }
        }
    }

    /// 游标归零，并清除 `on_reset` 声明的槽位
    pub async fn reset(&self, memory: &SlotMemory, msg: &Msg) -> Result<()> {
        let session_id = msg.session_id.as_str();
        for key in &self.reset_keys {
            memory.clear(session_id, key).await?;
        }
        self.save_cursor(memory, session_id, 0).await?;
        debug!(session_id = %session_id, keys = ?self.reset_keys, "🔄 状态机已重置");
        Ok(())
    }
}
