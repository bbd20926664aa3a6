//! 对话调度
//!
//! | 组件 | 作用 |
//! |------|------|
//! | [`Vocab`] | 无状态关键词路由，每轮最先尝试 |
//! | [`StateMachine`] | 槽位填充状态机，路由答不上来时接手 |
//! | [`DialogueEngine`] | 组合根：`run` 重置会话，`follow_up` 路由 → 状态机 |

pub mod engine;
pub mod router;
pub mod state_machine;

pub use engine::DialogueEngine;
pub use router::{KeywordAction, KeywordHandler, Trigger, Vocab};
pub use state_machine::{CURSOR_KEY, Completion, DialogueState, StateMachine};
