use crate::dialog::router::Vocab;
use crate::dialog::state_machine::StateMachine;
use crate::error::Result;
use crate::memory::{SessionLocks, SlotMemory};
use crate::message::Msg;
use tracing::{debug, info};

/// 双模式对话引擎：先走关键词路由，路由答不上来再交给状态机
///
/// 引擎持有技能上下文 `C`（外部协作者等），并在每次调用时显式传给处理器和状态；
/// 同一会话的轮次在会话锁下串行执行。
pub struct DialogueEngine<C: Sync> {
    ctx: C,
    memory: SlotMemory,
    router: Vocab<C>,
    machine: StateMachine<C>,
    locks: SessionLocks,
}

impl<C: Sync> DialogueEngine<C> {
    pub fn new(ctx: C, memory: SlotMemory, router: Vocab<C>, machine: StateMachine<C>) -> Self {
        Self {
            ctx,
            memory,
            router,
            machine,
            locks: SessionLocks::new(),
        }
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn memory(&self) -> &SlotMemory {
        &self.memory
    }

    pub fn router(&self) -> &Vocab<C> {
        &self.router
    }

    pub fn machine(&self) -> &StateMachine<C> {
        &self.machine
    }

    /// 全新的顶层命令：先重置会话，再按后续轮次处理
    pub async fn run(&self, msg: &Msg) -> Result<String> {
        let _guard = self.locks.acquire(&msg.session_id).await;
        info!(session_id = %msg.session_id, msg_id = %msg.id, "🆕 新的顶层命令");
        self.machine.reset(&self.memory, msg).await?;
        self.step(msg).await
    }

    /// 进行中的多轮对话的后续轮次
    pub async fn follow_up(&self, msg: &Msg) -> Result<String> {
        let _guard = self.locks.acquire(&msg.session_id).await;
        self.step(msg).await
    }

    async fn step(&self, msg: &Msg) -> Result<String> {
        let resp = self
            .router
            .handle_keywords(&self.ctx, &self.memory, msg)
            .await;
        if !resp.is_empty() {
            debug!(session_id = %msg.session_id, "关键词路由已回答");
            return Ok(resp);
        }
        self.machine.next(&self.ctx, &self.memory, msg).await
    }
}
