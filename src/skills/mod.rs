//! Skill 系统
//!
//! Skill 是挂在宿主上的一个对话能力单元，声明若干粗粒度触发词组，
//! 由宿主决定每条消息是新问题（[`Skill::run`]）还是对上一问题的后续（[`Skill::follow_up`]）。
//! [`SkillManager`] 就是这样一个进程内的最小宿主。

pub mod weather;

pub use weather::WeatherSkill;

use crate::dialog::Trigger;
use crate::error::Result;
use crate::message::Msg;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

// ── Skill Trait ───────────────────────────────────────────────────────────────

/// 对话技能
///
/// # 实现示例
///
/// ```rust
/// use async_trait::async_trait;
/// use echo_weather::dialog::Trigger;
/// use echo_weather::error::Result;
/// use echo_weather::message::Msg;
/// use echo_weather::skills::Skill;
///
/// struct Greeter {
///     triggers: Vec<Trigger>,
/// }
///
/// #[async_trait]
/// impl Skill for Greeter {
///     fn name(&self) -> &str { "greeter" }
///     fn description(&self) -> &str { "打招呼" }
///     fn triggers(&self) -> &[Trigger] { &self.triggers }
///     async fn run(&self, _msg: &Msg) -> Result<String> { Ok("Hi!".to_string()) }
///     async fn follow_up(&self, _msg: &Msg) -> Result<String> { Ok(String::new()) }
/// }
/// ```
#[async_trait]
pub trait Skill: Send + Sync {
    /// Skill 唯一标识名（建议小写下划线，如 "weather"）
    fn name(&self) -> &str;

    /// 人类可读的功能描述（展示给开发者）
    fn description(&self) -> &str;

    /// 宿主用来识别新问题的触发词组，任意一组命中即路由到 [`Skill::run`]
    fn triggers(&self) -> &[Trigger];

    /// 新的顶层问题：重置会话后处理本轮
    async fn run(&self, msg: &Msg) -> Result<String>;

    /// 同一话题的后续消息：沿用会话状态处理本轮
    async fn follow_up(&self, msg: &Msg) -> Result<String>;
}

// ── SkillInfo ─────────────────────────────────────────────────────────────────

/// 已注册 Skill 的元数据快照（用于查询/展示，不持有原 Skill 对象）
#[derive(Debug, Clone)]
pub struct SkillInfo {
    pub name: String,
    pub description: String,
    /// 触发词组数量
    pub trigger_count: usize,
}

/// 一次分发的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// 处理本条消息的 Skill
    pub skill: String,
    /// 是否走的 `run`（否则为 `follow_up`）
    pub fresh: bool,
    /// 回答；空字符串表示 Skill 让出了本轮
    pub text: String,
}

// ── SkillManager ──────────────────────────────────────────────────────────────

/// Skill 管理器
///
/// 按注册顺序保存 Skill，并记录每个会话当前活跃的 Skill：
/// 触发词命中时调用 `run` 并把它设为活跃；否则把消息作为后续交给活跃 Skill；
/// 两者都没有时不回答。Skill 返回空回答即视为让出会话，活跃记录随之清除。
pub struct SkillManager {
    skills: Vec<Arc<dyn Skill>>,
    infos: HashMap<String, SkillInfo>,
    /// session_id → skill name
    active: RwLock<HashMap<String, String>>,
}

impl SkillManager {
    pub fn new() -> Self {
        Self {
            skills: Vec::new(),
            infos: HashMap::new(),
            active: RwLock::new(HashMap::new()),
        }
    }

    /// 注册一个 Skill；同名 Skill 会被替换
    pub fn register(&mut self, skill: Arc<dyn Skill>) {
        let name = skill.name().to_string();
        if self.infos.contains_key(&name) {
            warn!(skill = %name, "⚠️ Skill 已存在，将被替换");
            self.skills.retain(|s| s.name() != name);
        }
        self.infos.insert(
            name.clone(),
            SkillInfo {
                name: name.clone(),
                description: skill.description().to_string(),
                trigger_count: skill.triggers().len(),
            },
        );
        self.skills.push(skill);
        info!(skill = %name, "🧩 Skill 已注册");
    }

    /// 查询是否已安装某 Skill
    pub fn is_installed(&self, name: &str) -> bool {
        self.infos.contains_key(name)
    }

    /// 获取已安装的 Skill 数量
    pub fn count(&self) -> usize {
        self.skills.len()
    }

    /// 列出所有已安装 Skill 的元数据
    pub fn list(&self) -> Vec<&SkillInfo> {
        let mut infos: Vec<&SkillInfo> = self.infos.values().collect();
        infos.sort_by_key(|i| &i.name);
        infos
    }

    /// 获取某个 Skill 的元数据
    pub fn get(&self, name: &str) -> Option<&SkillInfo> {
        self.infos.get(name)
    }

    /// 会话当前活跃的 Skill
    pub fn active_skill(&self, session_id: &str) -> Option<String> {
        self.active
            .read()
            .ok()
            .and_then(|map| map.get(session_id).cloned())
    }

    /// 把一条消息分发给合适的 Skill；没有 Skill 接手时返回 `None`
    pub async fn dispatch(&self, msg: &Msg) -> Result<Option<Reply>> {
        let session_id = msg.session_id.as_str();

        let triggered = self
            .skills
            .iter()
            .find(|s| s.triggers().iter().any(|t| t.matches(msg)));
        if let Some(skill) = triggered {
            debug!(session_id = %session_id, skill = %skill.name(), "🎯 触发词命中，开始新问题");
            self.set_active(session_id, skill.name());
            let text = skill.run(msg).await?;
            self.release_if_idle(session_id, &text);
            return Ok(Some(Reply {
                skill: skill.name().to_string(),
                fresh: true,
                text,
            }));
        }

        let Some(name) = self.active_skill(session_id) else {
            debug!(session_id = %session_id, "没有活跃的 Skill，忽略消息");
            return Ok(None);
        };
        let Some(skill) = self.skills.iter().find(|s| s.name() == name) else {
            return Ok(None);
        };
        debug!(session_id = %session_id, skill = %name, "↪️ 交给活跃 Skill 继续");
        let text = skill.follow_up(msg).await?;
        self.release_if_idle(session_id, &text);
        Ok(Some(Reply {
            skill: name,
            fresh: false,
            text,
        }))
    }

    /// 结束会话：忘掉活跃 Skill，下一条消息必须重新触发
    pub fn end_session(&self, session_id: &str) -> bool {
        match self.active.write() {
            Ok(mut map) => map.remove(session_id).is_some(),
            Err(_) => false,
        }
    }

    /// 空回答表示 Skill 已经让出会话（流程结束或不接手），不再保留活跃记录
    fn release_if_idle(&self, session_id: &str, text: &str) {
        if text.is_empty() && self.end_session(session_id) {
            debug!(session_id = %session_id, "Skill 让出会话，清除活跃记录");
        }
    }

    /// 当前保留活跃 Skill 的会话数量
    pub fn active_sessions(&self) -> usize {
        self.active.read().map(|map| map.len()).unwrap_or(0)
    }

    fn set_active(&self, session_id: &str, skill: &str) {
        if let Ok(mut map) = self.active.write() {
            map.insert(session_id.to_string(), skill.to_string());
        }
    }
}

impl Default for SkillManager {
    fn default() -> Self {
        Self::new()
    }
}
