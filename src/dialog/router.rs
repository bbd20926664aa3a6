//! 关键词意图路由
//!
//! 每轮对话最先尝试的无状态分派表。一个 [`Trigger`] 由命令词集合和对象词集合
//! 组成，消息的词集合必须与**两个**集合都有交集才算命中：
//!
//! ```text
//! commands: what show tell      objects: weather temperature temp outside
//! "what's the weather in LA?"   → what ∩ commands, weather ∩ objects → 命中
//! "the weather in LA"           → 没有命令词 → 不命中
//! ```

use crate::memory::SlotMemory;
use crate::message::Msg;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

// ── Trigger ──────────────────────────────────────────────────────────────────

/// 触发词对（命令词, 对象词），统一存小写
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trigger {
    commands: HashSet<String>,
    objects: HashSet<String>,
}

impl Trigger {
    pub fn new<S: AsRef<str>>(
        commands: impl IntoIterator<Item = S>,
        objects: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            commands: normalize(commands),
            objects: normalize(objects),
        }
    }

    pub fn commands(&self) -> &HashSet<String> {
        &self.commands
    }

    pub fn objects(&self) -> &HashSet<String> {
        &self.objects
    }

    /// 消息中至少含一个命令词且至少含一个对象词
    pub fn matches(&self, msg: &Msg) -> bool {
        let tokens = msg.token_set();
        self.commands.iter().any(|w| tokens.contains(w.as_str()))
            && self.objects.iter().any(|w| tokens.contains(w.as_str()))
    }
}

fn normalize<S: AsRef<str>>(words: impl IntoIterator<Item = S>) -> HashSet<String> {
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

// ── KeywordAction / KeywordHandler ───────────────────────────────────────────

/// 触发词命中后执行的处理函数
///
/// 返回空字符串表示"语法上命中，但信息不足"（例如不知道城市），路由会继续尝试
/// 后续处理器。处理器可以读写槽位记忆。
#[async_trait]
pub trait KeywordAction<C: Sync>: Send + Sync {
    async fn handle(&self, ctx: &C, memory: &SlotMemory, msg: &Msg) -> String;
}

/// 一条注册在路由表里的处理器
pub struct KeywordHandler<C: Sync> {
    name: String,
    trigger: Trigger,
    action: Box<dyn KeywordAction<C>>,
}

impl<C: Sync> KeywordHandler<C> {
    pub fn new(
        name: impl Into<String>,
        trigger: Trigger,
        action: impl KeywordAction<C> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            trigger,
            action: Box::new(action),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }
}

// ── Vocab ────────────────────────────────────────────────────────────────────

/// 有序的处理器表，启动时注册，之后不可变
pub struct Vocab<C: Sync> {
    handlers: Vec<KeywordHandler<C>>,
}

impl<C: Sync> Vocab<C> {
    pub fn new(handlers: Vec<KeywordHandler<C>>) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> &[KeywordHandler<C>] {
        &self.handlers
    }

    /// 所有处理器对象词的并集
    pub fn object_words(&self) -> HashSet<&str> {
        self.handlers
            .iter()
            .flat_map(|h| h.trigger.objects.iter().map(String::as_str))
            .collect()
    }

    /// 按注册顺序尝试处理器，第一个非空回答胜出
    ///
    /// 返回空字符串是明确的信号：交给状态机处理。
    pub async fn handle_keywords(&self, ctx: &C, memory: &SlotMemory, msg: &Msg) -> String {
        for handler in &self.handlers {
            if !handler.trigger.matches(msg) {
                continue;
            }
            debug!(msg_id = %msg.id, handler = %handler.name, "🎯 触发词命中");
            let resp = handler.action.handle(ctx, memory, msg).await;
            if !resp.is_empty() {
                return resp;
            }
            debug!(msg_id = %msg.id, handler = %handler.name, "处理器信息不足，继续尝试");
        }
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 记录调用次数并返回固定回答
    struct Fixed(&'static str);

    #[async_trait]
    impl KeywordAction<AtomicUsize> for Fixed {
        async fn handle(&self, calls: &AtomicUsize, _: &SlotMemory, _: &Msg) -> String {
            calls.fetch_add(1, Ordering::SeqCst);
            self.0.to_string()
        }
    }

    fn memory() -> SlotMemory {
        SlotMemory::new(Arc::new(InMemoryStore::new()), "test")
    }

    fn weather_trigger() -> Trigger {
        Trigger::new(["what", "show", "tell"], ["weather", "temperature"])
    }

    #[test]
    fn test_trigger_requires_both_word_classes() {
        let t = weather_trigger();
        assert!(t.matches(&Msg::new("s", "What's the WEATHER?")));
        assert!(t.matches(&Msg::new("s", "tell me the temperature, please")));
        // 只有对象词
        assert!(!t.matches(&Msg::new("s", "the weather in LA")));
        // 只有命令词
        assert!(!t.matches(&Msg::new("s", "what time is it")));
        // 不做词干化
        assert!(!t.matches(&Msg::new("s", "what about temperatures")));
    }

    #[test]
    fn test_trigger_normalizes_registration() {
        let t = Trigger::new([" What ", ""], ["Weather"]);
        assert_eq!(t.commands().len(), 1);
        assert!(t.commands().contains("what"));
        assert!(t.objects().contains("weather"));
    }

    #[tokio::test]
    async fn test_first_non_empty_handler_wins() {
        let vocab = Vocab::new(vec![
            KeywordHandler::new("empty", weather_trigger(), Fixed("")),
            KeywordHandler::new("first", weather_trigger(), Fixed("first")),
            KeywordHandler::new("second", weather_trigger(), Fixed("second")),
        ]);
        let calls = AtomicUsize::new(0);

        let resp = vocab
            .handle_keywords(&calls, &memory(), &Msg::new("s", "what is the weather"))
            .await;
        assert_eq!(resp, "first");
        // 空回答的处理器被跳过，第三个没有被调用
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_match_returns_empty() {
        let vocab = Vocab::new(vec![KeywordHandler::new(
            "temp",
            weather_trigger(),
            Fixed("answer"),
        )]);
        let calls = AtomicUsize::new(0);

        let resp = vocab
            .handle_keywords(&calls, &memory(), &Msg::new("s", "Los Angeles"))
            .await;
        assert!(resp.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_object_words_union() {
        let vocab = Vocab::new(vec![
            KeywordHandler::new("temp", weather_trigger(), Fixed("")),
            KeywordHandler::new("rain", Trigger::new(["is"], ["rain"]), Fixed("")),
        ]);
        let words = vocab.object_words();
        assert_eq!(words.len(), 3);
        assert!(words.contains("rain"));
    }
}
