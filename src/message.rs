use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 一轮对话的用户消息，构造后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Msg {
    /// 消息 ID（UUID v4），仅用于日志关联
    pub id: String,
    /// 会话标识，对话状态与槽位记忆都以它为作用域
    pub session_id: String,
    /// 原始文本
    pub raw_text: String,
    /// 小写、去标点后的词序列
    pub tokens: Vec<String>,
}

impl Msg {
    pub fn new(session_id: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            tokens: tokenize(&raw_text),
            raw_text,
        }
    }

    /// 词集合（去重）
    pub fn token_set(&self) -> HashSet<&str> {
        self.tokens.iter().map(String::as_str).collect()
    }

    pub fn contains_any<'a>(&self, words: impl IntoIterator<Item = &'a str>) -> bool {
        let set = self.token_set();
        words.into_iter().any(|w| set.contains(w))
    }
}

/// 按任意非字母数字字符切分并转小写
///
/// `"what's the weather in LA?"` → `["what", "s", "the", "weather", "in", "la"]`
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}
