use super::format::{ASK_CITY, ReportKind};
use super::handlers::lookup;
use super::{AWAITING_CITY_KEY, CITY_KEY, REPORT_KIND_KEY, WeatherContext};
use crate::dialog::{Completion, DialogueState};
use crate::error::Result;
use crate::memory::SlotMemory;
use crate::message::Msg;
use crate::services::City;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, warn};

// ── AskCity ──────────────────────────────────────────────────────────────────

/// 收集城市槽位
///
/// 只有在用户确实在问天气（消息含对象词），或者上一轮已经问过城市时才提问；
/// 其他情况返回空字符串，让宿主去找别的技能。
pub struct AskCity {
    object_words: HashSet<String>,
}

impl AskCity {
    pub fn new<'a>(object_words: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            object_words: object_words.into_iter().map(str::to_string).collect(),
        }
    }

    fn asks_about_weather(&self, msg: &Msg) -> bool {
        msg.contains_any(self.object_words.iter().map(String::as_str))
    }
}

#[async_trait]
impl DialogueState<WeatherContext> for AskCity {
    fn name(&self) -> &str {
        "ask_city"
    }

    async fn on_entry(&self, _: &WeatherContext, memory: &SlotMemory, msg: &Msg) -> String {
        let awaiting = memory
            .get_as::<bool>(&msg.session_id, AWAITING_CITY_KEY)
            .await
            .unwrap_or(false);
        if !awaiting && !self.asks_about_weather(msg) {
            debug!(session_id = %msg.session_id, "不是天气问题，让出本轮");
            return String::new();
        }
        if let Err(e) = memory.set(&msg.session_id, AWAITING_CITY_KEY, &true).await {
            warn!(session_id = %msg.session_id, "⚠️ 记录待答状态失败: {e}");
        }
        ASK_CITY.to_string()
    }

    async fn on_input(&self, ctx: &WeatherContext, memory: &SlotMemory, msg: &Msg) -> Result<()> {
        let cities = match ctx.extractor.extract(msg).await {
            Ok(cities) => cities,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        if let Some(city) = cities.first() {
            debug!(session_id = %msg.session_id, city = %city.name, "📍 记下城市");
            memory.set(&msg.session_id, CITY_KEY, city).await?;
        }
        Ok(())
    }

    async fn is_complete(&self, _: &WeatherContext, memory: &SlotMemory, msg: &Msg) -> Completion {
        match memory.get_as::<City>(&msg.session_id, CITY_KEY).await {
            Some(_) => Completion::done(),
            None => Completion::pending(),
        }
    }
}

// ── ReportWeather ────────────────────────────────────────────────────────────

/// 城市已知，进入即回答；句式沿用触发本次流程的问题类型（默认问天气）。
/// 下一轮到来时流程结束
pub struct ReportWeather;

#[async_trait]
impl DialogueState<WeatherContext> for ReportWeather {
    fn name(&self) -> &str {
        "report_weather"
    }

    async fn on_entry(&self, ctx: &WeatherContext, memory: &SlotMemory, msg: &Msg) -> String {
        match memory.get_as::<City>(&msg.session_id, CITY_KEY).await {
            Some(city) => {
                let kind = memory
                    .get_as::<ReportKind>(&msg.session_id, REPORT_KIND_KEY)
                    .await
                    .unwrap_or_default();
                lookup(ctx, &city, kind).await
            }
            None => {
                warn!(session_id = %msg.session_id, "⚠️ 进入报告状态时没有城市");
                String::new()
            }
        }
    }

    async fn on_input(&self, _: &WeatherContext, _: &SlotMemory, _: &Msg) -> Result<()> {
        Ok(())
    }

    async fn is_complete(&self, _: &WeatherContext, _: &SlotMemory, _: &Msg) -> Completion {
        Completion::done()
    }
}
