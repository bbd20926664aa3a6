//! 关键词处理器：温度 / 是否下雨
//!
//! 两个处理器共用同一套城市解析：本轮消息里的城市优先（并缓存到记忆），
//! 否则使用记忆里上一轮留下的城市。都找不到时记下问题类型并返回空字符串，
//! 交给状态机；城市补齐后状态机按同一类型回答。

use super::format::{APOLOGY, ReportKind};
use super::{CITY_KEY, REPORT_KIND_KEY, WeatherContext};
use crate::dialog::KeywordAction;
use crate::error::{Result, SkillError};
use crate::memory::SlotMemory;
use crate::message::Msg;
use crate::services::City;
use async_trait::async_trait;
use tracing::{debug, warn};

/// 解析本轮要查询的城市
///
/// `Ok(None)` 表示消息和记忆里都没有城市；`NotFound` 以外的抽取错误向上传播。
pub(crate) async fn resolve_city(
    ctx: &WeatherContext,
    memory: &SlotMemory,
    msg: &Msg,
) -> Result<Option<City>> {
    match ctx.extractor.extract(msg).await {
        Ok(cities) if !cities.is_empty() => {
            let city = cities.into_iter().next();
            if let Some(city) = &city
                && let Err(e) = memory.set(&msg.session_id, CITY_KEY, city).await
            {
                warn!(session_id = %msg.session_id, "⚠️ 缓存城市失败: {e}");
            }
            Ok(city)
        }
        Ok(_) => Ok(memory.get_as(&msg.session_id, CITY_KEY).await),
        Err(e) if e.is_not_found() => {
            debug!(session_id = %msg.session_id, "消息中没有城市，尝试记忆");
            Ok(memory.get_as(&msg.session_id, CITY_KEY).await)
        }
        Err(e) => Err(e),
    }
}

/// 查询天气并按 `kind` 组织句子；数据源出错时返回道歉语
pub(crate) async fn lookup(ctx: &WeatherContext, city: &City, kind: ReportKind) -> String {
    match ctx.weather.fetch(&city.name).await {
        Ok(report) => kind.render(&city.name, &report),
        Err(e) => apologize(&e),
    }
}

pub(crate) fn apologize(err: &SkillError) -> String {
    warn!("⚠️ 天气查询失败: {err}");
    APOLOGY.to_string()
}

async fn answer(ctx: &WeatherContext, memory: &SlotMemory, msg: &Msg, kind: ReportKind) -> String {
    match resolve_city(ctx, memory, msg).await {
        Ok(Some(city)) => lookup(ctx, &city, kind).await,
        Ok(None) => {
            if let Err(e) = memory.set(&msg.session_id, REPORT_KIND_KEY, &kind).await {
                warn!(session_id = %msg.session_id, "⚠️ 记录问题类型失败: {e}");
            }
            String::new()
        }
        Err(e) => apologize(&e),
    }
}

/// "what's the weather / temperature ..."
pub struct TemperatureHandler;

#[async_trait]
impl KeywordAction<WeatherContext> for TemperatureHandler {
    async fn handle(&self, ctx: &WeatherContext, memory: &SlotMemory, msg: &Msg) -> String {
        answer(ctx, memory, msg, ReportKind::Weather).await
    }
}

/// "is it going to rain / tell me if it will rain ..."
pub struct RainHandler;

#[async_trait]
impl KeywordAction<WeatherContext> for RainHandler {
    async fn handle(&self, ctx: &WeatherContext, memory: &SlotMemory, msg: &Msg) -> String {
        answer(ctx, memory, msg, ReportKind::Rain).await
    }
}
