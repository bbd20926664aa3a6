//! 天气技能
//!
//! 把对话引擎接到天气领域：
//!
//! - 路由表：温度处理器（`what/show/tell` × `weather/temperature/temp/outside`）、
//!   下雨处理器（`tell/is` × `rain`），按此顺序尝试；
//! - 状态机：`ask_city` → `report_weather`，`reset` 时清除 `city`、`awaiting_city`
//!   和 `report_kind`。
//!
//! ```rust,no_run
//! use echo_weather::memory::InMemoryStore;
//! use echo_weather::message::Msg;
//! use echo_weather::services::{GazetteerExtractor, HttpWeatherService};
//! use echo_weather::skills::{Skill, WeatherSkill};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> echo_weather::error::Result<()> {
//! let skill = WeatherSkill::new(
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(GazetteerExtractor::builtin()),
//!     Arc::new(HttpWeatherService::new("https://www.itsabot.org/api", Duration::from_secs(4))?),
//! );
//! let answer = skill.run(&Msg::new("alice", "what's the weather in LA?")).await?;
//! # Ok(())
//! # }
//! ```

mod format;
mod handlers;
mod states;

pub use format::{APOLOGY, ASK_CITY, ReportKind, format_rain, format_weather};
pub use handlers::{RainHandler, TemperatureHandler};
pub use states::{AskCity, ReportWeather};

use crate::dialog::{DialogueEngine, KeywordHandler, StateMachine, Trigger, Vocab};
use crate::error::Result;
use crate::memory::{SlotMemory, Store};
use crate::message::Msg;
use crate::services::{CityExtractor, WeatherService};
use crate::skills::Skill;
use async_trait::async_trait;
use std::sync::Arc;

pub const PLUGIN_ID: &str = "weather";
pub const CITY_KEY: &str = "city";
pub const AWAITING_CITY_KEY: &str = "awaiting_city";
/// 路由因缺城市没能回答时记下的问题类型
pub const REPORT_KIND_KEY: &str = "report_kind";

/// 技能上下文：处理器和状态需要的外部协作者
pub struct WeatherContext {
    pub extractor: Arc<dyn CityExtractor>,
    pub weather: Arc<dyn WeatherService>,
}

pub struct WeatherSkill {
    engine: DialogueEngine<WeatherContext>,
    triggers: Vec<Trigger>,
}

impl WeatherSkill {
    pub fn new(
        store: Arc<dyn Store>,
        extractor: Arc<dyn CityExtractor>,
        weather: Arc<dyn WeatherService>,
    ) -> Self {
        let vocab = Vocab::new(vec![
            KeywordHandler::new(
                "temperature",
                Trigger::new(
                    ["what", "show", "tell"],
                    ["weather", "temperature", "temp", "outside"],
                ),
                TemperatureHandler,
            ),
            KeywordHandler::new(
                "rain",
                Trigger::new(["tell", "is"], ["rain"]),
                RainHandler,
            ),
        ]);
        let machine = StateMachine::<WeatherContext>::new()
            .with_states(vec![
                Box::new(AskCity::new(vocab.object_words())),
                Box::new(ReportWeather),
            ])
            .on_reset([CITY_KEY, AWAITING_CITY_KEY, REPORT_KIND_KEY]);

        let ctx = WeatherContext { extractor, weather };
        let memory = SlotMemory::new(store, PLUGIN_ID);
        Self {
            engine: DialogueEngine::new(ctx, memory, vocab, machine),
            triggers: vec![Trigger::new(
                ["what", "show", "tell", "is"],
                ["weather", "temperature", "temp", "outside", "raining"],
            )],
        }
    }

    pub fn engine(&self) -> &DialogueEngine<WeatherContext> {
        &self.engine
    }
}

#[async_trait]
impl Skill for WeatherSkill {
    fn name(&self) -> &str {
        PLUGIN_ID
    }

    fn description(&self) -> &str {
        "Answers current-weather questions, asking for the city when it is not known"
    }

    fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    async fn run(&self, msg: &Msg) -> Result<String> {
        self.engine.run(msg).await
    }

    async fn follow_up(&self, msg: &Msg) -> Result<String> {
        self.engine.follow_up(msg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::services::City;
    use crate::testing::{MockCityExtractor, MockWeatherService};
    use serde_json::json;

    struct Fixture {
        skill: WeatherSkill,
        store: Arc<dyn Store>,
        extractor: MockCityExtractor,
        weather: MockWeatherService,
    }

    impl Fixture {
        fn new(extractor: MockCityExtractor, weather: MockWeatherService) -> Self {
            let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
            let skill = WeatherSkill::new(
                store.clone(),
                Arc::new(extractor.clone()),
                Arc::new(weather.clone()),
            );
            Self {
                skill,
                store,
                extractor,
                weather,
            }
        }

        async fn cursor(&self, session: &str) -> usize {
            let engine = self.skill.engine();
            engine.machine().cursor(engine.memory(), session).await
        }

        async fn city(&self, session: &str) -> Option<City> {
            self.skill.engine().memory().get_as(session, CITY_KEY).await
        }
    }

    #[tokio::test]
    async fn test_scenario_a_one_shot_answer() {
        let f = Fixture::new(
            MockCityExtractor::new().with_cities(vec![City::new("LA")]),
            MockWeatherService::new().with_report(&["rain"], 65.4),
        );

        let resp = f.skill.run(&Msg::new("s1", "what's the weather in LA?")).await.unwrap();
        assert_eq!(resp, "It's 65 with rain in LA.");
        assert_eq!(f.weather.cities(), vec!["LA"]);
        // 路由直接回答，状态机游标不动
        assert_eq!(f.cursor("s1").await, 0);
        // 城市被缓存下来
        assert_eq!(f.city("s1").await, Some(City::new("LA")));
    }

    #[tokio::test]
    async fn test_scenario_b_defers_silently() {
        let f = Fixture::new(
            MockCityExtractor::new().with_not_found(),
            MockWeatherService::new(),
        );

        let resp = f.skill.run(&Msg::new("s1", "is it raining?")).await.unwrap();
        assert_eq!(resp, "");
        assert_eq!(f.weather.call_count(), 0);
        assert_eq!(f.cursor("s1").await, 0);
    }

    #[tokio::test]
    async fn test_scenario_c_two_turn_flow() {
        // 第一轮：温度处理器和 ask_city 各抽取一次；第二轮：ask_city 抽取一次
        let f = Fixture::new(
            MockCityExtractor::new()
                .with_not_found()
                .with_not_found()
                .with_cities(vec![City::new("Los Angeles")]),
            MockWeatherService::new().with_report(&["sunny"], 78.2),
        );

        let r1 = f.skill.run(&Msg::new("s1", "what's the weather")).await.unwrap();
        assert_eq!(r1, ASK_CITY);
        assert_eq!(f.cursor("s1").await, 0);

        let r2 = f.skill.follow_up(&Msg::new("s1", "Los Angeles")).await.unwrap();
        assert_eq!(r2, "It's 78 with sunny in Los Angeles.");
        assert_eq!(f.cursor("s1").await, 1);
        assert_eq!(f.city("s1").await, Some(City::new("Los Angeles")));
        assert_eq!(f.extractor.call_count(), 3);

        // 流程走完，再来一轮没有话说
        let r3 = f.skill.follow_up(&Msg::new("s1", "thanks")).await.unwrap();
        assert_eq!(r3, "");
        assert_eq!(f.cursor("s1").await, 2);
    }

    #[tokio::test]
    async fn test_scenario_d_no_description() {
        let f = Fixture::new(
            MockCityExtractor::new().with_cities(vec![City::new("Austin")]),
            MockWeatherService::new().with_report(&[], 72.4),
        );
        let resp = f.skill.run(&Msg::new("s1", "show me the temperature in Austin")).await.unwrap();
        assert_eq!(resp, "It's 72 in Austin right now.");
    }

    #[tokio::test]
    async fn test_reprompts_until_city_given() {
        let f = Fixture::new(
            MockCityExtractor::new()
                .with_not_found()
                .with_not_found()
                .with_not_found()
                .with_cities(vec![City::new("Paris")]),
            MockWeatherService::new().with_report(&[], 55.0),
        );

        assert_eq!(f.skill.run(&Msg::new("s1", "tell me the weather")).await.unwrap(), ASK_CITY);
        // 回答里没有城市也会被再问一次（已经在等城市）
        assert_eq!(f.skill.follow_up(&Msg::new("s1", "hmm")).await.unwrap(), ASK_CITY);
        assert_eq!(f.cursor("s1").await, 0);
        assert_eq!(
            f.skill.follow_up(&Msg::new("s1", "Paris")).await.unwrap(),
            "It's 55 in Paris right now."
        );
    }

    #[tokio::test]
    async fn test_remembered_city_answers_later_turn() {
        let f = Fixture::new(
            MockCityExtractor::new().with_cities(vec![City::new("Chicago")]),
            MockWeatherService::new()
                .with_report(&["snow"], 20.4)
                .with_report(&["snow"], 20.4),
        );

        let first = f.skill.run(&Msg::new("s1", "what's the weather in Chicago")).await.unwrap();
        // 第二轮没有城市（抽取器返回 NotFound），用记忆里的 Chicago
        let second = f
            .skill
            .follow_up(&Msg::new("s1", "what's the temperature outside"))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(f.weather.cities(), vec!["Chicago", "Chicago"]);
    }

    #[tokio::test]
    async fn test_run_resets_but_follow_up_does_not() {
        let f = Fixture::new(
            MockCityExtractor::new()
                .with_not_found()
                .with_not_found()
                .with_cities(vec![City::new("Tokyo")]),
            MockWeatherService::new().with_report(&[], 60.0),
        );
        f.skill.run(&Msg::new("s1", "what's the weather")).await.unwrap();
        f.skill.follow_up(&Msg::new("s1", "Tokyo")).await.unwrap();
        assert_eq!(f.cursor("s1").await, 1);
        f.skill.follow_up(&Msg::new("s1", "ok")).await.unwrap();
        assert_eq!(f.cursor("s1").await, 2);

        // 新的顶层命令：游标归零、城市被清除
        f.skill.run(&Msg::new("s1", "hello there")).await.unwrap();
        assert_eq!(f.cursor("s1").await, 0);
        assert_eq!(f.city("s1").await, None);
    }

    #[tokio::test]
    async fn test_transport_error_apologizes() {
        let f = Fixture::new(
            MockCityExtractor::new().with_cities(vec![City::new("LA")]),
            MockWeatherService::new().with_failure("connection reset by peer"),
        );
        let resp = f.skill.run(&Msg::new("s1", "what's the weather in LA")).await.unwrap();
        assert_eq!(resp, APOLOGY);
        assert!(!resp.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_extraction_failure_apologizes() {
        let f = Fixture::new(
            MockCityExtractor::new().with_failure("gazetteer offline"),
            MockWeatherService::new(),
        );
        let resp = f.skill.run(&Msg::new("s1", "what's the weather in LA")).await.unwrap();
        assert_eq!(resp, APOLOGY);
        assert_eq!(f.weather.call_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_city_is_treated_as_absent() {
        let f = Fixture::new(MockCityExtractor::new(), MockWeatherService::new());
        f.skill.run(&Msg::new("s1", "hello")).await.unwrap();
        f.store
            .put(&[PLUGIN_ID, "s1"], CITY_KEY, json!(42))
            .await
            .unwrap();

        let resp = f.skill.follow_up(&Msg::new("s1", "what's the weather")).await.unwrap();
        assert_eq!(resp, ASK_CITY, "损坏的城市应触发重新提问");
        assert_eq!(f.weather.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rain_handler() {
        let f = Fixture::new(
            MockCityExtractor::new().with_cities(vec![City::new("Seattle")]),
            MockWeatherService::new().with_report(&["light rain"], 50.0),
        );
        let resp = f
            .skill
            .run(&Msg::new("s1", "tell me if it will rain in Seattle"))
            .await
            .unwrap();
        assert_eq!(resp, "It's raining in Seattle right now.");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let f = Fixture::new(
            MockCityExtractor::new().with_cities(vec![City::new("London")]),
            MockWeatherService::new().with_report(&[], 48.0),
        );
        f.skill.run(&Msg::new("alice", "what's the weather in London")).await.unwrap();
        assert_eq!(f.city("alice").await, Some(City::new("London")));
        assert_eq!(f.city("bob").await, None);

        // bob 没有城市，只会被问城市
        let resp = f.skill.follow_up(&Msg::new("bob", "what's the weather")).await.unwrap();
        assert_eq!(resp, ASK_CITY);
    }

    #[tokio::test]
    async fn test_concurrent_turns_same_session() {
        let f = Arc::new(Fixture::new(
            MockCityExtractor::new()
                .with_not_found()
                .with_not_found()
                .with_cities(vec![City::new("Sydney")]),
            MockWeatherService::new().with_report(&[], 70.0),
        ));
        f.skill.run(&Msg::new("s1", "what's the weather")).await.unwrap();

        // 同一条消息被重复投递两次
        let msg = Msg::new("s1", "Sydney");
        let dup = msg.clone();
        let (a, b) = tokio::join!(f.skill.follow_up(&msg), f.skill.follow_up(&dup));
        let mut answers = vec![a.unwrap(), b.unwrap()];
        answers.sort();
        // 串行执行：一轮推进到报告状态，另一轮结束流程
        assert_eq!(answers, vec!["".to_string(), "It's 70 in Sydney right now.".to_string()]);
        assert_eq!(f.cursor("s1").await, 2);
    }

    #[tokio::test]
    async fn test_router_answers_follow_up_without_moving_cursor() {
        let f = Fixture::new(
            MockCityExtractor::new()
                .with_not_found()
                .with_not_found()
                .with_cities(vec![City::new("Paris")]),
            MockWeatherService::new().with_report(&[], 55.0),
        );

        assert_eq!(f.skill.run(&Msg::new("s1", "what's the weather")).await.unwrap(), ASK_CITY);
        assert_eq!(f.cursor("s1").await, 0);

        let resp = f
            .skill
            .follow_up(&Msg::new("s1", "what's the weather in Paris"))
            .await
            .unwrap();
        assert_eq!(resp, "It's 55 in Paris right now.");
        assert_eq!(f.cursor("s1").await, 0, "路由回答后游标不应前进");
        // 第二轮只有温度处理器抽取过一次，状态机没有被调用
        assert_eq!(f.extractor.call_count(), 3);
    }

    #[tokio::test]
    async fn test_rain_question_answered_as_rain_after_city_prompt() {
        let f = Fixture::new(
            MockCityExtractor::new()
                .with_not_found()
                .with_not_found()
                .with_cities(vec![City::new("Seattle")]),
            MockWeatherService::new().with_report(&["light rain"], 50.0),
        );

        let r1 = f.skill.run(&Msg::new("s1", "is it going to rain?")).await.unwrap();
        assert_eq!(r1, ASK_CITY);
        let r2 = f.skill.follow_up(&Msg::new("s1", "Seattle")).await.unwrap();
        assert_eq!(r2, "It's raining in Seattle right now.");

        // 新问题会清掉上一次的问题类型
        f.skill.run(&Msg::new("s1", "hello")).await.unwrap();
        let kind: Option<ReportKind> = f.skill.engine().memory().get_as("s1", REPORT_KIND_KEY).await;
        assert_eq!(kind, None);
    }
}

