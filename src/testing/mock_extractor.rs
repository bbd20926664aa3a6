//! Mock 城市抽取器，用于在不依赖地名表/NLU 服务的情况下测试对话流程。
//!
//! ```rust
//! use echo_weather::message::Msg;
//! use echo_weather::services::{City, CityExtractor};
//! use echo_weather::testing::MockCityExtractor;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let ex = MockCityExtractor::new()
//!     .with_cities(vec![City::new("LA")])
//!     .with_not_found();
//!
//! let first = ex.extract(&Msg::new("s1", "weather in LA")).await.unwrap();
//! assert_eq!(first[0].name, "LA");
//! assert!(ex.extract(&Msg::new("s1", "hi")).await.unwrap_err().is_not_found());
//! assert_eq!(ex.call_count(), 2);
//! # }
//! ```

use crate::error::{ExtractError, Result};
use crate::message::Msg;
use crate::services::{City, CityExtractor};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum MockExtraction {
    Cities(Vec<City>),
    NotFound,
    Failure(String),
}

/// 可脚本化的 Mock 抽取器
///
/// 按顺序返回预设结果；队列耗尽后返回 [`ExtractError::NotFound`]。
#[derive(Clone, Default)]
pub struct MockCityExtractor {
    responses: Arc<Mutex<VecDeque<MockExtraction>>>,
    /// 每次调用收到的原始文本，按顺序记录
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockCityExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一次返回城市列表
    pub fn with_cities(self, cities: Vec<City>) -> Self {
        self.push(MockExtraction::Cities(cities));
        self
    }

    /// 追加一次 `NotFound`
    pub fn with_not_found(self) -> Self {
        self.push(MockExtraction::NotFound);
        self
    }

    /// 追加一次抽取器故障
    pub fn with_failure(self, msg: impl Into<String>) -> Self {
        self.push(MockExtraction::Failure(msg.into()));
        self
    }

    fn push(&self, response: MockExtraction) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CityExtractor for MockCityExtractor {
    async fn extract(&self, msg: &Msg) -> Result<Vec<City>> {
        self.calls.lock().unwrap().push(msg.raw_text.clone());
        let response = self.responses.lock().unwrap().pop_front();
        match response {
            Some(MockExtraction::Cities(cities)) => Ok(cities),
            Some(MockExtraction::Failure(msg)) => Err(ExtractError::Failed(msg).into()),
            Some(MockExtraction::NotFound) | None => Err(ExtractError::NotFound.into()),
        }
    }
}
