use crate::error::{Result, WeatherError};
use crate::services::{WeatherReport, WeatherService};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum MockWeatherResponse {
    Report(WeatherReport),
    Failure(String),
}

/// 可脚本化的 Mock 天气数据源
///
/// 按顺序返回预设结果；队列耗尽后重复最后一次成功的天气，
/// 从未设置过则返回网络错误。
#[derive(Clone, Default)]
pub struct MockWeatherService {
    responses: Arc<Mutex<VecDeque<MockWeatherResponse>>>,
    last: Arc<Mutex<Option<WeatherReport>>>,
    /// 每次查询的城市名
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockWeatherService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条天气结果
    pub fn with_report(self, description: &[&str], temp: f64) -> Self {
        let report = WeatherReport {
            description: description.iter().map(|d| d.to_string()).collect(),
            temp,
            humidity: 50,
        };
        self.responses
            .lock()
            .unwrap()
            .push_back(MockWeatherResponse::Report(report));
        self
    }

    /// 追加一次传输失败
    pub fn with_failure(self, msg: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(MockWeatherResponse::Failure(msg.into()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// 所有查询过的城市名（按时序）
    pub fn cities(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherService for MockWeatherService {
    async fn fetch(&self, city_name: &str) -> Result<WeatherReport> {
        self.calls.lock().unwrap().push(city_name.to_string());
        let response = self.responses.lock().unwrap().pop_front();
        match response {
            Some(MockWeatherResponse::Report(report)) => {
                *self.last.lock().unwrap() = Some(report.clone());
                Ok(report)
            }
            Some(MockWeatherResponse::Failure(msg)) => Err(WeatherError::Network(msg).into()),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| WeatherError::Network("mock: no report scripted".into()).into()),
        }
    }
}
