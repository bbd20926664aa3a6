//! 测试基础设施
//!
//! 在不依赖真实地名表 / 天气服务的情况下测试技能的各个组件。
//!
//! | 类型 | 用途 |
//! |------|------|
//! | [`MockCityExtractor`] | 替代城市抽取器，逐次返回预设的城市 / NotFound / 故障 |
//! | [`MockWeatherService`] | 替代天气数据源，逐次返回预设天气或传输错误 |
//!
//! 所有 Mock 都完全在内存中运行，内部使用 `Arc<Mutex<_>>`，clone 后共享同一份
//! 脚本和调用记录，便于一份交给技能、一份留在测试里检查。
//!
//! ```rust
//! use echo_weather::services::WeatherService;
//! use echo_weather::testing::MockWeatherService;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let weather = MockWeatherService::new()
//!     .with_report(&["rain"], 65.4)
//!     .with_failure("connection reset");
//!
//! assert!(weather.fetch("LA").await.is_ok());
//! assert!(weather.fetch("LA").await.is_err());
//! assert_eq!(weather.cities(), vec!["LA", "LA"]);
//! # }
//! ```

mod mock_extractor;
mod mock_weather;

pub use mock_extractor::MockCityExtractor;
pub use mock_weather::MockWeatherService;
