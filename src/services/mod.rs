//! 外部协作者
//!
//! 对话引擎只依赖这里的两个 trait：
//!
//! | Trait | 作用 | 参考实现 |
//! |-------|------|----------|
//! | [`CityExtractor`] | 从一句话里找出城市 | [`GazetteerExtractor`] |
//! | [`WeatherService`] | 按城市名查询当前天气 | [`HttpWeatherService`] |
//!
//! 测试时用 [`crate::testing`] 中的 Mock 替换。

pub mod extractor;
pub mod weather;

pub use extractor::{City, CityExtractor, GazetteerExtractor};
pub use weather::{HttpWeatherService, WeatherReport, WeatherService};
