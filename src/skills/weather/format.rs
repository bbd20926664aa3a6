//! 天气回答的句式
//!
//! 温度一律取最近整数，恰好在 .5 时取偶数（72.5 → 72，-2.5 → -2）：
//!
//! | 描述 | 句式 |
//! |------|------|
//! | 空 | `It's 72 in LA right now.` |
//! | 非空（只取第一个短语） | `It's 65 with rain in LA.` |

use crate::message::tokenize;
use crate::services::WeatherReport;
use serde::{Deserialize, Serialize};

/// 任何错误对用户都只显示这一句
pub const APOLOGY: &str = "Something went wrong, but I'll try to get that fixed right away.";

pub const ASK_CITY: &str = "What city are you in?";

const RAIN_WORDS: [&str; 3] = ["rain", "raining", "rainy"];

/// 用户问的是哪种天气问题，决定用哪种句式回答
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    #[default]
    Weather,
    Rain,
}

impl ReportKind {
    pub fn render(self, city: &str, report: &WeatherReport) -> String {
        match self {
            ReportKind::Weather => format_weather(city, report),
            ReportKind::Rain => format_rain(city, report),
        }
    }
}

pub fn format_weather(city: &str, report: &WeatherReport) -> String {
    let temp = round_temp(report.temp);
    match first_phrase(report) {
        Some(phrase) => format!("It's {temp} with {phrase} in {city}."),
        None => format!("It's {temp} in {city} right now."),
    }
}

pub fn format_rain(city: &str, report: &WeatherReport) -> String {
    if is_raining(report) {
        format!("It's raining in {city} right now.")
    } else {
        format!("It's not raining in {city} right now.")
    }
}

pub fn is_raining(report: &WeatherReport) -> bool {
    report
        .description
        .iter()
        .flat_map(|d| tokenize(d))
        .any(|w| RAIN_WORDS.contains(&w.as_str()))
}

fn first_phrase(report: &WeatherReport) -> Option<&str> {
    report
        .description
        .first()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
}

fn round_temp(temp: f64) -> i64 {
    temp.round_ties_even() as i64
}
