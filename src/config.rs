//! 技能进程配置
//!
//! 从环境变量（以及 `.env` 文件）读取：
//! ```text
//! ABOT_CORE_ADDR=127.0.0.1:4000        # 宿主地址
//! ABOT_ENV=test                        # 测试模式，宿主地址改用 ABOT_TEST_RPC_ADDR
//! ABOT_TEST_RPC_ADDR=127.0.0.1:4001
//! WEATHER_BASE_URL=https://www.itsabot.org/api
//! WEATHER_TIMEOUT_MS=4000
//! WEATHER_STORE_PATH=~/.echo-weather/memory.json
//! WEATHER_CITIES_PATH=./cities.yaml
//! ```

use crate::error::{ConfigError, Result};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.itsabot.org/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 4000;
pub const DEFAULT_TEST_RPC_ADDR: &str = "127.0.0.1:4001";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillConfig {
    /// 宿主地址；测试模式下为 `ABOT_TEST_RPC_ADDR`
    pub core_addr: Option<String>,
    pub test_mode: bool,
    pub weather_base_url: String,
    pub timeout_ms: u64,
    /// 设置后使用文件持久化的记忆，否则只在内存里
    pub store_path: Option<PathBuf>,
    /// 城市词表（YAML）；未设置时使用内置词表
    pub cities_path: Option<PathBuf>,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            core_addr: None,
            test_mode: false,
            weather_base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            store_path: None,
            cities_path: None,
        }
    }
}

impl SkillConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 用任意键值来源构建配置，空字符串视为未设置
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let test_mode = get("ABOT_ENV").is_some_and(|v| v.eq_ignore_ascii_case("test"));
        let core_addr = if test_mode {
            Some(get("ABOT_TEST_RPC_ADDR").unwrap_or_else(|| DEFAULT_TEST_RPC_ADDR.to_string()))
        } else {
            get("ABOT_CORE_ADDR")
        };

        let timeout_ms = match get("WEATHER_TIMEOUT_MS") {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_TIMEOUT_MS,
        };

        let config = Self {
            core_addr,
            test_mode,
            weather_base_url: get("WEATHER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout_ms,
            store_path: get("WEATHER_STORE_PATH").map(PathBuf::from),
            cities_path: get("WEATHER_CITIES_PATH").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(invalid("WEATHER_TIMEOUT_MS", "必须大于 0"));
        }
        if !(self.weather_base_url.starts_with("http://")
            || self.weather_base_url.starts_with("https://"))
        {
            return Err(invalid("WEATHER_BASE_URL", "必须以 http:// 或 https:// 开头"));
        }
        Ok(())
    }
}

fn parse_timeout(raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .map_err(|e| invalid("WEATHER_TIMEOUT_MS", &format!("无法解析 '{raw}': {e}")))
}

fn invalid(field: &str, message: &str) -> crate::error::SkillError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}
