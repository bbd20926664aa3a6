use crate::error::{ConfigError, ExtractError, Result};
use crate::message::{Msg, tokenize};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// 最长匹配的城市名词数
const MAX_NGRAM: usize = 4;

/// 城市实体，也是槽位记忆中 `"city"` 的存储单元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl City {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

/// 城市实体抽取接口
///
/// 返回按置信度排序的城市列表，下标 0 为权威结果。没有城市时既可以返回空列表，
/// 也可以返回 [`ExtractError::NotFound`]，调用方对两者一视同仁；其他错误需向上传播。
#[async_trait]
pub trait CityExtractor: Send + Sync {
    async fn extract(&self, msg: &Msg) -> Result<Vec<City>>;
}

// ── GazetteerExtractor ───────────────────────────────────────────────────────

/// 地名表中的一条记录（YAML 文件格式）
///
/// ```yaml
/// - name: Los Angeles
///   latitude: 34.05
///   longitude: -118.24
///   aliases: [LA]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazetteerEntry {
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl GazetteerEntry {
    fn city(&self) -> City {
        City {
            name: self.name.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// 基于地名表的城市抽取器
///
/// 在消息词序列上做 n-gram 查表（最长优先），结果按在消息中出现的顺序返回。
pub struct GazetteerExtractor {
    /// 规范化名称（词序列以空格连接）→ 城市
    index: HashMap<String, City>,
}

impl GazetteerExtractor {
    pub fn new(entries: impl IntoIterator<Item = GazetteerEntry>) -> Self {
        let mut index = HashMap::new();
        for entry in entries {
            let city = entry.city();
            for name in std::iter::once(&entry.name).chain(&entry.aliases) {
                let key = tokenize(name).join(" ");
                if !key.is_empty() {
                    index.insert(key, city.clone());
                }
            }
        }
        Self { index }
    }

    /// 从 YAML 文件加载地名表
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        let entries: Vec<GazetteerEntry> = serde_yaml::from_str(&raw)?;
        info!(path = %path.display(), cities = entries.len(), "🗺️ 地名表已加载");
        Ok(Self::new(entries))
    }

    /// 内置的小型地名表
    pub fn builtin() -> Self {
        let entry = |name: &str, lat: f64, lon: f64, aliases: &[&str]| GazetteerEntry {
            name: name.to_string(),
            latitude: Some(lat),
            longitude: Some(lon),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        };
        Self::new([
            entry("Los Angeles", 34.05, -118.24, &["LA"]),
            entry("San Francisco", 37.77, -122.42, &["SF"]),
            entry("New York", 40.71, -74.01, &["NYC", "New York City"]),
            entry("Chicago", 41.88, -87.63, &[]),
            entry("Seattle", 47.61, -122.33, &[]),
            entry("London", 51.51, -0.13, &[]),
            entry("Paris", 48.86, 2.35, &[]),
            entry("Tokyo", 35.68, 139.69, &[]),
            entry("Beijing", 39.90, 116.41, &[]),
            entry("Shanghai", 31.23, 121.47, &[]),
            entry("Sydney", -33.87, 151.21, &[]),
            entry("Salt Lake City", 40.76, -111.89, &["SLC"]),
        ])
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn scan(&self, tokens: &[String]) -> Vec<City> {
        let mut found: Vec<City> = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let longest = MAX_NGRAM.min(tokens.len() - i);
            let hit = (1..=longest).rev().find_map(|n| {
                self.index
                    .get(&tokens[i..i + n].join(" "))
                    .map(|city| (n, city))
            });
            match hit {
                Some((n, city)) => {
                    if !found.contains(city) {
                        found.push(city.clone());
                    }
                    i += n;
                }
                None => i += 1,
            }
        }
        found
    }
}

#[async_trait]
impl CityExtractor for GazetteerExtractor {
    async fn extract(&self, msg: &Msg) -> Result<Vec<City>> {
        let cities = self.scan(&msg.tokens);
        debug!(msg_id = %msg.id, found = cities.len(), "🔎 城市抽取");
        if cities.is_empty() {
            return Err(ExtractError::NotFound.into());
        }
        Ok(cities)
    }
}
