use std::fmt;

/// 天气技能的统一错误类型
#[derive(Debug)]
pub enum SkillError {
    /// 城市抽取错误
    Extract(ExtractError),
    /// 天气数据源错误
    Weather(WeatherError),
    /// 槽位记忆 / 存储错误
    Memory(MemoryError),
    /// 配置错误
    Config(ConfigError),
    /// IO 错误
    Io(std::io::Error),
    /// 其他错误
    Other(String),
}

/// 城市抽取错误
#[derive(Debug)]
pub enum ExtractError {
    /// 消息中没有城市（不是真正的错误，调用方应静默让出）
    NotFound,
    /// 抽取器自身故障
    Failed(String),
}

/// 天气数据源错误（统一视为传输错误，用户只会看到固定的道歉语）
#[derive(Debug)]
pub enum WeatherError {
    /// 网络请求失败或超时
    Network(String),
    /// 非 2xx 状态码
    Status { status: u16, message: String },
    /// 响应体无法解码
    Decode(String),
}

/// 记忆存储错误
#[derive(Debug)]
pub enum MemoryError {
    /// 读写存储文件失败
    IoError(String),
    /// 序列化/反序列化错误
    SerializationError(String),
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),
    /// 配置解析失败
    ParseFailed(String),
    /// 配置值无效
    InvalidValue { field: String, message: String },
}

impl SkillError {
    /// 是否为"没有找到城市"
    pub fn is_not_found(&self) -> bool {
        matches!(self, SkillError::Extract(ExtractError::NotFound))
    }
}

// 实现 Display trait
impl fmt::Display for SkillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillError::Extract(e) => write!(f, "Extract Error: {}", e),
            SkillError::Weather(e) => write!(f, "Weather Error: {}", e),
            SkillError::Memory(e) => write!(f, "Memory Error: {}", e),
            SkillError::Config(e) => write!(f, "Config Error: {}", e),
            SkillError::Io(e) => write!(f, "IO Error: {}", e),
            SkillError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::NotFound => write!(f, "no cities found"),
            ExtractError::Failed(msg) => write!(f, "extraction failed: {}", msg),
        }
    }
}

impl fmt::Display for WeatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherError::Network(msg) => write!(f, "Network error: {}", msg),
            WeatherError::Status { status, message } => {
                write!(f, "Weather API error (status {}): {}", status, message)
            }
            WeatherError::Decode(msg) => write!(f, "Invalid weather response: {}", msg),
        }
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::IoError(msg) => write!(f, "Store IO error: {}", msg),
            MemoryError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseFailed(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, message } => {
                write!(f, "Invalid config value for '{}': {}", field, message)
            }
        }
    }
}

// 实现 std::error::Error trait
impl std::error::Error for SkillError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SkillError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ExtractError {}
impl std::error::Error for WeatherError {}
impl std::error::Error for MemoryError {}
impl std::error::Error for ConfigError {}

// From 转换实现
impl From<std::io::Error> for SkillError {
    fn from(err: std::io::Error) -> Self {
        SkillError::Io(err)
    }
}

impl From<reqwest::Error> for SkillError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SkillError::Weather(WeatherError::Network("Request timeout".to_string()))
        } else if err.is_connect() {
            SkillError::Weather(WeatherError::Network(format!(
                "Connection failed: {}",
                err
            )))
        } else if err.is_decode() {
            SkillError::Weather(WeatherError::Decode(err.to_string()))
        } else {
            SkillError::Weather(WeatherError::Network(err.to_string()))
        }
    }
}

impl From<serde_json::Error> for SkillError {
    fn from(err: serde_json::Error) -> Self {
        SkillError::Memory(MemoryError::SerializationError(err.to_string()))
    }
}

impl From<serde_yaml::Error> for SkillError {
    fn from(err: serde_yaml::Error) -> Self {
        SkillError::Config(ConfigError::ParseFailed(err.to_string()))
    }
}

impl From<ExtractError> for SkillError {
    fn from(err: ExtractError) -> Self {
        SkillError::Extract(err)
    }
}

impl From<WeatherError> for SkillError {
    fn from(err: WeatherError) -> Self {
        SkillError::Weather(err)
    }
}

impl From<MemoryError> for SkillError {
    fn from(err: MemoryError) -> Self {
        SkillError::Memory(err)
    }
}

impl From<ConfigError> for SkillError {
    fn from(err: ConfigError) -> Self {
        SkillError::Config(err)
    }
}

// 便捷的 Result 类型别名
pub type Result<T> = std::result::Result<T, SkillError>;
