//! echo-weather —— 天气技能的交互式命令行
//!
//! 每输入一行就是一轮对话，经 `SkillManager` 分发给天气技能：
//!
//! ```text
//! > what's the weather?
//! What city are you in?
//! > Los Angeles
//! It's 72 with clear sky in Los Angeles.
//! ```
//!
//! `/reset` 结束当前话题，`/quit`（或 Ctrl-D）退出。
//!
//! # 运行
//! ```bash
//! RUST_LOG=echo_weather=debug cargo run -- --store ~/.echo-weather/memory.json
//! ```

use clap::Parser;
use echo_weather::config::SkillConfig;
use echo_weather::memory::{FileStore, InMemoryStore, Store};
use echo_weather::message::Msg;
use echo_weather::services::{CityExtractor, GazetteerExtractor, HttpWeatherService};
use echo_weather::skills::{SkillManager, WeatherSkill};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "echo-weather", version, about = "天气对话技能")]
struct Args {
    /// 宿主地址（覆盖 ABOT_CORE_ADDR）
    #[arg(long = "coreaddr")]
    core_addr: Option<String>,

    /// 天气接口地址（覆盖 WEATHER_BASE_URL）
    #[arg(long)]
    weather_url: Option<String>,

    /// 天气接口超时，毫秒（覆盖 WEATHER_TIMEOUT_MS）
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// 记忆文件路径（覆盖 WEATHER_STORE_PATH）
    #[arg(long)]
    store: Option<PathBuf>,

    /// 城市词表 YAML（覆盖 WEATHER_CITIES_PATH）
    #[arg(long)]
    cities: Option<PathBuf>,

    /// 会话 ID
    #[arg(long, env = "WEATHER_SESSION", default_value = "console")]
    session: String,
}

impl Args {
    fn apply(self, mut config: SkillConfig) -> echo_weather::error::Result<(SkillConfig, String)> {
        if let Some(addr) = self.core_addr {
            config.core_addr = Some(addr);
        }
        if let Some(url) = self.weather_url {
            config.weather_base_url = url;
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        if let Some(path) = self.store {
            config.store_path = Some(path);
        }
        if let Some(path) = self.cities {
            config.cities_path = Some(path);
        }
        config.validate()?;
        Ok((config, self.session))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "echo_weather=info".into()),
        )
        .init();

    let args = Args::parse();
    let (config, session) = args.apply(SkillConfig::from_env()?)?;
    info!(
        core_addr = ?config.core_addr,
        test_mode = config.test_mode,
        base_url = %config.weather_base_url,
        "⚙️ 配置已加载"
    );

    let store: Arc<dyn Store> = match &config.store_path {
        Some(path) => Arc::new(FileStore::new(path)?),
        None => Arc::new(InMemoryStore::new()),
    };
    let extractor: Arc<dyn CityExtractor> = match &config.cities_path {
        Some(path) => Arc::new(GazetteerExtractor::from_yaml_file(path)?),
        None => Arc::new(GazetteerExtractor::builtin()),
    };
    let weather = Arc::new(HttpWeatherService::new(
        config.weather_base_url.clone(),
        config.timeout(),
    )?);

    let mut manager = SkillManager::new();
    manager.register(Arc::new(WeatherSkill::new(store, extractor, weather)));

    println!("🌤️  echo-weather（会话: {session}）。输入 /reset 重新开始，/quit 退出。");
    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(text);

        match text {
            "/quit" | "/exit" => break,
            "/reset" => {
                manager.end_session(&session);
                println!("🔄 已重置");
                continue;
            }
            _ => {}
        }

        match manager.dispatch(&Msg::new(session.as_str(), text)).await {
            Ok(Some(reply)) if !reply.text.is_empty() => println!("{}", reply.text),
            Ok(_) => println!("（没有技能回答）"),
            Err(e) => warn!(session_id = %session, "⚠️ 本轮处理失败: {e}"),
        }
    }

    info!("👋 再见");
    Ok(())
}
