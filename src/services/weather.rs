use crate::error::{Result, WeatherError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// 天气数据源返回的当前天气
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// 天气描述短语，可能为空（如 `["light rain"]`）
    #[serde(rename = "Description", default)]
    pub description: Vec<String>,
    #[serde(rename = "Temp")]
    pub temp: f64,
    /// 湿度，格式化时不使用
    #[serde(rename = "Humidity", default)]
    pub humidity: i64,
}

/// 天气数据源接口：每次查询恰好一次同步调用
#[async_trait]
pub trait WeatherService: Send + Sync {
    async fn fetch(&self, city_name: &str) -> Result<WeatherReport>;
}

// ── HttpWeatherService ───────────────────────────────────────────────────────

/// 通过 HTTP 查询天气：`GET {base_url}/weather?city=<name>`
///
/// 超时由 HTTP 客户端强制执行，超时、连接失败、非 2xx 状态和解码失败
/// 都会以 [`WeatherError`] 返回。
pub struct HttpWeatherService {
    client: Client,
    base_url: String,
}

impl HttpWeatherService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::Network(format!("构建 HTTP 客户端失败: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}/weather", base)
    }
}

#[async_trait]
impl WeatherService for HttpWeatherService {
    async fn fetch(&self, city_name: &str) -> Result<WeatherReport> {
        debug!(city = %city_name, "🌦️ 查询天气");
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("city", city_name)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(WeatherError::Status { status, message }.into());
        }

        let report = response
            .json::<WeatherReport>()
            .await
            .map_err(|e| WeatherError::Decode(e.to_string()))?;
        debug!(city = %city_name, temp = report.temp, "✅ 天气已获取");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkillError;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 起一个只应答一次的本地 HTTP 服务，返回 base url 和收到的请求行
    async fn serve_once(
        status: &'static str,
        body: &'static str,
        delay: Duration,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            tokio::time::sleep(delay).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            request.lines().next().unwrap_or_default().to_string()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_fetch_decodes_report_and_encodes_city() {
        let (base, handle) = serve_once(
            "200 OK",
            r#"{"Description":["light rain"],"Temp":65.4,"Humidity":80}"#,
            Duration::ZERO,
        )
        .await;
        let svc = HttpWeatherService::new(base, Duration::from_secs(2)).unwrap();

        let report = svc.fetch("Los Angeles").await.unwrap();
        assert_eq!(report.description, vec!["light rain"]);
        assert_eq!(report.humidity, 80);
        assert!((report.temp - 65.4).abs() < 1e-9);

        let request_line = handle.await.unwrap();
        assert!(
            request_line.starts_with("GET /weather?city=Los+Angeles "),
            "请求行: {request_line}"
        );
    }

    #[tokio::test]
    async fn test_non_2xx_is_status_error() {
        let (base, _handle) = serve_once("503 Service Unavailable", "{}", Duration::ZERO).await;
        let svc = HttpWeatherService::new(base, Duration::from_secs(2)).unwrap();
        match svc.fetch("LA").await {
            Err(SkillError::Weather(WeatherError::Status { status, .. })) => assert_eq!(status, 503),
            other => panic!("应该是状态码错误: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_body_is_decode_error() {
        let (base, _handle) = serve_once("200 OK", r#"{"Temp":"hot"}"#, Duration::ZERO).await;
        let svc = HttpWeatherService::new(base, Duration::from_secs(2)).unwrap();
        match svc.fetch("LA").await {
            Err(SkillError::Weather(WeatherError::Decode(_))) => {}
            other => panic!("应该是解码错误: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let (base, _handle) = serve_once("200 OK", r#"{"Temp":1.0}"#, Duration::from_secs(3)).await;
        let svc = HttpWeatherService::new(base, Duration::from_millis(200)).unwrap();
        match svc.fetch("LA").await {
            Err(SkillError::Weather(WeatherError::Network(_))) => {}
            other => panic!("应该超时: {other:?}"),
        }
    }
}
