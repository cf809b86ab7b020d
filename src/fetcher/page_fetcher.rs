//! 页面抓取：带超时与指数退避重试的单次GET请求
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::GlobalConfig;
use crate::error::{RswResult, RswebstackError};
use crate::utils::{Cookie, HeaderConverter};

/// 抓取到的页面
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// 跟随重定向后的最终URL
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub cookies: Vec<Cookie>,
    pub body: String,
}

/// 单次尝试的结果
enum Attempt {
    Done(FetchedPage),
    /// 可重试的失败
    Retry(String),
    /// 不可重试的失败
    Fatal(String),
}

/// 页面抓取器
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    config: GlobalConfig,
}

impl PageFetcher {
    pub fn new(config: GlobalConfig) -> RswResult<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.clone())
            .gzip(true)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// 抓取页面，瞬时故障按配置重试，最终失败统一为 FetchFailed
    pub async fn fetch(&self, url: &Url) -> RswResult<FetchedPage> {
        let max_retries = self.config.max_retries;
        let mut last_err = String::new();

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay = self.config.backoff_delay(attempt);
                warn!(
                    "请求失败，{:?}后重试（第{}/{}次）：{}",
                    delay, attempt, max_retries, last_err
                );
                if delay > Duration::ZERO {
                    tokio::time::sleep(delay).await;
                }
            }

            match self.try_once(url).await {
                Attempt::Done(page) => {
                    info!(
                        "页面抓取成功：{} | 状态码: {} | 正文{}字节",
                        page.url,
                        page.status,
                        page.body.len()
                    );
                    return Ok(page);
                }
                Attempt::Retry(reason) => last_err = reason,
                Attempt::Fatal(reason) => {
                    error!("页面抓取失败：{}", reason);
                    return Err(RswebstackError::FetchFailed(reason));
                }
            }
        }

        error!("页面抓取失败，已重试{}次：{}", max_retries, last_err);
        Err(RswebstackError::FetchFailed(format!(
            "{}（共尝试{}次）",
            last_err,
            u64::from(max_retries) + 1
        )))
    }

    async fn try_once(&self, url: &Url) -> Attempt {
        let response = match self.client.get(url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_builder() => return Attempt::Fatal(format!("{}：{}", url, e)),
            Err(e) => return Attempt::Retry(format!("{}：{}", url, e)),
        };

        let status = response.status();
        debug!("收到响应：{} | 状态码: {}", url, status);
        if !status.is_success() {
            let reason = format!("{} 返回状态码 {}", url, status);
            return if self.config.is_retryable_status(status.as_u16()) {
                Attempt::Retry(reason)
            } else {
                Attempt::Fatal(reason)
            };
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let cookies = HeaderConverter::parse_cookies(&headers);
        match response.text().await {
            Ok(body) => Attempt::Done(FetchedPage {
                url: final_url,
                status,
                headers,
                cookies,
                body,
            }),
            Err(e) => Attempt::Retry(format!("{}：读取正文失败：{}", url, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;

    #[test]
    fn test_fetcher_builds_from_config() {
        let config = ConfigManager::custom()
            .http_timeout(Duration::from_secs(2))
            .max_retries(0)
            .build();
        let fetcher = PageFetcher::new(config).unwrap();
        assert_eq!(fetcher.config().max_retries, 0);
        assert_eq!(fetcher.config().http_timeout, Duration::from_secs(2));
    }
}
