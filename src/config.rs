//! 全局配置管理，只作用于页面抓取（检测引擎本身无配置项）

use std::time::Duration;

/// 默认可重试的HTTP状态码
pub const DEFAULT_RETRY_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 单次请求超时
    pub http_timeout: Duration,
    // 最大重试次数（不含第一次请求）
    pub max_retries: u32,
    // 退避系数：第n次重试前等待 backoff_factor * 2^(n-1) 秒
    pub backoff_factor: f64,
    // 触发重试的状态码
    pub retry_status_codes: Vec<u16>,
    // 请求使用的User-Agent
    pub user_agent: String,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff_factor: 0.3,
            retry_status_codes: DEFAULT_RETRY_STATUS_CODES.to_vec(),
            user_agent: format!("rswebstack/{}", env!("CARGO_PKG_VERSION")),
            verbose: false,
        }
    }
}

impl GlobalConfig {
    /// 第 attempt 次重试（从1开始）前的等待时长
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.backoff_factor <= 0.0 || !self.backoff_factor.is_finite() {
            return Duration::ZERO;
        }
        let exp = attempt.saturating_sub(1).min(16) as i32;
        let secs = self.backoff_factor * 2f64.powi(exp);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }

    /// 状态码是否属于可重试的瞬时故障
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.config.backoff_factor = factor;
        self
    }

    pub fn retry_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.config.retry_status_codes = codes;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}
