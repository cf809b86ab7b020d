//! 全局检测器单例管理
use tokio::sync::OnceCell;

use super::detector::TechDetector;
use crate::config::{ConfigManager, GlobalConfig};
use crate::error::RswResult;
use crate::result::TechStack;

/// 全局检测器实例
static GLOBAL_DETECTOR: OnceCell<TechDetector> = OnceCell::const_new();

/// 初始化全局检测器（默认配置）
pub async fn init_detector() -> RswResult<&'static TechDetector> {
    init_detector_with_config(ConfigManager::get_default()).await
}

/// 带自定义配置初始化全局检测器，已初始化时忽略新配置
pub async fn init_detector_with_config(config: GlobalConfig) -> RswResult<&'static TechDetector> {
    GLOBAL_DETECTOR
        .get_or_try_init(|| async move { TechDetector::new(config) })
        .await
}

/// 使用全局检测器检测URL（未初始化时按默认配置初始化）
pub async fn detect_url(raw_url: &str) -> RswResult<TechStack> {
    init_detector().await?.detect_url(raw_url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let a = init_detector().await.unwrap();
        let custom = ConfigManager::custom().max_retries(0).build();
        let b = init_detector_with_config(custom).await.unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[tokio::test]
    async fn test_global_detect_rejects_invalid_url() {
        assert!(detect_url("http://127.0.0.1/").await.is_err());
    }
}
