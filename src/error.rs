//! 全局错误类型定义

use thiserror::Error;
use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;

#[derive(Error, Debug)]
pub enum RswebstackError {
    // 输入相关错误（发生在任何网络请求之前）
    #[error("无效URL：{0}")]
    InvalidUrl(String),

    // 抓取相关错误（重试耗尽后仍失败，整次检测终止）
    #[error("页面抓取失败：{0}")]
    FetchFailed(String),

    // 可恢复错误：HTML解析失败，结构化检测降级为空操作
    #[error("HTML解析失败：{0}")]
    ParseFailed(String),
    // 可恢复错误：单个检测阶段失败，记录日志后继续
    #[error("检测阶段[{stage}]失败：{reason}")]
    StageFailed { stage: &'static str, reason: String },

    // 规则相关错误
    #[error("正则编译失败：{0}")]
    RegexCompileError(#[from] RegexError),
    #[error("规则表构建失败：{0}")]
    RuleBuildError(String),

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    HttpError(#[from] reqwest::Error),

    // 序列化错误
    #[error("JSON序列化失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

impl RswebstackError {
    /// 是否为终止整次检测的致命错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RswebstackError::InvalidUrl(_)
                | RswebstackError::FetchFailed(_)
                | RswebstackError::HttpError(_)
        )
    }
}

// 全局Result类型
pub type RswResult<T> = Result<T, RswebstackError>;
