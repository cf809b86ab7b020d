//! rswebstack - 单页面网站技术栈检测工具

// 导出全局错误类型
pub use self::error::{RswebstackError, RswResult};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, GlobalConfig};

// 导出规则模块核心接口
pub use self::rule::{Category, MatchPolicy, RuleCatalogue, Source, Stage};

// 导出提取模块核心接口
pub use self::extractor::{DocumentTree, Element, HtmlDocument, HtmlParser};

// 导出工具模块核心接口
pub use self::utils::{Cookie, HeaderConverter, UrlValidator, ValidatedUrl};

// 导出结果模块核心接口
pub use self::result::{JsonReporter, TechStack, TextReporter};

// 导出抓取模块核心接口
pub use self::fetcher::{FetchedPage, PageFetcher};

// 导出检测模块核心接口
pub use self::detector::{
    DetectionEngine, DetectionInput, DetectionOutcome, StageReport, StageStatus, TechDetector,
    detect_url, init_detector, init_detector_with_config,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod extractor;
pub mod utils;
pub mod result;
pub mod fetcher;
pub mod detector;
