//! 检测器核心：校验URL、抓取页面、解析HTML，交由检测引擎输出结果
use std::collections::HashMap;

use reqwest::header::HeaderMap;
use tracing::{info, warn};

use super::analyzer::DetectionInput;
use super::engine::{DetectionEngine, DetectionOutcome};
use crate::config::GlobalConfig;
use crate::error::RswResult;
use crate::extractor::{DocumentTree, HtmlParser};
use crate::fetcher::{FetchedPage, PageFetcher};
use crate::result::TechStack;
use crate::rule::RuleCatalogue;
use crate::utils::{Cookie, HeaderConverter, UrlValidator};

/// 技术检测器
#[derive(Debug, Clone)]
pub struct TechDetector {
    engine: DetectionEngine,
    fetcher: PageFetcher,
}

impl TechDetector {
    /// 创建检测器（使用进程级共享的内置规则表）
    pub fn new(config: GlobalConfig) -> RswResult<Self> {
        let engine = DetectionEngine::new(RuleCatalogue::shared()?);
        let fetcher = PageFetcher::new(config)?;
        Ok(Self { engine, fetcher })
    }

    pub fn config(&self) -> &GlobalConfig {
        self.fetcher.config()
    }

    pub fn engine(&self) -> &DetectionEngine {
        &self.engine
    }

    /// 检测指定URL，返回技术栈
    pub async fn detect_url(&self, raw_url: &str) -> RswResult<TechStack> {
        Ok(self.run_url(raw_url).await?.stack)
    }

    /// 检测指定URL，返回含阶段状态的完整结果
    pub async fn run_url(&self, raw_url: &str) -> RswResult<DetectionOutcome> {
        // 1. 校验URL（在任何网络请求之前）
        let validated = UrlValidator::validate(raw_url)?;
        info!("开始检测：{}（可注册域名：{}）", validated.as_str(), validated.registrable_domain);

        // 2. 抓取页面
        let page = self.fetcher.fetch(&validated.url).await?;

        // 3. HTTPS 以请求的URL协议为准
        Ok(self.analyze_page(&page, validated.is_https()))
    }

    /// 对已抓取的页面执行检测
    /// 使用页面上已解析的Cookie，不再从响应头重复解析
    pub fn analyze_page(&self, page: &FetchedPage, https_enabled: bool) -> DetectionOutcome {
        self.analyze_parts(https_enabled, &page.headers, &page.cookies, &page.body)
    }

    /// 检测接口（HashMap<String, Vec<String>> 头），Cookie从 Set-Cookie 中解析
    pub fn detect_with_hashmap(
        &self,
        https_enabled: bool,
        headers: &HashMap<String, Vec<String>>,
        body: &str,
    ) -> RswResult<TechStack> {
        let header_map = HeaderConverter::from_hashmap(headers)?;
        let cookies = HeaderConverter::parse_cookies(&header_map);
        Ok(self.analyze_parts(https_enabled, &header_map, &cookies, body).stack)
    }

    fn analyze_parts(
        &self,
        https_enabled: bool,
        headers: &HeaderMap,
        cookies: &[Cookie],
        body: &str,
    ) -> DetectionOutcome {
        // 解析失败不终止检测，依赖文档树的规则组跳过
        let (document, parse_error) = match HtmlParser::parse(body) {
            Ok(doc) => (Some(doc), None),
            Err(e) => {
                warn!("{}，结构化规则将跳过", e);
                (None, Some(e.to_string()))
            }
        };

        let input = DetectionInput::new(
            https_enabled,
            body,
            headers,
            cookies,
            document.as_ref().map(|d| d as &dyn DocumentTree),
        );
        let mut outcome = self.engine.run(&input);
        outcome.parse_error = parse_error;
        outcome
    }
}
