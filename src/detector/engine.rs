//! 检测引擎：按固定阶段顺序执行规则组，汇总阶段状态
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::analyzer::{DetectionInput, GroupAnalyzer};
use super::stage::{StageReport, StageStatus};
use crate::error::{RswResult, RswebstackError};
use crate::result::TechStack;
use crate::rule::{RuleCatalogue, Stage};

/// 一次检测的完整产出
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionOutcome {
    pub stack: TechStack,
    pub stages: Vec<StageReport>,
    /// HTML解析失败原因（此时依赖文档树的规则全部跳过）
    pub parse_error: Option<String>,
}

impl DetectionOutcome {
    /// 失败或部分失败的阶段
    pub fn failed_stages(&self) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().filter(|r| r.is_failure())
    }

    /// 所有阶段均无失败且文档解析成功
    pub fn is_complete(&self) -> bool {
        self.parse_error.is_none() && self.failed_stages().next().is_none()
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == stage)
    }
}

/// 检测引擎（规则表只读共享，可跨任务克隆）
#[derive(Debug, Clone)]
pub struct DetectionEngine {
    catalogue: Arc<RuleCatalogue>,
}

impl DetectionEngine {
    pub fn new(catalogue: Arc<RuleCatalogue>) -> Self {
        Self { catalogue }
    }

    /// 使用进程级共享的内置规则表
    pub fn with_builtin_rules() -> RswResult<Self> {
        Ok(Self::new(RuleCatalogue::shared()?))
    }

    pub fn catalogue(&self) -> &RuleCatalogue {
        &self.catalogue
    }

    /// 只返回检测结果
    pub fn detect(&self, input: &DetectionInput<'_>) -> TechStack {
        self.run(input).stack
    }

    /// 执行全部阶段，单个阶段失败不影响后续阶段
    pub fn run(&self, input: &DetectionInput<'_>) -> DetectionOutcome {
        let start = Instant::now();
        let mut stack = TechStack::new(input.https_enabled);
        let mut stages = Vec::with_capacity(Stage::PIPELINE.len());

        for stage in Stage::PIPELINE {
            stages.push(self.run_stage(stage, input, &mut stack));
        }

        let failed = stages.iter().filter(|r| r.is_failure()).count();
        info!(
            "检测完成，耗时{:?}，命中技术{}个，失败阶段{}个",
            start.elapsed(),
            stack.total_labels(),
            failed
        );

        DetectionOutcome {
            stack,
            stages,
            parse_error: None,
        }
    }

    fn run_stage(&self, stage: Stage, input: &DetectionInput<'_>, stack: &mut TechStack) -> StageReport {
        let mut matched = 0;
        let mut groups_run = 0;
        let mut groups_skipped = 0;
        let mut errors = Vec::new();

        for group in self.catalogue.groups_for(stage) {
            if group.needs_document() && input.document.is_none() {
                debug!("[{}]文档树不可用，跳过规则组", group.name);
                groups_skipped += 1;
                continue;
            }

            match GroupAnalyzer::analyze(group, input, stack) {
                Ok(n) => {
                    groups_run += 1;
                    matched += n;
                }
                Err(e) => {
                    let err = RswebstackError::StageFailed {
                        stage: stage.name(),
                        reason: format!("规则组[{}]：{}", group.name, e),
                    };
                    warn!("{}", err);
                    errors.push(err.to_string());
                }
            }
        }

        let report = StageReport::new(stage, matched, groups_run, groups_skipped, errors);
        if report.status == StageStatus::Skipped {
            debug!("阶段[{}]已跳过", stage);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{DocumentTree, Element, HtmlParser};
    use crate::rule::Category;
    use crate::utils::Cookie;
    use reqwest::header::{HeaderMap, HeaderValue};

    fn engine() -> DetectionEngine {
        DetectionEngine::with_builtin_rules().unwrap()
    }

    fn detect_html(html: &str, headers: &HeaderMap, cookies: &[Cookie]) -> DetectionOutcome {
        let doc = HtmlParser::parse(html).ok();
        let tree = doc.as_ref().map(|d| d as &dyn DocumentTree);
        engine().run(&DetectionInput::new(true, html, headers, cookies, tree))
    }

    #[test]
    fn test_wordpress_from_body() {
        let html = r#"<html><head><link rel="stylesheet" href="/wp-content/themes/x/style.css"></head><body></body></html>"#;
        let outcome = detect_html(html, &HeaderMap::new(), &[]);
        assert_eq!(outcome.stack.cms.as_deref(), Some("WordPress"));
        assert!(outcome.stack.https_enabled);
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_shopify_header_and_body() {
        let mut headers = HeaderMap::new();
        headers.insert("x-shopify-stage", HeaderValue::from_static("production"));
        let html = r#"<html><body><script src="https://cdn.shopify.com/s/app.js"></script></body></html>"#;
        let outcome = detect_html(html, &headers, &[]);
        assert_eq!(outcome.stack.cms.as_deref(), Some("Shopify"));
    }

    #[test]
    fn test_wordpress_cookie() {
        let cookies = vec![Cookie::new("wordpress_logged_in_abc", "1")];
        let outcome = detect_html("<html><body>hello</body></html>", &HeaderMap::new(), &cookies);
        assert_eq!(outcome.stack.cms.as_deref(), Some("WordPress"));
    }

    #[test]
    fn test_js_frameworks_without_duplicates() {
        let html = r#"<html><head>
            <script src="/js/jquery-3.7.1.min.js"></script>
            <script src="/js/jquery-ui.js"></script>
            <script src="/js/react.production.min.js"></script>
            <script>var $ = window.jQuery;</script>
        </head><body></body></html>"#;
        let outcome = detect_html(html, &HeaderMap::new(), &[]);
        let js: Vec<_> = outcome.stack.js_frameworks.iter().map(String::as_str).collect();
        assert_eq!(js, vec!["React", "jQuery"]);
    }

    #[test]
    fn test_unparseable_body_degrades() {
        let mut headers = HeaderMap::new();
        headers.insert("server", HeaderValue::from_static("nginx/1.25"));
        let outcome = engine().run(&DetectionInput::new(false, "", &headers, &[], None));

        assert_eq!(outcome.stack.web_server.as_deref(), Some("Nginx"));
        assert!(outcome.stack.js_frameworks.is_empty());
        assert!(outcome.stack.css_frameworks.is_empty());
        assert!(outcome.stack.fonts.is_empty());
        assert_eq!(outcome.stage(Stage::CssFrameworks).unwrap().status, StageStatus::Skipped);
        assert_eq!(outcome.stage(Stage::MetaTags).unwrap().status, StageStatus::Skipped);
        assert_eq!(outcome.stage(Stage::WebServer).unwrap().status, StageStatus::Success);
    }

    #[test]
    fn test_detection_is_idempotent() {
        let mut headers = HeaderMap::new();
        headers.insert("server", HeaderValue::from_static("cloudflare"));
        headers.insert("x-powered-by", HeaderValue::from_static("PHP/8.2"));
        let html = r#"<html><head>
            <link href="https://fonts.googleapis.com/css?family=Roboto" rel="stylesheet">
            <link href="/css/bootstrap.min.css" rel="stylesheet">
            <meta property="og:title" content="t">
        </head><body><script>gtag('config', 'G-1');</script></body></html>"#;
        let cookies = vec![Cookie::new("_ga", "GA1.1")];

        let first = detect_html(html, &headers, &cookies);
        let second = detect_html(html, &headers, &cookies);
        assert_eq!(first.stack, second.stack);
        assert_eq!(first.stack.cdn.as_deref(), Some("Cloudflare"));
        assert_eq!(first.stack.web_server.as_deref(), Some("Cloudflare"));
        assert!(first.stack.programming_languages.contains("PHP"));
        assert!(first.stack.analytics_tools.contains("Google Analytics"));
        assert!(first.stack.fonts.contains("Google Fonts"));
        assert!(first.stack.css_frameworks.contains("Bootstrap"));
    }

    #[test]
    fn test_meta_generator_overrides_earlier_cms() {
        let html = r#"<html><head><meta name="generator" content="WordPress 6.5"></head>
            <body><p>Powered by Drupal</p></body></html>"#;
        let outcome = detect_html(html, &HeaderMap::new(), &[]);
        assert_eq!(outcome.stack.cms.as_deref(), Some("WordPress"));
    }

    /// 查询总是失败的文档树
    struct BrokenTree;

    impl DocumentTree for BrokenTree {
        fn find_all(&self, tag: &str) -> RswResult<Vec<&Element>> {
            Err(RswebstackError::InvalidInput(format!("<{}> 属性格式错误", tag)))
        }
    }

    fn detect_body(body: &str, headers: &HeaderMap) -> TechStack {
        engine().detect(&DetectionInput::new(true, body, headers, &[], None))
    }

    fn headers_of(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_static(*value));
        }
        headers
    }

    #[test]
    fn test_stage_failure_does_not_abort_run() {
        let headers = headers_of(&[("server", "nginx")]);
        let body = r#"<script src="/vue.js"></script><div id="___gatsby"></div>"#;
        let outcome = engine().run(&DetectionInput::new(true, body, &headers, &[], Some(&BrokenTree)));

        let css = outcome.stage(Stage::CssFrameworks).unwrap();
        assert_eq!(css.status, StageStatus::Failed);
        assert_eq!(css.errors.len(), 1);
        assert_eq!(outcome.stage(Stage::MetaTags).unwrap().status, StageStatus::Failed);
        // 打包器路径规则不依赖文档树，阶段部分成功
        assert_eq!(outcome.stage(Stage::JsFrameworks).unwrap().status, StageStatus::Partial);
        assert!(outcome.stack.contains(Category::JsFramework, "Gatsby"));
        assert!(!outcome.stack.contains(Category::JsFramework, "Vue.js"));
        assert_eq!(outcome.stack.web_server.as_deref(), Some("Nginx"));
        assert!(!outcome.is_complete());
        assert_eq!(outcome.stages.len(), Stage::PIPELINE.len());
    }

    #[test]
    fn test_obs_text_server_header_still_matches() {
        let mut headers = HeaderMap::new();
        headers.insert("server", HeaderValue::from_bytes(b"cloudflare (\xe9dge)").unwrap());
        let outcome = engine().run(&DetectionInput::new(false, "", &headers, &[], None));

        assert_eq!(outcome.stack.web_server.as_deref(), Some("Cloudflare"));
        assert_eq!(outcome.stack.cdn.as_deref(), Some("Cloudflare"));
        assert!(outcome.failed_stages().next().is_none());
    }

    #[test]
    fn test_via_overrides_cloudflare_cdn() {
        let headers = headers_of(&[
            ("server", "cloudflare"),
            ("via", "1.1 abc123.cloudfront.net (CloudFront)"),
        ]);
        let stack = detect_body("", &headers);
        assert_eq!(stack.web_server.as_deref(), Some("Cloudflare"));
        assert_eq!(stack.cdn.as_deref(), Some("Amazon CloudFront"));
    }

    #[test]
    fn test_via_first_match_per_value() {
        // 同一个值同时提到 varnish 与 akamai，按规则顺序取 Akamai
        let stack = detect_body("", &headers_of(&[("via", "1.1 varnish, 1.1 akamai.net")]));
        assert_eq!(stack.cdn.as_deref(), Some("Akamai"));

        let stack = detect_body("", &headers_of(&[("via", "1.1 google")]));
        assert_eq!(stack.cdn.as_deref(), Some("Google Cloud CDN"));
    }

    #[test]
    fn test_cdn_cache_status() {
        let stack = detect_body("", &headers_of(&[("cdn-cache-status", "Netlify Edge; hit")]));
        assert_eq!(stack.cdn.as_deref(), Some("Netlify Edge"));

        // cdn-cache-status 在 via 之后执行，后写覆盖
        let stack = detect_body(
            "",
            &headers_of(&[("via", "1.1 varnish"), ("cdn-cache-status", "fastly; hit")]),
        );
        assert_eq!(stack.cdn.as_deref(), Some("Fastly"));
    }

    #[test]
    fn test_deployment_platform() {
        let stack = detect_body("", &headers_of(&[("server", "Vercel")]));
        assert_eq!(stack.deployment_platform.as_deref(), Some("Vercel"));
        assert_eq!(stack.web_server, None);

        let stack = detect_body("", &headers_of(&[("server", "Netlify")]));
        assert_eq!(stack.deployment_platform.as_deref(), Some("Netlify"));
    }

    #[test]
    fn test_bundler_paths() {
        let headers = HeaderMap::new();
        let stack = detect_body(r#"<script src="/_next/static/chunks/main-abc.js"></script>"#, &headers);
        assert!(stack.js_frameworks.contains("Next.js"));

        let stack = detect_body(r#"<link rel="preload" href="/_nuxt/app.3f2a.js">"#, &headers);
        assert!(stack.js_frameworks.contains("Nuxt.js"));

        let stack = detect_body(r#"<div id="___gatsby"></div>"#, &headers);
        let js: Vec<_> = stack.js_frameworks.iter().map(String::as_str).collect();
        assert_eq!(js, vec!["Gatsby"]);
    }

    #[test]
    fn test_ads_tracking() {
        let body = r#"<script async src="https://pagead2.googlesyndication.com/pagead/js/adsbygoogle.js"></script>
            <script src="https://securepubads.g.doubleclick.net/tag/js/gpt.js"></script>"#;
        let stack = detect_body(body, &HeaderMap::new());
        assert!(stack.other_technologies.contains("Google AdSense"));
        assert!(stack.other_technologies.contains("DoubleClick"));
        assert!(!stack.other_technologies.contains("Taboola"));
    }

    #[test]
    fn test_asp_net_from_powered_by() {
        let stack = detect_body("", &headers_of(&[("x-powered-by", "ASP.NET")]));
        let langs: Vec<_> = stack.programming_languages.iter().map(String::as_str).collect();
        assert_eq!(langs, vec!["ASP.NET"]);
    }
}
