//! 内置规则表
//! 按检测阶段分组的静态特征表，进程内只编译一次，之后只读共享

use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use tracing::debug;

use super::model::{
    Category, GroupSpec, MatchPolicy, PatternSpec, Rule, RuleGroup, RuleSpec, Source, Stage,
};
use crate::error::{RswResult, RswebstackError};

use Category as C;
use PatternSpec as P;

const fn rule(category: Category, label: &'static str, source: Source, pattern: PatternSpec) -> RuleSpec {
    RuleSpec { category, label, source, pattern }
}

const SERVER: Source = Source::Header("server");

// ===== CMS =====
const CMS_HEADERS: &[RuleSpec] = &[
    rule(C::Cms, "Drupal", Source::Header("x-drupal-cache"), P::Exists),
    rule(C::Cms, "Shopify", Source::Header("x-shopify-stage"), P::Exists),
];

// 顺序有意义：第一个命中的CMS生效
const CMS_BODY: &[RuleSpec] = &[
    rule(C::Cms, "WordPress", Source::Body, P::Regex(r"wp-content|wp-includes")),
    rule(C::Cms, "Joomla", Source::Body, P::Regex(r"Joomla")),
    rule(C::Cms, "Drupal", Source::Body, P::Regex(r"Drupal")),
    rule(C::Cms, "Shopify", Source::Body, P::Regex(r"cdn\.shopify\.com")),
    rule(C::Cms, "Wix", Source::Body, P::Regex(r"wix\.static")),
    rule(C::Cms, "Squarespace", Source::Body, P::Regex(r"squarespace")),
];

const CMS_COOKIES: &[RuleSpec] = &[
    rule(C::Cms, "WordPress", Source::CookieName, P::Contains("wordpress")),
];

// ===== JavaScript 框架 =====
const JS_SCRIPT_SRC: &[RuleSpec] = &[
    rule(C::JsFramework, "jQuery", Source::ScriptSrc, P::Contains("jquery")),
    rule(C::JsFramework, "Angular", Source::ScriptSrc, P::Contains("angular")),
    rule(C::JsFramework, "React", Source::ScriptSrc, P::Contains("react")),
    rule(C::JsFramework, "Vue.js", Source::ScriptSrc, P::Contains("vue")),
    rule(C::JsFramework, "Ember.js", Source::ScriptSrc, P::Contains("ember")),
];

const JS_INLINE: &[RuleSpec] = &[
    rule(C::JsFramework, "React", Source::InlineScript, P::RegexCaseSensitive(r"window\.React")),
    rule(C::JsFramework, "Angular", Source::InlineScript, P::RegexCaseSensitive(r"window\.angular")),
    rule(C::JsFramework, "jQuery", Source::InlineScript, P::RegexCaseSensitive(r"var\s+\$")),
];

// 打包器输出路径约定
const JS_BUNDLER_PATHS: &[RuleSpec] = &[
    rule(C::JsFramework, "Next.js", Source::Body, P::Regex(r"/_next/static/")),
    rule(C::JsFramework, "Nuxt.js", Source::Body, P::Regex(r"/_nuxt/")),
    rule(C::JsFramework, "Gatsby", Source::Body, P::Regex(r"___gatsby|gatsby-chunk-mapping")),
];

// ===== CSS 框架 =====
const CSS_LINK_HREF: &[RuleSpec] = &[
    rule(C::CssFramework, "Bootstrap", Source::LinkHref, P::Contains("bootstrap")),
    rule(C::CssFramework, "Tailwind CSS", Source::LinkHref, P::Contains("tailwind")),
    rule(C::CssFramework, "Bulma", Source::LinkHref, P::Contains("bulma")),
    rule(C::CssFramework, "Foundation", Source::LinkHref, P::Contains("foundation")),
];

// ===== 统计分析 =====
const ANALYTICS_BODY: &[RuleSpec] = &[
    rule(C::Analytics, "Google Analytics", Source::Body, P::Regex(r"gtag\(|\bga\(|google-analytics\.com")),
    rule(C::Analytics, "Facebook Pixel", Source::Body, P::Regex(r"fbq\(|facebook-pixel")),
    rule(C::Analytics, "Hotjar", Source::Body, P::Regex(r"hotjar")),
];

const ANALYTICS_COOKIES: &[RuleSpec] = &[
    rule(C::Analytics, "Google Analytics", Source::CookieName, P::Contains("google")),
    rule(C::Analytics, "Google Analytics", Source::CookieName, P::StartsWith("_ga")),
    rule(C::Analytics, "Hotjar", Source::CookieName, P::Contains("hotjar")),
    rule(C::Analytics, "Hotjar", Source::CookieName, P::StartsWith("_hj")),
];

const TAG_MANAGERS_BODY: &[RuleSpec] = &[
    rule(C::TagManager, "Google Tag Manager", Source::Body, P::Regex(r"googletagmanager")),
];

const RUM_BODY: &[RuleSpec] = &[
    rule(C::Rum, "New Relic", Source::Body, P::Regex(r"newrelic")),
    rule(C::Rum, "Datadog", Source::Body, P::Regex(r"datadog")),
];

// ===== Meta 标签 =====
const META_TAGS: &[RuleSpec] = &[
    rule(C::Other, "Open Graph (Facebook)", Source::MetaProperty, P::StartsWith("og:")),
    rule(C::Other, "Twitter Cards", Source::MetaProperty, P::StartsWith("twitter:")),
    rule(C::Other, "Twitter Cards", Source::MetaName, P::StartsWith("twitter:")),
    rule(C::Other, "LinkedIn", Source::MetaName, P::Contains("linkedin")),
    rule(C::Cms, "WordPress", Source::MetaContent { name_key: "generator" }, P::Contains("wordpress")),
];

// ===== 服务端 =====
const WEB_SERVER: &[RuleSpec] = &[
    rule(C::WebServer, "Apache", SERVER, P::Contains("apache")),
    rule(C::WebServer, "Nginx", SERVER, P::Contains("nginx")),
    rule(C::WebServer, "Cloudflare", SERVER, P::Contains("cloudflare")),
    rule(C::WebServer, "Microsoft-IIS", SERVER, P::Contains("microsoft-iis")),
];

const LANGUAGE_HEADERS: &[RuleSpec] = &[
    rule(C::ProgrammingLanguage, "PHP", Source::Header("x-powered-by"), P::Contains("php")),
    rule(C::ProgrammingLanguage, "ASP.NET", Source::Header("x-powered-by"), P::Contains("asp.net")),
];

const LANGUAGE_BODY: &[RuleSpec] = &[
    rule(C::ProgrammingLanguage, "PHP", Source::Body, P::Regex(r"\.php")),
];

// Via / CDN-Cache-Status 在真实响应中很少出现，仅作尽力匹配
const CDN_SERVER: &[RuleSpec] = &[
    rule(C::Cdn, "Cloudflare", SERVER, P::Contains("cloudflare")),
];

const CDN_VIA: &[RuleSpec] = &[
    rule(C::Cdn, "Amazon CloudFront", Source::Header("via"), P::Contains("cloudfront")),
    rule(C::Cdn, "Akamai", Source::Header("via"), P::Contains("akamai")),
    rule(C::Cdn, "Varnish", Source::Header("via"), P::Contains("varnish")),
    rule(C::Cdn, "Google Cloud CDN", Source::Header("via"), P::Contains("google")),
];

const CDN_CACHE_STATUS: &[RuleSpec] = &[
    rule(C::Cdn, "Netlify Edge", Source::Header("cdn-cache-status"), P::Contains("netlify")),
    rule(C::Cdn, "Fastly", Source::Header("cdn-cache-status"), P::Contains("fastly")),
    rule(C::Cdn, "Bunny CDN", Source::Header("cdn-cache-status"), P::Contains("bunny")),
];

const FONTS_LINK_HREF: &[RuleSpec] = &[
    rule(C::Font, "Google Fonts", Source::LinkHref, P::Contains("fonts.googleapis")),
    rule(C::Font, "Adobe Fonts (Typekit)", Source::LinkHref, P::Contains("use.typekit.net")),
];

const DEPLOYMENT_PLATFORM: &[RuleSpec] = &[
    rule(C::DeploymentPlatform, "Vercel", SERVER, P::Contains("vercel")),
    rule(C::DeploymentPlatform, "Netlify", SERVER, P::Contains("netlify")),
    rule(C::DeploymentPlatform, "Heroku", SERVER, P::Contains("heroku")),
    rule(C::DeploymentPlatform, "Firebase", SERVER, P::Contains("firebase")),
];

// ===== 广告追踪 / 支付，统一记入 other_technologies =====
const ADS_TRACKING_BODY: &[RuleSpec] = &[
    rule(C::Other, "Google AdSense", Source::Body, P::Regex(r"pagead2\.googlesyndication\.com|adsbygoogle")),
    rule(C::Other, "DoubleClick", Source::Body, P::Regex(r"doubleclick\.net")),
    rule(C::Other, "Amazon Advertising", Source::Body, P::Regex(r"amazon-adsystem\.com")),
    rule(C::Other, "Taboola", Source::Body, P::Regex(r"cdn\.taboola\.com")),
    rule(C::Other, "Outbrain", Source::Body, P::Regex(r"widgets\.outbrain\.com|outbrain\.js")),
    rule(C::Other, "Criteo", Source::Body, P::Regex(r"static\.criteo\.net")),
];

const PAYMENTS_BODY: &[RuleSpec] = &[
    rule(C::Other, "Stripe", Source::Body, P::Regex(r"js\.stripe\.com")),
    rule(C::Other, "PayPal", Source::Body, P::Regex(r"paypal\.com/sdk/js|paypalobjects\.com")),
    rule(C::Other, "Braintree", Source::Body, P::Regex(r"braintreegateway\.com")),
    rule(C::Other, "Square", Source::Body, P::Regex(r"squarecdn\.com|squareup\.com")),
    rule(C::Other, "Razorpay", Source::Body, P::Regex(r"checkout\.razorpay\.com")),
    rule(C::Other, "Klarna", Source::Body, P::Regex(r"klarna\.com|klarnacdn\.net")),
];

const fn group(name: &'static str, stage: Stage, policy: MatchPolicy, rules: &'static [RuleSpec]) -> GroupSpec {
    GroupSpec { name, stage, policy, rules }
}

/// 内置规则组，同一阶段内按此顺序执行
pub const BUILTIN_GROUPS: &[GroupSpec] = &[
    group("cms-headers", Stage::Cms, MatchPolicy::All, CMS_HEADERS),
    group("cms-body", Stage::Cms, MatchPolicy::FirstMatch, CMS_BODY),
    group("cms-cookies", Stage::Cms, MatchPolicy::All, CMS_COOKIES),
    group("js-script-src", Stage::JsFrameworks, MatchPolicy::FirstMatch, JS_SCRIPT_SRC),
    group("js-inline", Stage::JsFrameworks, MatchPolicy::All, JS_INLINE),
    group("js-bundler-paths", Stage::JsFrameworks, MatchPolicy::All, JS_BUNDLER_PATHS),
    group("css-link-href", Stage::CssFrameworks, MatchPolicy::FirstMatch, CSS_LINK_HREF),
    group("analytics-body", Stage::Analytics, MatchPolicy::All, ANALYTICS_BODY),
    group("analytics-cookies", Stage::Analytics, MatchPolicy::All, ANALYTICS_COOKIES),
    group("tag-managers-body", Stage::TagManagers, MatchPolicy::All, TAG_MANAGERS_BODY),
    group("rum-body", Stage::Rum, MatchPolicy::All, RUM_BODY),
    group("meta-tags", Stage::MetaTags, MatchPolicy::All, META_TAGS),
    group("web-server", Stage::WebServer, MatchPolicy::FirstMatch, WEB_SERVER),
    group("language-headers", Stage::ProgrammingLanguages, MatchPolicy::All, LANGUAGE_HEADERS),
    group("language-body", Stage::ProgrammingLanguages, MatchPolicy::All, LANGUAGE_BODY),
    group("cdn-server", Stage::Cdn, MatchPolicy::All, CDN_SERVER),
    group("cdn-via", Stage::Cdn, MatchPolicy::FirstMatch, CDN_VIA),
    group("cdn-cache-status", Stage::Cdn, MatchPolicy::FirstMatch, CDN_CACHE_STATUS),
    group("fonts-link-href", Stage::Fonts, MatchPolicy::FirstMatch, FONTS_LINK_HREF),
    group("deployment-platform", Stage::DeploymentPlatform, MatchPolicy::FirstMatch, DEPLOYMENT_PLATFORM),
    group("ads-tracking-body", Stage::AdsTracking, MatchPolicy::All, ADS_TRACKING_BODY),
    group("payments-body", Stage::Payments, MatchPolicy::All, PAYMENTS_BODY),
];

/// 进程级共享的内置规则表
static SHARED_CATALOGUE: Lazy<Result<Arc<RuleCatalogue>, String>> = Lazy::new(|| {
    RuleCatalogue::builtin()
        .map(Arc::new)
        .map_err(|e| e.to_string())
});

/// 编译后的规则表（不可变）
#[derive(Debug, Clone)]
pub struct RuleCatalogue {
    groups: Vec<RuleGroup>,
}

impl RuleCatalogue {
    /// 从静态规则组定义编译规则表
    pub fn from_specs(specs: &[GroupSpec]) -> RswResult<Self> {
        let start = Instant::now();
        let mut groups = Vec::with_capacity(specs.len());

        for spec in specs {
            Self::validate_group(spec)?;
            let rules = spec
                .rules
                .iter()
                .map(Rule::compile)
                .collect::<RswResult<Vec<_>>>()?;
            groups.push(RuleGroup {
                name: spec.name,
                stage: spec.stage,
                policy: spec.policy,
                rules,
            });
        }

        let catalogue = Self { groups };
        debug!(
            "规则表编译完成，耗时{:?}，规则组{}个，规则{}条",
            start.elapsed(),
            catalogue.groups.len(),
            catalogue.rule_count()
        );
        Ok(catalogue)
    }

    /// 编译内置规则表
    pub fn builtin() -> RswResult<Self> {
        Self::from_specs(BUILTIN_GROUPS)
    }

    /// 获取进程级共享的内置规则表（首次调用时编译）
    pub fn shared() -> RswResult<Arc<Self>> {
        SHARED_CATALOGUE
            .as_ref()
            .map(Arc::clone)
            .map_err(|e| RswebstackError::RuleBuildError(e.clone()))
    }

    pub fn groups(&self) -> &[RuleGroup] {
        &self.groups
    }

    /// 指定阶段的规则组（保持定义顺序）
    pub fn groups_for(&self, stage: Stage) -> impl Iterator<Item = &RuleGroup> + '_ {
        self.groups.iter().filter(move |g| g.stage == stage)
    }

    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.rules.len()).sum()
    }

    fn validate_group(spec: &GroupSpec) -> RswResult<()> {
        let Some(first) = spec.rules.first() else {
            return Err(RswebstackError::RuleBuildError(format!("规则组[{}]为空", spec.name)));
        };

        // FirstMatch 按输入值逐个择一，组内规则必须取自同一来源
        if spec.policy == MatchPolicy::FirstMatch
            && spec.rules.iter().any(|r| r.source != first.source)
        {
            return Err(RswebstackError::RuleBuildError(format!(
                "规则组[{}]为FirstMatch策略，但规则来源不一致",
                spec.name
            )));
        }

        for r in spec.rules {
            if r.pattern == PatternSpec::Exists && !matches!(r.source, Source::Header(_)) {
                return Err(RswebstackError::RuleBuildError(format!(
                    "规则组[{}]中的[{}]：存在性匹配仅支持响应头",
                    spec.name, r.label
                )));
            }
            if let Source::Header(name) = r.source {
                if name.bytes().any(|b| b.is_ascii_uppercase()) {
                    return Err(RswebstackError::RuleBuildError(format!(
                        "规则组[{}]中的响应头名称[{}]必须为小写",
                        spec.name, name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalogue_compiles() {
        let catalogue = RuleCatalogue::builtin().unwrap();
        assert_eq!(catalogue.groups().len(), BUILTIN_GROUPS.len());
        assert!(catalogue.rule_count() > 50);
    }

    #[test]
    fn test_every_stage_has_rules() {
        let catalogue = RuleCatalogue::builtin().unwrap();
        for stage in Stage::PIPELINE {
            assert!(
                catalogue.groups_for(stage).next().is_some(),
                "阶段{}没有规则组",
                stage
            );
        }
    }

    #[test]
    fn test_cms_group_order() {
        let catalogue = RuleCatalogue::builtin().unwrap();
        let names: Vec<_> = catalogue.groups_for(Stage::Cms).map(|g| g.name).collect();
        assert_eq!(names, vec!["cms-headers", "cms-body", "cms-cookies"]);
    }

    #[test]
    fn test_shared_is_same_instance() {
        let a = RuleCatalogue::shared().unwrap();
        let b = RuleCatalogue::shared().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_reject_mixed_first_match_group() {
        const MIXED: &[RuleSpec] = &[
            rule(C::Cms, "A", Source::Body, P::Contains("a")),
            rule(C::Cms, "B", Source::CookieName, P::Contains("b")),
        ];
        let specs = [group("mixed", Stage::Cms, MatchPolicy::FirstMatch, MIXED)];
        let err = RuleCatalogue::from_specs(&specs).unwrap_err();
        assert!(matches!(err, RswebstackError::RuleBuildError(_)));
    }

    #[test]
    fn test_reject_exists_on_body() {
        const BAD: &[RuleSpec] = &[rule(C::Cms, "A", Source::Body, P::Exists)];
        let specs = [group("bad", Stage::Cms, MatchPolicy::All, BAD)];
        assert!(RuleCatalogue::from_specs(&specs).is_err());
    }

    #[test]
    fn test_reject_bad_regex() {
        const BAD: &[RuleSpec] = &[rule(C::Cms, "A", Source::Body, P::Regex("(open"))];
        let specs = [group("bad", Stage::Cms, MatchPolicy::All, BAD)];
        let err = RuleCatalogue::from_specs(&specs).unwrap_err();
        assert!(matches!(err, RswebstackError::RegexCompileError(_)));
    }
}
