//! 规则数据模型定义
//! 规则一经构建即不可变，可在多个检测任务间只读共享

use std::borrow::Cow;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::RswResult;

/// 检测结果分类（对应结果记录中的字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Cms,
    JsFramework,
    CssFramework,
    Analytics,
    TagManager,
    Rum,
    WebServer,
    Cdn,
    ProgrammingLanguage,
    Font,
    DeploymentPlatform,
    Other,
}

impl Category {
    /// 单值字段：后写覆盖前写
    pub fn is_single_valued(&self) -> bool {
        matches!(
            self,
            Category::Cms | Category::WebServer | Category::Cdn | Category::DeploymentPlatform
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cms => "CMS",
            Category::JsFramework => "JavaScript Frameworks",
            Category::CssFramework => "CSS Frameworks",
            Category::Analytics => "Analytics",
            Category::TagManager => "Tag Managers",
            Category::Rum => "RUM (Real User Monitoring)",
            Category::WebServer => "Web Servers",
            Category::Cdn => "CDN",
            Category::ProgrammingLanguage => "Programming Languages",
            Category::Font => "Fonts",
            Category::DeploymentPlatform => "Deployment Platform",
            Category::Other => "Other Technologies",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 检测阶段，执行顺序固定（决定单值字段的最终归属）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Cms,
    JsFrameworks,
    CssFrameworks,
    Analytics,
    TagManagers,
    Rum,
    MetaTags,
    WebServer,
    ProgrammingLanguages,
    Cdn,
    Fonts,
    DeploymentPlatform,
    AdsTracking,
    Payments,
}

impl Stage {
    /// 引擎执行顺序
    pub const PIPELINE: [Stage; 14] = [
        Stage::Cms,
        Stage::JsFrameworks,
        Stage::CssFrameworks,
        Stage::Analytics,
        Stage::TagManagers,
        Stage::Rum,
        Stage::MetaTags,
        Stage::WebServer,
        Stage::ProgrammingLanguages,
        Stage::Cdn,
        Stage::Fonts,
        Stage::DeploymentPlatform,
        Stage::AdsTracking,
        Stage::Payments,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Cms => "cms",
            Stage::JsFrameworks => "js_frameworks",
            Stage::CssFrameworks => "css_frameworks",
            Stage::Analytics => "analytics",
            Stage::TagManagers => "tag_managers",
            Stage::Rum => "rum",
            Stage::MetaTags => "meta_tags",
            Stage::WebServer => "web_server",
            Stage::ProgrammingLanguages => "programming_languages",
            Stage::Cdn => "cdn",
            Stage::Fonts => "fonts",
            Stage::DeploymentPlatform => "deployment_platform",
            Stage::AdsTracking => "ads_tracking",
            Stage::Payments => "payments",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 特征来源：规则从哪一类数据中取值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// 原始响应正文
    Body,
    /// 指定名称的响应头（大小写不敏感）
    Header(&'static str),
    /// Cookie 名称
    CookieName,
    /// `<script src>`
    ScriptSrc,
    /// 无 src 的内联 `<script>` 文本
    InlineScript,
    /// `<link href>`
    LinkHref,
    /// `<meta property>`
    MetaProperty,
    /// `<meta name>`
    MetaName,
    /// name 中包含指定关键字的 `<meta>` 的 content
    MetaContent { name_key: &'static str },
}

impl Source {
    /// 是否依赖文档树（文档树缺失时该类规则整体跳过）
    pub fn needs_document(&self) -> bool {
        matches!(
            self,
            Source::ScriptSrc
                | Source::InlineScript
                | Source::LinkHref
                | Source::MetaProperty
                | Source::MetaName
                | Source::MetaContent { .. }
        )
    }

    /// 取值于元素属性的来源对应的 (标签, 属性)
    pub fn element_attr(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Source::ScriptSrc => Some(("script", "src")),
            Source::LinkHref => Some(("link", "href")),
            Source::MetaProperty => Some(("meta", "property")),
            Source::MetaName => Some(("meta", "name")),
            _ => None,
        }
    }

    pub fn describe(&self) -> Cow<'static, str> {
        match self {
            Source::Body => Cow::Borrowed("body"),
            Source::Header(name) => Cow::Owned(format!("header:{}", name)),
            Source::CookieName => Cow::Borrowed("cookie-name"),
            Source::ScriptSrc => Cow::Borrowed("script[src]"),
            Source::InlineScript => Cow::Borrowed("script(inline)"),
            Source::LinkHref => Cow::Borrowed("link[href]"),
            Source::MetaProperty => Cow::Borrowed("meta[property]"),
            Source::MetaName => Cow::Borrowed("meta[name]"),
            Source::MetaContent { name_key } => Cow::Owned(format!("meta[name*={}][content]", name_key)),
        }
    }
}

/// 规则表中的原始模式（静态数据，构建时编译为 [`Matcher`]）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSpec {
    Contains(&'static str),
    StartsWith(&'static str),
    /// 忽略大小写的正则
    Regex(&'static str),
    /// 区分大小写的正则
    RegexCaseSensitive(&'static str),
    /// 仅判断存在性（响应头）
    Exists,
}

#[derive(Debug, Clone)]
pub enum Matcher {
    Contains(String),   // 包含匹配（忽略大小写）
    StartsWith(String), // 前缀匹配（忽略大小写）
    Regex(Regex),       // 正则匹配
    Exists,             // 存在即命中
}

impl Matcher {
    /// 编译原始模式
    pub fn compile(spec: &PatternSpec) -> RswResult<Self> {
        let matcher = match spec {
            PatternSpec::Contains(s) => Matcher::Contains(s.to_ascii_lowercase()),
            PatternSpec::StartsWith(s) => Matcher::StartsWith(s.to_ascii_lowercase()),
            PatternSpec::Regex(p) => Matcher::Regex(RegexBuilder::new(p).case_insensitive(true).build()?),
            PatternSpec::RegexCaseSensitive(p) => Matcher::Regex(Regex::new(p)?),
            PatternSpec::Exists => Matcher::Exists,
        };
        Ok(matcher)
    }

    /// 简单匹配判断
    pub fn is_match(&self, input: &str) -> bool {
        match self {
            Matcher::Contains(s) => ascii_lower(input).contains(s.as_str()),
            Matcher::StartsWith(s) => ascii_lower(input).starts_with(s.as_str()),
            Matcher::Regex(regex) => regex.is_match(input),
            Matcher::Exists => true,
        }
    }

    pub fn is_exists(&self) -> bool {
        matches!(self, Matcher::Exists)
    }

    /// 规则描述
    pub fn describe(&self) -> &str {
        match self {
            Matcher::Contains(s) => s.as_str(),
            Matcher::StartsWith(s) => s.as_str(),
            Matcher::Regex(r) => r.as_str(),
            Matcher::Exists => "exists",
        }
    }
}

/// 无大写字母时零拷贝
fn ascii_lower(input: &str) -> Cow<'_, str> {
    if input.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(input.to_ascii_lowercase())
    } else {
        Cow::Borrowed(input)
    }
}

/// 单条规则的静态定义
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub category: Category,
    pub label: &'static str,
    pub source: Source,
    pub pattern: PatternSpec,
}

/// 规则组匹配策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// 所有命中的规则都生效
    All,
    /// 对每个输入值，按顺序第一个命中的规则生效
    FirstMatch,
}

/// 规则组的静态定义
#[derive(Debug, Clone, Copy)]
pub struct GroupSpec {
    pub name: &'static str,
    pub stage: Stage,
    pub policy: MatchPolicy,
    pub rules: &'static [RuleSpec],
}

/// 编译后的单条规则
#[derive(Debug, Clone)]
pub struct Rule {
    pub category: Category,
    pub label: &'static str,
    pub source: Source,
    pub matcher: Matcher,
}

impl Rule {
    pub fn compile(spec: &RuleSpec) -> RswResult<Self> {
        Ok(Self {
            category: spec.category,
            label: spec.label,
            source: spec.source,
            matcher: Matcher::compile(&spec.pattern)?,
        })
    }
}

/// 编译后的规则组
#[derive(Debug, Clone)]
pub struct RuleGroup {
    pub name: &'static str,
    pub stage: Stage,
    pub policy: MatchPolicy,
    pub rules: Vec<Rule>,
}

impl RuleGroup {
    /// 组内任一规则依赖文档树
    pub fn needs_document(&self) -> bool {
        self.rules.iter().any(|r| r.source.needs_document())
    }
}
