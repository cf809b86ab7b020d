//! 规则组分析器：从检测输入中取出特征值，按组策略执行匹配并写入结果
use std::borrow::Cow;

use reqwest::header::HeaderMap;
use tracing::debug;

use crate::error::RswResult;
use crate::extractor::DocumentTree;
use crate::result::TechStack;
use crate::rule::{MatchPolicy, Matcher, Rule, RuleGroup, Source};
use crate::utils::Cookie;

/// 单次检测的输入（只读借用）
#[derive(Clone, Copy)]
pub struct DetectionInput<'a> {
    pub https_enabled: bool,
    pub body: &'a str,
    pub headers: &'a HeaderMap,
    pub cookies: &'a [Cookie],
    /// 文档树，解析失败时为空
    pub document: Option<&'a dyn DocumentTree>,
}

impl<'a> DetectionInput<'a> {
    pub fn new(
        https_enabled: bool,
        body: &'a str,
        headers: &'a HeaderMap,
        cookies: &'a [Cookie],
        document: Option<&'a dyn DocumentTree>,
    ) -> Self {
        Self {
            https_enabled,
            body,
            headers,
            cookies,
            document,
        }
    }

    /// 按来源取出待匹配的值
    /// 响应头值按有损UTF-8解码；文档树查询失败时返回错误，由上层记为阶段失败
    pub(crate) fn values_of(&self, source: Source) -> RswResult<Vec<Cow<'a, str>>> {
        let values = match source {
            Source::Body => vec![Cow::Borrowed(self.body)],
            Source::Header(name) => self
                .headers
                .get_all(name)
                .into_iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()))
                .collect(),
            Source::CookieName => self
                .cookies
                .iter()
                .map(|c| Cow::Borrowed(c.name.as_str()))
                .collect(),
            _ => {
                let Some(doc) = self.document else {
                    return Ok(Vec::new());
                };
                Self::document_values(doc, source)?
            }
        };
        Ok(values)
    }

    fn document_values(doc: &'a dyn DocumentTree, source: Source) -> RswResult<Vec<Cow<'a, str>>> {
        if let Some((tag, attr)) = source.element_attr() {
            return Ok(doc
                .find_all_with_attr(tag, attr)?
                .into_iter()
                .filter_map(|el| el.attr(attr))
                .map(Cow::Borrowed)
                .collect());
        }

        let values = match source {
            Source::InlineScript => doc
                .find_all("script")?
                .into_iter()
                .filter(|el| !el.has_attr("src"))
                .map(|el| Cow::Borrowed(el.text().unwrap_or("")))
                .collect(),
            Source::MetaContent { name_key } => doc
                .find_all_with_attr("meta", "name")?
                .into_iter()
                .filter(|el| {
                    el.attr("name")
                        .map(|n| n.to_ascii_lowercase().contains(name_key))
                        .unwrap_or(false)
                })
                .filter_map(|el| el.attr("content"))
                .map(Cow::Borrowed)
                .collect(),
            _ => Vec::new(),
        };
        Ok(values)
    }

    /// 元素属性上的前缀规则直接走文档树的前缀查询；不适用时返回 None
    fn prefix_hit(&self, rule: &Rule) -> RswResult<Option<bool>> {
        let (Matcher::StartsWith(prefix), Some((tag, attr)), Some(doc)) =
            (&rule.matcher, rule.source.element_attr(), self.document)
        else {
            return Ok(None);
        };
        Ok(Some(!doc.find_all_with_attr_prefix(tag, attr, prefix)?.is_empty()))
    }

    /// 响应头存在性判断（不解码头值）
    fn has_header(&self, source: Source) -> bool {
        match source {
            Source::Header(name) => self.headers.contains_key(name),
            _ => false,
        }
    }
}

/// 规则组分析器
pub struct GroupAnalyzer;

impl GroupAnalyzer {
    /// 执行一个规则组，返回命中次数
    pub fn analyze(group: &RuleGroup, input: &DetectionInput<'_>, stack: &mut TechStack) -> RswResult<usize> {
        match group.policy {
            MatchPolicy::All => Self::analyze_all(group, input, stack),
            MatchPolicy::FirstMatch => Self::analyze_first_match(group, input, stack),
        }
    }

    /// 每条规则独立判断，命中即写入
    fn analyze_all(group: &RuleGroup, input: &DetectionInput<'_>, stack: &mut TechStack) -> RswResult<usize> {
        let mut matched = 0;
        for rule in &group.rules {
            let hit = if rule.matcher.is_exists() {
                input.has_header(rule.source)
            } else if let Some(hit) = input.prefix_hit(rule)? {
                hit
            } else {
                input
                    .values_of(rule.source)?
                    .iter()
                    .any(|value| rule.matcher.is_match(value))
            };

            if hit {
                Self::handle_match_success(group, rule, stack);
                matched += 1;
            }
        }
        Ok(matched)
    }

    /// 组内规则同源：对每个值按顺序择第一个命中的规则
    fn analyze_first_match(
        group: &RuleGroup,
        input: &DetectionInput<'_>,
        stack: &mut TechStack,
    ) -> RswResult<usize> {
        let Some(first) = group.rules.first() else {
            return Ok(0);
        };

        let mut matched = 0;
        for value in input.values_of(first.source)? {
            if let Some(rule) = group.rules.iter().find(|r| r.matcher.is_match(&value)) {
                Self::handle_match_success(group, rule, stack);
                matched += 1;
            }
        }
        Ok(matched)
    }

    fn handle_match_success(group: &RuleGroup, rule: &Rule, stack: &mut TechStack) {
        let changed = stack.apply(rule.category, rule.label);
        debug!(
            "[{}]匹配成功 | 技术: {} | 分类: {} | 来源: {} | 规则: {} | 结果变更: {}",
            group.name,
            rule.label,
            rule.category,
            rule.source.describe(),
            rule.matcher.describe(),
            changed
        );
    }
}
