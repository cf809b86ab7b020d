//! 检测结果输出
//! 只读消费 [`TechStack`]，不回写任何字段

use std::fmt::Write as _;

use super::tech_stack::TechStack;
use crate::error::RswResult;
use crate::rule::Category;

const NOT_DETECTED: &str = "Not detected";

/// 输出行顺序
enum Line {
    Single(Category),
    Set(Category),
    Https,
}

const LINES: [Line; 13] = [
    Line::Single(Category::Cms),
    Line::Set(Category::JsFramework),
    Line::Set(Category::CssFramework),
    Line::Set(Category::Analytics),
    Line::Set(Category::TagManager),
    Line::Set(Category::Rum),
    Line::Single(Category::WebServer),
    Line::Set(Category::ProgrammingLanguage),
    Line::Set(Category::Other),
    Line::Single(Category::Cdn),
    Line::Set(Category::Font),
    Line::Https,
    Line::Single(Category::DeploymentPlatform),
];

/// 文本格式输出
pub struct TextReporter;

impl TextReporter {
    /// 渲染带标题的完整报告
    pub fn render(url: &str, stack: &TechStack) -> String {
        let mut out = String::with_capacity(512);
        let _ = writeln!(out, "Detected Technologies on {}", url);
        out.push_str(&Self::render_body(stack));
        out
    }

    /// 每个字段一行：集合按字母序逗号分隔，空值输出 "Not detected"
    pub fn render_body(stack: &TechStack) -> String {
        let mut out = String::with_capacity(512);
        for line in &LINES {
            let (title, value) = match line {
                Line::Single(cat) => (cat.as_str(), stack.single(*cat).unwrap_or(NOT_DETECTED).to_string()),
                Line::Set(cat) => {
                    let value = match stack.set(*cat) {
                        Some(set) if !set.is_empty() => {
                            set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
                        }
                        _ => NOT_DETECTED.to_string(),
                    };
                    (cat.as_str(), value)
                }
                Line::Https => (
                    "HTTPS",
                    if stack.https_enabled { "Enabled" } else { "Not Enabled" }.to_string(),
                ),
            };
            let _ = writeln!(out, "{}: {}", title, value);
        }
        out
    }
}

/// JSON格式输出
pub struct JsonReporter;

impl JsonReporter {
    pub fn render(stack: &TechStack) -> RswResult<String> {
        Ok(serde_json::to_string_pretty(stack)?)
    }
}
