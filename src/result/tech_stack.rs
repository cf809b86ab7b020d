//! 技术栈检测结果
//! 单次检测独占的累加器：单值字段后写覆盖，集合字段只增不减

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::rule::Category;

/// 检测结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechStack {
    pub cms: Option<String>,
    pub web_server: Option<String>,
    pub cdn: Option<String>,
    pub deployment_platform: Option<String>,
    pub https_enabled: bool,
    pub js_frameworks: BTreeSet<String>,
    pub css_frameworks: BTreeSet<String>,
    pub analytics_tools: BTreeSet<String>,
    pub tag_managers: BTreeSet<String>,
    pub rum_tools: BTreeSet<String>,
    pub programming_languages: BTreeSet<String>,
    pub fonts: BTreeSet<String>,
    pub other_technologies: BTreeSet<String>,
}

impl TechStack {
    /// 创建空结果，HTTPS 由调用方根据URL协议确定
    pub fn new(https_enabled: bool) -> Self {
        Self {
            https_enabled,
            ..Self::default()
        }
    }

    /// 写入一条命中结果，返回结果是否发生变化
    pub fn apply(&mut self, category: Category, label: &str) -> bool {
        if let Some(slot) = self.single_slot_mut(category) {
            if slot.as_deref() == Some(label) {
                return false;
            }
            *slot = Some(label.to_string());
            return true;
        }
        match self.set_slot_mut(category) {
            Some(set) => set.insert(label.to_string()),
            None => false,
        }
    }

    /// 单值字段当前值
    pub fn single(&self, category: Category) -> Option<&str> {
        match category {
            Category::Cms => self.cms.as_deref(),
            Category::WebServer => self.web_server.as_deref(),
            Category::Cdn => self.cdn.as_deref(),
            Category::DeploymentPlatform => self.deployment_platform.as_deref(),
            _ => None,
        }
    }

    /// 集合字段
    pub fn set(&self, category: Category) -> Option<&BTreeSet<String>> {
        match category {
            Category::JsFramework => Some(&self.js_frameworks),
            Category::CssFramework => Some(&self.css_frameworks),
            Category::Analytics => Some(&self.analytics_tools),
            Category::TagManager => Some(&self.tag_managers),
            Category::Rum => Some(&self.rum_tools),
            Category::ProgrammingLanguage => Some(&self.programming_languages),
            Category::Font => Some(&self.fonts),
            Category::Other => Some(&self.other_technologies),
            _ => None,
        }
    }

    /// 分类下是否包含某个标签
    pub fn contains(&self, category: Category, label: &str) -> bool {
        if category.is_single_valued() {
            return self.single(category) == Some(label);
        }
        self.set(category).is_some_and(|s| s.contains(label))
    }

    /// 除HTTPS外没有任何检测结果
    pub fn is_empty(&self) -> bool {
        self.cms.is_none()
            && self.web_server.is_none()
            && self.cdn.is_none()
            && self.deployment_platform.is_none()
            && self.js_frameworks.is_empty()
            && self.css_frameworks.is_empty()
            && self.analytics_tools.is_empty()
            && self.tag_managers.is_empty()
            && self.rum_tools.is_empty()
            && self.programming_languages.is_empty()
            && self.fonts.is_empty()
            && self.other_technologies.is_empty()
    }

    /// 全部检测到的标签数（单值字段计1）
    pub fn total_labels(&self) -> usize {
        let singles = [&self.cms, &self.web_server, &self.cdn, &self.deployment_platform]
            .iter()
            .filter(|v| v.is_some())
            .count();
        let sets = [
            &self.js_frameworks,
            &self.css_frameworks,
            &self.analytics_tools,
            &self.tag_managers,
            &self.rum_tools,
            &self.programming_languages,
            &self.fonts,
            &self.other_technologies,
        ]
        .iter()
        .map(|s| s.len())
        .sum::<usize>();
        singles + sets
    }

    fn single_slot_mut(&mut self, category: Category) -> Option<&mut Option<String>> {
        match category {
            Category::Cms => Some(&mut self.cms),
            Category::WebServer => Some(&mut self.web_server),
            Category::Cdn => Some(&mut self.cdn),
            Category::DeploymentPlatform => Some(&mut self.deployment_platform),
            _ => None,
        }
    }

    fn set_slot_mut(&mut self, category: Category) -> Option<&mut BTreeSet<String>> {
        match category {
            Category::JsFramework => Some(&mut self.js_frameworks),
            Category::CssFramework => Some(&mut self.css_frameworks),
            Category::Analytics => Some(&mut self.analytics_tools),
            Category::TagManager => Some(&mut self.tag_managers),
            Category::Rum => Some(&mut self.rum_tools),
            Category::ProgrammingLanguage => Some(&mut self.programming_languages),
            Category::Font => Some(&mut self.fonts),
            Category::Other => Some(&mut self.other_technologies),
            _ => None,
        }
    }
}
