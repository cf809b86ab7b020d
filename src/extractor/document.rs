//! 文档树查询接口
//! 只暴露检测引擎需要的能力：按标签查元素、读属性、判断属性前缀

use crate::error::RswResult;

/// 已解析的单个元素（标签名与属性名均为小写）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    /// 仅 `<script>` / `<style>` 记录原始文本
    pub text: Option<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// 读取属性值，重复属性以第一个为准
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// 属性存在且以指定前缀开头（忽略ASCII大小写）
    pub fn attr_starts_with(&self, name: &str, prefix: &str) -> bool {
        self.attr(name).is_some_and(|v| {
            v.len() >= prefix.len()
                && v.is_char_boundary(prefix.len())
                && v[..prefix.len()].eq_ignore_ascii_case(prefix)
        })
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// 检测引擎使用的文档树能力
/// 查询可能失败（如元素属性格式错误），失败由检测引擎按阶段记录
pub trait DocumentTree {
    /// 按文档顺序返回指定标签的全部元素
    fn find_all(&self, tag: &str) -> RswResult<Vec<&Element>>;

    /// 指定标签中带有某属性的元素
    fn find_all_with_attr(&self, tag: &str, attr: &str) -> RswResult<Vec<&Element>> {
        Ok(self
            .find_all(tag)?
            .into_iter()
            .filter(|el| el.has_attr(attr))
            .collect())
    }

    /// 指定标签中属性值以某前缀开头的元素（忽略ASCII大小写）
    fn find_all_with_attr_prefix(&self, tag: &str, attr: &str, prefix: &str) -> RswResult<Vec<&Element>> {
        Ok(self
            .find_all(tag)?
            .into_iter()
            .filter(|el| el.attr_starts_with(attr, prefix))
            .collect())
    }
}

/// 扁平化的HTML文档（按出现顺序保存元素）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDocument {
    elements: Vec<Element>,
}

impl HtmlDocument {
    pub fn from_elements(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }
}

impl DocumentTree for HtmlDocument {
    fn find_all(&self, tag: &str) -> RswResult<Vec<&Element>> {
        Ok(self
            .elements
            .iter()
            .filter(|el| el.tag.eq_ignore_ascii_case(tag))
            .collect())
    }
}
