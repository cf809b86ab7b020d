//! HTML元素提取器
//! 基于 html5ever tokenizer 构建扁平文档，`<script>`/`<style>` 内容按原始文本收集

use std::cell::{Cell, RefCell};

use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use markup5ever::interface::Attribute;
use tendril::StrTendril;
use tracing::debug;

use super::document::{Element, HtmlDocument};
use crate::error::{RswResult, RswebstackError};

/// 元素收集器（tokenizer 回调只拿到 &self，使用内部可变性）
#[derive(Debug, Default)]
struct ElementSink {
    elements: RefCell<Vec<Element>>,
    // 正在收集原始文本的元素下标
    raw_target: Cell<Option<usize>>,
}

impl TokenSink for ElementSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(Tag {
                kind: TagKind::StartTag,
                name,
                attrs,
                ..
            }) => {
                let tag = name.to_ascii_lowercase().to_string();
                // HTML 忽略 script/style 上的自闭合标记，之后的内容仍是原始文本
                let raw_kind = match tag.as_str() {
                    "script" => Some(RawKind::ScriptData),
                    "style" => Some(RawKind::Rawtext),
                    _ => None,
                };

                let idx = self.push_element(&tag, &attrs);
                if let Some(kind) = raw_kind {
                    self.raw_target.set(Some(idx));
                    return TokenSinkResult::RawData(kind);
                }
            }
            Token::TagToken(Tag {
                kind: TagKind::EndTag,
                name,
                ..
            }) => {
                if matches!(&*name, "script" | "style") {
                    self.raw_target.set(None);
                }
            }
            Token::CharacterTokens(text) => {
                if let Some(idx) = self.raw_target.get() {
                    if let Some(el) = self.elements.borrow_mut().get_mut(idx) {
                        el.text.get_or_insert_with(String::new).push_str(&text);
                    }
                }
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl ElementSink {
    fn push_element(&self, tag: &str, attrs: &[Attribute]) -> usize {
        let mut element = Element::new(tag);
        for attr in attrs {
            element
                .attrs
                .push((attr.name.local.to_ascii_lowercase().to_string(), attr.value.to_string()));
        }
        let mut elements = self.elements.borrow_mut();
        elements.push(element);
        elements.len() - 1
    }
}

/// HTML解析器
pub struct HtmlParser;

impl HtmlParser {
    /// 最大 HTML 长度（2MB），超出部分截断
    pub const MAX_HTML_LEN: usize = 2 * 1024 * 1024;

    /// 解析HTML为扁平文档
    /// 空输入、二进制内容或不含任何元素的输入视为解析失败
    pub fn parse(html: &str) -> RswResult<HtmlDocument> {
        if html.trim().is_empty() {
            return Err(RswebstackError::ParseFailed("输入为空".to_string()));
        }
        if html.contains('\0') {
            return Err(RswebstackError::ParseFailed("输入包含NUL字节，疑似二进制内容".to_string()));
        }

        let html = truncate_on_char_boundary(html, Self::MAX_HTML_LEN);

        let tokenizer = Tokenizer::new(ElementSink::default(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));
        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        let elements = tokenizer.sink.elements.take();
        if elements.is_empty() {
            return Err(RswebstackError::ParseFailed("未发现任何HTML元素".to_string()));
        }

        debug!("HTML解析完成，元素{}个", elements.len());
        Ok(HtmlDocument::from_elements(elements))
    }
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    &s[..cut]
}
