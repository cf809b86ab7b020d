//! 提取模块：HTML解析与文档树查询
pub mod document;
pub mod html_extractor;

pub use self::document::{DocumentTree, Element, HtmlDocument};
pub use self::html_extractor::HtmlParser;
