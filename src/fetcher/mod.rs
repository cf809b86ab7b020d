//! 抓取模块：HTTP页面获取与重试
pub mod page_fetcher;

pub use self::page_fetcher::{FetchedPage, PageFetcher};
