//! Header格式转换工具
//! 从响应头中解析Cookie，以及HashMap到HeaderMap的转换

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RswResult, RswebstackError};

/// 单个Cookie（名称保持服务端原样）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 单次响应允许处理的最大Header条数
    const MAX_HEADERS: usize = 1000;

    /// 从响应头的 Set-Cookie 中解析Cookie列表
    pub fn parse_cookies(headers: &HeaderMap) -> Vec<Cookie> {
        let mut cookies = Vec::new();
        for (i, value) in headers.get_all(SET_COOKIE).iter().enumerate() {
            if i >= Self::MAX_HEADERS {
                warn!("Set-Cookie 超过{}条，忽略剩余部分", Self::MAX_HEADERS);
                break;
            }
            // 非可见ASCII的Cookie按有损UTF-8处理
            let raw = String::from_utf8_lossy(value.as_bytes());
            if let Some(cookie) = Self::parse_set_cookie(&raw) {
                cookies.push(cookie);
            }
        }
        debug!("解析Cookie {}个", cookies.len());
        cookies
    }

    /// 解析单条 Set-Cookie：取第一个 `;` 之前的 name=value，过滤已删除的Cookie
    pub fn parse_set_cookie(raw_cookie: &str) -> Option<Cookie> {
        let cookie_str = raw_cookie.trim();
        let core_kv = cookie_str.split(';').next()?.trim();
        let (name, value) = core_kv.split_once('=')?;
        let (name, value) = (name.trim(), value.trim().trim_matches('"'));

        if name.is_empty() || value.eq_ignore_ascii_case("deleted") {
            return None;
        }
        Some(Cookie::new(name, value))
    }

    /// 将 HashMap<String, Vec<String>> 转换为 HeaderMap（名称大小写不敏感）
    pub fn from_hashmap(headers: &HashMap<String, Vec<String>>) -> RswResult<HeaderMap> {
        let mut header_map = HeaderMap::new();
        for (key, values) in headers {
            let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                RswebstackError::InvalidInput(format!("无效Header名称：{}，错误：{}", key, e))
            })?;
            for value in values {
                let header_value = HeaderValue::from_str(value).map_err(|e| {
                    RswebstackError::InvalidInput(format!("无效Header值：{}，错误：{}", value, e))
                })?;
                header_map.append(header_name.clone(), header_value);
            }
        }
        Ok(header_map)
    }

}
