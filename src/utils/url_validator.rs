//! URL校验
//! 在任何网络请求之前完成：协议仅限 http/https，主机必须是带已知公共后缀的可注册域名

use psl::Type;
use tracing::warn;
use url::{Host, Url};

use crate::error::{RswResult, RswebstackError};

/// 通过校验的URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    pub url: Url,
    /// 可注册域名（如 `www.example.co.uk` -> `example.co.uk`）
    pub registrable_domain: String,
}

impl ValidatedUrl {
    /// 协议是否为 https（在抓取之前确定）
    pub fn is_https(&self) -> bool {
        self.url.scheme() == "https"
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// URL校验工具
pub struct UrlValidator;

impl UrlValidator {
    pub fn validate(raw: &str) -> RswResult<ValidatedUrl> {
        let raw = raw.trim();
        let url = Url::parse(raw)
            .map_err(|e| RswebstackError::InvalidUrl(format!("{}（{}）", raw, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RswebstackError::InvalidUrl(format!(
                "{}：仅支持 http:// 或 https://",
                raw
            )));
        }

        let host = match url.host() {
            Some(Host::Domain(host)) => host.trim_end_matches('.').to_ascii_lowercase(),
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {
                return Err(RswebstackError::InvalidUrl(format!("{}：不支持IP地址", raw)));
            }
            None => {
                return Err(RswebstackError::InvalidUrl(format!("{}：缺少主机名", raw)));
            }
        };

        if host.split('.').any(str::is_empty) {
            return Err(RswebstackError::InvalidUrl(format!("{}：主机名包含空标签", raw)));
        }

        let Some(registrable_domain) = icann_registrable_domain(&host) else {
            warn!("URL域名结构无效: {}", raw);
            return Err(RswebstackError::InvalidUrl(format!(
                "{}：域名缺少可注册部分或公共后缀",
                raw
            )));
        };
        let registrable_domain = registrable_domain.to_string();

        Ok(ValidatedUrl {
            url,
            registrable_domain,
        })
    }
}

/// 是否恰好为ICANN段的公共后缀（私有段后缀如 `github.io` 不计入）
fn is_icann_suffix(tail: &str) -> bool {
    psl::suffix(tail.as_bytes()).is_some_and(|s| {
        s.is_known() && s.typ() == Some(Type::Icann) && s.as_bytes().len() == tail.len()
    })
}

/// 按ICANN后缀计算可注册域名：最长的ICANN后缀加上其左侧一个标签
fn icann_registrable_domain(host: &str) -> Option<&str> {
    let starts = std::iter::once(0).chain(host.match_indices('.').map(|(i, _)| i + 1));
    let mut prev = None;
    for start in starts {
        if is_icann_suffix(&host[start..]) {
            return prev.map(|p| &host[p..]);
        }
        prev = Some(start);
    }
    None
}
