use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 代理类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    /// HTTP/HTTPS 代理
    Http,
    /// SOCKS5 代理
    Socks5,
}

impl ProxyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Http => "http",
            ProxyType::Socks5 => "socks5",
        }
    }

    /// 从 URL 前缀推断代理类型，无法识别时按 HTTP 处理
    pub fn infer(url: &str) -> Self {
        if url.starts_with("socks5://") || url.starts_with("socks5h://") {
            ProxyType::Socks5
        } else {
            ProxyType::Http
        }
    }
}

impl FromStr for ProxyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(ProxyType::Http),
            "socks5" => Ok(ProxyType::Socks5),
            _ => Err(format!("proxy type must be 'http' or 'socks5', got '{}'", s)),
        }
    }
}

/// 代理配置
///
/// - `proxy = "http://proxy.example.com:8080"` 对应 `Url`
/// - `proxy(type = socks5, url = "...", username = "...", password = "...")` 对应 `Full`
/// - `proxy = false` 对应 `Disabled`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProxyConfig {
    Url(String),
    Full {
        #[serde(default, rename = "type")]
        proxy_type: Option<ProxyType>,
        url: String,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        no_proxy: Option<String>,
    },
    Disabled(bool),
}

impl ProxyConfig {
    pub fn url(&self) -> Option<&str> {
        match self {
            ProxyConfig::Url(url) | ProxyConfig::Full { url, .. } => Some(url),
            ProxyConfig::Disabled(_) => None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, ProxyConfig::Disabled(_))
    }

    /// 显式类型优先，否则从 URL 推断
    pub fn proxy_type(&self) -> Option<ProxyType> {
        match self {
            ProxyConfig::Url(url) => Some(ProxyType::infer(url)),
            ProxyConfig::Full {
                proxy_type, url, ..
            } => Some(proxy_type.unwrap_or_else(|| ProxyType::infer(url))),
            ProxyConfig::Disabled(_) => None,
        }
    }

    /// 代理地址，缺少协议前缀时按代理类型补全
    pub fn full_url(&self) -> Option<String> {
        let url = self.url()?;
        if url.contains("://") {
            return Some(url.to_string());
        }
        let scheme = self.proxy_type().unwrap_or(ProxyType::Http).as_str();
        Some(format!("{}://{}", scheme, url))
    }
}

/// 会话级连接选项
///
/// 核心逻辑不解读其内容，只在创建会话时原样交给传输层。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    /// 传输层自定义的额外配置
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// 单次请求的传输配置，绑定路由时可覆盖
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportOptions {
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
