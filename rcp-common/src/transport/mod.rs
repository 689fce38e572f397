//! 传输层抽象
//!
//! 核心只构造 `Request` 并读取 `Response`，真正的网络 I/O 由注入的 `Transport` 完成。

pub mod reqwest;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::SessionConfig;
use crate::error::TransportError;
use crate::types::header::{Cookies, Headers};
use crate::types::http::HttpMethod;
use crate::types::options::TransportOptions;
use crate::types::param::RequestContent;
use crate::types::range::RangeSpec;
use crate::types::response::Destination;

pub use self::reqwest::{ReqwestSession, ReqwestTransport};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn next() -> Self {
        RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

/// 一次逻辑调用构造出的请求，重试时原样复用
#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    pub method: HttpMethod,
    /// 相对会话 base address 的路径，或完整 URL
    pub url: String,
    pub headers: Headers,
    pub cookies: Cookies,
    pub content: Option<RequestContent>,
    pub transfer_range: Option<RangeSpec>,
    pub configuration: Option<TransportOptions>,
    pub destination: Destination,
}

impl Request {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            id: RequestId::next(),
            method,
            url: url.into(),
            headers: Headers::new(),
            cookies: Cookies::new(),
            content: None,
            transfer_range: None,
            configuration: None,
            destination: Destination::Buffer,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub request: RequestId,
    pub status: u16,
    pub headers: Headers,
    /// 去向不是内存缓冲时为空
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// 会话：同一声明类型的请求共享
#[async_trait]
pub trait Session: Send + Sync {
    fn id(&self) -> SessionId;

    async fn fetch(&self, request: &Request) -> Result<Response, TransportError>;

    /// 中止指定请求，不等待其结束
    fn cancel(&self, request: RequestId);

    fn close(&self);
}

pub trait Transport: Send + Sync {
    fn create_session(&self, config: &SessionConfig) -> Result<Arc<dyn Session>, TransportError>;
}
