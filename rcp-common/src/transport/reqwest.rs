//! 基于 reqwest 的传输层实现

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ::reqwest::header::{COOKIE, RANGE};
use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, warn};
use tokio::io::AsyncWriteExt;
use tokio::sync::Notify;
use url::Url;

use super::{Request, RequestId, Response, Session, SessionId, Transport};
use crate::config::SessionConfig;
use crate::error::TransportError;
use crate::types::header::{Cookies, HeaderValue, Headers, cookie_header, merge_headers};
use crate::types::options::{ConnectionOptions, ProxyConfig};
use crate::types::param::RequestContent;
use crate::types::response::Destination;

/// 请求被取消时的错误码
pub const ABORTED: i32 = -1;

/// 每个会话一个 `reqwest::Client`
#[derive(Debug, Default, Clone)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for ReqwestTransport {
    fn create_session(&self, config: &SessionConfig) -> Result<Arc<dyn Session>, TransportError> {
        let client = build_client(config.connection.as_ref())?;
        let base = config
            .base_address
            .as_deref()
            .map(|address| {
                Url::parse(address).map_err(|e| {
                    TransportError::new(0, format!("invalid base address '{}': {}", address, e))
                })
            })
            .transpose()?;

        let session = ReqwestSession {
            id: SessionId::next(),
            client,
            base,
            headers: config.headers.clone(),
            cookies: config.cookies.clone(),
            pending: DashMap::new(),
            closed: AtomicBool::new(false),
        };
        debug!("{} created for {:?}", session.id, config.base_address);
        Ok(Arc::new(session))
    }
}

fn build_client(options: Option<&ConnectionOptions>) -> Result<::reqwest::Client, TransportError> {
    let mut builder = ::reqwest::Client::builder();
    if let Some(options) = options {
        if let Some(ms) = options.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = options.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        match &options.proxy {
            Some(ProxyConfig::Disabled(_)) => builder = builder.no_proxy(),
            Some(proxy) => builder = builder.proxy(build_proxy(proxy)?),
            None => {}
        }
    }
    builder
        .build()
        .map_err(|e| TransportError::new(0, format!("failed to create HTTP client: {}", e)))
}

fn build_proxy(config: &ProxyConfig) -> Result<::reqwest::Proxy, TransportError> {
    let url = config
        .full_url()
        .ok_or_else(|| TransportError::new(0, "proxy has no url"))?;
    let mut proxy = ::reqwest::Proxy::all(&url)
        .map_err(|e| TransportError::new(0, format!("invalid proxy url '{}': {}", url, e)))?;

    if let ProxyConfig::Full {
        username,
        password,
        no_proxy,
        ..
    } = config
    {
        if let (Some(username), Some(password)) = (username, password) {
            proxy = proxy.basic_auth(username, password);
        }
        if let Some(no_proxy) = no_proxy {
            proxy = proxy.no_proxy(::reqwest::NoProxy::from_string(no_proxy));
        }
    }
    Ok(proxy)
}

/// 合并会话与请求的头部，名称不区分大小写，同名的值按顺序拼接
fn outgoing_headers(session: &Headers, request: &Headers) -> Headers {
    let mut merged = Headers::new();
    for headers in [session, request] {
        for (name, value) in headers {
            let delta = Headers::from([(name.to_ascii_lowercase(), value.clone())]);
            merge_headers(&mut merged, &delta);
        }
    }
    merged
}

pub struct ReqwestSession {
    id: SessionId,
    client: ::reqwest::Client,
    base: Option<Url>,
    headers: Headers,
    cookies: Cookies,
    pending: DashMap<RequestId, Arc<Notify>>,
    closed: AtomicBool,
}

impl ReqwestSession {
    fn resolve(&self, target: &str) -> Result<Url, TransportError> {
        let resolved = match &self.base {
            _ if target.contains("://") => Url::parse(target),
            Some(base) => base.join(target),
            None => Url::parse(target),
        };
        resolved.map_err(|e| TransportError::new(0, format!("invalid request url '{}': {}", target, e)))
    }

    async fn perform(&self, request: &Request) -> Result<Response, TransportError> {
        let url = self.resolve(&request.url)?;
        let method = ::reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::new(0, e.to_string()))?;
        let mut builder = self.client.request(method, url);

        for (name, value) in &outgoing_headers(&self.headers, &request.headers) {
            for value in value.values() {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        let mut cookies = self.cookies.clone();
        cookies.extend(request.cookies.clone());
        if let Some(cookie) = cookie_header(&cookies) {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(range) = &request.transfer_range {
            builder = builder.header(RANGE, range.header_value());
        }
        if let Some(ms) = request.configuration.as_ref().and_then(|c| c.timeout_ms) {
            builder = builder.timeout(Duration::from_millis(ms));
        }

        builder = match &request.content {
            None => builder,
            Some(RequestContent::Text(text)) => builder.body(text.clone()),
            Some(RequestContent::Bytes(bytes)) => builder.body(bytes.clone()),
            Some(RequestContent::Json(value)) => builder.json(value),
            Some(RequestContent::Form(pairs)) => builder.form(pairs),
        };

        let mut response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let response_headers = collect_headers(response.headers());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::new(
                i32::from(status.as_u16()),
                format!("request failed with status {}: {}", status, body),
            ));
        }

        let body = deliver(&mut response, &request.destination).await?;
        Ok(Response {
            request: request.id(),
            status: status.as_u16(),
            headers: response_headers,
            body,
        })
    }
}

/// 按去向消费响应体，只有 Buffer 会保留在 `Response` 中
async fn deliver(response: &mut ::reqwest::Response, destination: &Destination) -> Result<Vec<u8>, TransportError> {
    let mut buffer = Vec::new();
    let mut file = match destination {
        Destination::File(path) => Some(
            tokio::fs::File::create(path)
                .await
                .map_err(|e| TransportError::new(0, format!("cannot create {}: {}", path.display(), e)))?,
        ),
        _ => None,
    };

    while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
        match destination {
            Destination::Buffer => buffer.extend_from_slice(&chunk),
            Destination::Callback(callback) => callback(&chunk[..]),
            Destination::File(path) => {
                if let Some(file) = file.as_mut() {
                    file.write_all(&chunk).await.map_err(|e| {
                        TransportError::new(0, format!("write to {} failed: {}", path.display(), e))
                    })?;
                }
            }
            Destination::Stream(sender) => {
                if sender.send(chunk.to_vec()).is_err() {
                    warn!("stream receiver dropped, discarding remaining body");
                    break;
                }
            }
            Destination::Queue(sender) => {
                if sender.send(chunk.to_vec()).await.is_err() {
                    warn!("queue receiver dropped, discarding remaining body");
                    break;
                }
            }
        }
    }

    if let Some(mut file) = file {
        file.flush()
            .await
            .map_err(|e| TransportError::new(0, format!("flush failed: {}", e)))?;
    }
    Ok(buffer)
}

fn collect_headers(map: &::reqwest::header::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for name in map.keys() {
        let values: Vec<String> = map
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok().map(str::to_string))
            .collect();
        let value = match values.len() {
            0 => continue,
            1 => HeaderValue::Single(values.into_iter().next().unwrap_or_default()),
            _ => HeaderValue::Multi(values),
        };
        headers.insert(name.as_str().to_string(), value);
    }
    headers
}

fn transport_error(error: ::reqwest::Error) -> TransportError {
    let code = error.status().map(|s| i32::from(s.as_u16())).unwrap_or(0);
    TransportError::new(code, error.to_string())
}

#[async_trait]
impl Session for ReqwestSession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn fetch(&self, request: &Request) -> Result<Response, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::new(ABORTED, format!("{} is closed", self.id)));
        }

        let abort = self.pending.entry(request.id()).or_default().clone();
        let outcome = tokio::select! {
            biased;
            _ = abort.notified() => Err(TransportError::new(ABORTED, "request aborted")),
            result = self.perform(request) => result,
        };
        self.pending.remove(&request.id());
        outcome
    }

    fn cancel(&self, request: RequestId) {
        // 只中止正在进行的请求，未知或已结束的请求忽略
        if let Some(abort) = self.pending.get(&request) {
            debug!("{} aborting {}", self.id, request);
            abort.notify_one();
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for entry in self.pending.iter() {
            entry.value().notify_one();
        }
        debug!("{} closed", self.id);
    }
}
