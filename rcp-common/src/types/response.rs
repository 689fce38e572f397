use std::any::{Any, type_name};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use crate::error::{RcpError, Result};
use crate::transport::Response;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 响应数据的去向类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationKind {
    IncomingDataCallback,
    DownloadToFile,
    DownloadToStream,
    NetworkOutputQueue,
}

impl DestinationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationKind::IncomingDataCallback => "incomingdatacallback",
            DestinationKind::DownloadToFile => "downloadtofile",
            DestinationKind::DownloadToStream => "downloadtostream",
            DestinationKind::NetworkOutputQueue => "networkoutputqueue",
        }
    }
}

impl std::str::FromStr for DestinationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        [
            DestinationKind::IncomingDataCallback,
            DestinationKind::DownloadToFile,
            DestinationKind::DownloadToStream,
            DestinationKind::NetworkOutputQueue,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == normalized)
        .ok_or_else(|| format!("unknown response destination kind: {}", s))
    }
}

/// 响应数据的去向
#[derive(Clone, Default)]
pub enum Destination {
    /// 保留在 `Response::body` 中
    #[default]
    Buffer,
    /// 每收到一段数据回调一次
    Callback(Arc<dyn Fn(&[u8]) + Send + Sync>),
    /// 写入文件
    File(PathBuf),
    /// 推送到无界通道
    Stream(mpsc::UnboundedSender<Vec<u8>>),
    /// 推送到有界队列，队列满时等待
    Queue(mpsc::Sender<Vec<u8>>),
}

impl Destination {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        Destination::Callback(Arc::new(f))
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self, Destination::Buffer)
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Buffer => f.write_str("Buffer"),
            Destination::Callback(_) => f.write_str("Callback(..)"),
            Destination::File(path) => f.debug_tuple("File").field(path).finish(),
            Destination::Stream(_) => f.write_str("Stream(..)"),
            Destination::Queue(_) => f.write_str("Queue(..)"),
        }
    }
}

/// 直接给出的去向，或在调用时由接收者按名称解析的去向
#[derive(Debug, Clone)]
pub enum DestinationTarget {
    Value(Destination),
    Accessor(String),
}

#[derive(Debug, Clone)]
pub struct ResponseSet {
    pub kind: DestinationKind,
    pub target: DestinationTarget,
}

impl ResponseSet {
    pub fn value(kind: DestinationKind, destination: Destination) -> Self {
        Self {
            kind,
            target: DestinationTarget::Value(destination),
        }
    }

    pub fn accessor(kind: DestinationKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            target: DestinationTarget::Accessor(name.into()),
        }
    }
}

type MapFn = dyn Fn(Response) -> BoxFuture<'static, anyhow::Result<Box<dyn Any + Send>>> + Send + Sync;

/// 响应映射函数，结果作为调用的返回值
#[derive(Clone)]
pub struct ResponseMap(Arc<MapFn>);

impl ResponseMap {
    pub fn new<F, Fut, T>(f: F) -> Self
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Any + Send,
    {
        ResponseMap(Arc::new(move |response| {
            let fut = f(response);
            Box::pin(async move { fut.await.map(|value| Box::new(value) as Box<dyn Any + Send>) })
        }))
    }

    pub async fn apply(&self, response: Response) -> anyhow::Result<Box<dyn Any + Send>> {
        (self.0)(response).await
    }

    pub fn ptr_eq(&self, other: &ResponseMap) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ResponseMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseMap(..)")
    }
}

/// 响应体解析为 JSON，空响应体得到 `Null`
pub async fn to_json(response: Response) -> anyhow::Result<serde_json::Value> {
    if response.body.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_slice(&response.body)?)
}

pub async fn to_text(response: Response) -> anyhow::Result<String> {
    Ok(response.text())
}

/// 响应体反序列化为 `T`
pub async fn to_map<T: DeserializeOwned>(response: Response) -> anyhow::Result<T> {
    Ok(serde_json::from_slice(&response.body)?)
}

/// 调用的结果：原始响应或映射函数的返回值
pub enum CallOutput {
    Response(Response),
    Mapped(Box<dyn Any + Send>),
}

impl CallOutput {
    /// 取出指定类型的结果，类型不符时返回配置错误
    pub fn downcast<T: Any>(self) -> Result<T> {
        let boxed: Box<dyn Any> = match self {
            CallOutput::Mapped(value) => value,
            CallOutput::Response(response) => Box::new(response),
        };
        boxed.downcast::<T>().map(|value| *value).map_err(|_| {
            RcpError::Configuration(format!(
                "call result cannot be converted to {}",
                type_name::<T>()
            ))
        })
    }

    pub fn into_response(self) -> Result<Response> {
        self.downcast()
    }

    pub fn into_text(self) -> Result<String> {
        match self {
            CallOutput::Response(response) => Ok(response.text()),
            mapped => mapped.downcast(),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            CallOutput::Response(response) => Ok(response.body),
            mapped => mapped.downcast(),
        }
    }

    /// 未配置映射函数时按 JSON 解析响应体
    pub fn into_json<T: DeserializeOwned + Any>(self) -> Result<T> {
        match self {
            CallOutput::Response(response) => response
                .json()
                .map_err(|e| RcpError::Other(anyhow::Error::new(e).context("failed to decode response body"))),
            mapped => mapped.downcast(),
        }
    }
}

impl fmt::Debug for CallOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallOutput::Response(response) => f.debug_tuple("Response").field(response).finish(),
            CallOutput::Mapped(_) => f.write_str("Mapped(..)"),
        }
    }
}
