//! 声明式 HTTP 客户端的运行时核心
//!
//! 负责会话与请求配置的合并、参数绑定、拦截器链、重试与取消，
//! 以及会话生命周期管理。`rcp-macro` 生成的代码只调用这里的入口。

pub mod binder;
pub mod cancel;
pub mod config;
pub mod error;
pub mod executor;
pub mod interceptor;
pub mod lifecycle;
pub mod parsing;
pub mod registry;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use async_trait::async_trait;

pub use cancel::{CancelToken, cancel};
pub use config::{ConfigStore, Fragment, RequestConfig, SessionConfig, Site, TypeKey};
pub use error::{RcpError, Result, TransportError};
pub use executor::{CallState, RequestExecutor};
pub use interceptor::{
    CapturedMethod, Interceptor, InterceptorCache, MethodInterceptor, Next, NoOpInterceptor,
    RequestContext,
};
pub use lifecycle::{RequestRegistry, SessionLifecycle};
pub use parsing::parse_client_args;
pub use registry::{Client, Registry};
pub use transport::{
    ReqwestSession, ReqwestTransport, Request, RequestId, Response, Session, SessionId, Transport,
};
pub use types::{
    Arg, CallOutput, ClientArgs, ConnectionOptions, Cookies, Destination, DestinationKind,
    DestinationTarget, HeaderValue, Headers, HttpMethod, ParamAttr, ParamBinding, ParamRole,
    ProxyConfig, ProxyType, RangeSpec, RequestContent, ResponseMap, ResponseSet, RetryArg,
    RetryConfig, RetryPolicy, RouteAttr, TransferRange, TransportOptions, to_json, to_map, to_text,
};
