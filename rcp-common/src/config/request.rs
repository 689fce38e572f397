use crate::config::store::Fragment;
use crate::types::header::{Cookies, HeaderValue, Headers, merge_headers};
use crate::types::http::HttpMethod;
use crate::types::options::TransportOptions;
use crate::types::param::ParamBinding;
use crate::types::response::{ResponseMap, ResponseSet};
use crate::types::retry::RetryPolicy;

/// 成员级别的请求配置
///
/// `params` 只追加不去重；请求头去重拼接；Cookie 新值覆盖旧值；
/// 其余字段后写入者生效，未设置的字段不会覆盖已有值。
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub path: Option<String>,
    pub method: Option<HttpMethod>,
    pub headers: Headers,
    pub cookies: Cookies,
    pub configuration: Option<TransportOptions>,
    pub params: Vec<ParamBinding>,
    pub retry: Option<u32>,
    pub backoff: Option<RetryPolicy>,
    pub auto_close: Option<bool>,
    pub map: Option<ResponseMap>,
    pub destination: Option<ResponseSet>,
}

impl RequestConfig {
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or_default()
    }

    pub fn method(&self) -> HttpMethod {
        self.method.unwrap_or_default()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry.unwrap_or(0)
    }

    pub fn is_auto_close(&self) -> bool {
        self.auto_close.unwrap_or(false)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        let mut delta = Headers::new();
        delta.insert(name.into(), value.into());
        merge_headers(&mut self.headers, &delta);
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_configuration(mut self, configuration: TransportOptions) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn with_param(mut self, binding: ParamBinding) -> Self {
        self.params.push(binding);
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    /// 同时设置重试次数与退避策略
    pub fn with_backoff(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy.max_retries);
        self.backoff = Some(policy);
        self
    }

    pub fn with_auto_close(mut self, auto_close: bool) -> Self {
        self.auto_close = Some(auto_close);
        self
    }

    pub fn with_map(mut self, map: ResponseMap) -> Self {
        self.map = Some(map);
        self
    }

    pub fn with_destination(mut self, destination: ResponseSet) -> Self {
        self.destination = Some(destination);
        self
    }
}

impl Fragment for RequestConfig {
    fn merge(&mut self, delta: Self) {
        merge_headers(&mut self.headers, &delta.headers);
        self.cookies.extend(delta.cookies);
        self.params.extend(delta.params);

        macro_rules! last_write_wins {
            ($($field:ident),*) => {
                $(
                    if delta.$field.is_some() {
                        self.$field = delta.$field;
                    }
                )*
            };
        }
        last_write_wins!(path, method, configuration, retry, backoff, auto_close, map, destination);
    }
}
