use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::store::Fragment;
use crate::interceptor::Interceptor;
use crate::types::header::{Cookies, HeaderValue, Headers, merge_headers};
use crate::types::options::ConnectionOptions;

/// 类级别的会话配置
///
/// 合并规则：拦截器按实例去重追加，请求头去重拼接，Cookie 新值覆盖旧值，
/// 其余字段后写入者生效。
#[derive(Clone, Default, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub base_address: Option<String>,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub cookies: Cookies,
    #[serde(skip)]
    pub interceptors: Vec<Arc<dyn Interceptor>>,
    #[serde(default)]
    pub connection: Option<ConnectionOptions>,
}

/// 只比较数据指针，忽略 vtable
pub(crate) fn same_interceptor(a: &Arc<dyn Interceptor>, b: &Arc<dyn Interceptor>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl SessionConfig {
    pub fn with_base_address(mut self, base_address: impl Into<String>) -> Self {
        self.base_address = Some(base_address.into());
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

    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        if !self.interceptors.iter().any(|existing| same_interceptor(existing, &interceptor)) {
            self.interceptors.push(interceptor);
        }
        self
    }

    pub fn with_connection(mut self, connection: ConnectionOptions) -> Self {
        self.connection = Some(connection);
        self
    }
}

impl Fragment for SessionConfig {
    fn merge(&mut self, delta: Self) {
        for interceptor in delta.interceptors {
            if !self.interceptors.iter().any(|existing| same_interceptor(existing, &interceptor)) {
                self.interceptors.push(interceptor);
            }
        }
        merge_headers(&mut self.headers, &delta.headers);
        self.cookies.extend(delta.cookies);
        if delta.base_address.is_some() {
            self.base_address = delta.base_address;
        }
        if delta.connection.is_some() {
            self.connection = delta.connection;
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("base_address", &self.base_address)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("interceptors", &self.interceptors.len())
            .field("connection", &self.connection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::NoOpInterceptor;

    #[test]
    fn test_interceptors_union_by_identity_keeps_order() {
        let first: Arc<dyn Interceptor> = Arc::new(NoOpInterceptor);
        let second: Arc<dyn Interceptor> = Arc::new(NoOpInterceptor);

        let mut config = SessionConfig::default().with_interceptor(first.clone());
        config.merge(
            SessionConfig::default()
                .with_interceptor(second.clone())
                .with_interceptor(first.clone()),
        );

        assert_eq!(config.interceptors.len(), 2);
        assert!(same_interceptor(&config.interceptors[0], &first));
        assert!(same_interceptor(&config.interceptors[1], &second));
    }

    #[test]
    fn test_headers_concat_and_cookies_assign() {
        let mut config = SessionConfig::default()
            .with_header("accept", "text/plain")
            .with_cookie("lang", "en")
            .with_cookie("theme", "dark");
        config.merge(
            SessionConfig::default()
                .with_header("accept", "application/json")
                .with_cookie("lang", "fr"),
        );

        assert_eq!(
            config.headers["accept"],
            HeaderValue::Multi(vec!["text/plain".into(), "application/json".into()])
        );
        assert_eq!(config.cookies["lang"], "fr");
        assert_eq!(config.cookies["theme"], "dark");
    }

    #[test]
    fn test_scalars_last_write_wins() {
        let mut config = SessionConfig::default().with_base_address("https://a.example");
        config.merge(SessionConfig::default());
        assert_eq!(config.base_address.as_deref(), Some("https://a.example"));

        config.merge(SessionConfig::default().with_base_address("https://b.example").with_connection(
            ConnectionOptions {
                timeout_ms: Some(10),
                ..Default::default()
            },
        ));
        assert_eq!(config.base_address.as_deref(), Some("https://b.example"));
        assert_eq!(config.connection.unwrap().timeout_ms, Some(10));
    }

    #[test]
    fn test_deserialize_from_json() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"base_address": "https://api.example.com", "headers": {"accept": ["a", "b"]}, "cookies": {"sid": "1"}}"#,
        )
        .unwrap();
        assert_eq!(config.base_address.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.headers["accept"].values().len(), 2);
        assert!(config.interceptors.is_empty());
    }
}
