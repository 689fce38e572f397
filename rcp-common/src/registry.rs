//! 声明与调用的入口
//!
//! `Registry` 保存所有声明类型的会话配置、请求配置与共享会话，
//! 由应用创建后显式传递，克隆开销很小。

use std::any::Any;
use std::sync::{Arc, OnceLock};

use dashmap::{DashMap, DashSet};
use log::{debug, warn};

use crate::config::{ConfigStore, RequestConfig, SessionConfig, Site, TypeKey};
use crate::config::session::same_interceptor;
use crate::error::{RcpError, Result};
use crate::executor::{CallPlan, RequestExecutor};
use crate::interceptor::{Interceptor, InterceptorCache};
use crate::lifecycle::SessionLifecycle;
use crate::transport::{ReqwestTransport, Session, SessionId, Transport};
use crate::types::http::{HttpMethod, infer_route};
use crate::types::options::TransportOptions;
use crate::types::param::Arg;
use crate::types::response::{
    CallOutput, Destination, DestinationKind, DestinationTarget, ResponseSet,
};

/// 由声明宏生成实现的客户端
pub trait Client: Any + Send + Sync {
    fn registry(&self) -> &Registry;

    /// 按名称解析响应去向，`#[destination(kind, "name")]` 使用
    fn destination(&self, _kind: DestinationKind, _name: &str) -> Option<Destination> {
        None
    }

    /// 关闭该客户端类型的共享会话
    fn close(&self) -> bool
    where
        Self: Sized,
    {
        self.registry().close::<Self>()
    }
}

struct RegistryInner {
    sessions: ConfigStore<SessionConfig>,
    requests: ConfigStore<RequestConfig>,
    bound: DashSet<Site>,
    not_requests: DashSet<Site>,
    declared: DashMap<TypeKey, Arc<OnceLock<()>>>,
    interceptors: InterceptorCache,
    lifecycle: SessionLifecycle,
}

#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: ConfigStore::new(),
                requests: ConfigStore::new(),
                bound: DashSet::new(),
                not_requests: DashSet::new(),
                declared: DashMap::new(),
                interceptors: InterceptorCache::new(),
                lifecycle: SessionLifecycle::new(transport),
            }),
        }
    }

    /// 对类型 `T` 只执行一次声明，并发调用会等待首次声明完成
    pub fn declare<T: 'static>(&self, declare: impl FnOnce(&Registry)) {
        let once = self
            .inner
            .declared
            .entry(TypeKey::of::<T>())
            .or_default()
            .clone();
        once.get_or_init(|| {
            debug!("declaring {}", std::any::type_name::<T>());
            declare(self)
        });
    }

    pub fn merge_session<T: 'static>(&self, fragment: SessionConfig) {
        self.inner
            .sessions
            .merge(Site::class(TypeKey::of::<T>()), fragment);
    }

    pub fn session_config<T: 'static>(&self) -> SessionConfig {
        self.inner.sessions.get(&Site::class(TypeKey::of::<T>()))
    }

    /// 在指定位置插入拦截器，位置被限制在 `[0, len]`，省略时追加到末尾
    pub fn insert_interceptor<T: 'static>(&self, index: Option<usize>, interceptor: Arc<dyn Interceptor>) {
        self.inner
            .sessions
            .update(Site::class(TypeKey::of::<T>()), |config| {
                if config
                    .interceptors
                    .iter()
                    .any(|existing| same_interceptor(existing, &interceptor))
                {
                    return;
                }
                let len = config.interceptors.len();
                config
                    .interceptors
                    .insert(index.map_or(len, |index| index.min(len)), interceptor);
            });
    }

    /// 注册表内按类型共享的拦截器实例
    pub fn shared_interceptor<I>(&self) -> Arc<dyn Interceptor>
    where
        I: Interceptor + Default + 'static,
    {
        self.inner.interceptors.get_or_create::<I>()
    }

    pub fn merge_request<T: 'static>(&self, member: &str, fragment: RequestConfig) {
        self.inner
            .requests
            .merge(Site::member(TypeKey::of::<T>(), member), fragment);
    }

    pub fn request_config<T: 'static>(&self, member: &str) -> RequestConfig {
        self.inner
            .requests
            .get(&Site::member(TypeKey::of::<T>(), member))
    }

    /// 显式绑定路由，之后不再对该成员做默认推断
    pub fn bind<T: 'static>(
        &self,
        member: &str,
        method: HttpMethod,
        path: impl Into<String>,
        configuration: Option<TransportOptions>,
    ) {
        let site = Site::member(TypeKey::of::<T>(), member);
        self.inner.requests.merge(
            site.clone(),
            RequestConfig {
                method: Some(method),
                path: Some(path.into()),
                configuration,
                ..Default::default()
            },
        );
        self.inner.bound.insert(site);
    }

    pub fn mark_not_request<T: 'static>(&self, member: &str) {
        self.inner
            .not_requests
            .insert(Site::member(TypeKey::of::<T>(), member));
    }

    /// 为未显式绑定、未标记为非请求的成员按名称推断方法与路径
    pub fn infer_routes<T: 'static>(&self, members: &[&str]) {
        for member in members {
            let site = Site::member(TypeKey::of::<T>(), *member);
            if self.inner.bound.contains(&site) || self.inner.not_requests.contains(&site) {
                continue;
            }
            let (method, path) = infer_route(member);
            debug!("inferred route {} {} for {}", method, path, member);
            self.inner.requests.merge(
                site,
                RequestConfig {
                    method: Some(method),
                    path: Some(path),
                    ..Default::default()
                },
            );
        }
    }

    /// 调用入口：合并配置、解析参数并执行请求
    pub async fn invoke<T: Client>(&self, client: &T, member: &str, args: Vec<Arg>) -> Result<CallOutput> {
        let ty = TypeKey::of::<T>();
        let site = Site::member(ty, member);
        if self.inner.not_requests.contains(&site) {
            return Err(RcpError::Configuration(format!(
                "{}::{} is not a request",
                ty.name(),
                member
            )));
        }
        if !self.inner.requests.contains(&site) {
            return Err(RcpError::Configuration(format!(
                "no route declared for {}::{}",
                ty.name(),
                member
            )));
        }

        let request = self.inner.requests.get(&site);
        let destination = resolve_destination(client, request.destination.as_ref());
        let plan = CallPlan {
            session: self.session_config::<T>(),
            request,
            destination,
            args,
        };
        let receiver: &(dyn Any + Send + Sync) = client;
        RequestExecutor::new(&self.inner.lifecycle, ty, member, receiver)
            .execute(plan)
            .await
    }

    pub fn close<T: 'static>(&self) -> bool {
        self.inner.lifecycle.close(TypeKey::of::<T>())
    }

    pub fn close_all(&self) {
        self.inner.lifecycle.close_all();
    }

    pub fn shared_session<T: 'static>(&self) -> Option<Arc<dyn Session>> {
        self.inner.lifecycle.shared(TypeKey::of::<T>())
    }

    pub fn in_flight(&self, session: SessionId) -> usize {
        self.inner.lifecycle.requests().in_flight(session)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("declared", &self.inner.declared.len())
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestTransport::default()))
    }
}

fn resolve_destination<T: Client>(client: &T, set: Option<&ResponseSet>) -> Destination {
    let Some(set) = set else {
        return Destination::Buffer;
    };
    match &set.target {
        DestinationTarget::Value(destination) => destination.clone(),
        DestinationTarget::Accessor(name) => client.destination(set.kind, name).unwrap_or_else(|| {
            warn!(
                "{} has no {} destination named '{}', buffering response",
                std::any::type_name::<T>(),
                set.kind.as_str(),
                name
            );
            Destination::Buffer
        }),
    }
}
