use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{RcpError, Result};
use crate::transport::{Request, Response, Session};

/// 拦截器可见的请求上下文
///
/// 除请求本身外还携带发起调用的客户端实例，方法级拦截器据此取回 `self`。
pub struct RequestContext<'a> {
    pub request: &'a mut Request,
    receiver: &'a (dyn Any + Send + Sync),
}

impl<'a> RequestContext<'a> {
    pub fn new(request: &'a mut Request, receiver: &'a (dyn Any + Send + Sync)) -> Self {
        Self { request, receiver }
    }

    /// 发起调用的客户端实例，类型不符时返回 `None`
    pub fn receiver<T: Any>(&self) -> Option<&'a T> {
        let receiver: &'a (dyn Any + Send + Sync) = self.receiver;
        receiver.downcast_ref::<T>()
    }
}

/// 拦截器链的后续部分
#[derive(Clone, Copy)]
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    session: &'a dyn Session,
}

impl<'a> Next<'a> {
    pub fn new(interceptors: &'a [Arc<dyn Interceptor>], session: &'a dyn Session) -> Self {
        Self {
            interceptors,
            session,
        }
    }

    /// 调用下一个拦截器，链尾交给会话发出请求
    pub async fn run(self, context: &mut RequestContext<'_>) -> Result<Response> {
        match self.interceptors.split_first() {
            Some((current, rest)) => {
                current
                    .intercept(context, Next::new(rest, self.session))
                    .await
            }
            None => Ok(self.session.fetch(context.request).await?),
        }
    }

    /// 剩余的拦截器数量
    pub fn remaining(&self) -> usize {
        self.interceptors.len()
    }
}

/// 请求拦截器
///
/// 实现者可以修改 `context.request` 后调用 `next.run(context)`，
/// 也可以不调用 `next` 直接返回自己的响应。
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, context: &mut RequestContext<'_>, next: Next<'_>) -> Result<Response>;
}

/// 以客户端方法形式声明的拦截器，调用时拿到原始接收者
#[async_trait]
pub trait MethodInterceptor<T>: Send + Sync {
    async fn call(
        &self,
        receiver: &T,
        context: &mut RequestContext<'_>,
        next: Next<'_>,
    ) -> Result<Response>;
}

/// 把 `MethodInterceptor` 适配为普通拦截器
pub struct CapturedMethod<T, M> {
    method: M,
    _receiver: PhantomData<fn() -> T>,
}

impl<T, M> CapturedMethod<T, M> {
    pub fn new(method: M) -> Self {
        Self {
            method,
            _receiver: PhantomData,
        }
    }
}

#[async_trait]
impl<T, M> Interceptor for CapturedMethod<T, M>
where
    T: Any + Send + Sync,
    M: MethodInterceptor<T>,
{
    async fn intercept(&self, context: &mut RequestContext<'_>, next: Next<'_>) -> Result<Response> {
        let receiver = context.receiver::<T>().ok_or_else(|| {
            RcpError::Configuration(format!(
                "method interceptor of {} invoked by a different client type",
                type_name::<T>()
            ))
        })?;
        self.method.call(receiver, context, next).await
    }
}

/// 空拦截器实现，直接调用下一环
#[derive(Default)]
pub struct NoOpInterceptor;

#[async_trait]
impl Interceptor for NoOpInterceptor {
    async fn intercept(&self, context: &mut RequestContext<'_>, next: Next<'_>) -> Result<Response> {
        next.run(context).await
    }
}
