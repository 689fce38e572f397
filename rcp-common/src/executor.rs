//! 单次逻辑调用的执行状态机

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use log::{debug, error, warn};

use crate::binder::{bind, combine_pathname, merge_query};
use crate::cancel::CancelToken;
use crate::config::{RequestConfig, SessionConfig, TypeKey};
use crate::error::{RcpError, Result};
use crate::interceptor::{Interceptor, Next, RequestContext};
use crate::lifecycle::SessionLifecycle;
use crate::transport::{Request, Response, Session};
use crate::types::header::merge_headers;
use crate::types::param::Arg;
use crate::types::response::{CallOutput, Destination};
use crate::types::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Building,
    Dispatched { attempt: u32 },
    Retrying { remaining: u32 },
    Succeeded,
    Cancelled,
    Failed,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Building => f.write_str("building"),
            CallState::Dispatched { attempt } => write!(f, "dispatched (attempt {})", attempt),
            CallState::Retrying { remaining } => write!(f, "retrying ({} left)", remaining),
            CallState::Succeeded => f.write_str("succeeded"),
            CallState::Cancelled => f.write_str("cancelled"),
            CallState::Failed => f.write_str("failed"),
        }
    }
}

/// 执行一次调用所需的合并后配置与实参
pub struct CallPlan {
    pub session: SessionConfig,
    pub request: RequestConfig,
    pub destination: Destination,
    pub args: Vec<Arg>,
}

pub struct RequestExecutor<'a> {
    lifecycle: &'a SessionLifecycle,
    ty: TypeKey,
    member: &'a str,
    receiver: &'a (dyn Any + Send + Sync),
    state: CallState,
}

impl<'a> RequestExecutor<'a> {
    pub fn new(
        lifecycle: &'a SessionLifecycle,
        ty: TypeKey,
        member: &'a str,
        receiver: &'a (dyn Any + Send + Sync),
    ) -> Self {
        Self {
            lifecycle,
            ty,
            member,
            receiver,
            state: CallState::Building,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    fn transition(&mut self, next: CallState) {
        debug!(
            "{}::{} {} -> {}",
            self.ty.name(),
            self.member,
            self.state,
            next
        );
        self.state = next;
    }

    pub async fn execute(mut self, plan: CallPlan) -> Result<CallOutput> {
        let CallPlan {
            session: session_config,
            request: config,
            destination,
            args,
        } = plan;

        let (mut request, token) = match build_request(&session_config, &config, destination, &args) {
            Ok(built) => built,
            Err(e) => {
                self.transition(CallState::Failed);
                return Err(e);
            }
        };

        let auto_close = config.is_auto_close();
        let interceptors = session_config.interceptors.clone();
        let session = match self.lifecycle.acquire(self.ty, auto_close, || session_config) {
            Ok(session) => session,
            Err(e) => {
                self.transition(CallState::Failed);
                error!("{}::{} {}", self.ty.name(), self.member, e);
                return Err(e);
            }
        };

        self.lifecycle.requests().register(session.id(), request.id());
        token.arm(request.id(), session.clone());

        let outcome = self
            .dispatch(
                &mut request,
                &session,
                &interceptors,
                &token,
                config.retry_count(),
                config.backoff.as_ref(),
            )
            .await;

        token.disarm();
        self.lifecycle.requests().unregister(session.id(), request.id());
        if auto_close {
            self.lifecycle.close_session(session.as_ref());
        }

        let response = outcome?;
        match &config.map {
            Some(map) => Ok(CallOutput::Mapped(map.apply(response).await?)),
            None => Ok(CallOutput::Response(response)),
        }
    }

    /// 发送请求，传输失败时在次数内重试；取消后不再发起新的尝试
    async fn dispatch(
        &mut self,
        request: &mut Request,
        session: &Arc<dyn Session>,
        interceptors: &[Arc<dyn Interceptor>],
        token: &CancelToken,
        retries: u32,
        backoff: Option<&RetryPolicy>,
    ) -> Result<Response> {
        let attempts = retries.saturating_add(1);
        let mut last_error: Option<RcpError> = None;
        let mut attempt = 0;

        while attempt < attempts && !token.is_cancel() {
            attempt += 1;
            self.transition(CallState::Dispatched { attempt });

            let mut context = RequestContext::new(request, self.receiver);
            let error = match Next::new(interceptors, session.as_ref()).run(&mut context).await {
                Ok(response) => {
                    self.transition(CallState::Succeeded);
                    return Ok(response);
                }
                Err(error) if error.transport().is_none() => {
                    self.transition(CallState::Failed);
                    return Err(error);
                }
                Err(error) => error,
            };

            if attempt < attempts && !token.is_cancel() {
                warn!(
                    "{}::{} attempt {}/{} failed: {}",
                    self.ty.name(),
                    self.member,
                    attempt,
                    attempts,
                    error
                );
                self.transition(CallState::Retrying {
                    remaining: attempts - attempt,
                });
                if let Some(policy) = backoff {
                    let delay = policy.calculate_delay(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
            last_error = Some(error);
        }

        let error = last_error.unwrap_or(RcpError::Cancelled {
            request: request.id(),
        });
        if token.is_cancel() {
            self.transition(CallState::Cancelled);
        } else {
            self.transition(CallState::Failed);
            error!(
                "{}::{} gave up after {} attempt(s): {}",
                self.ty.name(),
                self.member,
                attempt,
                error
            );
        }
        Err(error)
    }
}

/// 组合路径、请求头、Cookie 与请求体，构造只在此处生成一次的请求
fn build_request(
    session: &SessionConfig,
    config: &RequestConfig,
    destination: Destination,
    args: &[Arg],
) -> Result<(Request, CancelToken)> {
    let bound = bind(&config.params, args)?;

    let path = combine_pathname(session.base_address.as_deref(), config.path());
    let mut request = Request::new(config.method(), merge_query(&path, &bound.queries));

    request.headers = config.headers.clone();
    merge_headers(&mut request.headers, &bound.headers);
    request.cookies = config.cookies.clone();
    request.cookies.extend(bound.cookies);
    request.content = bound.content;
    request.transfer_range = bound.range;
    request.configuration = config.configuration.clone();
    request.destination = destination;

    Ok((request, bound.token.unwrap_or_default()))
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod executor_tests;
