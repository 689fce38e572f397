use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::transport::{RequestId, Session};

#[derive(Default)]
struct TokenState {
    request: Option<RequestId>,
    session: Option<Arc<dyn Session>>,
    cancelled: bool,
}

/// 取消句柄
///
/// 克隆共享同一状态；调用方持有的句柄与执行中的请求看到的是同一个标记。
#[derive(Clone, Default)]
pub struct CancelToken {
    state: Arc<Mutex<TokenState>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求发出前记录其所属会话，并清除上一次调用留下的取消标记
    pub(crate) fn arm(&self, request: RequestId, session: Arc<dyn Session>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.request = Some(request);
        state.session = Some(session);
        state.cancelled = false;
    }

    /// 调用结束后解除与会话的关联；取消标记保留供调用方查询
    pub(crate) fn disarm(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.request = None;
        state.session = None;
    }

    pub fn is_cancel(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancelled
    }

    pub fn request(&self) -> Option<RequestId> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .request
    }

    /// 标记取消并通知会话中止请求
    ///
    /// 只对进行中的请求生效，每个请求只有第一次调用返回 `true`。
    /// 句柄未关联请求（尚未发出或已经结束）时不做任何事并返回 `false`。
    pub fn cancel(&self) -> bool {
        let (request, session) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.cancelled {
                return false;
            }
            let Some((request, session)) = state.request.zip(state.session.clone()) else {
                return false;
            };
            state.cancelled = true;
            (request, session)
        };

        debug!("cancelling {} on {}", request, session.id());
        session.cancel(request);
        true
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("CancelToken")
            .field("request", &state.request)
            .field("cancelled", &state.cancelled)
            .finish()
    }
}

/// 取消 `token` 关联的请求
pub fn cancel(token: &CancelToken) -> bool {
    token.cancel()
}
