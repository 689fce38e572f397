//! 测试用的脚本化传输层

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::config::SessionConfig;
use crate::error::TransportError;
use crate::transport::{Request, RequestId, Response, Session, SessionId, Transport};

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Succeed,
    /// 前 n 次失败，之后成功
    FailFirst(usize),
    AlwaysFail,
    /// 直到请求被取消才以错误返回
    BlockUntilCancelled,
}

pub struct ScriptedSession {
    id: SessionId,
    behavior: Behavior,
    fetches: AtomicUsize,
    requests: Mutex<Vec<Request>>,
    cancelled: Mutex<Vec<RequestId>>,
    closed: AtomicBool,
    wake: Notify,
}

impl ScriptedSession {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            id: SessionId::next(),
            behavior,
            fetches: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(Behavior::Succeed)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn cancelled(&self) -> Vec<RequestId> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &Request) -> Response {
        let body = serde_json::json!({
            "method": request.method.as_str(),
            "url": request.url,
        });
        Response {
            request: request.id(),
            status: 200,
            headers: Default::default(),
            body: body.to_string().into_bytes(),
        }
    }
}

#[async_trait]
impl Session for ScriptedSession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn fetch(&self, request: &Request) -> Result<Response, TransportError> {
        let attempt = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());

        match self.behavior {
            Behavior::Succeed => Ok(self.respond(request)),
            Behavior::FailFirst(n) if attempt <= n => {
                Err(TransportError::new(500, format!("failure {}", attempt)))
            }
            Behavior::FailFirst(_) => Ok(self.respond(request)),
            Behavior::AlwaysFail => Err(TransportError::new(503, format!("failure {}", attempt))),
            Behavior::BlockUntilCancelled => loop {
                let woken = self.wake.notified();
                if self.cancelled.lock().unwrap().contains(&request.id()) {
                    return Err(TransportError::new(-1, "request aborted"));
                }
                woken.await;
            },
        }
    }

    fn cancel(&self, request: RequestId) {
        self.cancelled.lock().unwrap().push(request);
        self.wake.notify_waiters();
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub struct ScriptedTransport {
    behavior: Behavior,
    fail_create: bool,
    sessions: Mutex<Vec<Arc<ScriptedSession>>>,
    configs: Mutex<Vec<SessionConfig>>,
}

impl ScriptedTransport {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            fail_create: false,
            sessions: Mutex::new(Vec::new()),
            configs: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_creation() -> Arc<Self> {
        Arc::new(Self {
            behavior: Behavior::Succeed,
            fail_create: true,
            sessions: Mutex::new(Vec::new()),
            configs: Mutex::new(Vec::new()),
        })
    }

    pub fn created(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn sessions(&self) -> Vec<Arc<ScriptedSession>> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn last_config(&self) -> Option<SessionConfig> {
        self.configs.lock().unwrap().last().cloned()
    }

    pub fn total_fetches(&self) -> usize {
        self.sessions().iter().map(|session| session.fetches()).sum()
    }
}

impl Transport for ScriptedTransport {
    fn create_session(&self, config: &SessionConfig) -> Result<Arc<dyn Session>, TransportError> {
        if self.fail_create {
            return Err(TransportError::new(0, "no network"));
        }
        let session = Arc::new(ScriptedSession::new(self.behavior));
        self.sessions.lock().unwrap().push(session.clone());
        self.configs.lock().unwrap().push(config.clone());
        Ok(session)
    }
}
