//! 会话生命周期与在途请求登记

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::debug;

use crate::config::{SessionConfig, TypeKey};
use crate::error::{RcpError, Result};
use crate::transport::{RequestId, Session, SessionId, Transport};

/// 会话到在途请求集合的并发多重映射
#[derive(Default)]
pub struct RequestRegistry {
    inflight: DashMap<SessionId, HashSet<RequestId>>,
}

impl RequestRegistry {
    pub fn register(&self, session: SessionId, request: RequestId) {
        self.inflight.entry(session).or_default().insert(request);
    }

    /// 移除请求，集合为空时一并移除会话条目
    pub fn unregister(&self, session: SessionId, request: RequestId) {
        if let Some(mut requests) = self.inflight.get_mut(&session) {
            requests.remove(&request);
        }
        self.inflight
            .remove_if(&session, |_, requests| requests.is_empty());
    }

    /// 取出会话的全部在途请求
    pub fn take(&self, session: SessionId) -> Vec<RequestId> {
        self.inflight
            .remove(&session)
            .map(|(_, requests)| requests.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn in_flight(&self, session: SessionId) -> usize {
        self.inflight
            .get(&session)
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    pub fn contains_session(&self, session: SessionId) -> bool {
        self.inflight.contains_key(&session)
    }
}

/// 每个声明类型一个共享会话
pub struct SessionLifecycle {
    transport: Arc<dyn Transport>,
    shared: DashMap<TypeKey, Arc<dyn Session>>,
    requests: RequestRegistry,
}

impl SessionLifecycle {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            shared: DashMap::new(),
            requests: RequestRegistry::default(),
        }
    }

    pub fn requests(&self) -> &RequestRegistry {
        &self.requests
    }

    /// 取得调用使用的会话
    ///
    /// 自动关闭的调用总是得到一个不保存的私有会话。
    pub fn acquire(
        &self,
        ty: TypeKey,
        auto_close: bool,
        config: impl FnOnce() -> SessionConfig,
    ) -> Result<Arc<dyn Session>> {
        if auto_close {
            let session = self.create(&config())?;
            debug!("created private {} for {:?}", session.id(), ty);
            return Ok(session);
        }

        match self.shared.entry(ty) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let session = self.create(&config())?;
                debug!("created shared {} for {:?}", session.id(), ty);
                Ok(entry.insert(session).clone())
            }
        }
    }

    fn create(&self, config: &SessionConfig) -> Result<Arc<dyn Session>> {
        self.transport
            .create_session(config)
            .map_err(|e| RcpError::SessionCreation {
                reason: e.to_string(),
            })
    }

    pub fn shared(&self, ty: TypeKey) -> Option<Arc<dyn Session>> {
        self.shared.get(&ty).map(|session| session.clone())
    }

    /// 关闭并清除声明类型的共享会话，返回是否存在
    pub fn close(&self, ty: TypeKey) -> bool {
        match self.shared.remove(&ty) {
            Some((_, session)) => {
                self.close_session(session.as_ref());
                true
            }
            None => false,
        }
    }

    /// 取消会话上的全部在途请求后关闭会话
    pub fn close_session(&self, session: &dyn Session) {
        let pending = self.requests.take(session.id());
        debug!(
            "closing {} with {} request(s) in flight",
            session.id(),
            pending.len()
        );
        for request in pending {
            session.cancel(request);
        }
        session.close();
    }

    pub fn close_all(&self) {
        let types: Vec<TypeKey> = self.shared.iter().map(|entry| *entry.key()).collect();
        for ty in types {
            self.close(ty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Behavior, ScriptedTransport};

    struct Api;
    struct Other;

    #[test]
    fn test_registry_register_and_unregister() {
        let registry = RequestRegistry::default();
        let session = SessionId::next();
        let a = RequestId::next();
        let b = RequestId::next();

        registry.register(session, a);
        registry.register(session, b);
        assert_eq!(registry.in_flight(session), 2);

        registry.unregister(session, a);
        assert_eq!(registry.in_flight(session), 1);
        registry.unregister(session, b);
        assert!(!registry.contains_session(session));
    }

    #[test]
    fn test_registry_concurrent_inserts_are_not_lost() {
        let registry = Arc::new(RequestRegistry::default());
        let session = SessionId::next();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        registry.register(session, RequestId::next());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.in_flight(session), 800);
        assert_eq!(registry.take(session).len(), 800);
        assert!(!registry.contains_session(session));
    }

    #[test]
    fn test_shared_session_is_reused_per_type() {
        let transport = ScriptedTransport::new(Behavior::Succeed);
        let lifecycle = SessionLifecycle::new(transport.clone());

        let first = lifecycle.acquire(TypeKey::of::<Api>(), false, SessionConfig::default).unwrap();
        let second = lifecycle.acquire(TypeKey::of::<Api>(), false, SessionConfig::default).unwrap();
        let other = lifecycle.acquire(TypeKey::of::<Other>(), false, SessionConfig::default).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_ne!(first.id(), other.id());
        assert_eq!(transport.created(), 2);
    }

    #[test]
    fn test_auto_close_session_is_never_stored() {
        let transport = ScriptedTransport::new(Behavior::Succeed);
        let lifecycle = SessionLifecycle::new(transport.clone());

        let shared = lifecycle.acquire(TypeKey::of::<Api>(), false, SessionConfig::default).unwrap();
        let private = lifecycle.acquire(TypeKey::of::<Api>(), true, SessionConfig::default).unwrap();

        assert_ne!(shared.id(), private.id());
        assert_eq!(lifecycle.shared(TypeKey::of::<Api>()).unwrap().id(), shared.id());
    }

    #[test]
    fn test_close_cancels_registered_requests() {
        let transport = ScriptedTransport::new(Behavior::Succeed);
        let lifecycle = SessionLifecycle::new(transport.clone());
        let session = lifecycle.acquire(TypeKey::of::<Api>(), false, SessionConfig::default).unwrap();
        let a = RequestId::next();
        let b = RequestId::next();
        lifecycle.requests().register(session.id(), a);
        lifecycle.requests().register(session.id(), b);

        assert!(lifecycle.close(TypeKey::of::<Api>()));
        assert!(!lifecycle.close(TypeKey::of::<Api>()));

        let scripted = &transport.sessions()[0];
        let mut cancelled = scripted.cancelled();
        cancelled.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(cancelled, expected);
        assert!(scripted.is_closed());
        assert!(!lifecycle.requests().contains_session(session.id()));
        assert!(lifecycle.shared(TypeKey::of::<Api>()).is_none());
    }

    #[test]
    fn test_session_creation_failure() {
        let lifecycle = SessionLifecycle::new(ScriptedTransport::failing_creation());
        let result = lifecycle.acquire(TypeKey::of::<Api>(), false, SessionConfig::default);
        assert!(matches!(result, Err(RcpError::SessionCreation { .. })));
        assert!(lifecycle.shared(TypeKey::of::<Api>()).is_none());
    }
}
