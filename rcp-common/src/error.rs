use thiserror::Error;

use crate::transport::RequestId;

pub type Result<T> = std::result::Result<T, RcpError>;

/// 传输层返回的原始错误，原样透传给调用方
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error {code}: {message}")]
pub struct TransportError {
    /// 传输层错误码，HTTP 状态码或 0
    pub code: i32,
    pub message: String,
}

impl TransportError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RcpError {
    /// 传输层无法创建会话，不会重试
    #[error("failed to create session: {reason}")]
    SessionCreation { reason: String },

    /// 请求失败，重试耗尽后才会出现
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// 请求在发出前已被取消
    #[error("request {request} was cancelled")]
    Cancelled { request: RequestId },

    #[error("configuration error: {0}")]
    Configuration(String),

    /// 来自映射函数或拦截器的错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RcpError {
    /// 取出传输层错误，便于调用方读取错误码
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            RcpError::Transport(error) => Some(error),
            RcpError::Other(error) => error.downcast_ref::<TransportError>(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RcpError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display_carries_code_and_message() {
        let error = RcpError::from(TransportError::new(503, "service unavailable"));
        assert_eq!(error.to_string(), "transport error 503: service unavailable");
        assert_eq!(error.transport().unwrap().code, 503);
    }

    #[test]
    fn test_transport_error_inside_anyhow_is_found() {
        let error = RcpError::from(anyhow::Error::new(TransportError::new(7, "boom")));
        assert_eq!(error.transport().unwrap().message, "boom");
        assert!(!error.is_cancelled());
    }

    #[test]
    fn test_cancelled_display() {
        let request = RequestId::next();
        let error = RcpError::Cancelled { request };
        assert!(error.is_cancelled());
        assert!(error.to_string().contains(&request.to_string()));
    }
}
