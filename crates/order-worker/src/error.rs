//! Worker 错误类型
//!
//! 区分连接失败、超时、HTTP 状态异常和响应解析失败，
//! 便于循环层按错误类型输出不同的日志。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("无法连接订单服务: {url} ({reason})")]
    Connection { url: String, reason: String },

    #[error("订单服务请求超时: {url}")]
    Timeout { url: String },

    #[error("订单服务返回异常状态: {url} status={status}")]
    HttpStatus { url: String, status: u16 },

    #[error("订单响应解析失败: {0}")]
    Parse(String),

    #[error("订单服务请求失败: {0}")]
    Request(String),

    #[error("无效的订单: order_id={order_id}, 原因={reason}")]
    InvalidOrder { order_id: String, reason: String },

    #[error(transparent)]
    Shared(#[from] worker_shared::error::SharedError),
}

impl WorkerError {
    /// 错误分类标签，用于日志字段和指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "CONNECTION",
            Self::Timeout { .. } => "TIMEOUT",
            Self::HttpStatus { .. } => "HTTP_STATUS",
            Self::Parse(_) => "PARSE",
            Self::Request(_) => "REQUEST",
            Self::InvalidOrder { .. } => "INVALID_ORDER",
            Self::Shared(e) => e.code(),
        }
    }

    /// 是否为传输层错误（连接失败或超时）
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// 将 reqwest 错误映射为 worker 错误
    ///
    /// 超时优先判断：连接超时同时满足 `is_connect`，但应归类为超时。
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if err.is_connect() {
            Self::Connection {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}
