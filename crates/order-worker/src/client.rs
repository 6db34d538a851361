//! 订单服务 HTTP 客户端
//!
//! 通过 `OrderServiceClient` trait 抽象订单服务的两个接口：
//! `GET /orders` 与 `PATCH /orders/{id}/status`。worker 只依赖 trait，
//! 测试时可替换为 mock 或内存实现，无需启动真实订单服务。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use crate::error::WorkerError;
use crate::models::{Order, OrderId, OrderStatus, OrdersResponse, StatusUpdate};

/// 默认请求超时，防止订单服务不可用时阻塞 worker 主循环
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// 订单服务客户端抽象
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderServiceClient: Send + Sync {
    /// 拉取订单列表
    ///
    /// HTTP 实现只返回可解析的 pending 订单，其他状态的订单不做解析。
    async fn fetch_orders(&self) -> Result<Vec<Order>, WorkerError>;

    /// 回写订单状态，非 2xx 响应视为失败
    async fn update_status(&self, order_id: &OrderId, status: OrderStatus)
    -> Result<(), WorkerError>;
}

/// 基于 reqwest 的订单服务客户端
///
/// 每个请求都受 `timeout` 约束，超时与连接失败分别映射为不同的错误类型。
#[derive(Debug, Clone)]
pub struct HttpOrderServiceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpOrderServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WorkerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WorkerError::Request(format!("创建 HTTP 客户端失败: {e}")))?;

        Self::with_client(base_url, http)
    }

    /// 使用预先配置好的 reqwest 客户端（超时、代理等由调用方决定）
    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self, WorkerError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| WorkerError::Request(format!("无效的订单服务 URL {base_url}: {e}")))?;

        // 提前校验，避免每次请求时才发现 URL 无法追加路径
        if base_url.cannot_be_a_base() {
            return Err(WorkerError::Request(format!(
                "订单服务 URL 不能作为基础路径: {base_url}"
            )));
        }

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 在基础地址后追加路径段，路径段会被正确转义
    fn endpoint(&self, segments: &[&str]) -> Result<Url, WorkerError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                WorkerError::Request(format!("订单服务 URL 不能作为基础路径: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn orders_url(&self) -> Result<Url, WorkerError> {
        self.endpoint(&["orders"])
    }

    pub fn status_url(&self, order_id: &OrderId) -> Result<Url, WorkerError> {
        let id = order_id.to_string();
        self.endpoint(&["orders", &id, "status"])
    }
}

#[async_trait]
impl OrderServiceClient for HttpOrderServiceClient {
    async fn fetch_orders(&self) -> Result<Vec<Order>, WorkerError> {
        let url = self.orders_url()?;
        debug!(url = %url, "拉取订单列表");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| WorkerError::from_reqwest(url.as_str(), e))?;

        let body: OrdersResponse = response
            .json()
            .await
            .map_err(|e| WorkerError::from_reqwest(url.as_str(), e))?;

        Ok(body.into_pending_orders())
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), WorkerError> {
        let url = self.status_url(order_id)?;
        debug!(url = %url, order_id = %order_id, status = %status, "回写订单状态");

        self.http
            .patch(url.clone())
            .json(&StatusUpdate { status })
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| WorkerError::from_reqwest(url.as_str(), e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_url() {
        let client =
            HttpOrderServiceClient::new("http://localhost:3001", DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert_eq!(
            client.orders_url().unwrap().as_str(),
            "http://localhost:3001/orders"
        );
    }

    #[test]
    fn test_status_url_with_path_prefix_and_trailing_slash() {
        let client =
            HttpOrderServiceClient::new("http://gateway:8080/api/", DEFAULT_REQUEST_TIMEOUT)
                .unwrap();
        assert_eq!(
            client.status_url(&OrderId::Number(7)).unwrap().as_str(),
            "http://gateway:8080/api/orders/7/status"
        );
    }

    #[test]
    fn test_status_url_escapes_text_id() {
        let client =
            HttpOrderServiceClient::new("http://localhost:3001", DEFAULT_REQUEST_TIMEOUT).unwrap();
        let url = client.status_url(&OrderId::from("a/b")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/orders/a%2Fb/status");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpOrderServiceClient::new("not a url", DEFAULT_REQUEST_TIMEOUT);
        assert!(matches!(result, Err(WorkerError::Request(_))));

        let result = HttpOrderServiceClient::new("mailto:ops@example.com", DEFAULT_REQUEST_TIMEOUT);
        assert!(matches!(result, Err(WorkerError::Request(_))));
    }
}
