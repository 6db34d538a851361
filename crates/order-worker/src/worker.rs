//! 订单处理循环
//!
//! 一次循环：拉取订单 → 筛选 pending → 逐个顺序处理并回写状态。
//! 拉取失败只结束本轮，不影响调度器继续运行。

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use worker_shared::config::AppConfig;
use worker_shared::observability::metrics;

use crate::client::{DEFAULT_REQUEST_TIMEOUT, OrderServiceClient};
use crate::error::WorkerError;
use crate::models::Order;
use crate::processor::{
    DEFAULT_FAILURE_RATE, DEFAULT_PROCESSING_DELAY, OrderProcessor, ProcessOutcome, RandomSource,
};

/// 两次循环之间的固定间隔，从上一轮处理结束开始计算
pub const PROCESS_INTERVAL: Duration = Duration::from_secs(30);

/// 每隔多少轮输出一次健康状态
pub const HEALTH_CHECK_EVERY: u64 = 5;

/// Worker 运行参数
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub service_name: String,
    pub order_service_url: String,
    pub process_interval: Duration,
    pub request_timeout: Duration,
    pub processing_delay: Duration,
    pub failure_rate: f64,
    pub health_check_every: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl WorkerConfig {
    /// 从应用配置构建，时间相关参数使用固定常量
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            order_service_url: config.order_service_url.trim().to_string(),
            process_interval: PROCESS_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            processing_delay: DEFAULT_PROCESSING_DELAY,
            failure_rate: DEFAULT_FAILURE_RATE,
            health_check_every: HEALTH_CHECK_EVERY,
        }
    }
}

/// 单轮循环统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub update_failures: usize,
    /// 拉取订单失败时为 true，此时不会处理任何订单
    pub aborted: bool,
}

impl CycleReport {
    fn aborted() -> Self {
        Self {
            aborted: true,
            ..Default::default()
        }
    }
}

/// 筛选待处理订单，其余状态原样忽略
pub fn filter_pending(orders: Vec<Order>) -> Vec<Order> {
    orders.into_iter().filter(Order::is_pending).collect()
}

pub struct OrderWorker {
    client: Arc<dyn OrderServiceClient>,
    processor: OrderProcessor,
    order_service_url: String,
}

impl OrderWorker {
    pub fn new(
        config: &WorkerConfig,
        client: Arc<dyn OrderServiceClient>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let processor = OrderProcessor::new(
            client.clone(),
            random,
            config.processing_delay,
            config.failure_rate,
        );
        Self {
            client,
            processor,
            order_service_url: config.order_service_url.clone(),
        }
    }

    /// 执行一轮处理，拉取失败时返回错误
    pub async fn run_cycle(&self) -> Result<CycleReport, WorkerError> {
        info!("开始订单处理循环");

        let orders = self.client.fetch_orders().await?;
        let pending = filter_pending(orders);

        info!(count = pending.len(), "发现待处理订单");

        let mut report = CycleReport {
            pending: pending.len(),
            ..Default::default()
        };

        // 顺序处理，单个订单失败不影响后续订单
        for order in &pending {
            let processed = self.processor.process(order).await;
            match processed.outcome {
                ProcessOutcome::Completed => report.completed += 1,
                ProcessOutcome::Failed { .. } => report.failed += 1,
            }
            if !processed.status_updated {
                report.update_failures += 1;
            }
        }

        if pending.is_empty() {
            info!("没有待处理的订单");
        }

        info!(
            pending = report.pending,
            completed = report.completed,
            failed = report.failed,
            update_failures = report.update_failures,
            "订单处理循环完成"
        );

        Ok(report)
    }

    /// 执行一轮处理并吞掉所有错误，只记录日志
    pub async fn process_pending_orders(&self) -> CycleReport {
        match self.run_cycle().await {
            Ok(report) => report,
            Err(e) => {
                metrics::record_fetch_failure(e.kind());
                match &e {
                    WorkerError::Connection { .. } => error!(
                        url = %self.order_service_url,
                        error = %e,
                        "无法连接订单服务"
                    ),
                    WorkerError::Timeout { .. } => error!(
                        url = %self.order_service_url,
                        "订单服务请求超时"
                    ),
                    _ => error!(
                        error = %e,
                        error_kind = e.kind(),
                        "订单处理过程中发生意外错误"
                    ),
                }
                CycleReport::aborted()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockOrderServiceClient;
    use crate::models::{OrderId, OrderStatus};

    struct FixedRandom(f64);

    impl RandomSource for FixedRandom {
        fn next_f64(&self) -> f64 {
            self.0
        }
    }

    fn test_config() -> WorkerConfig {
        WorkerConfig {
            processing_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn worker(client: MockOrderServiceClient, roll: f64) -> OrderWorker {
        OrderWorker::new(&test_config(), Arc::new(client), Arc::new(FixedRandom(roll)))
    }

    fn orders_from(mut body: serde_json::Value) -> Vec<Order> {
        serde_json::from_value(body["orders"].take()).expect("构造测试订单失败")
    }

    #[test]
    fn test_default_worker_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.process_interval, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.processing_delay, Duration::from_secs(2));
        assert_eq!(config.failure_rate, 0.10);
        assert_eq!(config.health_check_every, 5);
        assert_eq!(config.order_service_url, "http://localhost:3001");
    }

    #[test]
    fn test_filter_pending() {
        let orders = orders_from(serde_json::json!({
            "orders": [
                {"id": 1, "status": "pending"},
                {"id": 2, "status": "completed"},
                {"id": 3, "status": "failed"},
                {"id": 4, "status": "shipped"},
                {"id": 5, "status": "pending"}
            ]
        }));

        let pending: Vec<OrderId> = filter_pending(orders).into_iter().map(|o| o.id).collect();
        assert_eq!(pending, vec![OrderId::Number(1), OrderId::Number(5)]);
    }

    #[tokio::test]
    async fn test_only_pending_order_is_processed() {
        let orders = orders_from(serde_json::json!({
            "orders": [
                {"id": 1, "status": "pending", "amount": 50},
                {"id": 2, "status": "completed"}
            ]
        }));

        let mut client = MockOrderServiceClient::new();
        client
            .expect_fetch_orders()
            .times(1)
            .returning(move || Ok(orders.clone()));
        client
            .expect_update_status()
            .withf(|id, status| {
                *id == OrderId::Number(1)
                    && matches!(status, OrderStatus::Completed | OrderStatus::Failed)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let report = worker(client, 0.5).process_pending_orders().await;
        assert_eq!(
            report,
            CycleReport {
                pending: 1,
                completed: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_empty_orders_no_updates() {
        let mut client = MockOrderServiceClient::new();
        client
            .expect_fetch_orders()
            .times(1)
            .returning(|| Ok(Vec::new()));
        client.expect_update_status().times(0);

        let report = worker(client, 0.5).process_pending_orders().await;
        assert_eq!(report, CycleReport::default());
    }

    #[tokio::test]
    async fn test_fetch_timeout_aborts_cycle() {
        let mut client = MockOrderServiceClient::new();
        client.expect_fetch_orders().times(1).returning(|| {
            Err(WorkerError::Timeout {
                url: "http://localhost:3001/orders".to_string(),
            })
        });
        client.expect_update_status().times(0);

        let report = worker(client, 0.5).process_pending_orders().await;
        assert!(report.aborted);
        assert_eq!(report.pending, 0);
    }

    #[tokio::test]
    async fn test_fetch_parse_error_aborts_cycle() {
        let mut client = MockOrderServiceClient::new();
        client
            .expect_fetch_orders()
            .times(1)
            .returning(|| Err(WorkerError::Parse("expected value at line 1".to_string())));
        client.expect_update_status().times(0);

        let w = worker(client, 0.5);
        assert!(matches!(w.run_cycle().await, Err(WorkerError::Parse(_))));
    }

    #[tokio::test]
    async fn test_update_failure_does_not_stop_batch() {
        let orders = orders_from(serde_json::json!({
            "orders": [
                {"id": 1, "status": "pending"},
                {"id": 2, "status": "pending"},
                {"id": 3, "status": "pending"}
            ]
        }));

        let mut client = MockOrderServiceClient::new();
        client
            .expect_fetch_orders()
            .times(1)
            .returning(move || Ok(orders.clone()));
        client
            .expect_update_status()
            .times(3)
            .returning(|id, _| {
                if *id == OrderId::Number(2) {
                    Err(WorkerError::Connection {
                        url: "http://localhost:3001/orders/2/status".to_string(),
                        reason: "connection refused".to_string(),
                    })
                } else {
                    Ok(())
                }
            });

        let report = worker(client, 0.01).process_pending_orders().await;
        assert_eq!(report.pending, 3);
        assert_eq!(report.failed, 3);
        assert_eq!(report.update_failures, 1);
        assert!(!report.aborted);
    }
}
