//! 单个订单处理
//!
//! 模拟支付、库存检查等耗时操作：固定延迟后按概率判定成功或失败。
//! 随机数来源通过 `RandomSource` 注入，测试可固定结果以覆盖两个分支。

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use worker_shared::observability::metrics;

use crate::client::OrderServiceClient;
use crate::error::WorkerError;
use crate::models::{Order, OrderId, OrderStatus};
use crate::updater::update_order_status;

/// 模拟处理耗时
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_secs(2);

/// 模拟支付网关超时的概率
pub const DEFAULT_FAILURE_RATE: f64 = 0.10;

const GATEWAY_TIMEOUT_REASON: &str = "支付网关超时";

/// `[0, 1)` 均匀分布随机数来源
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

/// 基于线程本地 RNG 的随机数来源
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// 订单处理结论
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Completed,
    Failed { reason: String },
}

impl ProcessOutcome {
    /// 需要回写的目标状态
    pub fn status(&self) -> OrderStatus {
        match self {
            Self::Completed => OrderStatus::Completed,
            Self::Failed { .. } => OrderStatus::Failed,
        }
    }
}

/// 单个订单的处理记录
#[derive(Debug, Clone)]
pub struct ProcessedOrder {
    pub order_id: OrderId,
    pub outcome: ProcessOutcome,
    /// 状态回写是否成功；失败时订单仍为 pending，下一轮会被再次处理
    pub status_updated: bool,
}

pub struct OrderProcessor {
    client: Arc<dyn OrderServiceClient>,
    random: Arc<dyn RandomSource>,
    processing_delay: Duration,
    failure_rate: f64,
}

impl OrderProcessor {
    pub fn new(
        client: Arc<dyn OrderServiceClient>,
        random: Arc<dyn RandomSource>,
        processing_delay: Duration,
        failure_rate: f64,
    ) -> Self {
        Self {
            client,
            random,
            processing_delay,
            failure_rate,
        }
    }

    /// 处理单个订单并回写结果
    ///
    /// 无论处理成功、随机失败还是处理出错，都恰好回写一次状态。
    pub async fn process(&self, order: &Order) -> ProcessedOrder {
        info!(
            order_id = %order.id,
            customer_id = ?order.customer_id,
            amount = order.amount(),
            "开始处理订单"
        );

        let outcome = match self.simulate(order).await {
            Ok(ProcessOutcome::Completed) => {
                info!(order_id = %order.id, "订单处理成功");
                ProcessOutcome::Completed
            }
            Ok(failed @ ProcessOutcome::Failed { .. }) => {
                error!(
                    order_id = %order.id,
                    reason = GATEWAY_TIMEOUT_REASON,
                    "订单支付处理失败"
                );
                failed
            }
            Err(e) => {
                error!(order_id = %order.id, error = %e, "订单处理出错");
                ProcessOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        metrics::record_order_processed(outcome.status().as_str());

        let status_updated =
            update_order_status(self.client.as_ref(), &order.id, outcome.status()).await;

        ProcessedOrder {
            order_id: order.id.clone(),
            outcome,
            status_updated,
        }
    }

    /// 模拟处理过程
    async fn simulate(&self, order: &Order) -> Result<ProcessOutcome, WorkerError> {
        if !self.processing_delay.is_zero() {
            tokio::time::sleep(self.processing_delay).await;
        }

        let amount = order.amount();
        if !amount.is_finite() || amount < 0.0 {
            return Err(WorkerError::InvalidOrder {
                order_id: order.id.to_string(),
                reason: format!("金额无效: {amount}"),
            });
        }

        if self.random.next_f64() < self.failure_rate {
            return Ok(ProcessOutcome::Failed {
                reason: GATEWAY_TIMEOUT_REASON.to_string(),
            });
        }

        Ok(ProcessOutcome::Completed)
    }
}
