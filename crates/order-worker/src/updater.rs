//! 订单状态回写
//!
//! 尽力而为：请求失败只记录日志，不重试也不上抛。
//! worker 无法确认状态是否真正落库，回写失败的订单会在下一轮循环中被再次处理。

use tracing::{error, info};
use worker_shared::observability::metrics;

use crate::client::OrderServiceClient;
use crate::models::{OrderId, OrderStatus};

/// 回写订单状态，返回是否成功
pub async fn update_order_status(
    client: &dyn OrderServiceClient,
    order_id: &OrderId,
    status: OrderStatus,
) -> bool {
    match client.update_status(order_id, status).await {
        Ok(()) => {
            info!(order_id = %order_id, status = %status, "订单状态已更新");
            true
        }
        Err(e) => {
            error!(
                order_id = %order_id,
                status = %status,
                error = %e,
                error_kind = e.kind(),
                "订单状态更新失败"
            );
            metrics::record_status_update_failure();
            false
        }
    }
}
