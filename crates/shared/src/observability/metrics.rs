//! Worker 指标
//!
//! 基于 metrics crate 的门面记录 worker 运行指标。

/// 注册指标描述
pub fn register_worker_metrics(service_name: &str) {
    metrics::describe_counter!("worker_cycles_total", "Total number of worker cycles");
    metrics::describe_counter!(
        "orders_processed_total",
        "Total number of processed orders by outcome"
    );
    metrics::describe_counter!(
        "order_fetch_failures_total",
        "Total number of failed order fetches by error kind"
    );
    metrics::describe_counter!(
        "order_status_update_failures_total",
        "Total number of failed order status updates"
    );
    metrics::describe_gauge!(
        "worker_last_run_timestamp",
        "Unix timestamp of the last worker health check"
    );

    // 记录服务启动
    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 记录一次 worker 循环
#[inline]
pub fn record_cycle(worker: &str) {
    metrics::counter!("worker_cycles_total", "worker" => worker.to_string()).increment(1);
}

/// 记录订单处理结果
#[inline]
pub fn record_order_processed(status: &str) {
    metrics::counter!("orders_processed_total", "status" => status.to_string()).increment(1);
}

/// 记录订单拉取失败
#[inline]
pub fn record_fetch_failure(kind: &str) {
    metrics::counter!("order_fetch_failures_total", "kind" => kind.to_string()).increment(1);
}

/// 记录订单状态回写失败
#[inline]
pub fn record_status_update_failure() {
    metrics::counter!("order_status_update_failures_total").increment(1);
}

/// 记录 Worker 健康状态
#[inline]
pub fn set_worker_last_run(worker: &str) {
    metrics::gauge!("worker_last_run_timestamp", "worker" => worker.to_string())
        .set(chrono::Utc::now().timestamp() as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 即使没有初始化 recorder，这些函数也不应该 panic
        register_worker_metrics("background-worker");
        record_cycle("order_worker");
        record_order_processed("completed");
        record_fetch_failure("TIMEOUT");
        record_status_update_failure();
        set_worker_last_run("order_worker");
    }
}
