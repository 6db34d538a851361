//! 订单处理后台 Worker
//!
//! 定期拉取订单服务中的 pending 订单并模拟处理，结果回写订单服务。

use std::sync::Arc;

use order_worker::client::HttpOrderServiceClient;
use order_worker::processor::ThreadRandom;
use order_worker::scheduler::PeriodicScheduler;
use order_worker::worker::{OrderWorker, WorkerConfig};
use tokio::sync::watch;
use tracing::{Instrument, info, info_span};
use worker_shared::config::{AppConfig, DEFAULT_SERVICE_NAME};
use worker_shared::observability;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(DEFAULT_SERVICE_NAME)?;
    observability::init(&config.observability())?;

    let worker_config = WorkerConfig::from_app_config(&config);

    info!("Starting {}", worker_config.service_name);
    info!(url = %worker_config.order_service_url, "订单服务地址");
    info!(interval = ?worker_config.process_interval, "处理间隔");

    let client = Arc::new(HttpOrderServiceClient::new(
        &worker_config.order_service_url,
        worker_config.request_timeout,
    )?);
    let worker = OrderWorker::new(&worker_config, client, Arc::new(ThreadRandom));

    // shutdown 信号只在两轮之间生效，进行中的一轮会完整执行
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut scheduler = PeriodicScheduler::new(
        worker_config.service_name.clone(),
        worker_config.process_interval,
        worker_config.health_check_every,
    );

    let worker = &worker;
    let cycles = scheduler
        .run(shutdown_rx, move |cycle| {
            async move {
                worker.process_pending_orders().await;
                anyhow::Ok(())
            }
            .instrument(info_span!("order_cycle", cycle))
        })
        .await;

    info!(cycles, "Worker 已停止");
    Ok(())
}

/// 监听关闭信号
///
/// 容器停止时发送 SIGTERM；本地开发通过 Ctrl+C。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down worker..."),
        _ = terminate => info!("Received SIGTERM, shutting down worker..."),
    }
}
