//! 可取消的周期任务调度器
//!
//! 以固定间隔重复执行一个任务：间隔从上一轮结束开始计算，不做漂移补偿。
//! 每轮的错误和 panic 都在循环边界被捕获并记录，调度器本身永不退出，
//! 直到收到 shutdown 信号。shutdown 只在两轮之间生效，进行中的一轮总会完整执行。

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{error, info};
use worker_shared::observability::metrics;

pub struct PeriodicScheduler {
    /// 服务名，用于健康日志和指标标签
    name: String,
    interval: Duration,
    /// 为 0 时不输出健康状态
    health_check_every: u64,
    cycle_count: u64,
    health_checks: u64,
}

impl PeriodicScheduler {
    pub fn new(name: impl Into<String>, interval: Duration, health_check_every: u64) -> Self {
        Self {
            name: name.into(),
            interval,
            health_check_every,
            cycle_count: 0,
            health_checks: 0,
        }
    }

    /// 已执行的轮数
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// 已输出的健康状态次数
    pub fn health_check_count(&self) -> u64 {
        self.health_checks
    }

    fn is_health_check_cycle(&self, cycle: u64) -> bool {
        self.health_check_every > 0 && cycle % self.health_check_every == 0
    }

    fn health_check(&mut self) {
        self.health_checks += 1;
        info!(service = %self.name, cycle = self.cycle_count, "{} is healthy and running", self.name);
        metrics::set_worker_last_run(&self.name);
    }

    /// 主循环：持续执行任务直到收到 shutdown 信号，返回累计执行轮数
    ///
    /// `task` 接收当前轮次编号（从 1 开始）。
    pub async fn run<F, Fut>(&mut self, mut shutdown: watch::Receiver<bool>, mut task: F) -> u64
    where
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        info!(
            service = %self.name,
            interval = ?self.interval,
            health_check_every = self.health_check_every,
            "周期调度器已启动"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.cycle_count += 1;
            let cycle = self.cycle_count;
            metrics::record_cycle(&self.name);

            if self.is_health_check_cycle(cycle) {
                self.health_check();
            }

            match AssertUnwindSafe(task(cycle)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(cycle, error = %e, "Worker 循环出错");
                }
                Err(panic) => {
                    error!(cycle, panic = %panic_message(panic.as_ref()), "Worker 循环发生 panic");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = wait_for_shutdown(&mut shutdown) => {}
            }
        }

        info!(
            service = %self.name,
            cycles = self.cycle_count,
            health_checks = self.health_checks,
            "正在关闭 worker..."
        );
        self.cycle_count
    }
}

/// 等待 shutdown 信号置为 true
///
/// 发送端被 drop 后不会再有信号，此时永远挂起，调度器继续按间隔运行。
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
