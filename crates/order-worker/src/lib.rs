//! 订单处理后台 Worker
//!
//! 以固定间隔轮询订单服务，筛选待处理订单并逐个模拟处理，
//! 处理结果通过订单服务 API 回写。单个订单或单次循环失败只记录日志，
//! 不会中断后续处理。

pub mod client;
pub mod error;
pub mod models;
pub mod processor;
pub mod scheduler;
pub mod updater;
pub mod worker;
