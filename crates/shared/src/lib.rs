//! 共享库
//!
//! 包含 worker 进程共用的配置加载、错误类型与可观测性初始化代码。

pub mod config;
pub mod error;
pub mod observability;
