//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, SharedError};
use crate::observability::ObservabilityConfig;

/// 默认服务名，用于日志中标识 worker 进程
pub const DEFAULT_SERVICE_NAME: &str = "background-worker";

/// 默认订单服务地址，适用于本地运行
pub const DEFAULT_ORDER_SERVICE_URL: &str = "http://localhost:3001";

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    /// 订单服务基础地址，不含 `/orders` 路径
    pub order_service_url: String,
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            environment: "development".to_string(),
            order_service_url: DEFAULT_ORDER_SERVICE_URL.to_string(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. 代码内默认值
    /// 2. config/default.toml（默认配置）
    /// 3. config/{environment}.toml（环境特定配置）
    /// 4. config/{service_name}.toml（服务特定配置）
    /// 5. 环境变量（WORKER_ 前缀，`__` 分隔层级，如 WORKER_OBSERVABILITY__LOG_LEVEL）
    /// 6. 部署约定的 SERVICE_NAME / ORDER_SERVICE_URL
    pub fn load(service_name: &str) -> Result<Self> {
        // .env 文件可选，不存在时忽略
        let _ = dotenvy::dotenv();

        let env = std::env::var("WORKER_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .set_default("order_service_url", DEFAULT_ORDER_SERVICE_URL)?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("WORKER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("service_name", std::env::var("SERVICE_NAME").ok())?
            .set_override_option(
                "order_service_url",
                std::env::var("ORDER_SERVICE_URL").ok(),
            )?;

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// 校验配置的基本合法性
    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(SharedError::invalid_config("service_name", "不能为空"));
        }

        let url = self.order_service_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SharedError::invalid_config(
                "order_service_url",
                format!("必须以 http:// 或 https:// 开头: {url}"),
            ));
        }

        Ok(())
    }

    /// 可观测性配置，注入当前服务名
    pub fn observability(&self) -> ObservabilityConfig {
        self.observability
            .clone()
            .with_service_name(&self.service_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.service_name, "background-worker");
        assert_eq!(config.order_service_url, "http://localhost:3001");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = AppConfig {
            order_service_url: "localhost:3001".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_validate_rejects_empty_service_name() {
        let config = AppConfig {
            service_name: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_observability_inherits_service_name() {
        let config = AppConfig {
            service_name: "order-worker-test".to_string(),
            ..Default::default()
        };
        assert_eq!(config.observability().service_name, "order-worker-test");
    }

    #[test]
    fn test_load_env_overrides() {
        // 本 crate 中只有这一个测试修改进程环境变量
        // SAFETY: 测试内设置后立即恢复，不与其他测试共享这些变量
        unsafe {
            std::env::set_var("CONFIG_DIR", "/nonexistent-config-dir");
            std::env::set_var("SERVICE_NAME", "worker-under-test");
            std::env::set_var("ORDER_SERVICE_URL", "http://order-service:3001");
        }

        let result = AppConfig::load("background-worker");

        unsafe {
            std::env::remove_var("CONFIG_DIR");
            std::env::remove_var("SERVICE_NAME");
            std::env::remove_var("ORDER_SERVICE_URL");
        }

        let config = result.expect("加载配置失败");
        assert_eq!(config.service_name, "worker-under-test");
        assert_eq!(config.order_service_url, "http://order-service:3001");
        assert_eq!(config.observability.log_level, "info");
    }
}
