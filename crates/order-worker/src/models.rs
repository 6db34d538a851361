//! 订单数据模型
//!
//! 订单由订单服务持有，worker 每次循环重新读取，不在本地保存任何订单状态。

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// 外部系统的不透明标识
///
/// 订单服务可能返回数字或字符串形式的 ID，worker 原样透传。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpaqueId {
    Number(i64),
    Text(String),
}

pub type OrderId = OpaqueId;
pub type CustomerId = OpaqueId;

impl fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for OpaqueId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for OpaqueId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// 订单状态
///
/// worker 只会把 `Pending` 迁移到 `Completed` 或 `Failed`；
/// 其他未知状态反序列化为 `Other`，不做任何处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
    #[serde(other)]
    Other,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 订单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "customerId", default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub status: OrderStatus,
}

impl Order {
    /// 订单金额，缺省为 0
    pub fn amount(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

/// `GET /orders` 响应体
///
/// 缺少 `orders` 字段时视为空列表。列表项先保持原始 JSON，
/// 只有 `status == "pending"` 的订单才会被解析为 `Order`，
/// 其他订单的字段格式不影响本轮处理。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrdersResponse {
    #[serde(default)]
    pub orders: Vec<Value>,
}

impl OrdersResponse {
    /// 取出待处理订单，无法解析的 pending 订单记录告警后跳过
    pub fn into_pending_orders(self) -> Vec<Order> {
        self.orders
            .into_iter()
            .filter(|raw| raw.get("status").and_then(Value::as_str) == Some("pending"))
            .filter_map(|raw| match serde_json::from_value::<Order>(raw.clone()) {
                Ok(order) => Some(order),
                Err(e) => {
                    warn!(order = %raw, error = %e, "跳过无法解析的待处理订单");
                    None
                }
            })
            .collect()
    }
}

/// `PATCH /orders/{id}/status` 请求体
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}
