// ==========================================
// BOM 告警引擎 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换引擎/仓储错误为调用方可处理的错误
// 规则:
// - 校验类 / 未找到 直接返回字段级细节
// - 冲突附带阻断告警列表
// - 内部错误完整记录日志，对外只返回通用信息
// ==========================================

use crate::domain::inventory::InventoryAlert;
use crate::engine::error::EngineError;
use crate::engine::lot_status::TransitionError;
use crate::repository::error::RepositoryError;
use serde::Serialize;
use std::error::Error;
use thiserror::Error;

/// 对外暴露的通用内部错误信息
pub const INTERNAL_ERROR_MESSAGE: &str = "存储访问失败，请稍后重试";

/// API层错误类型
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// 输入形状/取值非法
    #[error("输入无效 (field={field}): {message}")]
    ValidationError { field: String, message: String },

    /// 批次 / 告警 / 构件 / 采购建议不存在
    #[error("资源未找到: {entity}(id={id})")]
    NotFound { entity: String, id: String },

    /// 下达被阻断 / 重复确认 / 非法状态迁移
    #[error("冲突: {message}")]
    Conflict {
        message: String,
        blocking_alerts: Vec<InventoryAlert>,
    },

    /// 工艺结构损坏（上游数据问题，不可重试）
    #[error("工艺结构错误: {0}")]
    MalformedStructure(String),

    /// 替代料未预选（上游数据问题，不可重试）
    #[error("替代料未确定: group_id={group_id}, {reason}")]
    UnresolvedAlternative { group_id: String, reason: String },

    /// 批次已下达，禁止任何告警变更
    #[error("批次已下达: lot_id={lot_id}")]
    LotFinalized { lot_id: String },

    /// 存储故障（细节只进日志）
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        ApiError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
            blocking_alerts: Vec::new(),
        }
    }

    /// 记录完整上下文后返回通用内部错误
    pub fn internal(context: &str, detail: &dyn std::fmt::Display) -> Self {
        tracing::error!(context = context, error = %detail, "内部错误");
        ApiError::InternalError(INTERNAL_ERROR_MESSAGE.to_string())
    }

    /// 配置读取失败
    pub fn from_config(err: Box<dyn Error>) -> Self {
        ApiError::internal("config", &err)
    }

    /// 稳定的机器可读错误码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::MalformedStructure(_) => "MALFORMED_STRUCTURE",
            ApiError::UnresolvedAlternative { .. } => "UNRESOLVED_ALTERNATIVE",
            ApiError::LotFinalized { .. } => "LOT_FINALIZED",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// 仅存储类内部错误可由调用方重试
    pub fn is_retriable(&self) -> bool {
        matches!(self, ApiError::InternalError(_))
    }

    /// 转换为响应体
    pub fn to_response(&self) -> ErrorResponse {
        let (field, blocking_alerts) = match self {
            ApiError::ValidationError { field, .. } => (Some(field.clone()), Vec::new()),
            ApiError::Conflict { blocking_alerts, .. } => (None, blocking_alerts.clone()),
            _ => (None, Vec::new()),
        };
        ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            field,
            retriable: self.is_retriable(),
            blocking_alerts,
        }
    }
}

/// 错误响应体
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub retriable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocking_alerts: Vec<InventoryAlert>,
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => ApiError::NotFound { entity, id },
            RepositoryError::UniqueConstraintViolation(msg) => {
                tracing::warn!(error = %msg, "唯一约束冲突");
                ApiError::conflict("记录已存在")
            }
            other => ApiError::internal("repository", &other),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::MalformedStructure { reason } => ApiError::MalformedStructure(reason),
            EngineError::UnresolvedAlternative { group_id, reason } => {
                ApiError::UnresolvedAlternative { group_id, reason }
            }
            EngineError::InvalidInput { field, message } => {
                ApiError::ValidationError { field, message }
            }
            EngineError::CostConversion(message) => ApiError::ValidationError {
                field: "quantity".to_string(),
                message,
            },
        }
    }
}

/// 状态迁移被拒 → API 错误（阻断告警由调用方从告警全集中挑出）
pub fn from_transition(
    err: TransitionError,
    lot_id: &str,
    alerts: &[InventoryAlert],
) -> ApiError {
    match err {
        TransitionError::LotFinalized => ApiError::LotFinalized {
            lot_id: lot_id.to_string(),
        },
        TransitionError::Blocked {
            reason,
            blocking_alert_ids,
        } => ApiError::Conflict {
            message: reason,
            blocking_alerts: alerts
                .iter()
                .filter(|a| blocking_alert_ids.contains(&a.alert_id))
                .cloned()
                .collect(),
        },
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_not_found_keeps_detail() {
        let api_err: ApiError = RepositoryError::not_found("ProductionLot", "LOT-9").into();
        match &api_err {
            ApiError::NotFound { entity, id } => {
                assert_eq!(entity, "ProductionLot");
                assert_eq!(id, "LOT-9");
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
        assert_eq!(api_err.code(), "NOT_FOUND");
        assert!(!api_err.is_retriable());
    }

    #[test]
    fn test_storage_error_is_generic() {
        let api_err: ApiError =
            RepositoryError::DatabaseQueryError("no such table: secret_table".to_string()).into();
        assert_eq!(api_err.code(), "INTERNAL_ERROR");
        assert!(api_err.is_retriable());
        assert!(!api_err.to_string().contains("secret_table"));
    }

    #[test]
    fn test_engine_errors_are_not_retriable() {
        let api_err: ApiError = EngineError::UnresolvedAlternative {
            group_id: "G-1".to_string(),
            reason: "未预选".to_string(),
        }
        .into();
        assert_eq!(api_err.code(), "UNRESOLVED_ALTERNATIVE");
        assert!(!api_err.is_retriable());

        let api_err: ApiError = EngineError::malformed("空替代料组").into();
        assert_eq!(api_err.code(), "MALFORMED_STRUCTURE");
    }

    #[test]
    fn test_validation_response_has_field() {
        let resp = ApiError::validation("lot_quantity", "必须大于 0").to_response();
        assert_eq!(resp.code, "VALIDATION_ERROR");
        assert_eq!(resp.field.as_deref(), Some("lot_quantity"));

        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("blocking_alerts").is_none());
    }
}
