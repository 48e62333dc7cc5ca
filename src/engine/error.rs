// ==========================================
// BOM 告警引擎 - 引擎层错误类型
// ==========================================
// 说明: 结构类错误均不可重试（上游数据问题，非瞬时故障）
// ==========================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// 工艺结构损坏（如替代料组无可选成员）
    #[error("工艺结构错误: {reason}")]
    MalformedStructure { reason: String },

    /// 批次模式下替代料组未预选或预选无效
    #[error("替代料未确定: group_id={group_id}, {reason}")]
    UnresolvedAlternative { group_id: String, reason: String },

    /// 输入数值非法
    #[error("输入无效 (field={field}): {message}")]
    InvalidInput { field: String, message: String },

    /// 数量无法转换为金额精度
    #[error("金额换算失败: {0}")]
    CostConversion(String),
}

impl EngineError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        EngineError::MalformedStructure {
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
