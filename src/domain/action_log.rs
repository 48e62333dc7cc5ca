// ==========================================
// BOM 告警引擎 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪（建批次 / 重新校验 / 确认 / 下达 / 采购状态变更）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub lot_id: Option<String>,     // 关联批次 (采购状态变更等可为 None)
    pub action_type: String,        // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateLot,
    Recheck,
    Acknowledge,
    AcknowledgeBulk,
    Finalize,
    RecommendationStatusChange,
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateLot => "CreateLot",
            ActionType::Recheck => "Recheck",
            ActionType::Acknowledge => "Acknowledge",
            ActionType::AcknowledgeBulk => "AcknowledgeBulk",
            ActionType::Finalize => "Finalize",
            ActionType::RecommendationStatusChange => "RecommendationStatusChange",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CreateLot" => Some(ActionType::CreateLot),
            "Recheck" => Some(ActionType::Recheck),
            "Acknowledge" => Some(ActionType::Acknowledge),
            "AcknowledgeBulk" => Some(ActionType::AcknowledgeBulk),
            "Finalize" => Some(ActionType::Finalize),
            "RecommendationStatusChange" => Some(ActionType::RecommendationStatusChange),
            _ => None,
        }
    }
}

impl ActionLog {
    /// 创建新的操作日志
    ///
    /// # 参数
    /// - `lot_id`: 关联批次ID (可选)
    /// - `action_type`: 操作类型
    /// - `actor`: 操作人
    pub fn new(lot_id: Option<String>, action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            lot_id,
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_type_round_trip() {
        for t in [
            ActionType::CreateLot,
            ActionType::Recheck,
            ActionType::Acknowledge,
            ActionType::AcknowledgeBulk,
            ActionType::Finalize,
            ActionType::RecommendationStatusChange,
        ] {
            assert_eq!(ActionType::from_str(t.as_str()), Some(t));
        }
    }

    #[test]
    fn test_builder_sets_payload() {
        let log = ActionLog::new(Some("LOT-1".to_string()), ActionType::Finalize, "planner")
            .with_payload(&json!({"status": "FINALIZED"}))
            .with_detail("批次下达");

        assert_eq!(log.action_type, "Finalize");
        assert_eq!(log.payload_json.unwrap()["status"], "FINALIZED");
        assert_eq!(log.detail.as_deref(), Some("批次下达"));
    }
}
