// ==========================================
// BOM 告警引擎 - 领域类型定义
// ==========================================
// 职责: 严重度 / 用户动作 / 批次状态 / 采购建议状态等枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 缺料严重度 (Severity)
// ==========================================
// 顺序: Ok < Low < Medium < High < Critical
// 红线: 等级制,不是评分制
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Ok,       // 充足
    Low,      // 低于再订货点
    Medium,   // 侵占安全库存
    High,     // 库存不足
    Critical, // 零库存
}

impl Severity {
    /// 全部严重度（由高到低，用于汇总展示）
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Ok,
    ];

    /// 严重度排名 (OK=0 ... CRITICAL=4)
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Ok => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    /// 是否需要生成采购建议 (HIGH / CRITICAL)
    pub fn requires_procurement(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// 从字符串解析 (数据库存储格式)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "OK" => Some(Severity::Ok),
            "LOW" => Some(Severity::Low),
            "MEDIUM" => Some(Severity::Medium),
            "HIGH" => Some(Severity::High),
            "CRITICAL" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 用户确认动作 (User Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserAction {
    Proceed,        // 照常生产
    Delay,          // 延期（批次挂起）
    Substitute,     // 改用替代料
    PartialFulfill, // 部分齐套生产
}

impl UserAction {
    /// 确认后是否使批次进入挂起
    pub fn holds_lot(&self) -> bool {
        matches!(self, UserAction::Delay)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserAction::Proceed => "PROCEED",
            UserAction::Delay => "DELAY",
            UserAction::Substitute => "SUBSTITUTE",
            UserAction::PartialFulfill => "PARTIAL_FULFILL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PROCEED" => Some(UserAction::Proceed),
            "DELAY" => Some(UserAction::Delay),
            "SUBSTITUTE" => Some(UserAction::Substitute),
            "PARTIAL_FULFILL" => Some(UserAction::PartialFulfill),
            _ => None,
        }
    }
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 批次状态 (Lot Status)
// ==========================================
// 由当前告警全集重算得到，FINALIZED 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotStatus {
    Ready,                      // 可投产
    PartialFulfillmentRequired, // 需部分齐套
    PendingProcurement,         // 待采购
    OnHold,                     // 挂起
    Finalized,                  // 已下达
}

impl LotStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LotStatus::Finalized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Ready => "READY",
            LotStatus::PartialFulfillmentRequired => "PARTIAL_FULFILLMENT_REQUIRED",
            LotStatus::PendingProcurement => "PENDING_PROCUREMENT",
            LotStatus::OnHold => "ON_HOLD",
            LotStatus::Finalized => "FINALIZED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "READY" => Some(LotStatus::Ready),
            "PARTIAL_FULFILLMENT_REQUIRED" => Some(LotStatus::PartialFulfillmentRequired),
            "PENDING_PROCUREMENT" => Some(LotStatus::PendingProcurement),
            "ON_HOLD" => Some(LotStatus::OnHold),
            "FINALIZED" => Some(LotStatus::Finalized),
            _ => None,
        }
    }
}

impl fmt::Display for LotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 采购建议状态 (Recommendation Status)
// ==========================================
// 本引擎只负责写入 RECOMMENDED，其余迁移由采购单联动驱动
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationStatus {
    Recommended,
    Ordered,
    Received,
    Partial,
    Cancelled,
}

impl RecommendationStatus {
    /// 状态迁移表
    ///
    /// # 规则
    /// - RECOMMENDED → ORDERED | CANCELLED
    /// - ORDERED → PARTIAL | RECEIVED | CANCELLED
    /// - PARTIAL → RECEIVED | CANCELLED
    /// - RECEIVED / CANCELLED 为终态
    pub fn can_transition_to(&self, next: RecommendationStatus) -> bool {
        use RecommendationStatus::*;
        matches!(
            (self, next),
            (Recommended, Ordered)
                | (Recommended, Cancelled)
                | (Ordered, Partial)
                | (Ordered, Received)
                | (Ordered, Cancelled)
                | (Partial, Received)
                | (Partial, Cancelled)
        )
    }

    /// 重新校验时是否允许刷新数量/交期
    pub fn is_refreshable(&self) -> bool {
        matches!(
            self,
            RecommendationStatus::Recommended | RecommendationStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Recommended => "RECOMMENDED",
            RecommendationStatus::Ordered => "ORDERED",
            RecommendationStatus::Received => "RECEIVED",
            RecommendationStatus::Partial => "PARTIAL",
            RecommendationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "RECOMMENDED" => Some(RecommendationStatus::Recommended),
            "ORDERED" => Some(RecommendationStatus::Ordered),
            "RECEIVED" => Some(RecommendationStatus::Received),
            "PARTIAL" => Some(RecommendationStatus::Partial),
            "CANCELLED" => Some(RecommendationStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 重新校验策略 (Recheck Policy)
// ==========================================
// 手动重新校验时，上一轮已确认的告警如何处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecheckPolicy {
    /// 每次重新校验清空全部确认
    ResetAll,
    /// 严重度未变化的构件沿用上一轮确认
    PreserveUnchanged,
}

impl RecheckPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecheckPolicy::ResetAll => "RESET_ALL",
            RecheckPolicy::PreserveUnchanged => "PRESERVE_UNCHANGED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "RESET_ALL" => Some(RecheckPolicy::ResetAll),
            "PRESERVE_UNCHANGED" => Some(RecheckPolicy::PreserveUnchanged),
            _ => None,
        }
    }
}

impl Default for RecheckPolicy {
    fn default() -> Self {
        RecheckPolicy::ResetAll
    }
}

impl fmt::Display for RecheckPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order_matches_rank() {
        assert!(Severity::Ok < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);

        for pair in Severity::ALL.windows(2) {
            assert!(pair[0].rank() > pair[1].rank());
        }
    }

    #[test]
    fn test_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&UserAction::PartialFulfill).unwrap();
        assert_eq!(json, "\"PARTIAL_FULFILL\"");

        let status: LotStatus = serde_json::from_str("\"PENDING_PROCUREMENT\"").unwrap();
        assert_eq!(status, LotStatus::PendingProcurement);

        assert_eq!(serde_json::to_string(&Severity::Ok).unwrap(), "\"OK\"");
    }

    #[test]
    fn test_recommendation_transitions() {
        use RecommendationStatus::*;
        assert!(Recommended.can_transition_to(Ordered));
        assert!(Ordered.can_transition_to(Partial));
        assert!(Partial.can_transition_to(Received));
        assert!(!Received.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Recommended));
        assert!(!Recommended.can_transition_to(Received));
    }

    #[test]
    fn test_from_str_round_trip_for_storage() {
        assert_eq!(LotStatus::from_str("on_hold"), Some(LotStatus::OnHold));
        assert_eq!(UserAction::from_str("unknown"), None);
        assert_eq!(
            RecheckPolicy::from_str("preserve_unchanged"),
            Some(RecheckPolicy::PreserveUnchanged)
        );
    }
}
