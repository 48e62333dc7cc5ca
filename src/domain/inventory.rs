// ==========================================
// BOM 告警引擎 - 库存告警领域模型
// ==========================================
// 职责: 告警规则 / 库存快照 / 严重度判定结果 / 告警记录 / 告警汇总
// ==========================================

use crate::domain::types::{Severity, UserAction};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// InventoryAlertRule - 库存告警规则
// ==========================================
// 外部维护，本引擎只读
// 约束: reorder_point_quantity > safety_stock_quantity >= 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAlertRule {
    pub component_id: String,
    pub safety_stock_quantity: f64,   // 安全库存
    pub reorder_point_quantity: f64,  // 再订货点
    pub alert_threshold_percentage: f64, // 告警阈值百分比（展示用）
}

impl InventoryAlertRule {
    /// 规则自身是否满足约束
    pub fn is_consistent(&self) -> bool {
        self.safety_stock_quantity >= 0.0
            && self.reorder_point_quantity > self.safety_stock_quantity
    }
}

// ==========================================
// AppliedRule - 实际生效的规则
// ==========================================
// 无规则时显式降级为零阈值（只会产生 CRITICAL / HIGH / OK）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppliedRule {
    Configured(InventoryAlertRule),
    Fallback,
}

impl AppliedRule {
    pub fn from_option(rule: Option<InventoryAlertRule>) -> Self {
        match rule {
            Some(rule) => AppliedRule::Configured(rule),
            None => AppliedRule::Fallback,
        }
    }

    pub fn safety_stock_quantity(&self) -> f64 {
        match self {
            AppliedRule::Configured(rule) => rule.safety_stock_quantity,
            AppliedRule::Fallback => 0.0,
        }
    }

    pub fn reorder_point_quantity(&self) -> f64 {
        match self {
            AppliedRule::Configured(rule) => rule.reorder_point_quantity,
            AppliedRule::Fallback => 0.0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, AppliedRule::Fallback)
    }
}

// ==========================================
// ComponentStockInput - 单构件校验输入
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentStockInput {
    pub current_stock: Option<f64>, // None = 无库存记录
    pub rule: AppliedRule,
}

// ==========================================
// SeverityClassification - 严重度判定结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityClassification {
    pub component_id: String,
    pub severity: Severity,
    pub current_stock: f64,
    pub required_quantity: f64,
    pub shortfall: f64,                 // max(0, 需求 - 库存)
    pub safety_stock_quantity: f64,
    pub reorder_point_quantity: f64,
    pub rule_fallback: bool,            // 是否使用了零阈值降级
    pub reason: String,                 // 判定原因（可解释性）
}

// ==========================================
// InventoryAlert - 库存告警记录
// ==========================================
// 每个 (批次, 构件, 校验轮次) 一条；仅确认操作可修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAlert {
    pub alert_id: String,
    pub lot_id: String,
    pub component_id: String,
    pub validation_cycle: i32,
    pub severity: Severity,
    pub current_stock: f64,
    pub required_quantity: f64,
    pub shortfall: f64,
    pub suggested_procurement_qty: f64,
    pub reason: String,

    // ===== 确认信息 =====
    pub acknowledged: bool,
    pub user_action: Option<UserAction>,
    pub notes: Option<String>,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<NaiveDateTime>,

    pub created_at: NaiveDateTime,
}

impl InventoryAlert {
    /// 未确认的 CRITICAL 告警阻断下达
    pub fn is_blocking(&self) -> bool {
        !self.acknowledged && self.severity == Severity::Critical
    }

    /// 已确认且动作为 DELAY
    pub fn is_on_hold(&self) -> bool {
        self.acknowledged && self.user_action.map(|a| a.holds_lot()).unwrap_or(false)
    }
}

// ==========================================
// SeverityCounts / AlertSummary - 告警汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    #[serde(rename = "CRITICAL")]
    pub critical: usize,
    #[serde(rename = "HIGH")]
    pub high: usize,
    #[serde(rename = "MEDIUM")]
    pub medium: usize,
    #[serde(rename = "LOW")]
    pub low: usize,
    #[serde(rename = "OK")]
    pub ok: usize,
}

impl SeverityCounts {
    pub fn increment(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Ok => self.ok += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Ok => self.ok,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.ok
    }
}

/// 批次告警汇总（批次状态的投影依据）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub by_severity: SeverityCounts,
    pub total: usize,
    pub acknowledged: usize,
    pub unacknowledged_critical: usize,
    pub unacknowledged_high: usize,
    pub on_hold: bool,
    pub validation_cycle: i32,
}
