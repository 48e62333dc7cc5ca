// ==========================================
// BOM 告警引擎 - 告警构建器
// ==========================================
// 职责: 严重度判定结果 → 新一轮告警记录
// 重新校验策略:
// - RESET_ALL: 新一轮告警全部未确认
// - PRESERVE_UNCHANGED: 同构件且严重度未变的上一轮确认沿用到新告警
// ==========================================

use crate::domain::inventory::{InventoryAlert, SeverityClassification};
use crate::domain::types::RecheckPolicy;
use crate::engine::procurement::recommended_quantity;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use uuid::Uuid;

/// 告警构建参数
#[derive(Debug, Clone)]
pub struct AlertBuildParams {
    pub lot_id: String,
    pub validation_cycle: i32,
    pub policy: RecheckPolicy,
    pub include_safety_buffer: bool,
    pub now: NaiveDateTime,
}

/// 告警构建结果
#[derive(Debug, Clone)]
pub struct BuiltAlerts {
    pub alerts: Vec<InventoryAlert>,
    pub carried_acknowledgments: usize,
}

pub struct AlertBuilder;

impl Default for AlertBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertBuilder {
    pub fn new() -> Self {
        Self
    }

    /// 构建新一轮告警
    ///
    /// # 参数
    /// - `classifications`: 本轮判定结果（每构件一条）
    /// - `previous`: 上一轮告警（首次校验传空）
    pub fn build(
        &self,
        classifications: &[SeverityClassification],
        previous: &[InventoryAlert],
        params: &AlertBuildParams,
    ) -> BuiltAlerts {
        let previous_by_component: HashMap<&str, &InventoryAlert> = previous
            .iter()
            .map(|a| (a.component_id.as_str(), a))
            .collect();

        let mut carried = 0;
        let alerts = classifications
            .iter()
            .map(|c| {
                let suggested = if c.severity.requires_procurement() {
                    recommended_quantity(c, params.include_safety_buffer)
                } else {
                    0.0
                };

                let mut alert = InventoryAlert {
                    alert_id: Uuid::new_v4().to_string(),
                    lot_id: params.lot_id.clone(),
                    component_id: c.component_id.clone(),
                    validation_cycle: params.validation_cycle,
                    severity: c.severity,
                    current_stock: c.current_stock,
                    required_quantity: c.required_quantity,
                    shortfall: c.shortfall,
                    suggested_procurement_qty: suggested,
                    reason: c.reason.clone(),
                    acknowledged: false,
                    user_action: None,
                    notes: None,
                    acknowledged_by: None,
                    acknowledged_at: None,
                    created_at: params.now,
                };

                if params.policy == RecheckPolicy::PreserveUnchanged {
                    if let Some(prev) = previous_by_component.get(c.component_id.as_str()) {
                        if prev.acknowledged && prev.severity == c.severity {
                            alert.acknowledged = true;
                            alert.user_action = prev.user_action;
                            alert.notes = prev.notes.clone();
                            alert.acknowledged_by = prev.acknowledged_by.clone();
                            alert.acknowledged_at = prev.acknowledged_at;
                            carried += 1;
                        }
                    }
                }

                alert
            })
            .collect();

        BuiltAlerts {
            alerts,
            carried_acknowledgments: carried,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Severity, UserAction};
    use chrono::Utc;

    fn classification(component_id: &str, severity: Severity) -> SeverityClassification {
        SeverityClassification {
            component_id: component_id.to_string(),
            severity,
            current_stock: 40.0,
            required_quantity: 50.0,
            shortfall: 10.0,
            safety_stock_quantity: 20.0,
            reorder_point_quantity: 60.0,
            rule_fallback: false,
            reason: "r".to_string(),
        }
    }

    fn params(policy: RecheckPolicy, cycle: i32) -> AlertBuildParams {
        AlertBuildParams {
            lot_id: "LOT-1".to_string(),
            validation_cycle: cycle,
            policy,
            include_safety_buffer: true,
            now: Utc::now().naive_utc(),
        }
    }

    fn acknowledged_previous(builder: &AlertBuilder) -> Vec<InventoryAlert> {
        let mut prev = builder
            .build(
                &[
                    classification("C-1", Severity::High),
                    classification("C-2", Severity::Critical),
                ],
                &[],
                &params(RecheckPolicy::ResetAll, 1),
            )
            .alerts;
        for a in prev.iter_mut() {
            a.acknowledged = true;
            a.user_action = Some(UserAction::Proceed);
            a.acknowledged_by = Some("planner".to_string());
        }
        prev
    }

    #[test]
    fn test_suggested_quantity_only_for_shortages() {
        let built = AlertBuilder::new().build(
            &[
                classification("C-1", Severity::High),
                classification("C-2", Severity::Medium),
            ],
            &[],
            &params(RecheckPolicy::ResetAll, 1),
        );
        assert_eq!(built.alerts[0].suggested_procurement_qty, 30.0);
        assert_eq!(built.alerts[1].suggested_procurement_qty, 0.0);
        assert!(built.alerts.iter().all(|a| !a.acknowledged));
    }

    #[test]
    fn test_reset_all_drops_previous_acknowledgments() {
        let builder = AlertBuilder::new();
        let prev = acknowledged_previous(&builder);

        let built = builder.build(
            &[
                classification("C-1", Severity::High),
                classification("C-2", Severity::Critical),
            ],
            &prev,
            &params(RecheckPolicy::ResetAll, 2),
        );
        assert_eq!(built.carried_acknowledgments, 0);
        assert!(built.alerts.iter().all(|a| !a.acknowledged));
    }

    #[test]
    fn test_preserve_unchanged_carries_same_severity_only() {
        let builder = AlertBuilder::new();
        let prev = acknowledged_previous(&builder);

        let built = builder.build(
            &[
                classification("C-1", Severity::High),
                classification("C-2", Severity::High),
            ],
            &prev,
            &params(RecheckPolicy::PreserveUnchanged, 2),
        );
        assert_eq!(built.carried_acknowledgments, 1);
        assert!(built.alerts[0].acknowledged);
        assert_eq!(built.alerts[0].user_action, Some(UserAction::Proceed));
        assert_eq!(built.alerts[0].acknowledged_by.as_deref(), Some("planner"));
        assert_eq!(built.alerts[0].validation_cycle, 2);
        assert_ne!(built.alerts[0].alert_id, prev[0].alert_id);
        // 严重度变化 → 需重新确认
        assert!(!built.alerts[1].acknowledged);
    }
}
