// ==========================================
// BOM 告警引擎 - 库存校验引擎
// ==========================================
// 职责: 批次需求 × 库存快照 × 告警规则 → 逐构件严重度
// 判定顺序（首条命中即返回）:
// 1. 库存 == 0 且 需求 > 0          → CRITICAL
// 2. 库存 < 需求                    → HIGH
// 3. 库存 < 需求 + 安全库存         → MEDIUM
// 4. 库存 < 再订货点                → LOW
// 5. 其他                           → OK
// ==========================================

use crate::domain::bom::LotBom;
use crate::domain::inventory::{AppliedRule, ComponentStockInput, SeverityClassification};
use crate::domain::types::Severity;
use std::collections::HashMap;

/// 按判定顺序给出严重度及原因
///
/// # 说明
/// - 负库存（账实差异）按零库存处理，保证库存增加时严重度单调不升
pub fn classify_severity(current_stock: f64, required_quantity: f64, rule: &AppliedRule) -> (Severity, String) {
    let safety = rule.safety_stock_quantity();
    let reorder = rule.reorder_point_quantity();

    if current_stock <= 0.0 && required_quantity > 0.0 {
        return (
            Severity::Critical,
            format!("零库存, 需求={}", required_quantity),
        );
    }
    if current_stock < required_quantity {
        return (
            Severity::High,
            format!("库存{} < 需求{}", current_stock, required_quantity),
        );
    }
    if current_stock < required_quantity + safety {
        return (
            Severity::Medium,
            format!(
                "库存{} < 需求{} + 安全库存{}",
                current_stock, required_quantity, safety
            ),
        );
    }
    if current_stock < reorder {
        return (
            Severity::Low,
            format!("库存{} < 再订货点{}", current_stock, reorder),
        );
    }

    (Severity::Ok, "库存充足".to_string())
}

/// 缺口 = max(0, 需求 - 库存)
pub fn shortfall(current_stock: f64, required_quantity: f64) -> f64 {
    (required_quantity - current_stock.max(0.0)).max(0.0)
}

// ==========================================
// InventoryValidator - 库存校验引擎
// ==========================================
// 红线: 无状态引擎；不修改库存
pub struct InventoryValidator;

impl Default for InventoryValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryValidator {
    pub fn new() -> Self {
        Self
    }

    /// 逐行判定严重度（含 OK 行，用于汇总完整性）
    ///
    /// # 参数
    /// - `bom`: 批次展开结果（每构件一行）
    /// - `stock`: 构件库存与规则；缺失构件按零库存 + 零阈值处理
    pub fn validate(
        &self,
        bom: &LotBom,
        stock: &HashMap<String, ComponentStockInput>,
    ) -> Vec<SeverityClassification> {
        bom.lines
            .iter()
            .map(|line| {
                let input = stock.get(&line.component_id).cloned().unwrap_or(ComponentStockInput {
                    current_stock: None,
                    rule: AppliedRule::Fallback,
                });
                let current_stock = input.current_stock.unwrap_or(0.0);

                if let AppliedRule::Configured(rule) = &input.rule {
                    if !rule.is_consistent() {
                        tracing::warn!(
                            component_id = %line.component_id,
                            safety_stock = rule.safety_stock_quantity,
                            reorder_point = rule.reorder_point_quantity,
                            "告警规则不满足 再订货点 > 安全库存 >= 0，按原值判定"
                        );
                    }
                }

                let (severity, mut reason) =
                    classify_severity(current_stock, line.required_quantity, &input.rule);
                if input.rule.is_fallback() {
                    reason.push_str("; 无告警规则, 安全库存/再订货点按 0 计");
                }
                if input.current_stock.is_none() {
                    reason.push_str("; 无库存记录, 按 0 计");
                }

                SeverityClassification {
                    component_id: line.component_id.clone(),
                    severity,
                    current_stock,
                    required_quantity: line.required_quantity,
                    shortfall: shortfall(current_stock, line.required_quantity),
                    safety_stock_quantity: input.rule.safety_stock_quantity(),
                    reorder_point_quantity: input.rule.reorder_point_quantity(),
                    rule_fallback: input.rule.is_fallback(),
                    reason,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bom::ComponentRequirementLine;
    use crate::domain::inventory::InventoryAlertRule;

    fn rule(safety: f64, reorder: f64) -> AppliedRule {
        AppliedRule::Configured(InventoryAlertRule {
            component_id: "C-1".to_string(),
            safety_stock_quantity: safety,
            reorder_point_quantity: reorder,
            alert_threshold_percentage: 20.0,
        })
    }

    fn create_test_bom(lines: &[(&str, f64)]) -> LotBom {
        LotBom {
            process_id: "P-1".to_string(),
            process_version: 1,
            lot_quantity: 1.0,
            lines: lines
                .iter()
                .map(|(id, qty)| ComponentRequirementLine {
                    component_id: id.to_string(),
                    subprocess_id: "SP-1".to_string(),
                    quantity_per_unit: *qty,
                    required_quantity: *qty,
                    resolved_unit_cost: None,
                    substitute_group_id: None,
                    is_alternative: false,
                })
                .collect(),
        }
    }

    #[test]
    fn test_scenario_a_zero_stock_is_critical() {
        let (severity, _) = classify_severity(0.0, 50.0, &rule(20.0, 60.0));
        assert_eq!(severity, Severity::Critical);
        assert_eq!(shortfall(0.0, 50.0), 50.0);
    }

    #[test]
    fn test_scenario_b_partial_stock_is_high() {
        let (severity, _) = classify_severity(40.0, 50.0, &rule(20.0, 60.0));
        assert_eq!(severity, Severity::High);
        assert_eq!(shortfall(40.0, 50.0), 10.0);
    }

    #[test]
    fn test_scenario_c_eats_into_safety_stock_is_medium() {
        let (severity, reason) = classify_severity(65.0, 50.0, &rule(20.0, 60.0));
        assert_eq!(severity, Severity::Medium);
        assert!(reason.contains("安全库存"));
        assert_eq!(shortfall(65.0, 50.0), 0.0);
    }

    #[test]
    fn test_below_reorder_point_is_low() {
        let (severity, _) = classify_severity(75.0, 50.0, &rule(20.0, 80.0));
        assert_eq!(severity, Severity::Low);

        let (severity, _) = classify_severity(80.0, 50.0, &rule(20.0, 80.0));
        assert_eq!(severity, Severity::Ok);
    }

    #[test]
    fn test_zero_requirement_with_zero_stock_is_not_critical() {
        let (severity, _) = classify_severity(0.0, 0.0, &AppliedRule::Fallback);
        assert_eq!(severity, Severity::Ok);
    }

    #[test]
    fn test_fallback_only_yields_critical_high_ok() {
        for stock in [0.0, 10.0, 49.0, 50.0, 51.0, 500.0] {
            let (severity, _) = classify_severity(stock, 50.0, &AppliedRule::Fallback);
            assert!(
                matches!(severity, Severity::Critical | Severity::High | Severity::Ok),
                "stock={} gave {:?}",
                stock,
                severity
            );
        }
    }

    #[test]
    fn test_more_stock_never_raises_severity() {
        let applied = rule(20.0, 90.0);
        let mut previous = Severity::Critical;
        let mut stock = -10.0;
        while stock <= 120.0 {
            let (severity, _) = classify_severity(stock, 50.0, &applied);
            assert!(severity.rank() <= previous.rank(), "stock={} raised severity", stock);
            previous = severity;
            stock += 0.5;
        }
        assert_eq!(previous, Severity::Ok);
    }

    #[test]
    fn test_validate_includes_ok_lines_and_marks_fallback() {
        let bom = create_test_bom(&[("C-1", 50.0), ("C-2", 5.0), ("C-3", 1.0)]);
        let mut stock = HashMap::new();
        stock.insert(
            "C-1".to_string(),
            ComponentStockInput {
                current_stock: Some(40.0),
                rule: rule(20.0, 60.0),
            },
        );
        stock.insert(
            "C-2".to_string(),
            ComponentStockInput {
                current_stock: Some(100.0),
                rule: AppliedRule::Fallback,
            },
        );

        let result = InventoryValidator::new().validate(&bom, &stock);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].severity, Severity::High);
        assert_eq!(result[0].shortfall, 10.0);
        assert_eq!(result[1].severity, Severity::Ok);
        assert!(result[1].rule_fallback);
        // 无库存记录 → 零库存
        assert_eq!(result[2].severity, Severity::Critical);
        assert!(result[2].reason.contains("无库存记录"));
    }

    #[test]
    fn test_validate_is_deterministic() {
        let bom = create_test_bom(&[("C-1", 50.0), ("C-2", 5.0)]);
        let mut stock = HashMap::new();
        stock.insert(
            "C-1".to_string(),
            ComponentStockInput {
                current_stock: Some(65.0),
                rule: rule(20.0, 60.0),
            },
        );

        let validator = InventoryValidator::new();
        assert_eq!(validator.validate(&bom, &stock), validator.validate(&bom, &stock));
    }
}
