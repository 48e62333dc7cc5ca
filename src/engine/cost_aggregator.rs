// ==========================================
// BOM 告警引擎 - 成本汇总引擎
// ==========================================
// 职责: 模板最坏成本 / 批次成本汇总
// 规则:
// - 非替代行: 单位用量 × 单价 累加
// - 替代料组: 取组内扩展成本最大者（最坏情况），成员不相加
// - 无定价行: 计 0 并登记到 costing_gaps，不视为免费
// - 全精度累加，末尾一次性舍入到两位小数
// ==========================================

use crate::domain::bom::{
    ComponentRequirementLine, CostRollup, LineCost, LotBom, LotCostRollup, TemplateBom,
    TemplateSlot,
};
use crate::engine::error::{EngineError, EngineResult};
use rust_decimal::{Decimal, RoundingStrategy};

/// 金额小数位
pub const COST_SCALE: u32 = 2;

/// 金额舍入（四舍五入，远离零）
pub fn round_cost(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(COST_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// 数量 × 单价（未舍入）
pub fn extended_cost(quantity: f64, unit_cost: Option<Decimal>) -> EngineResult<Option<Decimal>> {
    let Some(unit_cost) = unit_cost else {
        return Ok(None);
    };
    let qty = Decimal::try_from(quantity)
        .map_err(|e| EngineError::CostConversion(format!("quantity={}: {}", quantity, e)))?;
    qty.checked_mul(unit_cost).map(Some).ok_or_else(|| {
        EngineError::CostConversion(format!(
            "金额溢出: quantity={} × unit_cost={}",
            quantity, unit_cost
        ))
    })
}

/// 金额累加（溢出返回错误）
pub fn add_cost(total: Decimal, cost: Decimal) -> EngineResult<Decimal> {
    total
        .checked_add(cost)
        .ok_or_else(|| EngineError::CostConversion(format!("金额合计溢出: {} + {}", total, cost)))
}

// ==========================================
// CostAggregator - 成本汇总引擎
// ==========================================
pub struct CostAggregator;

impl Default for CostAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl CostAggregator {
    pub fn new() -> Self {
        Self
    }

    /// 模板最坏成本汇总
    pub fn aggregate_template(&self, bom: &TemplateBom) -> EngineResult<CostRollup> {
        let mut total = Decimal::ZERO;
        let mut gaps = GapList::default();
        let mut line_costs = Vec::new();

        for slot in &bom.slots {
            match slot {
                TemplateSlot::Single(line) => {
                    let cost = extended_cost(line.quantity_per_unit, line.resolved_unit_cost)?;
                    match cost {
                        Some(c) => total = add_cost(total, c)?,
                        None => gaps.push(&line.component_id),
                    }
                    line_costs.push(line_cost(line, cost, cost.is_some()));
                }
                TemplateSlot::Alternatives { group_id, members } => {
                    let costs = members
                        .iter()
                        .map(|m| extended_cost(m.quantity_per_unit, m.resolved_unit_cost))
                        .collect::<EngineResult<Vec<_>>>()?;

                    // 并列最大时取靠前成员
                    let mut worst: Option<(usize, Decimal)> = None;
                    for (i, cost) in costs.iter().enumerate() {
                        if let Some(c) = cost {
                            if worst.map(|(_, w)| *c > w).unwrap_or(true) {
                                worst = Some((i, *c));
                            }
                        }
                    }

                    for (i, (member, cost)) in members.iter().zip(costs.iter()).enumerate() {
                        if cost.is_none() {
                            gaps.push(&member.component_id);
                        }
                        let counted = worst.map(|(w, _)| w == i).unwrap_or(false);
                        line_costs.push(line_cost(member, *cost, counted));
                    }

                    if let Some((_, c)) = worst {
                        total = add_cost(total, c)?;
                    } else {
                        tracing::warn!(group_id = %group_id, "替代料组全部成员无定价，按 0 计入");
                    }
                }
            }
        }

        Ok(CostRollup {
            total_cost: round_cost(total),
            costing_gaps: gaps.into_inner(),
            line_costs,
        })
    }

    /// 批次成本汇总（按预选成员）
    pub fn aggregate_lot(&self, bom: &LotBom) -> EngineResult<LotCostRollup> {
        let mut lot_total = Decimal::ZERO;
        let mut per_unit = Decimal::ZERO;
        let mut gaps = GapList::default();

        for line in &bom.lines {
            match line.resolved_unit_cost {
                Some(_) => {
                    let line_total = extended_cost(line.required_quantity, line.resolved_unit_cost)?
                        .unwrap_or(Decimal::ZERO);
                    let line_per_unit = extended_cost(line.quantity_per_unit, line.resolved_unit_cost)?
                        .unwrap_or(Decimal::ZERO);
                    lot_total = add_cost(lot_total, line_total)?;
                    per_unit = add_cost(per_unit, line_per_unit)?;
                }
                None => gaps.push(&line.component_id),
            }
        }

        Ok(LotCostRollup {
            lot_total: round_cost(lot_total),
            per_unit_cost: round_cost(per_unit),
            costing_gaps: gaps.into_inner(),
        })
    }
}

fn line_cost(line: &ComponentRequirementLine, cost: Option<Decimal>, counted: bool) -> LineCost {
    LineCost {
        component_id: line.component_id.clone(),
        substitute_group_id: line.substitute_group_id.clone(),
        extended_cost: cost,
        counted,
    }
}

/// 去重且保序的无定价构件列表
#[derive(Default)]
struct GapList(Vec<String>);

impl GapList {
    fn push(&mut self, component_id: &str) {
        if !self.0.iter().any(|c| c == component_id) {
            self.0.push(component_id.to_string());
        }
    }

    fn into_inner(self) -> Vec<String> {
        self.0
    }
}
