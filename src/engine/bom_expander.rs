// ==========================================
// BOM 告警引擎 - BOM 展开器
// ==========================================
// 职责: 将多级工艺结构展开为有序构件需求行
// 输入: 工艺结构 + 展开模式 + 价格表
// 输出: TemplateBom (全部替代成员) / LotBom (仅预选成员，按批次放大)
// ==========================================

use crate::domain::bom::{
    ComponentRequirementLine, ExpandedBom, ExpansionMode, LotBom, PriceBook, TemplateBom,
    TemplateSlot,
};
use crate::domain::process::{
    ComponentUsage, ProcessStructure, StructureSlot, Subprocess, SubstituteGroup,
};
use crate::engine::error::{EngineError, EngineResult};
use std::collections::{HashMap, HashSet};

// ==========================================
// BomExpander - BOM 展开器
// ==========================================
// 红线: 无状态引擎,所有方法都是纯函数
pub struct BomExpander;

impl Default for BomExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl BomExpander {
    pub fn new() -> Self {
        Self
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 按模式展开工艺结构
    pub fn expand(
        &self,
        structure: &ProcessStructure,
        mode: ExpansionMode,
        prices: &PriceBook,
    ) -> EngineResult<ExpandedBom> {
        match mode {
            ExpansionMode::Template => self
                .expand_template(structure, prices)
                .map(ExpandedBom::Template),
            ExpansionMode::Lot { lot_quantity } => self
                .expand_lot(structure, lot_quantity, prices)
                .map(ExpandedBom::Lot),
        }
    }

    /// 模板展开（最坏成本估算用，不可用于库存校验）
    ///
    /// # 规则
    /// - 替代料组全部成员输出，不做预选
    /// - 需求量 = 单位用量
    pub fn expand_template(
        &self,
        structure: &ProcessStructure,
        prices: &PriceBook,
    ) -> EngineResult<TemplateBom> {
        let slots = collect_slots(structure)?;

        let template_slots = slots
            .into_iter()
            .map(|(subprocess_id, slot)| match slot {
                StructureSlot::Single(usage) => {
                    TemplateSlot::Single(build_line(subprocess_id, usage, None, 1.0, prices))
                }
                StructureSlot::Alternatives(group) => TemplateSlot::Alternatives {
                    group_id: group.group_id.clone(),
                    members: group
                        .members
                        .iter()
                        .map(|m| build_line(subprocess_id, m, Some(&group.group_id), 1.0, prices))
                        .collect(),
                },
            })
            .collect();

        Ok(TemplateBom {
            process_id: structure.process_id.clone(),
            process_version: structure.process_version,
            slots: template_slots,
        })
    }

    /// 批次展开（批次成本 / 库存校验用）
    ///
    /// # 规则
    /// - 每个替代料组必须已有且仅有一个预选成员
    /// - 同一构件出现在多个结构位时合并为一行（不重复计数）
    /// - 需求量 = 合计单位用量 × 批次数量
    pub fn expand_lot(
        &self,
        structure: &ProcessStructure,
        lot_quantity: f64,
        prices: &PriceBook,
    ) -> EngineResult<LotBom> {
        if !lot_quantity.is_finite() || lot_quantity <= 0.0 {
            return Err(EngineError::InvalidInput {
                field: "lot_quantity".to_string(),
                message: format!("批次数量必须为正数, 实际={}", lot_quantity),
            });
        }

        let slots = collect_slots(structure)?;

        let mut lines: Vec<ComponentRequirementLine> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (subprocess_id, slot) in slots {
            let line = match slot {
                StructureSlot::Single(usage) => build_line(subprocess_id, usage, None, 1.0, prices),
                StructureSlot::Alternatives(group) => {
                    let selected = resolve_selection(group)?;
                    build_line(subprocess_id, selected, Some(&group.group_id), 1.0, prices)
                }
            };

            match index.get(&line.component_id) {
                Some(&pos) => {
                    let existing = &mut lines[pos];
                    existing.quantity_per_unit += line.quantity_per_unit;
                    existing.is_alternative |= line.is_alternative;
                    if existing.substitute_group_id.is_none() {
                        existing.substitute_group_id = line.substitute_group_id;
                    }
                    if existing.resolved_unit_cost.is_none() {
                        existing.resolved_unit_cost = line.resolved_unit_cost;
                    }
                }
                None => {
                    index.insert(line.component_id.clone(), lines.len());
                    lines.push(line);
                }
            }
        }

        // 合并完成后统一放大，避免逐行累加误差
        for line in lines.iter_mut() {
            line.required_quantity = line.quantity_per_unit * lot_quantity;
        }

        tracing::debug!(
            process_id = %structure.process_id,
            lot_quantity,
            line_count = lines.len(),
            "批次展开完成"
        );

        Ok(LotBom {
            process_id: structure.process_id.clone(),
            process_version: structure.process_version,
            lot_quantity,
            lines,
        })
    }
}

// ==========================================
// 结构遍历与校验
// ==========================================

/// 深度优先收集结构位（先本级结构位，再下级子工序）
fn collect_slots(structure: &ProcessStructure) -> EngineResult<Vec<(&str, &StructureSlot)>> {
    let mut out = Vec::new();
    let mut subprocess_ids = HashSet::new();
    let mut group_ids = HashSet::new();

    visit(
        &structure.subprocesses,
        &mut subprocess_ids,
        &mut group_ids,
        &mut out,
    )?;

    if out.is_empty() {
        return Err(EngineError::malformed(format!(
            "工艺 {} 不含任何构件用量",
            structure.process_id
        )));
    }

    Ok(out)
}

fn visit<'a>(
    subprocesses: &'a [Subprocess],
    subprocess_ids: &mut HashSet<&'a str>,
    group_ids: &mut HashSet<&'a str>,
    out: &mut Vec<(&'a str, &'a StructureSlot)>,
) -> EngineResult<()> {
    for sub in subprocesses {
        if !subprocess_ids.insert(sub.subprocess_id.as_str()) {
            return Err(EngineError::malformed(format!(
                "子工序重复引用: {}",
                sub.subprocess_id
            )));
        }

        for slot in &sub.slots {
            match slot {
                StructureSlot::Single(usage) => validate_usage(usage)?,
                StructureSlot::Alternatives(group) => {
                    if !group_ids.insert(group.group_id.as_str()) {
                        return Err(EngineError::malformed(format!(
                            "替代料组重复: {}",
                            group.group_id
                        )));
                    }
                    validate_group(group)?;
                }
            }
            out.push((sub.subprocess_id.as_str(), slot));
        }

        visit(&sub.children, subprocess_ids, group_ids, out)?;
    }

    Ok(())
}

fn validate_usage(usage: &ComponentUsage) -> EngineResult<()> {
    if usage.component_id.trim().is_empty() {
        return Err(EngineError::malformed("构件ID为空"));
    }
    if !usage.quantity_per_unit.is_finite() || usage.quantity_per_unit <= 0.0 {
        return Err(EngineError::malformed(format!(
            "构件 {} 单位用量非法: {}",
            usage.component_id, usage.quantity_per_unit
        )));
    }
    Ok(())
}

fn validate_group(group: &SubstituteGroup) -> EngineResult<()> {
    if group.members.is_empty() {
        return Err(EngineError::malformed(format!(
            "替代料组 {} 无可选成员",
            group.group_id
        )));
    }
    if group.members.len() < 2 {
        return Err(EngineError::malformed(format!(
            "替代料组 {} 至少需要两个成员, 实际={}",
            group.group_id,
            group.members.len()
        )));
    }

    let mut seen = HashSet::new();
    for member in &group.members {
        validate_usage(member)?;
        if !seen.insert(member.component_id.as_str()) {
            return Err(EngineError::malformed(format!(
                "替代料组 {} 成员重复: {}",
                group.group_id, member.component_id
            )));
        }
    }
    Ok(())
}

/// 批次模式: 取预选成员
fn resolve_selection(group: &SubstituteGroup) -> EngineResult<&ComponentUsage> {
    let selected_id = group.selected_component_id.as_deref().ok_or_else(|| {
        EngineError::UnresolvedAlternative {
            group_id: group.group_id.clone(),
            reason: "批次配置未预选替代料".to_string(),
        }
    })?;

    group
        .selected_member()
        .ok_or_else(|| EngineError::UnresolvedAlternative {
            group_id: group.group_id.clone(),
            reason: format!("预选构件 {} 不是该组成员", selected_id),
        })
}

fn build_line(
    subprocess_id: &str,
    usage: &ComponentUsage,
    group_id: Option<&String>,
    factor: f64,
    prices: &PriceBook,
) -> ComponentRequirementLine {
    let resolved_unit_cost = usage
        .unit_cost_override
        .or_else(|| prices.get(&usage.component_id).copied());

    ComponentRequirementLine {
        component_id: usage.component_id.clone(),
        subprocess_id: subprocess_id.to_string(),
        quantity_per_unit: usage.quantity_per_unit,
        required_quantity: usage.quantity_per_unit * factor,
        resolved_unit_cost,
        substitute_group_id: group_id.cloned(),
        is_alternative: group_id.is_some(),
    }
}
