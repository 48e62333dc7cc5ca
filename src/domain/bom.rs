// ==========================================
// BOM 告警引擎 - 展开结果领域模型
// ==========================================
// 职责: BOM 展开器输出（模板展开 / 批次展开）与成本汇总结果
// 说明: 模板展开保留替代料组的全部成员，批次展开只含预选成员，
//       二者在类型上区分，不依赖运行时空值判断
// ==========================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 构件单价表 (component_id -> unit_cost)，缺失即无定价
pub type PriceBook = HashMap<String, Decimal>;

// ==========================================
// ComponentRequirementLine - 构件需求行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRequirementLine {
    pub component_id: String,
    pub subprocess_id: String,                  // 首次出现的子工序
    pub quantity_per_unit: f64,                 // 单位产品用量
    pub required_quantity: f64,                 // 需求量 (模板模式 = 单位用量)
    pub resolved_unit_cost: Option<Decimal>,    // 单价（无定价为 None）
    pub substitute_group_id: Option<String>,    // 所属替代料组
    pub is_alternative: bool,                   // 是否来自替代料组
}

// ==========================================
// TemplateSlot / TemplateBom - 模板展开
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateSlot {
    Single(ComponentRequirementLine),
    Alternatives {
        group_id: String,
        members: Vec<ComponentRequirementLine>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateBom {
    pub process_id: String,
    pub process_version: i32,
    pub slots: Vec<TemplateSlot>,
}

impl TemplateBom {
    /// 按顺序平铺全部需求行（含替代料组全部成员）
    pub fn lines(&self) -> Vec<&ComponentRequirementLine> {
        self.slots
            .iter()
            .flat_map(|slot| match slot {
                TemplateSlot::Single(line) => std::slice::from_ref(line).iter(),
                TemplateSlot::Alternatives { members, .. } => members.iter(),
            })
            .collect()
    }
}

// ==========================================
// LotBom - 批次展开
// ==========================================
// 每个构件一行，数量已按批次数量放大
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotBom {
    pub process_id: String,
    pub process_version: i32,
    pub lot_quantity: f64,
    pub lines: Vec<ComponentRequirementLine>,
}

impl LotBom {
    pub fn component_ids(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.component_id.clone()).collect()
    }

    pub fn find_line(&self, component_id: &str) -> Option<&ComponentRequirementLine> {
        self.lines.iter().find(|l| l.component_id == component_id)
    }
}

// ==========================================
// ExpandedBom - 按模式返回的展开结果
// ==========================================
#[derive(Debug, Clone)]
pub enum ExpandedBom {
    Template(TemplateBom),
    Lot(LotBom),
}

// ==========================================
// ExpansionMode - 展开模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpansionMode {
    /// 模板成本估算: 替代料组全部成员输出
    Template,
    /// 批次: 只输出预选成员，数量 = 单位用量 × 批次数量
    Lot { lot_quantity: f64 },
}

// ==========================================
// 成本汇总结果
// ==========================================

/// 单行成本明细（可解释性）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineCost {
    pub component_id: String,
    pub substitute_group_id: Option<String>,
    pub extended_cost: Option<Decimal>, // 未舍入的扩展成本
    pub counted: bool,                  // 是否计入总额（组内只计最大值成员）
}

/// 模板最坏成本汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRollup {
    pub total_cost: Decimal,         // 两位小数（仅在汇总末尾舍入一次）
    pub costing_gaps: Vec<String>,   // 无定价构件
    pub line_costs: Vec<LineCost>,
}

/// 批次成本汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotCostRollup {
    pub lot_total: Decimal,          // 批次总成本
    pub per_unit_cost: Decimal,      // 单位产品成本
    pub costing_gaps: Vec<String>,
}
