// ==========================================
// BOM 告警引擎 - 工艺结构领域模型
// ==========================================
// 职责: 多级工艺定义（子工序 / 构件用量 / 替代料组）
// 说明: 结构由上游校验后传入，本引擎只读
// ==========================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// ProcessStructure - 工艺结构
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessStructure {
    pub process_id: String,          // 工艺ID
    pub process_version: i32,        // 工艺版本
    pub name: String,                // 工艺名称
    pub subprocesses: Vec<Subprocess>, // 有序子工序
}

// ==========================================
// Subprocess - 子工序（可嵌套）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subprocess {
    pub subprocess_id: String,
    pub name: String,
    pub slots: Vec<StructureSlot>, // 结构位（有序）
    #[serde(default)]
    pub children: Vec<Subprocess>, // 下级子工序
}

// ==========================================
// StructureSlot - 结构位
// ==========================================
// 单一构件 或 一组互斥替代料（OR 组）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructureSlot {
    Single(ComponentUsage),
    Alternatives(SubstituteGroup),
}

// ==========================================
// ComponentUsage - 构件用量
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentUsage {
    pub component_id: String,
    pub quantity_per_unit: f64,            // 单位产品用量
    #[serde(default)]
    pub unit_cost_override: Option<Decimal>, // 工艺内指定单价（优先于价格表）
}

impl ComponentUsage {
    pub fn new(component_id: &str, quantity_per_unit: f64) -> Self {
        Self {
            component_id: component_id.to_string(),
            quantity_per_unit,
            unit_cost_override: None,
        }
    }
}

// ==========================================
// SubstituteGroup - 替代料组
// ==========================================
// 约束: 至少两个成员；批次模式下必须且仅能预选一个成员
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstituteGroup {
    pub group_id: String,
    pub name: String,
    pub members: Vec<ComponentUsage>,
    #[serde(default)]
    pub selected_component_id: Option<String>, // 批次配置预选的成员
}

impl SubstituteGroup {
    /// 查找预选成员
    pub fn selected_member(&self) -> Option<&ComponentUsage> {
        let selected = self.selected_component_id.as_deref()?;
        self.members.iter().find(|m| m.component_id == selected)
    }
}

impl ProcessStructure {
    /// 结构中出现的全部构件（含替代料组全部成员，去重保序）
    pub fn component_ids(&self) -> Vec<String> {
        fn visit(subs: &[Subprocess], out: &mut Vec<String>) {
            for sub in subs {
                for slot in &sub.slots {
                    let usages: &[ComponentUsage] = match slot {
                        StructureSlot::Single(usage) => std::slice::from_ref(usage),
                        StructureSlot::Alternatives(group) => &group.members,
                    };
                    for usage in usages {
                        if !out.contains(&usage.component_id) {
                            out.push(usage.component_id.clone());
                        }
                    }
                }
                visit(&sub.children, out);
            }
        }

        let mut out = Vec::new();
        visit(&self.subprocesses, &mut out);
        out
    }

    /// 为指定替代料组设置预选成员（批次配置用）
    ///
    /// # 返回
    /// - true: 找到该组并已设置
    /// - false: 结构中不存在该组
    pub fn select_alternative(&mut self, group_id: &str, component_id: &str) -> bool {
        fn visit(subs: &mut [Subprocess], group_id: &str, component_id: &str) -> bool {
            for sub in subs.iter_mut() {
                for slot in sub.slots.iter_mut() {
                    if let StructureSlot::Alternatives(group) = slot {
                        if group.group_id == group_id {
                            group.selected_component_id = Some(component_id.to_string());
                            return true;
                        }
                    }
                }
                if visit(&mut sub.children, group_id, component_id) {
                    return true;
                }
            }
            false
        }

        visit(&mut self.subprocesses, group_id, component_id)
    }
}
