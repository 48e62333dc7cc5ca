// ==========================================
// BOM 告警引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod bom;
pub mod inventory;
pub mod lot;
pub mod process;
pub mod procurement;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use bom::{
    ComponentRequirementLine, CostRollup, ExpandedBom, ExpansionMode, LineCost, LotBom,
    LotCostRollup, PriceBook, TemplateBom, TemplateSlot,
};
pub use inventory::{
    AlertSummary, AppliedRule, ComponentStockInput, InventoryAlert, InventoryAlertRule,
    SeverityClassification, SeverityCounts,
};
pub use lot::ProductionLot;
pub use process::{ComponentUsage, ProcessStructure, StructureSlot, Subprocess, SubstituteGroup};
pub use procurement::{ProcurementRecommendation, RecommendationFilter, SupplierLeadTime};
pub use types::{LotStatus, RecheckPolicy, RecommendationStatus, Severity, UserAction};
