// ==========================================
// BOM 告警引擎 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 所有判定必须输出 reason
// 数据流: BOM 展开 → {成本汇总, 库存校验} → 采购建议 → 批次状态
// ==========================================

pub mod alert_builder;
pub mod bom_expander;
pub mod cost_aggregator;
pub mod error;
pub mod inventory_validator;
pub mod lot_status;
pub mod procurement;

// 重导出核心引擎
pub use alert_builder::{AlertBuildParams, AlertBuilder, BuiltAlerts};
pub use bom_expander::BomExpander;
pub use cost_aggregator::{add_cost, round_cost, CostAggregator, COST_SCALE};
pub use error::{EngineError, EngineResult};
pub use inventory_validator::{classify_severity, InventoryValidator};
pub use lot_status::{LotEvent, LotStatusCoordinator, TransitionError};
pub use procurement::{
    ProcurementParams, ProcurementRecommender, RecommendationChange, RecommendationDraft,
};
