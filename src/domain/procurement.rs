// ==========================================
// BOM 告警引擎 - 采购建议领域模型
// ==========================================

use crate::domain::types::RecommendationStatus;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// SupplierLeadTime - 供应商交期
// ==========================================
// 外部数据，只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierLeadTime {
    pub supplier_id: String,
    pub component_id: String,
    pub lead_time_days: i64,
    pub unit_price: Option<Decimal>,
    pub is_preferred: bool,
}

// ==========================================
// ProcurementRecommendation - 采购建议
// ==========================================
// 每个 (批次, 构件) 一条；HIGH / CRITICAL 时生成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcurementRecommendation {
    pub recommendation_id: String,
    pub lot_id: String,
    pub component_id: String,
    pub supplier_id: Option<String>,
    pub recommended_quantity: f64,               // 缺口 + 安全库存
    pub required_delivery_date: Option<NaiveDate>, // 批次创建时间 + 交期
    pub estimated_cost: Option<Decimal>,
    pub status: RecommendationStatus,
    pub lead_time_missing: bool,                 // 无供应商/交期数据
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// RecommendationFilter - 采购建议查询条件
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationFilter {
    pub lot_id: Option<String>,
    pub component_id: Option<String>,
    pub supplier_id: Option<String>,
    pub status: Option<RecommendationStatus>,
    #[serde(default)]
    pub lead_time_missing_only: bool,
}
