// ==========================================
// BOM 告警引擎 - 采购建议引擎
// ==========================================
// 职责: HIGH / CRITICAL 判定结果 + 供应商交期 → 采购建议草稿
// 规则:
// - 建议数量 = 缺口 + 安全库存（可配置为仅缺口）
// - 要求到货日 = 批次创建时间 + 交期天数
// - 无供应商/交期数据时仍生成建议，到货日为空并打标
// 供应商选择: 首选供应商 > 交期最短 > supplier_id 字典序
// ==========================================

use crate::domain::bom::PriceBook;
use crate::domain::inventory::SeverityClassification;
use crate::domain::procurement::{ProcurementRecommendation, SupplierLeadTime};
use crate::domain::types::RecommendationStatus;
use crate::engine::cost_aggregator::{extended_cost, round_cost};
use crate::engine::error::EngineResult;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ==========================================
// RecommendationDraft - 采购建议草稿
// ==========================================
// 尚未落库（无 ID / 状态），由仓储层做 upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationDraft {
    pub component_id: String,
    pub supplier_id: Option<String>,
    pub recommended_quantity: f64,
    pub required_delivery_date: Option<NaiveDate>,
    pub estimated_cost: Option<Decimal>,
    pub lead_time_missing: bool,
}

/// 采购建议落库变更
#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationChange {
    Insert(ProcurementRecommendation),
    Update(ProcurementRecommendation),
}

/// 采购建议生成参数
#[derive(Debug, Clone, Copy)]
pub struct ProcurementParams {
    pub lot_created_at: NaiveDateTime,
    pub include_safety_buffer: bool,
}

// ==========================================
// ProcurementRecommender - 采购建议引擎
// ==========================================
pub struct ProcurementRecommender;

impl Default for ProcurementRecommender {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcurementRecommender {
    pub fn new() -> Self {
        Self
    }

    /// 生成采购建议草稿
    ///
    /// # 参数
    /// - `classifications`: 库存校验结果（内部过滤为 HIGH / CRITICAL）
    /// - `suppliers`: component_id → 可供货供应商列表
    /// - `unit_costs`: 构件标准单价（供应商无报价时兜底）
    /// - `params`: 批次创建时间、是否计入安全库存
    ///
    /// # 返回
    /// 与输入顺序一致的草稿列表
    pub fn recommend(
        &self,
        classifications: &[SeverityClassification],
        suppliers: &HashMap<String, Vec<SupplierLeadTime>>,
        unit_costs: &PriceBook,
        params: ProcurementParams,
    ) -> EngineResult<Vec<RecommendationDraft>> {
        let mut drafts = Vec::new();

        for c in classifications.iter().filter(|c| c.severity.requires_procurement()) {
            let quantity = recommended_quantity(c, params.include_safety_buffer);
            let supplier = suppliers
                .get(&c.component_id)
                .and_then(|list| select_supplier(list));

            let draft = match supplier {
                Some(s) => {
                    let unit_price = s.unit_price.or_else(|| unit_costs.get(&c.component_id).copied());
                    let delivery = delivery_date(params.lot_created_at, s.lead_time_days);
                    if delivery.is_none() {
                        tracing::warn!(
                            component_id = %c.component_id,
                            supplier_id = %s.supplier_id,
                            lead_time_days = s.lead_time_days,
                            "供应商交期超出日期范围，按无交期处理"
                        );
                    }
                    RecommendationDraft {
                        component_id: c.component_id.clone(),
                        supplier_id: Some(s.supplier_id.clone()),
                        recommended_quantity: quantity,
                        required_delivery_date: delivery,
                        estimated_cost: extended_cost(quantity, unit_price)?.map(round_cost),
                        lead_time_missing: delivery.is_none(),
                    }
                }
                None => {
                    tracing::warn!(
                        component_id = %c.component_id,
                        severity = %c.severity,
                        "无供应商交期数据，采购建议到货日置空"
                    );
                    RecommendationDraft {
                        component_id: c.component_id.clone(),
                        supplier_id: None,
                        recommended_quantity: quantity,
                        required_delivery_date: None,
                        estimated_cost: extended_cost(
                            quantity,
                            unit_costs.get(&c.component_id).copied(),
                        )?
                        .map(round_cost),
                        lead_time_missing: true,
                    }
                }
            };
            drafts.push(draft);
        }

        tracing::debug!(count = drafts.len(), "采购建议草稿生成完成");
        Ok(drafts)
    }

    /// 将本轮草稿与已有建议合并为落库变更
    ///
    /// # 规则
    /// - 已有 RECOMMENDED / CANCELLED 且仍缺料 → 按草稿刷新并置为 RECOMMENDED
    /// - 已有 ORDERED / PARTIAL / RECEIVED → 不动（采购单已接手）
    /// - 无已有记录 → 新增 RECOMMENDED
    /// - 已有 RECOMMENDED 但本轮不再缺料 → CANCELLED
    pub fn plan_refresh(
        &self,
        lot_id: &str,
        existing: &[ProcurementRecommendation],
        drafts: &[RecommendationDraft],
        now: NaiveDateTime,
    ) -> Vec<RecommendationChange> {
        let by_component: HashMap<&str, &ProcurementRecommendation> = existing
            .iter()
            .map(|r| (r.component_id.as_str(), r))
            .collect();

        let mut changes = Vec::new();

        for draft in drafts {
            match by_component.get(draft.component_id.as_str()) {
                Some(current) if current.status.is_refreshable() => {
                    changes.push(RecommendationChange::Update(ProcurementRecommendation {
                        supplier_id: draft.supplier_id.clone(),
                        recommended_quantity: draft.recommended_quantity,
                        required_delivery_date: draft.required_delivery_date,
                        estimated_cost: draft.estimated_cost,
                        status: RecommendationStatus::Recommended,
                        lead_time_missing: draft.lead_time_missing,
                        updated_at: now,
                        ..(*current).clone()
                    }));
                }
                Some(current) => {
                    tracing::debug!(
                        lot_id = lot_id,
                        component_id = %draft.component_id,
                        status = %current.status,
                        "采购建议已进入采购流程，保持不变"
                    );
                }
                None => changes.push(RecommendationChange::Insert(ProcurementRecommendation {
                    recommendation_id: Uuid::new_v4().to_string(),
                    lot_id: lot_id.to_string(),
                    component_id: draft.component_id.clone(),
                    supplier_id: draft.supplier_id.clone(),
                    recommended_quantity: draft.recommended_quantity,
                    required_delivery_date: draft.required_delivery_date,
                    estimated_cost: draft.estimated_cost,
                    status: RecommendationStatus::Recommended,
                    lead_time_missing: draft.lead_time_missing,
                    created_at: now,
                    updated_at: now,
                })),
            }
        }

        for current in existing {
            let still_short = drafts.iter().any(|d| d.component_id == current.component_id);
            if !still_short && current.status == RecommendationStatus::Recommended {
                changes.push(RecommendationChange::Update(ProcurementRecommendation {
                    status: RecommendationStatus::Cancelled,
                    updated_at: now,
                    ..current.clone()
                }));
            }
        }

        changes
    }
}

/// 建议数量
pub fn recommended_quantity(c: &SeverityClassification, include_safety_buffer: bool) -> f64 {
    if include_safety_buffer {
        c.shortfall + c.safety_stock_quantity
    } else {
        c.shortfall
    }
}

/// 要求到货日 = 批次创建时间 + 交期天数（超出日期范围返回 None）
pub fn delivery_date(lot_created_at: NaiveDateTime, lead_time_days: i64) -> Option<NaiveDate> {
    Duration::try_days(lead_time_days)
        .and_then(|lead| lot_created_at.checked_add_signed(lead))
        .map(|ts| ts.date())
}

/// 选择供应商（首选 > 交期短 > ID 小）
fn select_supplier(candidates: &[SupplierLeadTime]) -> Option<&SupplierLeadTime> {
    candidates
        .iter()
        .filter(|s| s.lead_time_days >= 0)
        .min_by(|a, b| {
            b.is_preferred
                .cmp(&a.is_preferred)
                .then(a.lead_time_days.cmp(&b.lead_time_days))
                .then(a.supplier_id.cmp(&b.supplier_id))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Severity;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn classification(component_id: &str, severity: Severity, shortfall: f64) -> SeverityClassification {
        SeverityClassification {
            component_id: component_id.to_string(),
            severity,
            current_stock: 50.0 - shortfall,
            required_quantity: 50.0,
            shortfall,
            safety_stock_quantity: 20.0,
            reorder_point_quantity: 60.0,
            rule_fallback: false,
            reason: String::new(),
        }
    }

    fn supplier(id: &str, component_id: &str, lead: i64, price: Option<&str>, preferred: bool) -> SupplierLeadTime {
        SupplierLeadTime {
            supplier_id: id.to_string(),
            component_id: component_id.to_string(),
            lead_time_days: lead,
            unit_price: price.map(dec),
            is_preferred: preferred,
        }
    }

    fn params() -> ProcurementParams {
        ProcurementParams {
            lot_created_at: NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(15, 30, 0)
                .unwrap(),
            include_safety_buffer: true,
        }
    }

    #[test]
    fn test_only_high_and_critical_get_recommendations() {
        let input = vec![
            classification("C-1", Severity::Critical, 50.0),
            classification("C-2", Severity::Medium, 0.0),
            classification("C-3", Severity::High, 10.0),
            classification("C-4", Severity::Ok, 0.0),
        ];
        let drafts = ProcurementRecommender::new()
            .recommend(&input, &HashMap::new(), &PriceBook::new(), params())
            .unwrap();

        let ids: Vec<_> = drafts.iter().map(|d| d.component_id.as_str()).collect();
        assert_eq!(ids, vec!["C-1", "C-3"]);
    }

    #[test]
    fn test_quantity_includes_safety_buffer_and_date_adds_lead_time() {
        let mut suppliers = HashMap::new();
        suppliers.insert(
            "C-3".to_string(),
            vec![supplier("S-1", "C-3", 14, Some("2.50"), false)],
        );
        let drafts = ProcurementRecommender::new()
            .recommend(
                &[classification("C-3", Severity::High, 10.0)],
                &suppliers,
                &PriceBook::new(),
                params(),
            )
            .unwrap();

        let d = &drafts[0];
        assert_eq!(d.recommended_quantity, 30.0);
        assert_eq!(d.required_delivery_date, NaiveDate::from_ymd_opt(2026, 3, 15));
        assert_eq!(d.estimated_cost, Some(dec("75.00")));
        assert!(!d.lead_time_missing);
    }

    #[test]
    fn test_buffer_can_be_disabled() {
        let mut p = params();
        p.include_safety_buffer = false;
        let drafts = ProcurementRecommender::new()
            .recommend(
                &[classification("C-3", Severity::High, 10.0)],
                &HashMap::new(),
                &PriceBook::new(),
                p,
            )
            .unwrap();
        assert_eq!(drafts[0].recommended_quantity, 10.0);
    }

    #[test]
    fn test_missing_supplier_still_recommends_with_flag() {
        let mut prices = PriceBook::new();
        prices.insert("C-1".to_string(), dec("1.10"));

        let drafts = ProcurementRecommender::new()
            .recommend(
                &[classification("C-1", Severity::Critical, 50.0)],
                &HashMap::new(),
                &prices,
                params(),
            )
            .unwrap();

        let d = &drafts[0];
        assert!(d.lead_time_missing);
        assert_eq!(d.supplier_id, None);
        assert_eq!(d.required_delivery_date, None);
        assert_eq!(d.estimated_cost, Some(dec("77.00")));
    }

    #[test]
    fn test_supplier_selection_prefers_flag_then_lead_time() {
        let list = vec![
            supplier("S-B", "C-1", 3, None, false),
            supplier("S-A", "C-1", 3, None, false),
            supplier("S-P", "C-1", 30, None, true),
        ];
        assert_eq!(select_supplier(&list).unwrap().supplier_id, "S-P");

        let list = vec![
            supplier("S-B", "C-1", 3, None, false),
            supplier("S-A", "C-1", 3, None, false),
            supplier("S-C", "C-1", 7, None, false),
        ];
        assert_eq!(select_supplier(&list).unwrap().supplier_id, "S-A");
    }

    fn existing(component_id: &str, status: RecommendationStatus) -> ProcurementRecommendation {
        let ts = params().lot_created_at;
        ProcurementRecommendation {
            recommendation_id: format!("R-{}", component_id),
            lot_id: "LOT-1".to_string(),
            component_id: component_id.to_string(),
            supplier_id: None,
            recommended_quantity: 1.0,
            required_delivery_date: None,
            estimated_cost: None,
            status,
            lead_time_missing: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn draft(component_id: &str, qty: f64) -> RecommendationDraft {
        RecommendationDraft {
            component_id: component_id.to_string(),
            supplier_id: Some("S-1".to_string()),
            recommended_quantity: qty,
            required_delivery_date: None,
            estimated_cost: None,
            lead_time_missing: false,
        }
    }

    #[test]
    fn test_plan_refresh_rules() {
        let now = params().lot_created_at + Duration::hours(2);
        let current = vec![
            existing("C-REFRESH", RecommendationStatus::Recommended),
            existing("C-ORDERED", RecommendationStatus::Ordered),
            existing("C-GONE", RecommendationStatus::Recommended),
            existing("C-REVIVE", RecommendationStatus::Cancelled),
        ];
        let drafts = vec![
            draft("C-REFRESH", 12.0),
            draft("C-ORDERED", 99.0),
            draft("C-REVIVE", 5.0),
            draft("C-NEW", 7.0),
        ];

        let changes = ProcurementRecommender::new().plan_refresh("LOT-1", &current, &drafts, now);
        assert_eq!(changes.len(), 4);

        match &changes[0] {
            RecommendationChange::Update(r) => {
                assert_eq!(r.recommendation_id, "R-C-REFRESH");
                assert_eq!(r.recommended_quantity, 12.0);
                assert_eq!(r.updated_at, now);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &changes[1] {
            RecommendationChange::Update(r) => {
                assert_eq!(r.component_id, "C-REVIVE");
                assert_eq!(r.status, RecommendationStatus::Recommended);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &changes[2] {
            RecommendationChange::Insert(r) => {
                assert_eq!(r.component_id, "C-NEW");
                assert_eq!(r.status, RecommendationStatus::Recommended);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &changes[3] {
            RecommendationChange::Update(r) => {
                assert_eq!(r.component_id, "C-GONE");
                assert_eq!(r.status, RecommendationStatus::Cancelled);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_lead_time_keeps_recommendation_without_date() {
        let mut suppliers = HashMap::new();
        suppliers.insert(
            "C-LT".to_string(),
            vec![supplier("S-1", "C-LT", 200_000_000, Some("1.00"), true)],
        );
        let drafts = ProcurementRecommender::new()
            .recommend(
                &[classification("C-LT", Severity::Critical, 10.0)],
                &suppliers,
                &PriceBook::new(),
                params(),
            )
            .unwrap();

        let d = &drafts[0];
        assert_eq!(d.supplier_id.as_deref(), Some("S-1"));
        assert_eq!(d.required_delivery_date, None);
        assert!(d.lead_time_missing);
        assert_eq!(d.estimated_cost, Some(dec("30.00")));

        assert_eq!(delivery_date(params().lot_created_at, i64::MAX), None);
        assert_eq!(
            delivery_date(params().lot_created_at, 0),
            NaiveDate::from_ymd_opt(2026, 3, 1)
        );
    }

    #[test]
    fn test_supplier_without_price_falls_back_to_unit_cost() {
        let mut suppliers = HashMap::new();
        suppliers.insert("C-1".to_string(), vec![supplier("S-1", "C-1", 5, None, true)]);
        let mut prices = PriceBook::new();
        prices.insert("C-1".to_string(), dec("0.333"));

        let drafts = ProcurementRecommender::new()
            .recommend(
                &[classification("C-1", Severity::Critical, 10.0)],
                &suppliers,
                &prices,
                params(),
            )
            .unwrap();

        // 30 × 0.333 = 9.99
        assert_eq!(drafts[0].estimated_cost, Some(dec("9.99")));
    }
}
