// ==========================================
// BOM 告警引擎 - 校验轮次 / 状态重算（事务内）
// ==========================================
// 职责:
// - run_validation_cycle_tx: 库存校验 → 写入新一轮告警 → 刷新采购建议 → 写入投影
// - recompute_projection_tx: 告警变更后按告警全集重算批次状态与汇总
// 红线: 只在调用方持有的 IMMEDIATE 事务内调用；任何错误由调用方回滚
// ==========================================

use crate::api::error::{from_transition, ApiResult};
use crate::domain::bom::LotBom;
use crate::domain::inventory::{AlertSummary, InventoryAlert};
use crate::domain::lot::ProductionLot;
use crate::domain::procurement::ProcurementRecommendation;
use crate::domain::types::{LotStatus, RecheckPolicy};
use crate::engine::{
    AlertBuildParams, AlertBuilder, InventoryValidator, LotEvent, LotStatusCoordinator,
    ProcurementParams, ProcurementRecommender, RecommendationChange,
};
use crate::repository::{
    AlertRepository, LotRepository, ProcurementRepository, StockRepository,
};
use chrono::NaiveDateTime;
use rusqlite::Transaction;

/// 本轮校验所用配置（事务外读取）
#[derive(Debug, Clone, Copy)]
pub struct ValidationSettings {
    pub policy: RecheckPolicy,
    pub include_safety_buffer: bool,
}

/// 一轮校验的结果
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub status: LotStatus,
    pub summary: AlertSummary,
    pub alerts: Vec<InventoryAlert>,
    pub recommendations: Vec<ProcurementRecommendation>,
    pub carried_acknowledgments: usize,
}

/// 执行一轮库存校验
///
/// # 参数
/// - `lot`: 批次（已落库；validation_cycle 为上一轮轮次，新建批次为 0）
/// - `bom`: 批次展开结果
/// - `previous`: 上一轮告警（读取自同一事务，保证看到最新确认）
/// - `event`: None = 新建批次；Some(Recheck) = 重新校验
pub fn run_validation_cycle_tx(
    tx: &Transaction,
    lot: &ProductionLot,
    bom: &LotBom,
    previous: &[InventoryAlert],
    event: Option<LotEvent>,
    settings: ValidationSettings,
    now: NaiveDateTime,
) -> ApiResult<CycleOutcome> {
    let cycle = lot.validation_cycle + 1;
    let component_ids = bom.component_ids();

    // 1. 库存校验
    let stock = StockRepository::load_stock_inputs_tx(tx, &component_ids)?;
    let classifications = InventoryValidator::new().validate(bom, &stock);

    // 2. 新一轮告警
    let built = AlertBuilder::new().build(
        &classifications,
        previous,
        &AlertBuildParams {
            lot_id: lot.lot_id.clone(),
            validation_cycle: cycle,
            policy: settings.policy,
            include_safety_buffer: settings.include_safety_buffer,
            now,
        },
    );
    AlertRepository::insert_batch_tx(tx, &built.alerts)?;

    // 3. 采购建议
    let prices = StockRepository::load_price_book_tx(tx, &component_ids)?;
    let suppliers = StockRepository::load_suppliers_tx(tx, &component_ids)?;
    let recommender = ProcurementRecommender::new();
    let drafts = recommender.recommend(
        &classifications,
        &suppliers,
        &prices,
        ProcurementParams {
            lot_created_at: lot.created_at,
            include_safety_buffer: settings.include_safety_buffer,
        },
    )?;
    let existing = ProcurementRepository::list_by_lot_tx(tx, &lot.lot_id)?;
    for change in recommender.plan_refresh(&lot.lot_id, &existing, &drafts, now) {
        match change {
            RecommendationChange::Insert(rec) => ProcurementRepository::insert_tx(tx, &rec)?,
            RecommendationChange::Update(rec) => ProcurementRepository::update_tx(tx, &rec)?,
        }
    }
    let recommendations = ProcurementRepository::list_by_lot_tx(tx, &lot.lot_id)?;

    // 4. 投影（状态由告警全集重算）
    let coordinator = LotStatusCoordinator::new();
    let (status, summary) = match event {
        None => coordinator.project(&built.alerts, cycle),
        Some(event) => (
            coordinator
                .transition(lot.status, event, &built.alerts)
                .map_err(|e| from_transition(e, &lot.lot_id, &built.alerts))?,
            coordinator.summarize(&built.alerts, cycle),
        ),
    };
    LotRepository::update_projection_tx(tx, &lot.lot_id, status, &summary, now)?;

    tracing::info!(
        lot_id = %lot.lot_id,
        validation_cycle = cycle,
        status = %status,
        critical = summary.by_severity.critical,
        high = summary.by_severity.high,
        carried = built.carried_acknowledgments,
        "库存校验完成"
    );

    Ok(CycleOutcome {
        status,
        summary,
        alerts: built.alerts,
        recommendations,
        carried_acknowledgments: built.carried_acknowledgments,
    })
}

/// 告警确认后重算并写入批次投影
///
/// # 返回
/// - (新状态, 告警汇总, 当前轮次告警全集)
pub fn recompute_projection_tx(
    tx: &Transaction,
    lot: &ProductionLot,
    event: LotEvent,
    now: NaiveDateTime,
) -> ApiResult<(LotStatus, AlertSummary, Vec<InventoryAlert>)> {
    let alerts = AlertRepository::list_current_tx(tx, &lot.lot_id)?;
    let coordinator = LotStatusCoordinator::new();

    let status = coordinator
        .transition(lot.status, event, &alerts)
        .map_err(|e| from_transition(e, &lot.lot_id, &alerts))?;
    let summary = coordinator.summarize(&alerts, lot.validation_cycle);

    LotRepository::update_projection_tx(tx, &lot.lot_id, status, &summary, now)?;

    tracing::debug!(
        lot_id = %lot.lot_id,
        from = %lot.status,
        to = %status,
        "批次状态重算"
    );
    Ok((status, summary, alerts))
}
