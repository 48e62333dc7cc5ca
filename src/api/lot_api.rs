// ==========================================
// BOM 告警引擎 - 生产批次 API
// ==========================================
// 职责: 建批次并校验 / 重新校验 / 查询 / 下达 / 模板成本估算
// 原子路径: 建批次 → 展开 → 成本 → 校验 → 写告警 → 写状态，同一 IMMEDIATE 事务
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::error::{from_transition, ApiError, ApiResult};
use crate::api::validation_cycle::{run_validation_cycle_tx, ValidationSettings};
use crate::config::AlertConfigReader;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::bom::CostRollup;
use crate::domain::inventory::{AlertSummary, InventoryAlert};
use crate::domain::lot::ProductionLot;
use crate::domain::procurement::ProcurementRecommendation;
use crate::domain::process::ProcessStructure;
use crate::domain::types::{LotStatus, Severity};
use crate::engine::{BomExpander, CostAggregator, LotEvent, LotStatusCoordinator};
use crate::repository::transaction::{begin_immediate, commit};
use crate::repository::{
    ActionLogRepository, AlertRepository, LotRepository, RepositoryError, RequirementRepository,
    StockRepository,
};

// ==========================================
// 请求 / 响应
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLotRequest {
    /// 不传则自动生成
    #[serde(default)]
    pub lot_id: Option<String>,
    pub process_structure: ProcessStructure,
    pub lot_quantity: f64,
    #[serde(default)]
    pub actor: Option<String>,
}

/// 批次成本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotCostSummary {
    pub template_worst_case: Decimal,
    pub lot_total: Decimal,
    pub lot_per_unit: Decimal,
    pub costing_gaps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLotResponse {
    pub lot_id: String,
    pub lot_status: LotStatus,
    pub alerts: Vec<InventoryAlert>,
    pub procurement_recommendations: Vec<ProcurementRecommendation>,
    pub action_required: bool,
    pub alert_summary: AlertSummary,
    pub cost: LotCostSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInventoryResponse {
    pub lot_id: String,
    pub lot_status: LotStatus,
    pub alerts_summary: AlertSummary,
    pub alerts: Vec<InventoryAlert>,
    pub carried_acknowledgments: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeResponse {
    pub lot_id: String,
    pub lot_status: LotStatus,
}

// ==========================================
// LotApi - 生产批次 API
// ==========================================
pub struct LotApi {
    conn: Arc<Mutex<Connection>>,
    config: Arc<dyn AlertConfigReader>,
    lot_repo: Arc<LotRepository>,
    alert_repo: Arc<AlertRepository>,
    stock_repo: Arc<StockRepository>,
}

impl LotApi {
    /// 创建新的LotApi实例
    ///
    /// # 参数
    /// - conn: 共享连接（事务在此之上开启）
    /// - config: 配置读取器
    /// - lot_repo / alert_repo / stock_repo: 只读查询用仓储
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        config: Arc<dyn AlertConfigReader>,
        lot_repo: Arc<LotRepository>,
        alert_repo: Arc<AlertRepository>,
        stock_repo: Arc<StockRepository>,
    ) -> Self {
        Self {
            conn,
            config,
            lot_repo,
            alert_repo,
            stock_repo,
        }
    }

    fn settings(&self) -> ApiResult<ValidationSettings> {
        Ok(ValidationSettings {
            policy: self.config.get_recheck_policy().map_err(ApiError::from_config)?,
            include_safety_buffer: self
                .config
                .get_include_safety_buffer()
                .map_err(ApiError::from_config)?,
        })
    }

    fn resolve_actor(&self, actor: Option<&str>) -> ApiResult<String> {
        match actor.map(str::trim).filter(|a| !a.is_empty()) {
            Some(a) => Ok(a.to_string()),
            None => self.config.get_default_actor().map_err(ApiError::from_config),
        }
    }

    fn lock(&self) -> ApiResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()).into())
    }

    // ==========================================
    // 建批次
    // ==========================================

    /// 创建批次并完成首轮库存校验
    ///
    /// # 返回
    /// - Ok(CreateLotResponse): 批次状态、告警、采购建议、成本
    /// - Err(MalformedStructure / UnresolvedAlternative): 上游结构数据问题
    /// - Err(ValidationError): 批次数量非法
    /// - Err(Conflict): lot_id 已存在
    pub fn create_lot_with_validation(&self, request: CreateLotRequest) -> ApiResult<CreateLotResponse> {
        let lot_id = match request.lot_id.as_deref().map(str::trim) {
            Some("") => return Err(ApiError::validation("lot_id", "批次ID不能为空")),
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        let settings = self.settings()?;
        let actor = self.resolve_actor(request.actor.as_deref())?;
        let config_snapshot = self
            .config
            .get_config_snapshot()
            .map_err(ApiError::from_config)?;
        let structure = &request.process_structure;

        let mut conn = self.lock()?;
        let tx = begin_immediate(&mut conn)?;
        let now = Utc::now().naive_utc();

        // 1. 展开 + 成本
        let prices = StockRepository::load_price_book_tx(&tx, &structure.component_ids())?;
        let expander = BomExpander::new();
        let aggregator = CostAggregator::new();
        let template = expander.expand_template(structure, &prices)?;
        let lot_bom = expander.expand_lot(structure, request.lot_quantity, &prices)?;
        let template_cost = aggregator.aggregate_template(&template)?;
        let lot_cost = aggregator.aggregate_lot(&lot_bom)?;

        // 2. 批次 + 需求行
        let lot = ProductionLot {
            lot_id: lot_id.clone(),
            process_id: structure.process_id.clone(),
            process_version: structure.process_version,
            quantity: request.lot_quantity,
            status: LotStatus::Ready,
            alert_summary: AlertSummary::default(),
            validation_cycle: 0,
            created_at: now,
            updated_at: now,
            finalized_at: None,
        };
        LotRepository::insert_tx(&tx, &lot)?;
        RequirementRepository::insert_lines_tx(&tx, &lot_id, &lot_bom)?;

        // 3. 首轮校验
        let outcome = run_validation_cycle_tx(&tx, &lot, &lot_bom, &[], None, settings, now)?;

        let cost = LotCostSummary {
            template_worst_case: template_cost.total_cost,
            lot_total: lot_cost.lot_total,
            lot_per_unit: lot_cost.per_unit_cost,
            costing_gaps: lot_cost.costing_gaps,
        };

        // 4. 审计
        let log = ActionLog::new(Some(lot_id.clone()), ActionType::CreateLot, &actor)
            .with_payload(&json!({
                "process_id": structure.process_id,
                "process_version": structure.process_version,
                "lot_quantity": request.lot_quantity,
                "lot_status": outcome.status,
                "alert_summary": outcome.summary,
                "cost": cost,
                "config_snapshot": config_snapshot,
            }))
            .with_detail(format!("创建批次, 状态={}", outcome.status));
        ActionLogRepository::insert_tx(&tx, &log)?;

        commit(tx)?;

        info!(
            lot_id = %lot_id,
            status = %outcome.status,
            alerts = outcome.alerts.len(),
            recommendations = outcome.recommendations.len(),
            "批次创建完成"
        );

        Ok(CreateLotResponse {
            lot_id,
            lot_status: outcome.status,
            action_required: outcome.status != LotStatus::Ready,
            alert_summary: outcome.summary,
            alerts: outcome.alerts,
            procurement_recommendations: outcome.recommendations,
            cost,
        })
    }

    // ==========================================
    // 重新校验
    // ==========================================

    /// 手动重新校验（新一轮告警取代上一轮）
    ///
    /// # 说明
    /// - 上一轮告警在同一事务内读取，确认不会被静默丢弃
    /// - 是否沿用上一轮确认由 recheck_policy 决定
    pub fn check_inventory(&self, lot_id: &str, actor: Option<&str>) -> ApiResult<CheckInventoryResponse> {
        let settings = self.settings()?;
        let actor = self.resolve_actor(actor)?;
        let config_snapshot = self
            .config
            .get_config_snapshot()
            .map_err(ApiError::from_config)?;

        let mut conn = self.lock()?;
        let tx = begin_immediate(&mut conn)?;
        let now = Utc::now().naive_utc();

        let lot = LotRepository::find_by_id_tx(&tx, lot_id)?
            .ok_or_else(|| ApiError::not_found("ProductionLot", lot_id))?;
        if lot.is_finalized() {
            return Err(ApiError::LotFinalized {
                lot_id: lot_id.to_string(),
            });
        }

        let bom = RequirementRepository::load_lot_bom_tx(&tx, &lot)?;
        let previous = AlertRepository::list_current_tx(&tx, lot_id)?;
        let outcome = run_validation_cycle_tx(
            &tx,
            &lot,
            &bom,
            &previous,
            Some(LotEvent::Recheck),
            settings,
            now,
        )?;

        let log = ActionLog::new(Some(lot_id.to_string()), ActionType::Recheck, &actor)
            .with_payload(&json!({
                "validation_cycle": outcome.summary.validation_cycle,
                "recheck_policy": settings.policy,
                "from_status": lot.status,
                "to_status": outcome.status,
                "carried_acknowledgments": outcome.carried_acknowledgments,
                "alert_summary": outcome.summary,
                "config_snapshot": config_snapshot,
            }));
        ActionLogRepository::insert_tx(&tx, &log)?;

        commit(tx)?;

        Ok(CheckInventoryResponse {
            lot_id: lot_id.to_string(),
            lot_status: outcome.status,
            alerts_summary: outcome.summary,
            alerts: outcome.alerts,
            carried_acknowledgments: outcome.carried_acknowledgments,
        })
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_lot(&self, lot_id: &str) -> ApiResult<ProductionLot> {
        self.lot_repo
            .find_by_id(lot_id)?
            .ok_or_else(|| ApiError::not_found("ProductionLot", lot_id))
    }

    /// 当前轮次告警（可按严重度过滤）
    pub fn list_alerts(&self, lot_id: &str, severity: Option<Severity>) -> ApiResult<Vec<InventoryAlert>> {
        // 批次不存在时返回 NotFound 而不是空列表
        self.get_lot(lot_id)?;
        let alerts = self.alert_repo.list_current(lot_id)?;
        Ok(match severity {
            Some(s) => alerts.into_iter().filter(|a| a.severity == s).collect(),
            None => alerts,
        })
    }

    // ==========================================
    // 下达
    // ==========================================

    /// 下达批次
    ///
    /// # 返回
    /// - Ok(FINALIZED)
    /// - Err(Conflict): 存在未确认 CRITICAL 告警或批次 ON_HOLD（附阻断告警）
    /// - Err(LotFinalized): 重复下达
    pub fn finalize(&self, lot_id: &str, actor: Option<&str>) -> ApiResult<FinalizeResponse> {
        let actor = self.resolve_actor(actor)?;

        let mut conn = self.lock()?;
        let tx = begin_immediate(&mut conn)?;
        let now = Utc::now().naive_utc();

        let lot = LotRepository::find_by_id_tx(&tx, lot_id)?
            .ok_or_else(|| ApiError::not_found("ProductionLot", lot_id))?;
        let alerts = AlertRepository::list_current_tx(&tx, lot_id)?;

        let coordinator = LotStatusCoordinator::new();
        let current = if lot.is_finalized() {
            lot.status
        } else {
            coordinator.compute_status(&alerts)
        };

        let status = match coordinator.transition(current, LotEvent::Finalize, &alerts) {
            Ok(s) => s,
            Err(e) => {
                let err = from_transition(e, lot_id, &alerts);
                warn!(lot_id = lot_id, status = %current, error = %err, "批次下达被拒绝");
                return Err(err);
            }
        };
        let summary = coordinator.summarize(&alerts, lot.validation_cycle);
        LotRepository::update_projection_tx(&tx, lot_id, status, &summary, now)?;

        let log = ActionLog::new(Some(lot_id.to_string()), ActionType::Finalize, &actor)
            .with_payload(&json!({
                "from_status": current,
                "alert_summary": summary,
            }));
        ActionLogRepository::insert_tx(&tx, &log)?;

        commit(tx)?;
        info!(lot_id = lot_id, actor = %actor, "批次已下达");

        Ok(FinalizeResponse {
            lot_id: lot_id.to_string(),
            lot_status: status,
        })
    }

    // ==========================================
    // 模板成本估算
    // ==========================================

    /// 模板最坏成本（替代料组取最贵成员）
    pub fn estimate_template_cost(&self, structure: &ProcessStructure) -> ApiResult<CostRollup> {
        let prices = self.stock_repo.load_price_book(&structure.component_ids())?;
        let expander = BomExpander::new();
        let template = expander.expand_template(structure, &prices)?;
        let rollup = CostAggregator::new().aggregate_template(&template)?;

        if !rollup.costing_gaps.is_empty() {
            warn!(
                process_id = %structure.process_id,
                gaps = ?rollup.costing_gaps,
                "模板成本存在无定价构件"
            );
        }
        Ok(rollup)
    }
}
