// ==========================================
// BOM 告警引擎 - 采购建议 API
// ==========================================
// 职责: 采购建议查询 / 状态流转
// 说明: 状态流转不依赖批次状态（已下达批次仍可跟踪采购进度）
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::AlertConfigReader;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::procurement::{ProcurementRecommendation, RecommendationFilter};
use crate::domain::types::RecommendationStatus;
use crate::engine::{add_cost, round_cost};
use crate::repository::transaction::{begin_immediate, commit};
use crate::repository::{ActionLogRepository, ProcurementRepository, RepositoryError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationListResponse {
    pub recommendations: Vec<ProcurementRecommendation>,
    /// 未取消建议的估算成本合计（两位小数）
    pub total_estimated_cost: Decimal,
    /// 无估算成本的建议数
    pub missing_cost_count: usize,
}

// ==========================================
// ProcurementApi - 采购建议 API
// ==========================================
pub struct ProcurementApi {
    conn: Arc<Mutex<Connection>>,
    config: Arc<dyn AlertConfigReader>,
    procurement_repo: Arc<ProcurementRepository>,
}

impl ProcurementApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        config: Arc<dyn AlertConfigReader>,
        procurement_repo: Arc<ProcurementRepository>,
    ) -> Self {
        Self {
            conn,
            config,
            procurement_repo,
        }
    }

    /// 按条件查询采购建议
    pub fn get_recommendations(&self, filter: &RecommendationFilter) -> ApiResult<RecommendationListResponse> {
        let recommendations = self.procurement_repo.list_by_filter(filter)?;

        let active = recommendations
            .iter()
            .filter(|r| r.status != RecommendationStatus::Cancelled);
        let mut total = Decimal::ZERO;
        let mut missing_cost_count = 0;
        for rec in active {
            match rec.estimated_cost {
                Some(cost) => total = add_cost(total, cost)?,
                None => missing_cost_count += 1,
            }
        }

        Ok(RecommendationListResponse {
            recommendations,
            total_estimated_cost: round_cost(total),
            missing_cost_count,
        })
    }

    /// 更新采购建议状态
    ///
    /// # 参数
    /// - `recommendation_id`: 建议ID
    /// - `status`: 目标状态
    /// - `actor`: 操作人（为空取默认操作人）
    ///
    /// # 返回
    /// - Err(NotFound): 建议不存在
    /// - Err(Conflict): 非法状态流转
    pub fn update_recommendation_status(
        &self,
        recommendation_id: &str,
        status: RecommendationStatus,
        actor: Option<&str>,
    ) -> ApiResult<ProcurementRecommendation> {
        let actor = match actor.map(str::trim).filter(|a| !a.is_empty()) {
            Some(a) => a.to_string(),
            None => self.config.get_default_actor().map_err(ApiError::from_config)?,
        };

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::from(RepositoryError::LockError(e.to_string())))?;
        let tx = begin_immediate(&mut conn)?;
        let now = Utc::now().naive_utc();

        let current = ProcurementRepository::find_by_id_tx(&tx, recommendation_id)?
            .ok_or_else(|| ApiError::not_found("ProcurementRecommendation", recommendation_id))?;

        if !current.status.can_transition_to(status) {
            warn!(
                recommendation_id = recommendation_id,
                from = %current.status,
                to = %status,
                "非法的采购建议状态流转"
            );
            return Err(ApiError::conflict(format!(
                "采购建议状态不能从 {} 变更为 {}",
                current.status, status
            )));
        }

        if !ProcurementRepository::update_status_tx(&tx, recommendation_id, current.status, status, now)? {
            return Err(ApiError::conflict(format!(
                "采购建议 {} 状态已被并发修改",
                recommendation_id
            )));
        }

        let log = ActionLog::new(
            Some(current.lot_id.clone()),
            ActionType::RecommendationStatusChange,
            &actor,
        )
        .with_payload(&json!({
            "recommendation_id": recommendation_id,
            "component_id": current.component_id,
            "from_status": current.status,
            "to_status": status,
        }));
        ActionLogRepository::insert_tx(&tx, &log)?;

        let updated = ProcurementRepository::find_by_id_tx(&tx, recommendation_id)?
            .ok_or_else(|| ApiError::not_found("ProcurementRecommendation", recommendation_id))?;
        commit(tx)?;

        info!(
            recommendation_id = recommendation_id,
            from = %current.status,
            to = %status,
            "采购建议状态已更新"
        );
        Ok(updated)
    }
}
