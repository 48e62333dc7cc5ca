// ==========================================
// BOM 告警引擎 - 告警确认 API
// ==========================================
// 职责: 单条确认 / 批量确认（全有或全无）
// 原子路径: 写确认 → 按告警全集重算状态 → 写投影 → 审计，同一 IMMEDIATE 事务
// ==========================================

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validation_cycle::recompute_projection_tx;
use crate::config::AlertConfigReader;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::inventory::{AlertSummary, InventoryAlert};
use crate::domain::lot::ProductionLot;
use crate::domain::types::{LotStatus, UserAction};
use crate::engine::LotEvent;
use crate::repository::transaction::{begin_immediate, commit};
use crate::repository::{ActionLogRepository, AlertRepository, LotRepository, RepositoryError};

// ==========================================
// 请求 / 响应
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgeRequest {
    pub alert_id: String,
    pub user_action: UserAction,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgeResponse {
    pub alert: InventoryAlert,
    pub updated_lot_status: LotStatus,
    pub alert_summary: AlertSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgeItem {
    pub alert_id: String,
    pub user_action: UserAction,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgeBulkRequest {
    pub lot_id: String,
    pub items: Vec<AcknowledgeItem>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgeBulkResponse {
    pub acknowledged_count: usize,
    pub updated_lot_status: LotStatus,
    pub alert_summary: AlertSummary,
}

// ==========================================
// AlertApi - 告警确认 API
// ==========================================
pub struct AlertApi {
    conn: Arc<Mutex<Connection>>,
    config: Arc<dyn AlertConfigReader>,
}

impl AlertApi {
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<dyn AlertConfigReader>) -> Self {
        Self { conn, config }
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

    /// 确认单条告警
    ///
    /// # 返回
    /// - Ok: 更新后的告警 + 批次新状态
    /// - Err(NotFound): 告警不存在
    /// - Err(Conflict): 已确认 / 告警已被新一轮校验取代
    /// - Err(LotFinalized): 批次已下达
    pub fn acknowledge(&self, request: AcknowledgeRequest) -> ApiResult<AcknowledgeResponse> {
        let actor = self.resolve_actor(request.actor.as_deref())?;

        let mut conn = self.lock()?;
        let tx = begin_immediate(&mut conn)?;
        let now = Utc::now().naive_utc();

        let alert = AlertRepository::find_by_id_tx(&tx, &request.alert_id)?
            .ok_or_else(|| ApiError::not_found("InventoryAlert", &request.alert_id))?;
        let lot = load_mutable_lot(&tx, &alert.lot_id)?;
        check_acknowledgeable(&alert, &lot)?;

        let item = AcknowledgeItem {
            alert_id: request.alert_id.clone(),
            user_action: request.user_action,
            notes: request.notes.clone(),
        };
        apply_acknowledgment(&tx, &alert, &item, &actor, now)?;

        let (status, summary, alerts) =
            recompute_projection_tx(&tx, &lot, LotEvent::Acknowledge(request.user_action), now)?;
        let updated = alerts
            .into_iter()
            .find(|a| a.alert_id == request.alert_id)
            .ok_or_else(|| ApiError::not_found("InventoryAlert", &request.alert_id))?;

        let log = ActionLog::new(Some(lot.lot_id.clone()), ActionType::Acknowledge, &actor)
            .with_payload(&json!({
                "alert_id": request.alert_id,
                "component_id": updated.component_id,
                "severity": updated.severity,
                "user_action": request.user_action,
                "notes": request.notes,
                "from_status": lot.status,
                "to_status": status,
            }));
        ActionLogRepository::insert_tx(&tx, &log)?;

        commit(tx)?;
        info!(
            lot_id = %lot.lot_id,
            alert_id = %request.alert_id,
            action = %request.user_action,
            status = %status,
            "告警已确认"
        );

        Ok(AcknowledgeResponse {
            alert: updated,
            updated_lot_status: status,
            alert_summary: summary,
        })
    }

    /// 批量确认（全有或全无）
    ///
    /// # 说明
    /// - 先校验整批：未知 alert_id、不属于该批次、已被取代、已确认、批内重复
    /// - 任一条不合法则整批拒绝，不产生任何写入
    pub fn acknowledge_bulk(&self, request: AcknowledgeBulkRequest) -> ApiResult<AcknowledgeBulkResponse> {
        if request.items.is_empty() {
            return Err(ApiError::validation("items", "确认列表不能为空"));
        }
        let mut seen = HashSet::new();
        for item in &request.items {
            if !seen.insert(item.alert_id.as_str()) {
                return Err(ApiError::validation(
                    "alert_id",
                    format!("批内重复的告警: {}", item.alert_id),
                ));
            }
        }
        let actor = self.resolve_actor(request.actor.as_deref())?;

        let mut conn = self.lock()?;
        let tx = begin_immediate(&mut conn)?;
        let now = Utc::now().naive_utc();

        let lot = load_mutable_lot(&tx, &request.lot_id)?;
        let current: HashMap<String, InventoryAlert> =
            AlertRepository::list_current_tx(&tx, &lot.lot_id)?
                .into_iter()
                .map(|a| (a.alert_id.clone(), a))
                .collect();

        // 1. 整批校验（不写入）
        let mut resolved = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let alert = match current.get(&item.alert_id) {
                Some(a) => a.clone(),
                None => {
                    let err = match AlertRepository::find_by_id_tx(&tx, &item.alert_id)? {
                        None => ApiError::not_found("InventoryAlert", &item.alert_id),
                        Some(other) if other.lot_id != lot.lot_id => ApiError::validation(
                            "alert_id",
                            format!("告警 {} 不属于批次 {}", item.alert_id, lot.lot_id),
                        ),
                        Some(stale) => ApiError::Conflict {
                            message: format!(
                                "告警 {} 已被第 {} 轮校验取代",
                                item.alert_id, lot.validation_cycle
                            ),
                            blocking_alerts: vec![stale],
                        },
                    };
                    warn!(lot_id = %lot.lot_id, alert_id = %item.alert_id, error = %err, "批量确认被拒绝");
                    return Err(err);
                }
            };
            if let Err(err) = check_acknowledgeable(&alert, &lot) {
                warn!(lot_id = %lot.lot_id, alert_id = %item.alert_id, error = %err, "批量确认被拒绝");
                return Err(err);
            }
            resolved.push((alert, item));
        }

        // 2. 写入
        for (alert, item) in &resolved {
            apply_acknowledgment(&tx, alert, item, &actor, now)?;
        }

        // 3. 重算（事件动作取批内任一 DELAY，否则取首条动作）
        let event_action = request
            .items
            .iter()
            .map(|i| i.user_action)
            .find(|a| a.holds_lot())
            .unwrap_or(request.items[0].user_action);
        let (status, summary, _) =
            recompute_projection_tx(&tx, &lot, LotEvent::Acknowledge(event_action), now)?;

        let log = ActionLog::new(Some(lot.lot_id.clone()), ActionType::AcknowledgeBulk, &actor)
            .with_payload(&json!({
                "items": request.items,
                "from_status": lot.status,
                "to_status": status,
            }));
        ActionLogRepository::insert_tx(&tx, &log)?;

        commit(tx)?;
        info!(
            lot_id = %lot.lot_id,
            count = resolved.len(),
            status = %status,
            "批量确认完成"
        );

        Ok(AcknowledgeBulkResponse {
            acknowledged_count: resolved.len(),
            updated_lot_status: status,
            alert_summary: summary,
        })
    }
}

// ==========================================
// 内部辅助
// ==========================================

/// 读取批次并拒绝已下达批次
fn load_mutable_lot(tx: &Transaction, lot_id: &str) -> ApiResult<ProductionLot> {
    let lot = LotRepository::find_by_id_tx(tx, lot_id)?
        .ok_or_else(|| ApiError::not_found("ProductionLot", lot_id))?;
    if lot.is_finalized() {
        return Err(ApiError::LotFinalized {
            lot_id: lot_id.to_string(),
        });
    }
    Ok(lot)
}

/// 告警必须属于当前轮次且未确认
fn check_acknowledgeable(alert: &InventoryAlert, lot: &ProductionLot) -> ApiResult<()> {
    if alert.validation_cycle != lot.validation_cycle {
        return Err(ApiError::Conflict {
            message: format!(
                "告警 {} 属于第 {} 轮校验，当前为第 {} 轮",
                alert.alert_id, alert.validation_cycle, lot.validation_cycle
            ),
            blocking_alerts: vec![alert.clone()],
        });
    }
    if alert.acknowledged {
        return Err(ApiError::Conflict {
            message: format!("告警 {} 已确认", alert.alert_id),
            blocking_alerts: vec![alert.clone()],
        });
    }
    Ok(())
}

fn apply_acknowledgment(
    tx: &Transaction,
    alert: &InventoryAlert,
    item: &AcknowledgeItem,
    actor: &str,
    now: chrono::NaiveDateTime,
) -> ApiResult<()> {
    let updated = AlertRepository::acknowledge_tx(
        tx,
        &alert.alert_id,
        item.user_action,
        item.notes.as_deref(),
        actor,
        now,
    )?;
    if !updated {
        return Err(ApiError::Conflict {
            message: format!("告警 {} 已被并发确认", alert.alert_id),
            blocking_alerts: vec![alert.clone()],
        });
    }
    Ok(())
}
