// ==========================================
// BOM 告警引擎 - 库存告警数据仓储
// ==========================================
// 红线: 告警只插入、只确认，不删除
// 说明: 每轮校验写入一整套告警；旧轮次保留作历史
// ==========================================

use crate::domain::inventory::InventoryAlert;
use crate::domain::types::{Severity, UserAction};
use crate::repository::db_utils::{get_enum, get_opt_enum};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const ALERT_COLUMNS: &str = "alert_id, lot_id, component_id, validation_cycle, severity, \
     current_stock, required_quantity, shortfall, suggested_procurement_qty, reason, \
     acknowledged, user_action, notes, acknowledged_by, acknowledged_at, created_at";

// ==========================================
// AlertRepository - 库存告警仓储
// ==========================================
pub struct AlertRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AlertRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询批次当前轮次告警
    pub fn list_current(&self, lot_id: &str) -> RepositoryResult<Vec<InventoryAlert>> {
        let conn = self.get_conn()?;
        Self::list_current_tx(&conn, lot_id)
    }

    /// 按 ID 查询告警
    pub fn find_by_id(&self, alert_id: &str) -> RepositoryResult<Option<InventoryAlert>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, alert_id)
    }

    /// 统计批次已确认告警数（全部轮次）
    pub fn count_acknowledged(&self, lot_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM inventory_alert WHERE lot_id = ?1 AND acknowledged = 1",
            params![lot_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    /// 批量插入一轮告警
    pub fn insert_batch_tx(tx: &Transaction, alerts: &[InventoryAlert]) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO inventory_alert ({}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            ALERT_COLUMNS
        ))?;

        for alert in alerts {
            stmt.execute(params![
                alert.alert_id,
                alert.lot_id,
                alert.component_id,
                alert.validation_cycle,
                alert.severity.as_str(),
                alert.current_stock,
                alert.required_quantity,
                alert.shortfall,
                alert.suggested_procurement_qty,
                alert.reason,
                alert.acknowledged,
                alert.user_action.map(|a| a.as_str()),
                alert.notes,
                alert.acknowledged_by,
                alert.acknowledged_at,
                alert.created_at,
            ])?;
        }
        Ok(alerts.len())
    }

    /// 查询批次当前轮次告警（以 production_lot.validation_cycle 为准）
    pub fn list_current_tx(conn: &Connection, lot_id: &str) -> RepositoryResult<Vec<InventoryAlert>> {
        let sql = format!(
            "SELECT {} FROM inventory_alert a \
             WHERE a.lot_id = ?1 \
               AND a.validation_cycle = (SELECT validation_cycle FROM production_lot WHERE lot_id = ?1) \
             ORDER BY a.rowid",
            prefixed_columns("a")
        );
        let mut stmt = conn.prepare(&sql)?;
        let alerts = stmt
            .query_map(params![lot_id], map_alert_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(alerts)
    }

    /// 按 ID 查询告警（可在事务内调用）
    pub fn find_by_id_tx(conn: &Connection, alert_id: &str) -> RepositoryResult<Option<InventoryAlert>> {
        let sql = format!("SELECT {} FROM inventory_alert WHERE alert_id = ?1", ALERT_COLUMNS);
        let alert = conn
            .query_row(&sql, params![alert_id], map_alert_row)
            .optional()?;
        Ok(alert)
    }

    /// 写入确认信息
    ///
    /// # 返回
    /// - Ok(true): 确认成功
    /// - Ok(false): 告警不存在或已被确认（并发确认时由后到者感知）
    pub fn acknowledge_tx(
        tx: &Transaction,
        alert_id: &str,
        action: UserAction,
        notes: Option<&str>,
        actor: &str,
        at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let rows = tx.execute(
            r#"
            UPDATE inventory_alert
            SET acknowledged = 1,
                user_action = ?2,
                notes = ?3,
                acknowledged_by = ?4,
                acknowledged_at = ?5
            WHERE alert_id = ?1 AND acknowledged = 0
            "#,
            params![alert_id, action.as_str(), notes, actor, at],
        )?;
        Ok(rows == 1)
    }
}

fn prefixed_columns(alias: &str) -> String {
    ALERT_COLUMNS
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn map_alert_row(row: &Row) -> rusqlite::Result<InventoryAlert> {
    Ok(InventoryAlert {
        alert_id: row.get("alert_id")?,
        lot_id: row.get("lot_id")?,
        component_id: row.get("component_id")?,
        validation_cycle: row.get("validation_cycle")?,
        severity: get_enum(row, "severity", Severity::from_str)?,
        current_stock: row.get("current_stock")?,
        required_quantity: row.get("required_quantity")?,
        shortfall: row.get("shortfall")?,
        suggested_procurement_qty: row.get("suggested_procurement_qty")?,
        reason: row.get("reason")?,
        acknowledged: row.get("acknowledged")?,
        user_action: get_opt_enum(row, "user_action", UserAction::from_str)?,
        notes: row.get("notes")?,
        acknowledged_by: row.get("acknowledged_by")?,
        acknowledged_at: row.get("acknowledged_at")?,
        created_at: row.get("created_at")?,
    })
}
