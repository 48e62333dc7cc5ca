// ==========================================
// BOM 告警引擎 - 生产批次数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: status / alert_summary_json 只通过 update_projection_tx 写入
// ==========================================

use crate::domain::inventory::AlertSummary;
use crate::domain::lot::ProductionLot;
use crate::domain::types::LotStatus;
use crate::repository::db_utils::get_enum;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const LOT_COLUMNS: &str = "lot_id, process_id, process_version, quantity, status, \
     alert_summary_json, validation_cycle, created_at, updated_at, finalized_at";

// ==========================================
// LotRepository - 生产批次仓储
// ==========================================
pub struct LotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LotRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按 ID 查询批次
    pub fn find_by_id(&self, lot_id: &str) -> RepositoryResult<Option<ProductionLot>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, lot_id)
    }

    // ==========================================
    // 事务内操作（调用方持有事务）
    // ==========================================

    /// 查询批次（可在事务内调用）
    pub fn find_by_id_tx(conn: &Connection, lot_id: &str) -> RepositoryResult<Option<ProductionLot>> {
        let sql = format!("SELECT {} FROM production_lot WHERE lot_id = ?1", LOT_COLUMNS);
        let lot = conn
            .query_row(&sql, params![lot_id], map_lot_row)
            .optional()?;
        Ok(lot)
    }

    /// 插入新批次
    pub fn insert_tx(tx: &Transaction, lot: &ProductionLot) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO production_lot (
                lot_id, process_id, process_version, quantity, status,
                alert_summary_json, validation_cycle, created_at, updated_at, finalized_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                lot.lot_id,
                lot.process_id,
                lot.process_version,
                lot.quantity,
                lot.status.as_str(),
                serde_json::to_string(&lot.alert_summary)?,
                lot.validation_cycle,
                lot.created_at,
                lot.updated_at,
                lot.finalized_at,
            ],
        )?;
        Ok(())
    }

    /// 写入投影字段（状态 + 告警汇总 + 当前轮次）
    ///
    /// # 返回
    /// - Ok(()): 更新成功
    /// - Err(NotFound): 批次不存在
    pub fn update_projection_tx(
        tx: &Transaction,
        lot_id: &str,
        status: LotStatus,
        summary: &AlertSummary,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let finalized_at = if status == LotStatus::Finalized {
            Some(now)
        } else {
            None
        };

        let rows = tx.execute(
            r#"
            UPDATE production_lot
            SET status = ?2,
                alert_summary_json = ?3,
                validation_cycle = ?4,
                updated_at = ?5,
                finalized_at = COALESCE(finalized_at, ?6)
            WHERE lot_id = ?1
            "#,
            params![
                lot_id,
                status.as_str(),
                serde_json::to_string(summary)?,
                summary.validation_cycle,
                now,
                finalized_at,
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::not_found("ProductionLot", lot_id));
        }
        Ok(())
    }
}

fn map_lot_row(row: &Row) -> rusqlite::Result<ProductionLot> {
    let summary_json: String = row.get("alert_summary_json")?;
    let alert_summary: AlertSummary = serde_json::from_str(&summary_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(ProductionLot {
        lot_id: row.get("lot_id")?,
        process_id: row.get("process_id")?,
        process_version: row.get("process_version")?,
        quantity: row.get("quantity")?,
        status: get_enum(row, "status", LotStatus::from_str)?,
        alert_summary,
        validation_cycle: row.get("validation_cycle")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        finalized_at: row.get("finalized_at")?,
    })
}
