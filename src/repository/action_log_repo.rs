// ==========================================
// BOM 告警引擎 - 操作日志数据仓储
// ==========================================
// 红线: 所有写入必须记录；日志与业务写入同事务
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入操作日志（事务内）
    ///
    /// # 返回
    /// - `Ok(action_id)`
    pub fn insert_tx(tx: &Transaction, log: &ActionLog) -> RepositoryResult<String> {
        tx.execute(
            r#"
            INSERT INTO action_log (
                action_id, lot_id, action_type, action_ts, actor, payload_json, detail
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                log.action_id,
                log.lot_id,
                log.action_type,
                log.action_ts,
                log.actor,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;
        Ok(log.action_id.clone())
    }

    /// 查询批次操作日志（按时间正序）
    pub fn list_by_lot(&self, lot_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, lot_id, action_type, action_ts, actor, payload_json, detail
            FROM action_log
            WHERE lot_id = ?1
            ORDER BY action_ts, rowid
            "#,
        )?;

        let logs = stmt
            .query_map(params![lot_id], |row| {
                let payload: Option<String> = row.get("payload_json")?;
                Ok(ActionLog {
                    action_id: row.get("action_id")?,
                    lot_id: row.get("lot_id")?,
                    action_type: row.get("action_type")?,
                    action_ts: row.get("action_ts")?,
                    actor: row.get("actor")?,
                    payload_json: payload.and_then(|s| serde_json::from_str(&s).ok()),
                    detail: row.get("detail")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }
}
