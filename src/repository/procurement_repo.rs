// ==========================================
// BOM 告警引擎 - 采购建议数据仓储
// ==========================================
// 约束: (lot_id, component_id) 唯一
// ==========================================

use crate::domain::procurement::{ProcurementRecommendation, RecommendationFilter};
use crate::domain::types::RecommendationStatus;
use crate::repository::db_utils::{decimal_to_sql, get_enum, get_opt_decimal};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const RECOMMENDATION_COLUMNS: &str = "recommendation_id, lot_id, component_id, supplier_id, \
     recommended_quantity, required_delivery_date, estimated_cost, status, lead_time_missing, \
     created_at, updated_at";

// ==========================================
// ProcurementRepository - 采购建议仓储
// ==========================================
pub struct ProcurementRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProcurementRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按条件查询采购建议
    pub fn list_by_filter(
        &self,
        filter: &RecommendationFilter,
    ) -> RepositoryResult<Vec<ProcurementRecommendation>> {
        let conn = self.get_conn()?;

        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(lot_id) = &filter.lot_id {
            clauses.push("lot_id = ?");
            values.push(Value::Text(lot_id.clone()));
        }
        if let Some(component_id) = &filter.component_id {
            clauses.push("component_id = ?");
            values.push(Value::Text(component_id.clone()));
        }
        if let Some(supplier_id) = &filter.supplier_id {
            clauses.push("supplier_id = ?");
            values.push(Value::Text(supplier_id.clone()));
        }
        if let Some(status) = filter.status {
            clauses.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if filter.lead_time_missing_only {
            clauses.push("lead_time_missing = 1");
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM procurement_recommendation {} ORDER BY lot_id, created_at, component_id",
            RECOMMENDATION_COLUMNS, where_sql
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), map_recommendation_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn find_by_id_tx(
        conn: &Connection,
        recommendation_id: &str,
    ) -> RepositoryResult<Option<ProcurementRecommendation>> {
        let sql = format!(
            "SELECT {} FROM procurement_recommendation WHERE recommendation_id = ?1",
            RECOMMENDATION_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![recommendation_id], map_recommendation_row)
            .optional()?)
    }

    pub fn list_by_lot_tx(conn: &Connection, lot_id: &str) -> RepositoryResult<Vec<ProcurementRecommendation>> {
        let sql = format!(
            "SELECT {} FROM procurement_recommendation WHERE lot_id = ?1 ORDER BY created_at, rowid",
            RECOMMENDATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![lot_id], map_recommendation_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_tx(tx: &Transaction, rec: &ProcurementRecommendation) -> RepositoryResult<()> {
        tx.execute(
            &format!(
                "INSERT INTO procurement_recommendation ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                RECOMMENDATION_COLUMNS
            ),
            params![
                rec.recommendation_id,
                rec.lot_id,
                rec.component_id,
                rec.supplier_id,
                rec.recommended_quantity,
                rec.required_delivery_date,
                decimal_to_sql(rec.estimated_cost),
                rec.status.as_str(),
                rec.lead_time_missing,
                rec.created_at,
                rec.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 覆盖建议内容（重新校验刷新用）
    pub fn update_tx(tx: &Transaction, rec: &ProcurementRecommendation) -> RepositoryResult<()> {
        let rows = tx.execute(
            r#"
            UPDATE procurement_recommendation
            SET supplier_id = ?2,
                recommended_quantity = ?3,
                required_delivery_date = ?4,
                estimated_cost = ?5,
                status = ?6,
                lead_time_missing = ?7,
                updated_at = ?8
            WHERE recommendation_id = ?1
            "#,
            params![
                rec.recommendation_id,
                rec.supplier_id,
                rec.recommended_quantity,
                rec.required_delivery_date,
                decimal_to_sql(rec.estimated_cost),
                rec.status.as_str(),
                rec.lead_time_missing,
                rec.updated_at,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found(
                "ProcurementRecommendation",
                &rec.recommendation_id,
            ));
        }
        Ok(())
    }

    /// 仅更新状态（以旧状态为条件，防止并发覆盖）
    ///
    /// # 返回
    /// - Ok(true): 更新成功
    /// - Ok(false): 当前状态已不是 `from`
    pub fn update_status_tx(
        tx: &Transaction,
        recommendation_id: &str,
        from: RecommendationStatus,
        to: RecommendationStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let rows = tx.execute(
            "UPDATE procurement_recommendation SET status = ?3, updated_at = ?4 \
             WHERE recommendation_id = ?1 AND status = ?2",
            params![recommendation_id, from.as_str(), to.as_str(), now],
        )?;
        Ok(rows == 1)
    }
}

fn map_recommendation_row(row: &Row) -> rusqlite::Result<ProcurementRecommendation> {
    Ok(ProcurementRecommendation {
        recommendation_id: row.get("recommendation_id")?,
        lot_id: row.get("lot_id")?,
        component_id: row.get("component_id")?,
        supplier_id: row.get("supplier_id")?,
        recommended_quantity: row.get("recommended_quantity")?,
        required_delivery_date: row.get("required_delivery_date")?,
        estimated_cost: get_opt_decimal(row, "estimated_cost")?,
        status: get_enum(row, "status", RecommendationStatus::from_str)?,
        lead_time_missing: row.get("lead_time_missing")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
