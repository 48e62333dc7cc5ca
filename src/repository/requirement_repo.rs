// ==========================================
// BOM 告警引擎 - 批次需求行数据仓储
// ==========================================
// 用途: 持久化批次展开结果，重新校验时直接复用（不再依赖工艺结构）
// ==========================================

use crate::domain::bom::{ComponentRequirementLine, LotBom};
use crate::domain::lot::ProductionLot;
use crate::repository::db_utils::{decimal_to_sql, get_opt_decimal};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, Transaction};

pub struct RequirementRepository;

impl RequirementRepository {
    /// 写入批次需求行（保持展开顺序）
    pub fn insert_lines_tx(tx: &Transaction, lot_id: &str, bom: &LotBom) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO lot_requirement_line (
                lot_id, line_no, component_id, subprocess_id, quantity_per_unit,
                required_quantity, resolved_unit_cost, substitute_group_id, is_alternative
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )?;

        let mut count = 0;
        for (line_no, line) in bom.lines.iter().enumerate() {
            stmt.execute(params![
                lot_id,
                line_no as i64,
                line.component_id,
                line.subprocess_id,
                line.quantity_per_unit,
                line.required_quantity,
                decimal_to_sql(line.resolved_unit_cost),
                line.substitute_group_id,
                line.is_alternative,
            ])?;
            count += 1;
        }
        Ok(count)
    }

    /// 读取批次展开结果
    pub fn load_lot_bom_tx(conn: &Connection, lot: &ProductionLot) -> RepositoryResult<LotBom> {
        let mut stmt = conn.prepare(
            r#"
            SELECT component_id, subprocess_id, quantity_per_unit, required_quantity,
                   resolved_unit_cost, substitute_group_id, is_alternative
            FROM lot_requirement_line
            WHERE lot_id = ?1
            ORDER BY line_no
            "#,
        )?;

        let lines = stmt
            .query_map(params![lot.lot_id], |row| {
                Ok(ComponentRequirementLine {
                    component_id: row.get("component_id")?,
                    subprocess_id: row.get("subprocess_id")?,
                    quantity_per_unit: row.get("quantity_per_unit")?,
                    required_quantity: row.get("required_quantity")?,
                    resolved_unit_cost: get_opt_decimal(row, "resolved_unit_cost")?,
                    substitute_group_id: row.get("substitute_group_id")?,
                    is_alternative: row.get("is_alternative")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LotBom {
            process_id: lot.process_id.clone(),
            process_version: lot.process_version,
            lot_quantity: lot.quantity,
            lines,
        })
    }
}
