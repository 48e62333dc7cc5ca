// ==========================================
// BOM 告警引擎 - 外部主数据只读仓储
// ==========================================
// 数据源: component / component_stock / inventory_alert_rule / supplier_component
// 红线: 只读，本引擎从不修改库存
// ==========================================

use crate::domain::bom::PriceBook;
use crate::domain::inventory::{AppliedRule, ComponentStockInput, InventoryAlertRule};
use crate::domain::procurement::SupplierLeadTime;
use crate::repository::db_utils::{build_in_clause, get_opt_decimal};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params_from_iter, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct StockRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StockRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取构件标准单价（模板估算用）
    pub fn load_price_book(&self, component_ids: &[String]) -> RepositoryResult<PriceBook> {
        let conn = self.get_conn()?;
        Self::load_price_book_tx(&conn, component_ids)
    }

    // ==========================================
    // 事务内读取
    // ==========================================

    /// 构件标准单价；unit_cost 为空的构件不出现在结果中
    pub fn load_price_book_tx(conn: &Connection, component_ids: &[String]) -> RepositoryResult<PriceBook> {
        let sql = format!(
            "SELECT component_id, unit_cost FROM component WHERE {} AND unit_cost IS NOT NULL",
            build_in_clause("component_id", component_ids)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(component_ids.iter()), |row| {
            Ok((row.get::<_, String>("component_id")?, get_opt_decimal(row, "unit_cost")?))
        })?;

        let mut prices = PriceBook::new();
        for row in rows {
            let (component_id, cost) = row?;
            if let Some(cost) = cost {
                prices.insert(component_id, cost);
            }
        }
        Ok(prices)
    }

    /// 库存快照 + 告警规则
    ///
    /// # 返回
    /// - 有库存记录或有规则的构件才出现在结果中
    /// - 无库存记录的构件 current_stock = None；无规则的构件 rule = Fallback
    pub fn load_stock_inputs_tx(
        conn: &Connection,
        component_ids: &[String],
    ) -> RepositoryResult<HashMap<String, ComponentStockInput>> {
        let mut stock: HashMap<String, f64> = HashMap::new();
        {
            let sql = format!(
                "SELECT component_id, current_stock FROM component_stock WHERE {}",
                build_in_clause("component_id", component_ids)
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(component_ids.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?;
            for row in rows {
                let (id, qty) = row?;
                stock.insert(id, qty);
            }
        }

        let mut rules: HashMap<String, InventoryAlertRule> = HashMap::new();
        {
            let sql = format!(
                "SELECT component_id, safety_stock_quantity, reorder_point_quantity, \
                        alert_threshold_percentage \
                 FROM inventory_alert_rule WHERE {}",
                build_in_clause("component_id", component_ids)
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(component_ids.iter()), |row| {
                Ok(InventoryAlertRule {
                    component_id: row.get(0)?,
                    safety_stock_quantity: row.get(1)?,
                    reorder_point_quantity: row.get(2)?,
                    alert_threshold_percentage: row.get(3)?,
                })
            })?;
            for row in rows {
                let rule = row?;
                rules.insert(rule.component_id.clone(), rule);
            }
        }

        let mut inputs = HashMap::new();
        for id in component_ids {
            let current_stock = stock.get(id).copied();
            let rule = rules.remove(id);
            if current_stock.is_none() && rule.is_none() {
                continue;
            }
            inputs.insert(
                id.clone(),
                ComponentStockInput {
                    current_stock,
                    rule: AppliedRule::from_option(rule),
                },
            );
        }
        Ok(inputs)
    }

    /// 供应商交期（component_id → 供应商列表）
    pub fn load_suppliers_tx(
        conn: &Connection,
        component_ids: &[String],
    ) -> RepositoryResult<HashMap<String, Vec<SupplierLeadTime>>> {
        let sql = format!(
            "SELECT supplier_id, component_id, lead_time_days, unit_price, is_preferred \
             FROM supplier_component WHERE {} ORDER BY component_id, supplier_id",
            build_in_clause("component_id", component_ids)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(component_ids.iter()), |row| {
            Ok(SupplierLeadTime {
                supplier_id: row.get("supplier_id")?,
                component_id: row.get("component_id")?,
                lead_time_days: row.get("lead_time_days")?,
                unit_price: get_opt_decimal(row, "unit_price")?,
                is_preferred: row.get("is_preferred")?,
            })
        })?;

        let mut map: HashMap<String, Vec<SupplierLeadTime>> = HashMap::new();
        for row in rows {
            let s = row?;
            map.entry(s.component_id.clone()).or_default().push(s);
        }
        Ok(map)
    }
}
