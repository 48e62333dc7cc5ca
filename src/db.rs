// ==========================================
// BOM 告警引擎 - SQLite 连接初始化 / 建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - ensure_schema 幂等建表，记录 schema_version
// 说明: component / component_stock / inventory_alert_rule / supplier_component
//       为外部主数据，本引擎只读，不对其加外键
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id    TEXT NOT NULL,
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    PRIMARY KEY (scope_id, key)
);

-- ===== 外部主数据（只读） =====

CREATE TABLE IF NOT EXISTS component (
    component_id  TEXT PRIMARY KEY,
    name          TEXT,
    unit_cost     TEXT
);

CREATE TABLE IF NOT EXISTS component_stock (
    component_id   TEXT PRIMARY KEY,
    current_stock  REAL NOT NULL,
    updated_at     TEXT
);

CREATE TABLE IF NOT EXISTS inventory_alert_rule (
    component_id                TEXT PRIMARY KEY,
    safety_stock_quantity       REAL NOT NULL DEFAULT 0,
    reorder_point_quantity      REAL NOT NULL DEFAULT 0,
    alert_threshold_percentage  REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS supplier_component (
    supplier_id     TEXT NOT NULL,
    component_id    TEXT NOT NULL,
    lead_time_days  INTEGER NOT NULL,
    unit_price      TEXT,
    is_preferred    INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (supplier_id, component_id)
);

-- ===== 本引擎写入 =====

CREATE TABLE IF NOT EXISTS production_lot (
    lot_id              TEXT PRIMARY KEY,
    process_id          TEXT NOT NULL,
    process_version     INTEGER NOT NULL,
    quantity            REAL NOT NULL,
    status              TEXT NOT NULL,
    alert_summary_json  TEXT NOT NULL,
    validation_cycle    INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    finalized_at        TEXT
);

CREATE TABLE IF NOT EXISTS lot_requirement_line (
    lot_id               TEXT NOT NULL REFERENCES production_lot(lot_id),
    line_no              INTEGER NOT NULL,
    component_id         TEXT NOT NULL,
    subprocess_id        TEXT NOT NULL,
    quantity_per_unit    REAL NOT NULL,
    required_quantity    REAL NOT NULL,
    resolved_unit_cost   TEXT,
    substitute_group_id  TEXT,
    is_alternative       INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (lot_id, line_no),
    UNIQUE (lot_id, component_id)
);

CREATE TABLE IF NOT EXISTS inventory_alert (
    alert_id                   TEXT PRIMARY KEY,
    lot_id                     TEXT NOT NULL REFERENCES production_lot(lot_id),
    component_id               TEXT NOT NULL,
    validation_cycle           INTEGER NOT NULL,
    severity                   TEXT NOT NULL,
    current_stock              REAL NOT NULL,
    required_quantity          REAL NOT NULL,
    shortfall                  REAL NOT NULL,
    suggested_procurement_qty  REAL NOT NULL,
    reason                     TEXT NOT NULL,
    acknowledged               INTEGER NOT NULL DEFAULT 0,
    user_action                TEXT,
    notes                      TEXT,
    acknowledged_by            TEXT,
    acknowledged_at            TEXT,
    created_at                 TEXT NOT NULL,
    UNIQUE (lot_id, component_id, validation_cycle)
);
CREATE INDEX IF NOT EXISTS idx_alert_lot_cycle ON inventory_alert(lot_id, validation_cycle);

CREATE TABLE IF NOT EXISTS procurement_recommendation (
    recommendation_id       TEXT PRIMARY KEY,
    lot_id                  TEXT NOT NULL REFERENCES production_lot(lot_id),
    component_id            TEXT NOT NULL,
    supplier_id             TEXT,
    recommended_quantity    REAL NOT NULL,
    required_delivery_date  TEXT,
    estimated_cost          TEXT,
    status                  TEXT NOT NULL,
    lead_time_missing       INTEGER NOT NULL DEFAULT 0,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL,
    UNIQUE (lot_id, component_id)
);
CREATE INDEX IF NOT EXISTS idx_recommendation_status ON procurement_recommendation(status);

CREATE TABLE IF NOT EXISTS action_log (
    action_id     TEXT PRIMARY KEY,
    lot_id        TEXT,
    action_type   TEXT NOT NULL,
    action_ts     TEXT NOT NULL,
    actor         TEXT NOT NULL,
    payload_json  TEXT,
    detail        TEXT
);
CREATE INDEX IF NOT EXISTS idx_action_lot_ts ON action_log(lot_id, action_ts);
"#;

/// 幂等建表，并记录 schema_version
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [CURRENT_SCHEMA_VERSION],
    )?;

    let version = read_schema_version(conn)?;
    if version != Some(CURRENT_SCHEMA_VERSION) {
        tracing::warn!(
            expected = CURRENT_SCHEMA_VERSION,
            actual = ?version,
            "schema_version 与当前代码不一致"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_read_schema_version_without_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }

    #[test]
    fn test_alert_unique_per_cycle() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO production_lot VALUES ('L1','P',1,10,'READY','{}',1,'2026-01-01 00:00:00','2026-01-01 00:00:00',NULL)",
            [],
        )
        .unwrap();
        let insert = "INSERT INTO inventory_alert (alert_id, lot_id, component_id, validation_cycle, severity, \
                      current_stock, required_quantity, shortfall, suggested_procurement_qty, reason, created_at) \
                      VALUES (?1, 'L1', 'C1', 1, 'OK', 0, 0, 0, 0, '', '2026-01-01 00:00:00')";
        conn.execute(insert, ["A1"]).unwrap();
        assert!(conn.execute(insert, ["A2"]).is_err());
    }
}
