// ==========================================
// BOM 告警引擎 - 数据库工具模块
// ==========================================
// 职责: IN 子句构建 / 金额与枚举列的编解码
// 说明: 金额以 TEXT 存储（Decimal 原样字符串），避免 REAL 精度损失
// ==========================================

use rusqlite::types::Type;
use rusqlite::Row;
use rust_decimal::Decimal;
use std::str::FromStr;

/// 构建 IN 子句的 SQL 片段
///
/// # 返回
/// - 例如: "component_id IN (?, ?, ?)"
/// - 空列表返回永假条件 "1 = 0"
///
/// # 示例
/// ```
/// use bom_alert_engine::repository::db_utils::build_in_clause;
///
/// let ids = vec!["C-1".to_string(), "C-2".to_string()];
/// assert_eq!(build_in_clause("component_id", &ids), "component_id IN (?, ?)");
///
/// let empty: Vec<String> = vec![];
/// assert_eq!(build_in_clause("component_id", &empty), "1 = 0");
/// ```
pub fn build_in_clause<T: AsRef<str>>(column_name: &str, values: &[T]) -> String {
    if values.is_empty() {
        return "1 = 0".to_string();
    }

    let placeholders = values.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    format!("{} IN ({})", column_name, placeholders)
}

/// Decimal → TEXT
pub fn decimal_to_sql(value: Option<Decimal>) -> Option<String> {
    value.map(|v| v.to_string())
}

/// 读取可空金额列
pub fn get_opt_decimal(row: &Row, column: &str) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(column)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => Decimal::from_str(s.trim())
            .map(Some)
            .map_err(|e| conversion_error(row, column, e.to_string())),
    }
}

/// 读取枚举列（as_str / from_str 约定）
pub fn get_enum<T>(row: &Row, column: &str, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    parse(&raw).ok_or_else(|| conversion_error(row, column, format!("未知取值: {}", raw)))
}

/// 读取可空枚举列
pub fn get_opt_enum<T>(
    row: &Row,
    column: &str,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(column)?;
    match raw {
        None => Ok(None),
        Some(s) => parse(&s)
            .map(Some)
            .ok_or_else(|| conversion_error(row, column, format!("未知取值: {}", s))),
    }
}

fn conversion_error(row: &Row, column: &str, message: String) -> rusqlite::Error {
    let idx = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("{}: {}", column, message).into(),
    )
}
