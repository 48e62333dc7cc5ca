// ==========================================
// BOM 告警引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope)
// 说明: 非法取值回退默认值并告警，不中断业务
// ==========================================

use crate::config::alert_config_trait::AlertConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::RecheckPolicy;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }
}

// ==========================================
// AlertConfigReader Trait 实现
// ==========================================
impl AlertConfigReader for ConfigManager {
    fn get_recheck_policy(&self) -> Result<RecheckPolicy, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::RECHECK_POLICY, "RESET_ALL")?;
        Ok(RecheckPolicy::from_str(&value).unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::RECHECK_POLICY,
                raw_value = %value,
                "重新校验策略配置非法，使用 RESET_ALL"
            );
            RecheckPolicy::default()
        }))
    }

    fn get_include_safety_buffer(&self) -> Result<bool, Box<dyn Error>> {
        let value =
            self.get_config_or_default(config_keys::PROCUREMENT_INCLUDE_SAFETY_BUFFER, "true")?;
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => {
                tracing::warn!(
                    config_key = config_keys::PROCUREMENT_INCLUDE_SAFETY_BUFFER,
                    raw_value = %value,
                    "安全库存缓冲配置非法，使用 true"
                );
                Ok(true)
            }
        }
    }

    fn get_default_actor(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_ACTOR, "system")?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok("system".to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }

    fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 重新校验
    pub const RECHECK_POLICY: &str = "recheck_policy";

    // 采购建议
    pub const PROCUREMENT_INCLUDE_SAFETY_BUFFER: &str = "procurement_include_safety_buffer";

    // 审计
    pub const DEFAULT_ACTOR: &str = "default_actor";
}
