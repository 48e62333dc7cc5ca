// ==========================================
// BOM 告警引擎 - 配置层
// ==========================================
// 职责: 系统配置读取与写入
// 存储: config_kv 表
// ==========================================

pub mod alert_config_trait;
pub mod config_manager;

// 重导出核心配置管理器
pub use alert_config_trait::AlertConfigReader;
pub use config_manager::{config_keys, ConfigManager};
