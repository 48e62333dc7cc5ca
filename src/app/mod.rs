// ==========================================
// BOM 告警引擎 - 应用层
// ==========================================
// 职责: 组装连接、仓储、配置与 API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
