// ==========================================
// BOM 告警引擎 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{AlertApi, LotApi, ProcurementApi};
use crate::config::{AlertConfigReader, ConfigManager};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::{
    ActionLogRepository, AlertRepository, LotRepository, ProcurementRepository, StockRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源；所有仓储与 API 共用同一连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 生产批次API
    pub lot_api: Arc<LotApi>,

    /// 告警确认API
    pub alert_api: Arc<AlertApi>,

    /// 采购建议API
    pub procurement_api: Arc<ProcurementApi>,

    /// 配置管理器（读写 config_kv）
    pub config_manager: Arc<ConfigManager>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开连接并幂等建表
    /// 2. 初始化所有Repository
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let lot_repo = Arc::new(LotRepository::new(conn.clone()));
        let alert_repo = Arc::new(AlertRepository::new(conn.clone()));
        let stock_repo = Arc::new(StockRepository::new(conn.clone()));
        let procurement_repo = Arc::new(ProcurementRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // 配置管理器
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config: Arc<dyn AlertConfigReader> = config_manager.clone();

        // ==========================================
        // 初始化API层
        // ==========================================
        let lot_api = Arc::new(LotApi::new(
            conn.clone(),
            config.clone(),
            lot_repo,
            alert_repo,
            stock_repo,
        ));
        let alert_api = Arc::new(AlertApi::new(conn.clone(), config.clone()));
        let procurement_api = Arc::new(ProcurementApi::new(conn, config, procurement_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            lot_api,
            alert_api,
            procurement_api,
            config_manager,
            action_log_repo,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 BOM_ALERT_DB_PATH（非空时）
/// - 否则: 用户数据目录/bom-alert-engine/bom_alert.db
/// - 取不到用户数据目录时: ./bom_alert.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("BOM_ALERT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./bom_alert.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("bom-alert-engine");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("bom_alert.db");
        }
    }

    path.to_string_lossy().to_string()
}
