// ==========================================
// BOM 告警引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: `*_tx` 关联函数在调用方持有的事务/连接上执行
// ==========================================

pub mod action_log_repo;
pub mod alert_repo;
pub mod db_utils;
pub mod error;
pub mod lot_repo;
pub mod procurement_repo;
pub mod requirement_repo;
pub mod stock_repo;
pub mod transaction;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use alert_repo::AlertRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use lot_repo::LotRepository;
pub use procurement_repo::ProcurementRepository;
pub use requirement_repo::RequirementRepository;
pub use stock_repo::StockRepository;
