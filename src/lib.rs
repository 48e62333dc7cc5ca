// ==========================================
// BOM 告警引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 备料决策支持 (人工确认告警，引擎只计算与记录)
// 数据流: 工艺结构 → BOM 展开 → 成本汇总 / 库存校验 → 告警 → 采购建议 → 批次状态
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{LotStatus, RecheckPolicy, RecommendationStatus, Severity, UserAction};

// 领域实体
pub use domain::{
    ActionLog, ActionType, InventoryAlert, ProcessStructure, ProcurementRecommendation,
    ProductionLot,
};

// 引擎
pub use engine::{
    AlertBuilder, BomExpander, CostAggregator, InventoryValidator, LotStatusCoordinator,
    ProcurementRecommender,
};

// API
pub use api::{AlertApi, ApiError, ApiResult, LotApi, ProcurementApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "BOM 告警引擎";
