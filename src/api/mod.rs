// ==========================================
// BOM 告警引擎 - API 层
// ==========================================
// 职责: 提供业务 API 接口（事务边界、审计、错误映射）
// ==========================================

pub mod alert_api;
pub mod error;
pub mod lot_api;
pub mod procurement_api;
pub mod validation_cycle;

// 重导出核心类型
pub use alert_api::{
    AcknowledgeBulkRequest, AcknowledgeBulkResponse, AcknowledgeItem, AcknowledgeRequest,
    AcknowledgeResponse, AlertApi,
};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use lot_api::{
    CheckInventoryResponse, CreateLotRequest, CreateLotResponse, FinalizeResponse, LotApi,
    LotCostSummary,
};
pub use procurement_api::{ProcurementApi, RecommendationListResponse};
