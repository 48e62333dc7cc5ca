// ==========================================
// BOM 告警引擎 - 告警配置读取 Trait
// ==========================================
// 职责: 定义校验/采购流程所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::RecheckPolicy;
use std::error::Error;

// ==========================================
// AlertConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）；测试中为 MockConfig
pub trait AlertConfigReader: Send + Sync {
    /// 重新校验策略
    ///
    /// # 默认值
    /// - RESET_ALL
    fn get_recheck_policy(&self) -> Result<RecheckPolicy, Box<dyn Error>>;

    /// 建议采购量是否计入安全库存
    ///
    /// # 默认值
    /// - true
    fn get_include_safety_buffer(&self) -> Result<bool, Box<dyn Error>>;

    /// 调用方未提供操作人时写入审计日志的操作人
    ///
    /// # 默认值
    /// - "system"
    fn get_default_actor(&self) -> Result<String, Box<dyn Error>>;

    /// 全部 global 配置的 JSON 快照
    fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>>;
}
