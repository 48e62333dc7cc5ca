// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================
#![allow(dead_code)]

use bom_alert_engine::config::AlertConfigReader;
use bom_alert_engine::domain::types::RecheckPolicy;
use std::error::Error;

/// Mock 配置结构
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub recheck_policy: RecheckPolicy,
    pub include_safety_buffer: bool,
    pub default_actor: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            recheck_policy: RecheckPolicy::ResetAll,
            include_safety_buffer: true,
            default_actor: "test_user".to_string(),
        }
    }
}

impl MockConfig {
    /// 重新校验沿用未变告警的确认
    pub fn preserve_unchanged() -> Self {
        Self {
            recheck_policy: RecheckPolicy::PreserveUnchanged,
            ..Self::default()
        }
    }

    /// 建议采购量不计安全库存
    pub fn without_safety_buffer() -> Self {
        Self {
            include_safety_buffer: false,
            ..Self::default()
        }
    }
}

impl AlertConfigReader for MockConfig {
    fn get_recheck_policy(&self) -> Result<RecheckPolicy, Box<dyn Error>> {
        Ok(self.recheck_policy)
    }

    fn get_include_safety_buffer(&self) -> Result<bool, Box<dyn Error>> {
        Ok(self.include_safety_buffer)
    }

    fn get_default_actor(&self) -> Result<String, Box<dyn Error>> {
        Ok(self.default_actor.clone())
    }

    fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        Ok(serde_json::json!({
            "recheck_policy": self.recheck_policy.as_str(),
            "procurement_include_safety_buffer": self.include_safety_buffer.to_string(),
            "default_actor": self.default_actor,
        })
        .to_string())
    }
}
