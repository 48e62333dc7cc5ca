// ==========================================
// BOM 告警引擎 - 生产批次领域模型
// ==========================================
// 说明: 本引擎只拥有 status / alert_summary 两个字段，
//       二者是由告警全集重算得到的投影，不可单独写入
// ==========================================

use crate::domain::inventory::AlertSummary;
use crate::domain::types::LotStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionLot - 生产批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionLot {
    pub lot_id: String,
    pub process_id: String,
    pub process_version: i32,
    pub quantity: f64,

    // ===== 投影字段 (本引擎独占) =====
    pub status: LotStatus,
    pub alert_summary: AlertSummary,
    pub validation_cycle: i32, // 当前有效校验轮次

    // ===== 元数据 =====
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub finalized_at: Option<NaiveDateTime>,
}

impl ProductionLot {
    pub fn is_finalized(&self) -> bool {
        self.status.is_terminal()
    }
}
