// ==========================================
// BOM 告警引擎 - 批次状态协调器
// ==========================================
// 职责: 由告警全集重算批次状态与告警汇总；显式状态迁移表
// 红线:
// - 状态是告警全集的投影，每次变更都全量重算，不做增量修补
// - FINALIZED 为终态，之后任何告警变更均被拒绝
// 判定顺序:
// 1. 存在已确认且动作为 DELAY 的告警   → ON_HOLD
// 2. 存在未确认 CRITICAL               → PENDING_PROCUREMENT
// 3. 存在未确认 HIGH                   → PARTIAL_FULFILLMENT_REQUIRED
// 4. 其他                              → READY
// ==========================================

use crate::domain::inventory::{AlertSummary, InventoryAlert};
use crate::domain::types::{LotStatus, Severity, UserAction};
use thiserror::Error;

// ==========================================
// LotEvent - 批次事件
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotEvent {
    /// 告警确认（单条或批量）
    Acknowledge(UserAction),
    /// 手动重新校验
    Recheck,
    /// 下达
    Finalize,
}

// ==========================================
// TransitionError - 迁移被拒绝
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    #[error("批次已下达，禁止变更")]
    LotFinalized,

    #[error("批次无法下达: {reason}")]
    Blocked {
        reason: String,
        blocking_alert_ids: Vec<String>,
    },
}

// ==========================================
// LotStatusCoordinator - 批次状态协调器
// ==========================================
pub struct LotStatusCoordinator;

impl Default for LotStatusCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl LotStatusCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// 由告警全集计算批次状态
    pub fn compute_status(&self, alerts: &[InventoryAlert]) -> LotStatus {
        if alerts.iter().any(|a| a.is_on_hold()) {
            LotStatus::OnHold
        } else if alerts.iter().any(|a| a.is_blocking()) {
            LotStatus::PendingProcurement
        } else if alerts
            .iter()
            .any(|a| !a.acknowledged && a.severity == Severity::High)
        {
            LotStatus::PartialFulfillmentRequired
        } else {
            LotStatus::Ready
        }
    }

    /// 告警汇总
    pub fn summarize(&self, alerts: &[InventoryAlert], validation_cycle: i32) -> AlertSummary {
        let mut summary = AlertSummary {
            validation_cycle,
            ..Default::default()
        };
        for alert in alerts {
            summary.by_severity.increment(alert.severity);
            summary.total += 1;
            if alert.acknowledged {
                summary.acknowledged += 1;
            } else if alert.severity == Severity::Critical {
                summary.unacknowledged_critical += 1;
            } else if alert.severity == Severity::High {
                summary.unacknowledged_high += 1;
            }
            if alert.is_on_hold() {
                summary.on_hold = true;
            }
        }
        summary
    }

    /// 状态 + 汇总（投影一次算完）
    pub fn project(&self, alerts: &[InventoryAlert], validation_cycle: i32) -> (LotStatus, AlertSummary) {
        (self.compute_status(alerts), self.summarize(alerts, validation_cycle))
    }

    /// 状态迁移表: 当前状态 × 事件 → 新状态
    ///
    /// # 参数
    /// - `current`: 批次当前状态
    /// - `event`: 触发事件
    /// - `alerts`: 事件生效后的告警全集（确认/重新校验已应用）
    ///
    /// # 规则
    /// - FINALIZED × 任意事件 → LotFinalized
    /// - 非终态 × Acknowledge/Recheck → 全量重算
    /// - READY / PARTIAL / PENDING × Finalize → 无未确认 CRITICAL 时 FINALIZED
    /// - ON_HOLD × Finalize → 拒绝（需先重新校验解除 DELAY）
    pub fn transition(
        &self,
        current: LotStatus,
        event: LotEvent,
        alerts: &[InventoryAlert],
    ) -> Result<LotStatus, TransitionError> {
        match (current, event) {
            (LotStatus::Finalized, _) => Err(TransitionError::LotFinalized),

            (_, LotEvent::Acknowledge(_)) | (_, LotEvent::Recheck) => {
                Ok(self.compute_status(alerts))
            }

            (LotStatus::OnHold, LotEvent::Finalize) => Err(TransitionError::Blocked {
                reason: "批次处于 ON_HOLD（存在 DELAY 确认）".to_string(),
                blocking_alert_ids: alerts
                    .iter()
                    .filter(|a| a.is_on_hold())
                    .map(|a| a.alert_id.clone())
                    .collect(),
            }),

            (
                LotStatus::Ready | LotStatus::PartialFulfillmentRequired | LotStatus::PendingProcurement,
                LotEvent::Finalize,
            ) => {
                let blocking = self.blocking_alerts(alerts);
                if blocking.is_empty() {
                    Ok(LotStatus::Finalized)
                } else {
                    Err(TransitionError::Blocked {
                        reason: format!("存在 {} 条未确认 CRITICAL 告警", blocking.len()),
                        blocking_alert_ids: blocking.iter().map(|a| a.alert_id.clone()).collect(),
                    })
                }
            }
        }
    }

    /// 阻断下达的告警（未确认 CRITICAL）
    pub fn blocking_alerts<'a>(&self, alerts: &'a [InventoryAlert]) -> Vec<&'a InventoryAlert> {
        alerts.iter().filter(|a| a.is_blocking()).collect()
    }
}
