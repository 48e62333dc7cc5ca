// ==========================================
// 告警确认 / 批次下达 集成测试
// ==========================================
// 目标: 单条确认、批量全有或全无、下达闸门、已下达批次冻结
// ==========================================


#[path = "helpers/mock_config.rs"]
mod mock_config;

#[cfg(test)]
mod alert_acknowledge_test {
    use crate::mock_config::MockConfig;
    use crate::test_helpers::*;
    use bom_alert_engine::api::{
        AcknowledgeBulkRequest, AcknowledgeItem, AcknowledgeRequest, ApiError, CreateLotRequest,
    };
    use bom_alert_engine::domain::inventory::InventoryAlert;
    use bom_alert_engine::domain::types::{LotStatus, Severity, UserAction};
    use std::sync::Arc;

    fn env() -> TestEnv {
        TestEnv::new(Arc::new(MockConfig::default()))
    }

    /// 建批次: components 中每个构件单位用量 1, 批次数量 10
    fn create_lot(env: &TestEnv, lot_id: &str, components: &[&str]) -> Vec<InventoryAlert> {
        let slots = components.iter().map(|c| single(c, 1.0)).collect();
        env.lot_api
            .create_lot_with_validation(CreateLotRequest {
                lot_id: Some(lot_id.to_string()),
                process_structure: flat_structure("P-1", slots),
                lot_quantity: 10.0,
                actor: None,
            })
            .unwrap()
            .alerts
    }

    fn ack(alert_id: &str, action: UserAction) -> AcknowledgeRequest {
        AcknowledgeRequest {
            alert_id: alert_id.to_string(),
            user_action: action,
            notes: Some("已与采购确认".to_string()),
            actor: Some("planner_a".to_string()),
        }
    }

    fn item(alert_id: &str, action: UserAction) -> AcknowledgeItem {
        AcknowledgeItem {
            alert_id: alert_id.to_string(),
            user_action: action,
            notes: None,
        }
    }

    // ==========================================
    // 单条确认
    // ==========================================

    #[test]
    fn test_ack_only_critical_unblocks_finalize() {
        let env = env();
        env.with_conn(|conn| {
            seed_full(conn, "C-ZERO", "1.00", 0.0, 5.0, 0.0);
            seed_full(conn, "C-PLENTY", "1.00", 500.0, 5.0, 0.0);
        });
        let alerts = create_lot(&env, "LOT-D", &["C-ZERO", "C-PLENTY"]);
        let critical = alerts.iter().find(|a| a.severity == Severity::Critical).unwrap();

        // 下达被阻断，附阻断告警
        let err = env.lot_api.finalize("LOT-D", None).unwrap_err();
        match &err {
            ApiError::Conflict { blocking_alerts, .. } => {
                assert_eq!(blocking_alerts.len(), 1);
                assert_eq!(blocking_alerts[0].alert_id, critical.alert_id);
            }
            other => panic!("Expected Conflict, got {:?}", other),
        }
        assert_eq!(err.to_response().blocking_alerts.len(), 1);

        let response = env
            .alert_api
            .acknowledge(ack(&critical.alert_id, UserAction::Proceed))
            .unwrap();
        assert_eq!(response.updated_lot_status, LotStatus::Ready);
        assert!(response.alert.acknowledged);
        assert_eq!(response.alert.user_action, Some(UserAction::Proceed));
        assert_eq!(response.alert.acknowledged_by.as_deref(), Some("planner_a"));
        assert_eq!(response.alert.notes.as_deref(), Some("已与采购确认"));
        assert!(response.alert.acknowledged_at.is_some());
        assert_eq!(response.alert_summary.acknowledged, 1);
        assert_eq!(response.alert_summary.unacknowledged_critical, 0);

        let finalized = env.lot_api.finalize("LOT-D", Some("planner_a")).unwrap();
        assert_eq!(finalized.lot_status, LotStatus::Finalized);

        let lot = env.lot_api.get_lot("LOT-D").unwrap();
        assert_eq!(lot.status, LotStatus::Finalized);
        assert!(lot.finalized_at.is_some());
    }

    #[test]
    fn test_ack_critical_with_remaining_high_is_partial() {
        let env = env();
        env.with_conn(|conn| {
            seed_full(conn, "C-ZERO", "1.00", 0.0, 0.0, 0.0);
            seed_full(conn, "C-SHORT", "1.00", 4.0, 0.0, 0.0);
        });
        let alerts = create_lot(&env, "LOT-1", &["C-ZERO", "C-SHORT"]);

        let response = env
            .alert_api
            .acknowledge(ack(&alerts[0].alert_id, UserAction::Substitute))
            .unwrap();
        assert_eq!(response.updated_lot_status, LotStatus::PartialFulfillmentRequired);

        // 未确认 HIGH 不阻断下达
        let finalized = env.lot_api.finalize("LOT-1", None).unwrap();
        assert_eq!(finalized.lot_status, LotStatus::Finalized);
    }

    #[test]
    fn test_delay_puts_lot_on_hold_and_blocks_finalize() {
        let env = env();
        env.with_conn(|conn| {
            seed_full(conn, "C-ZERO", "1.00", 0.0, 0.0, 0.0);
            seed_full(conn, "C-SHORT", "1.00", 4.0, 0.0, 0.0);
        });
        let alerts = create_lot(&env, "LOT-1", &["C-ZERO", "C-SHORT"]);
        let high = &alerts[1];
        assert_eq!(high.severity, Severity::High);

        // DELAY 覆盖仍未确认的 CRITICAL
        let response = env
            .alert_api
            .acknowledge(ack(&high.alert_id, UserAction::Delay))
            .unwrap();
        assert_eq!(response.updated_lot_status, LotStatus::OnHold);
        assert!(response.alert_summary.on_hold);

        // 再确认 CRITICAL 仍保持 ON_HOLD
        let response = env
            .alert_api
            .acknowledge(ack(&alerts[0].alert_id, UserAction::Proceed))
            .unwrap();
        assert_eq!(response.updated_lot_status, LotStatus::OnHold);

        let err = env.lot_api.finalize("LOT-1", None).unwrap_err();
        match err {
            ApiError::Conflict { blocking_alerts, .. } => {
                assert_eq!(blocking_alerts.len(), 1);
                assert_eq!(blocking_alerts[0].alert_id, high.alert_id);
            }
            other => panic!("Expected Conflict, got {:?}", other),
        }
        assert_eq!(env.lot_api.get_lot("LOT-1").unwrap().status, LotStatus::OnHold);
    }

    #[test]
    fn test_double_ack_is_conflict() {
        let env = env();
        env.with_conn(|conn| seed_full(conn, "C-ZERO", "1.00", 0.0, 0.0, 0.0));
        let alerts = create_lot(&env, "LOT-1", &["C-ZERO"]);

        env.alert_api
            .acknowledge(ack(&alerts[0].alert_id, UserAction::Proceed))
            .unwrap();
        let err = env
            .alert_api
            .acknowledge(ack(&alerts[0].alert_id, UserAction::Delay))
            .unwrap_err();
        match err {
            ApiError::Conflict { blocking_alerts, .. } => {
                assert_eq!(blocking_alerts[0].user_action, Some(UserAction::Proceed));
            }
            other => panic!("Expected Conflict, got {:?}", other),
        }
        // 第一次确认保留
        let current = env.alert_repo.find_by_id(&alerts[0].alert_id).unwrap().unwrap();
        assert_eq!(current.user_action, Some(UserAction::Proceed));
    }

    #[test]
    fn test_ack_unknown_alert_is_not_found() {
        let env = env();
        let err = env
            .alert_api
            .acknowledge(ack("NO-SUCH-ALERT", UserAction::Proceed))
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_finalized_lot_rejects_every_event() {
        let env = env();
        env.with_conn(|conn| {
            seed_full(conn, "C-OK", "1.00", 500.0, 0.0, 0.0);
            seed_full(conn, "C-SHORT", "1.00", 4.0, 0.0, 0.0);
        });
        let alerts = create_lot(&env, "LOT-F", &["C-OK", "C-SHORT"]);
        env.lot_api.finalize("LOT-F", None).unwrap();

        let err = env
            .alert_api
            .acknowledge(ack(&alerts[1].alert_id, UserAction::Proceed))
            .unwrap_err();
        assert!(matches!(err, ApiError::LotFinalized { .. }));

        let err = env
            .alert_api
            .acknowledge_bulk(AcknowledgeBulkRequest {
                lot_id: "LOT-F".to_string(),
                items: vec![item(&alerts[1].alert_id, UserAction::Proceed)],
                actor: None,
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::LotFinalized { .. }));

        let err = env.lot_api.check_inventory("LOT-F", None).unwrap_err();
        assert!(matches!(err, ApiError::LotFinalized { .. }));

        let err = env.lot_api.finalize("LOT-F", None).unwrap_err();
        assert_eq!(err.code(), "LOT_FINALIZED");

        // 告警未被改动
        assert_eq!(env.alert_repo.count_acknowledged("LOT-F").unwrap(), 0);
    }

    // ==========================================
    // 批量确认
    // ==========================================

    fn seed_five_critical(env: &TestEnv) -> Vec<InventoryAlert> {
        let components = ["C-1", "C-2", "C-3", "C-4", "C-5"];
        env.with_conn(|conn| {
            for c in components {
                seed_full(conn, c, "1.00", 0.0, 0.0, 0.0);
            }
        });
        create_lot(env, "LOT-E", &components)
    }

    #[test]
    fn test_bulk_with_one_unknown_id_rejects_all() {
        let env = env();
        let alerts = seed_five_critical(&env);

        let mut items: Vec<AcknowledgeItem> = alerts[..4]
            .iter()
            .map(|a| item(&a.alert_id, UserAction::Proceed))
            .collect();
        items.push(item("NO-SUCH-ALERT", UserAction::Proceed));

        let err = env
            .alert_api
            .acknowledge_bulk(AcknowledgeBulkRequest {
                lot_id: "LOT-E".to_string(),
                items,
                actor: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        assert_eq!(env.alert_repo.count_acknowledged("LOT-E").unwrap(), 0);
        let lot = env.lot_api.get_lot("LOT-E").unwrap();
        assert_eq!(lot.status, LotStatus::PendingProcurement);
        assert_eq!(lot.alert_summary.unacknowledged_critical, 5);
        assert!(env
            .action_log_repo
            .list_by_lot("LOT-E")
            .unwrap()
            .iter()
            .all(|l| l.action_type != "AcknowledgeBulk"));
    }

    #[test]
    fn test_bulk_acknowledges_all_atomically() {
        let env = env();
        let alerts = seed_five_critical(&env);

        let items = alerts
            .iter()
            .map(|a| item(&a.alert_id, UserAction::PartialFulfill))
            .collect();
        let response = env
            .alert_api
            .acknowledge_bulk(AcknowledgeBulkRequest {
                lot_id: "LOT-E".to_string(),
                items,
                actor: Some("planner_b".to_string()),
            })
            .unwrap();

        assert_eq!(response.acknowledged_count, 5);
        assert_eq!(response.updated_lot_status, LotStatus::Ready);
        assert_eq!(response.alert_summary.acknowledged, 5);
        assert_eq!(env.alert_repo.count_acknowledged("LOT-E").unwrap(), 5);

        let logs = env.action_log_repo.list_by_lot("LOT-E").unwrap();
        let bulk = logs.iter().find(|l| l.action_type == "AcknowledgeBulk").unwrap();
        assert_eq!(bulk.actor, "planner_b");
    }

    #[test]
    fn test_bulk_rejects_duplicates_and_empty() {
        let env = env();
        let alerts = seed_five_critical(&env);

        let err = env
            .alert_api
            .acknowledge_bulk(AcknowledgeBulkRequest {
                lot_id: "LOT-E".to_string(),
                items: vec![
                    item(&alerts[0].alert_id, UserAction::Proceed),
                    item(&alerts[0].alert_id, UserAction::Delay),
                ],
                actor: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err = env
            .alert_api
            .acknowledge_bulk(AcknowledgeBulkRequest {
                lot_id: "LOT-E".to_string(),
                items: vec![],
                actor: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(env.alert_repo.count_acknowledged("LOT-E").unwrap(), 0);
    }

    #[test]
    fn test_bulk_rejects_foreign_and_acknowledged_alerts() {
        let env = env();
        let alerts = seed_five_critical(&env);
        let other = create_lot(&env, "LOT-OTHER", &["C-1"]);

        let err = env
            .alert_api
            .acknowledge_bulk(AcknowledgeBulkRequest {
                lot_id: "LOT-E".to_string(),
                items: vec![
                    item(&alerts[0].alert_id, UserAction::Proceed),
                    item(&other[0].alert_id, UserAction::Proceed),
                ],
                actor: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        env.alert_api
            .acknowledge(ack(&alerts[1].alert_id, UserAction::Proceed))
            .unwrap();
        let err = env
            .alert_api
            .acknowledge_bulk(AcknowledgeBulkRequest {
                lot_id: "LOT-E".to_string(),
                items: vec![
                    item(&alerts[0].alert_id, UserAction::Proceed),
                    item(&alerts[1].alert_id, UserAction::Proceed),
                ],
                actor: None,
            })
            .unwrap_err();
        match err {
            ApiError::Conflict { blocking_alerts, .. } => {
                assert_eq!(blocking_alerts[0].alert_id, alerts[1].alert_id);
            }
            other => panic!("Expected Conflict, got {:?}", other),
        }
        assert_eq!(env.alert_repo.count_acknowledged("LOT-E").unwrap(), 1);
    }

    #[test]
    fn test_superseded_alert_cannot_be_acknowledged() {
        let env = env();
        env.with_conn(|conn| seed_full(conn, "C-ZERO", "1.00", 0.0, 0.0, 0.0));
        let first = create_lot(&env, "LOT-1", &["C-ZERO"]);

        env.lot_api.check_inventory("LOT-1", None).unwrap();

        let err = env
            .alert_api
            .acknowledge(ack(&first[0].alert_id, UserAction::Proceed))
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");

        let err = env
            .alert_api
            .acknowledge_bulk(AcknowledgeBulkRequest {
                lot_id: "LOT-1".to_string(),
                items: vec![item(&first[0].alert_id, UserAction::Proceed)],
                actor: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[test]
    fn test_reacknowledge_does_not_double_count() {
        let env = env();
        env.with_conn(|conn| {
            seed_full(conn, "C-1", "1.00", 0.0, 0.0, 0.0);
            seed_full(conn, "C-2", "1.00", 0.0, 0.0, 0.0);
        });
        let alerts = create_lot(&env, "LOT-1", &["C-1", "C-2"]);

        let first = env
            .alert_api
            .acknowledge(ack(&alerts[0].alert_id, UserAction::Proceed))
            .unwrap();
        assert_eq!(first.alert_summary.acknowledged, 1);
        assert_eq!(first.alert_summary.unacknowledged_critical, 1);
        assert_eq!(first.updated_lot_status, LotStatus::PendingProcurement);

        let _ = env
            .alert_api
            .acknowledge(ack(&alerts[0].alert_id, UserAction::Proceed))
            .unwrap_err();
        let lot = env.lot_api.get_lot("LOT-1").unwrap();
        assert_eq!(lot.alert_summary.acknowledged, 1);
        assert_eq!(lot.alert_summary.total, 2);
    }
}
