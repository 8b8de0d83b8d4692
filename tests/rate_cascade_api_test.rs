// ==========================================
// 计价级联 API 集成测试
// ==========================================
// 测试范围:
// 1. 完整级联 (S/Rs/G/R/P -> 各级单价与金额)
// 2. 非数字/带千分位输入
// 3. 计价参数从 config_kv 读取
// 4. 写操作留痕 (action_log)
// ==========================================

mod support;

use embroidery_costing::api::{ItemDetails, RawRateInputs};
use embroidery_costing::app::AppState;
use embroidery_costing::config::config_keys;
use embroidery_costing::domain::CommonFieldsLock;
use support::api_test_helper::*;

#[test]
fn test_full_cascade_from_raw_inputs() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let contract = env.contract("HT-RATE", "2026-01-01");
    let item = env.item(&contract.contract_id, 1000.0, 5.0);

    assert_eq!(item.rates.calculated_rate, Some(0.1385));
    assert_eq!(item.rates.rate_per_repeat, Some(1.4002));
    assert_eq!(item.rates.total_rate, Some(7.001));
    assert_eq!(item.rates.heads, 12);
    assert_eq!(item.rates.rate_per_piece, Some(0.1167));
    assert_eq!(item.rates.piece_amount, Some(2.8008));
    assert_eq!(item.rates.final_total_rate, Some(10.0));

    // 持久化后读回一致
    let loaded = env.state.contract_api.get_item(&item.item_id).unwrap();
    assert_eq!(loaded.rates, item.rates);
}

#[test]
fn test_non_numeric_and_thousands_separator() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let contract = env.contract("HT-RATE", "2026-01-01");

    let raw = RawRateInputs {
        stitch_per_repeat: Some("1,000".to_string()),
        rate_per_stitch: Some("0.05".to_string()),
        cost_factor: Some("10.11".to_string()),
        repeat_count: Some("5".to_string()),
        ..Default::default()
    };
    let item = env
        .state
        .contract_api
        .add_item(
            &contract.contract_id,
            &ItemDetails::default(),
            &raw,
            &CommonFieldsLock::Unlocked,
            OPERATOR,
        )
        .unwrap();
    assert_eq!(item.inputs.stitch_per_repeat, Some(1000.0));
    assert_eq!(item.rates.calculated_rate, Some(0.1385));

    // 非数字视为未录入: 依赖它的派生字段不产生
    let raw = RawRateInputs {
        stitch_per_repeat: Some("abc".to_string()),
        rate_per_stitch: Some("0.05".to_string()),
        cost_factor: Some("10.11".to_string()),
        ..Default::default()
    };
    let item = env
        .state
        .contract_api
        .add_item(
            &contract.contract_id,
            &ItemDetails::default(),
            &raw,
            &CommonFieldsLock::Unlocked,
            OPERATOR,
        )
        .unwrap();
    assert_eq!(item.inputs.stitch_per_repeat, None);
    assert_eq!(item.rates.calculated_rate, None);
    assert_eq!(item.rates.rate_per_repeat, None);
    assert_eq!(item.rates.heads, 12);
    assert_eq!(item.planned_total_stitches(), 0.0);
}

#[test]
fn test_cascade_parameters_loaded_from_config() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.state
        .config_manager
        .set_global_config_value(config_keys::RATE_MULTIPLIER, "3")
        .unwrap();
    env.state
        .config_manager
        .set_global_config_value(
            config_keys::COST_FACTOR_HEADS,
            r#"[{"cost_factor":10.11,"heads":10}]"#,
        )
        .unwrap();

    // 参数在启动时读取
    let state = AppState::new(env.db_path.clone()).unwrap();
    let contract = state
        .contract_api
        .create_contract("HT-CFG", None, "2026-01-01", None, OPERATOR)
        .unwrap();
    let item = state
        .contract_api
        .add_item(
            &contract.contract_id,
            &ItemDetails::default(),
            &rate_inputs(1000.0, 5.0),
            &CommonFieldsLock::Unlocked,
            OPERATOR,
        )
        .unwrap();

    assert_eq!(item.rates.calculated_rate, Some(0.15));
    assert_eq!(item.rates.rate_per_repeat, Some(1.5165));
    assert_eq!(item.rates.heads, 10);
}

#[test]
fn test_writes_are_audited() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let contract = env.contract("HT-LOG", "2026-01-01");
    let item = env.item(&contract.contract_id, 1000.0, 5.0);
    env.state
        .contract_api
        .override_rate_per_repeat(&item.item_id, "2.4", OPERATOR)
        .unwrap();

    // 失败的写操作不留痕
    assert!(env
        .state
        .contract_api
        .override_rate_per_repeat(&item.item_id, "-1", OPERATOR)
        .is_err());

    let logs = env
        .state
        .action_log_repo
        .find_by_contract(&contract.contract_id, 10)
        .unwrap();
    let types: Vec<&str> = logs.iter().map(|l| l.action_type.as_str()).collect();
    assert_eq!(logs.len(), 3);
    assert!(types.contains(&"CREATE_CONTRACT"));
    assert!(types.contains(&"ADD_ITEM"));
    assert!(types.contains(&"OVERRIDE_RATE_PER_REPEAT"));
    assert!(logs.iter().all(|l| l.actor == OPERATOR));
}

#[test]
fn test_non_numeric_update_keeps_stored_inputs_and_override() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let contract = env.contract("HT-KEEP", "2026-01-01");
    let item = env.item(&contract.contract_id, 1000.0, 50.0);
    env.state
        .contract_api
        .override_rate_per_repeat(&item.item_id, "2.4", OPERATOR)
        .unwrap();

    let mut raw = rate_inputs(1000.0, 50.0);
    raw.stitch_per_repeat = Some("abc".to_string());
    let updated = env
        .state
        .contract_api
        .update_item_inputs(&item.item_id, &raw, OPERATOR)
        .unwrap();

    // 非数字针数不清空计划量,派生值与录入一致,覆写不丢失
    assert_eq!(updated.inputs.stitch_per_repeat, Some(1000.0));
    assert_eq!(updated.planned_total_stitches(), 50000.0);
    assert_eq!(updated.rates.calculated_rate, Some(0.1385));
    assert!(updated.rate_per_repeat_overridden);
    assert_eq!(updated.rates.rate_per_repeat, Some(2.4));

    let progress = env.state.progress_api.item_progress(&item.item_id).unwrap();
    assert_eq!(progress.planned, 50000.0);

    // 数值变化才丢弃覆写
    let updated = env
        .state
        .contract_api
        .update_item_inputs(&item.item_id, &rate_inputs(2000.0, 50.0), OPERATOR)
        .unwrap();
    assert!(!updated.rate_per_repeat_overridden);
    assert_eq!(updated.rates.rate_per_repeat, Some(2.8005));
    assert_eq!(updated.planned_total_stitches(), 100000.0);
}
