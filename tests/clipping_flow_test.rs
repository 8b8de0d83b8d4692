// ==========================================
// 外发剪花流程集成测试
// ==========================================
// 测试范围:
// 1. 外发/分次收回/状态推导
// 2. 超收、非正数量、早于发出日期 均拒绝
// 3. 外发商进度 (按合同 + 总体)
// ==========================================

mod support;

use embroidery_costing::api::ApiError;
use embroidery_costing::domain::{ClipStatus, VendorContractStatus};
use support::api_test_helper::*;

#[test]
fn test_send_and_partial_receipts() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let contract = env.contract("HT-CLIP", "2026-01-01");
    let item = env.item(&contract.contract_id, 1000.0, 10.0);
    let vendor = env.vendor("剪花A");

    let api = &env.state.clipping_api;
    let clip = api
        .send(&item.item_id, &vendor.vendor_id, "100", "2026-01-05", OPERATOR)
        .unwrap();
    assert_eq!(clip.status, ClipStatus::Sent);
    assert_eq!(clip.contract_id, contract.contract_id);

    let clip = api.receive(&clip.clip_id, "40", "2026-01-06", OPERATOR).unwrap();
    assert_eq!(clip.quantity_received, 40);
    assert_eq!(clip.status, ClipStatus::PartiallyReceived);

    // 超收拒绝,状态不变
    let err = api.receive(&clip.clip_id, "61", "2026-01-07", OPERATOR).unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)));
    assert_eq!(api.get_clip(&clip.clip_id).unwrap().quantity_received, 40);

    let clip = api.receive(&clip.clip_id, "60", "2026-01-08", OPERATOR).unwrap();
    assert_eq!(clip.quantity_received, 100);
    assert_eq!(clip.status, ClipStatus::Completed);
    assert_eq!(clip.last_received_date.map(|d| d.to_string()), Some("2026-01-08".to_string()));

    // 已完成后再收
    assert!(api.receive(&clip.clip_id, "1", "2026-01-09", OPERATOR).is_err());
}

#[test]
fn test_invalid_quantities_and_dates() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let contract = env.contract("HT-CLIP", "2026-01-01");
    let item = env.item(&contract.contract_id, 1000.0, 10.0);
    let vendor = env.vendor("剪花A");
    let api = &env.state.clipping_api;

    assert!(api.send(&item.item_id, &vendor.vendor_id, "0", "2026-01-05", OPERATOR).is_err());
    assert!(api.send(&item.item_id, &vendor.vendor_id, "-3", "2026-01-05", OPERATOR).is_err());
    assert!(api.send(&item.item_id, &vendor.vendor_id, "abc", "2026-01-05", OPERATOR).is_err());
    assert!(matches!(
        api.send(&item.item_id, "no-such-vendor", "10", "2026-01-05", OPERATOR),
        Err(ApiError::NotFound(_))
    ));

    let clip = api
        .send(&item.item_id, &vendor.vendor_id, "10", "2026-01-05", OPERATOR)
        .unwrap();
    assert!(api.receive(&clip.clip_id, "0", "2026-01-06", OPERATOR).is_err());
    assert!(api.receive(&clip.clip_id, "5", "2026-01-04", OPERATOR).is_err());
    assert_eq!(api.get_clip(&clip.clip_id).unwrap().status, ClipStatus::Sent);

    // 明细停用后不可外发
    env.state
        .contract_api
        .deactivate_item(&item.item_id, OPERATOR)
        .unwrap();
    assert!(matches!(
        api.send(&item.item_id, &vendor.vendor_id, "10", "2026-01-05", OPERATOR),
        Err(ApiError::ValidationError(_))
    ));
}

#[test]
fn test_vendor_progress_by_contract() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let c1 = env.contract("HT-1", "2026-01-01");
    let c2 = env.contract("HT-2", "2026-01-01");
    let i1 = env.item(&c1.contract_id, 1000.0, 10.0);
    let i2 = env.item(&c2.contract_id, 1000.0, 10.0);
    let vendor = env.vendor("剪花A");
    let other = env.vendor("剪花B");
    let api = &env.state.clipping_api;

    let a = api.send(&i1.item_id, &vendor.vendor_id, "100", "2026-01-05", OPERATOR).unwrap();
    let b = api.send(&i2.item_id, &vendor.vendor_id, "50", "2026-01-05", OPERATOR).unwrap();
    api.send(&i2.item_id, &other.vendor_id, "999", "2026-01-05", OPERATOR).unwrap();

    api.receive(&a.clip_id, "100", "2026-01-06", OPERATOR).unwrap();
    api.receive(&b.clip_id, "25", "2026-01-06", OPERATOR).unwrap();

    let progress = api.vendor_progress(&vendor.vendor_id).unwrap();
    assert_eq!(progress.quantity_sent, 150);
    assert_eq!(progress.quantity_received, 125);
    assert_eq!(progress.contracts.len(), 2);

    let p1 = progress.contracts.iter().find(|c| c.contract_id == c1.contract_id).unwrap();
    assert_eq!(p1.status, VendorContractStatus::Completed);
    assert_eq!(p1.percent, 100.0);
    let p2 = progress.contracts.iter().find(|c| c.contract_id == c2.contract_id).unwrap();
    assert_eq!(p2.status, VendorContractStatus::Ongoing);
    assert_eq!(p2.percent, 50.0);

    // 无外发记录的外发商
    let idle = env.vendor("剪花C");
    let progress = api.vendor_progress(&idle.vendor_id).unwrap();
    assert_eq!(progress.quantity_sent, 0);
    assert_eq!(progress.percent, 0.0);
    assert!(progress.contracts.is_empty());
}
