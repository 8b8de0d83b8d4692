// ==========================================
// 刺绣合同核算系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 操作人由身份协作方提供,仅用于审计,核心逻辑不读取
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,         // 操作类型 (ActionType 的字符串形式)
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub contract_id: Option<String>,
    pub item_id: Option<String>,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

impl ActionLog {
    /// 以当前时间创建日志
    pub fn new(
        action_type: ActionType,
        actor: &str,
        contract_id: Option<&str>,
        item_id: Option<&str>,
        payload_json: Option<JsonValue>,
        detail: String,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            contract_id: contract_id.map(str::to_string),
            item_id: item_id.map(str::to_string),
            payload_json,
            detail: Some(detail),
        }
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateContract,       // 创建合同
    UpdateContractStatus, // 修改合同状态
    DeactivateContract,   // 软删除合同
    AddItem,              // 新增明细
    UpdateItemInputs,     // 修改计价录入
    UpdateItemDetails,    // 修改描述字段
    OverrideRatePerRepeat, // 覆写每循环单价
    DeactivateItem,       // 软删除明细
    UpsertMachine,        // 新增/修改机台
    SaveAssignments,      // 保存机台分配
    RecordEntry,          // 录入生产记录
    UpdateEntry,          // 修改生产记录
    RescanItem,           // 全量重算累计
    CreateVendor,         // 新增外发商
    SendClipping,         // 外发
    ReceiveClipping,      // 外发收回
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::CreateContract => "CREATE_CONTRACT",
            ActionType::UpdateContractStatus => "UPDATE_CONTRACT_STATUS",
            ActionType::DeactivateContract => "DEACTIVATE_CONTRACT",
            ActionType::AddItem => "ADD_ITEM",
            ActionType::UpdateItemInputs => "UPDATE_ITEM_INPUTS",
            ActionType::UpdateItemDetails => "UPDATE_ITEM_DETAILS",
            ActionType::OverrideRatePerRepeat => "OVERRIDE_RATE_PER_REPEAT",
            ActionType::DeactivateItem => "DEACTIVATE_ITEM",
            ActionType::UpsertMachine => "UPSERT_MACHINE",
            ActionType::SaveAssignments => "SAVE_ASSIGNMENTS",
            ActionType::RecordEntry => "RECORD_ENTRY",
            ActionType::UpdateEntry => "UPDATE_ENTRY",
            ActionType::RescanItem => "RESCAN_ITEM",
            ActionType::CreateVendor => "CREATE_VENDOR",
            ActionType::SendClipping => "SEND_CLIPPING",
            ActionType::ReceiveClipping => "RECEIVE_CLIPPING",
        };
        write!(f, "{}", s)
    }
}
