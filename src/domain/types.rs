// ==========================================
// 刺绣合同核算系统 - 领域类型定义
// ==========================================
// 职责: 状态枚举、班次、一致性告警
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 合同状态 (Contract Status)
// ==========================================
// 合同头状态,由外部协作方维护
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Draft,     // 草稿
    Active,    // 生效
    Completed, // 已完成
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractStatus::Draft => write!(f, "DRAFT"),
            ContractStatus::Active => write!(f, "ACTIVE"),
            ContractStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl ContractStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => ContractStatus::Active,
            "COMPLETED" => ContractStatus::Completed,
            _ => ContractStatus::Draft, // 默认值
        }
    }
}

// ==========================================
// 合同进度分类 (Contract Progress Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStatus {
    Completed,  // percent >= 100
    InProgress, // 0 < percent < 100
    Active,     // percent == 0
    Inactive,   // 合同已软删除
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStatus::Completed => write!(f, "COMPLETED"),
            ProgressStatus::InProgress => write!(f, "IN_PROGRESS"),
            ProgressStatus::Active => write!(f, "ACTIVE"),
            ProgressStatus::Inactive => write!(f, "INACTIVE"),
        }
    }
}

// ==========================================
// 外发单状态 (Clip Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClipStatus {
    Sent,              // 已发出
    PartiallyReceived, // 部分收回
    Completed,         // 全部收回
}

impl fmt::Display for ClipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipStatus::Sent => write!(f, "SENT"),
            ClipStatus::PartiallyReceived => write!(f, "PARTIALLY_RECEIVED"),
            ClipStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl ClipStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PARTIALLY_RECEIVED" => ClipStatus::PartiallyReceived,
            "COMPLETED" => ClipStatus::Completed,
            _ => ClipStatus::Sent,
        }
    }
}

// ==========================================
// 外发商-合同汇总状态 (Vendor Contract Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VendorContractStatus {
    Pending,   // 无外发记录
    Ongoing,   // 存在未完成外发
    Completed, // 全部外发已收回
}

impl fmt::Display for VendorContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VendorContractStatus::Pending => write!(f, "PENDING"),
            VendorContractStatus::Ongoing => write!(f, "ONGOING"),
            VendorContractStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

// ==========================================
// 班次 (Shift)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Shift {
    Day,   // 白班
    Night, // 夜班
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shift::Day => write!(f, "DAY"),
            Shift::Night => write!(f, "NIGHT"),
        }
    }
}

impl Shift {
    /// 从字符串解析班次 (未知值返回 None)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DAY" | "D" => Some(Shift::Day),
            "NIGHT" | "N" => Some(Shift::Night),
            _ => None,
        }
    }
}

// ==========================================
// 一致性告警 (Consistency Warning)
// ==========================================
// 软约束: 允许人工覆盖,随成功结果返回,由调用方决定是否提示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyWarning {
    /// 机台分配针数合计与计划总针数不一致
    AssignedSumMismatch {
        item_id: String,
        planned_stitches: f64,
        assigned_stitches: f64,
    },
    /// 已用针数超过计划总针数
    OverConsumption {
        item_id: String,
        planned_stitches: f64,
        used_stitches: f64,
    },
    /// 机台已用针数超过该机台分配针数
    MachineOverConsumption {
        item_id: String,
        machine_id: String,
        assigned_stitches: f64,
        used_stitches: f64,
    },
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyWarning::AssignedSumMismatch {
                item_id,
                planned_stitches,
                assigned_stitches,
            } => write!(
                f,
                "分配针数合计与计划不一致: item={}, planned={}, assigned={}",
                item_id, planned_stitches, assigned_stitches
            ),
            ConsistencyWarning::OverConsumption {
                item_id,
                planned_stitches,
                used_stitches,
            } => write!(
                f,
                "已用针数超过计划: item={}, planned={}, used={}",
                item_id, planned_stitches, used_stitches
            ),
            ConsistencyWarning::MachineOverConsumption {
                item_id,
                machine_id,
                assigned_stitches,
                used_stitches,
            } => write!(
                f,
                "机台已用针数超过分配: item={}, machine={}, assigned={}, used={}",
                item_id, machine_id, assigned_stitches, used_stitches
            ),
        }
    }
}

// ==========================================
// 变更结果 (Mutation Outcome)
// ==========================================
// 成功结果 + 零或多条软告警
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationOutcome<T> {
    pub value: T,
    pub warnings: Vec<ConsistencyWarning>,
}

impl<T> MutationOutcome<T> {
    pub fn new(value: T, warnings: Vec<ConsistencyWarning>) -> Self {
        Self { value, warnings }
    }

    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
