// ==========================================
// 刺绣合同核算系统 - 公共字段锁定状态机
// ==========================================
// 同一合同连续录入多条明细时,锁定公共计价字段供后续明细继承
// 状态: Unlocked -> Locked -> AwaitingConfirm -> (confirm) -> Unlocked
// 不可变: 每次转换消费旧状态,返回新状态
// ==========================================

use crate::domain::contract_item::RateInputs;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ==========================================
// CommonFields - 公共计价字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommonFields {
    pub rate_per_stitch: Option<f64>,
    pub cost_factor: Option<f64>,
    pub motif_rate: Option<f64>,
    pub lace_rate: Option<f64>,
}

impl CommonFields {
    /// 从录入字段提取公共字段
    pub fn from_inputs(inputs: &RateInputs) -> Self {
        Self {
            rate_per_stitch: inputs.rate_per_stitch,
            cost_factor: inputs.cost_factor,
            motif_rate: inputs.motif_rate,
            lace_rate: inputs.lace_rate,
        }
    }

    /// 用公共字段覆盖录入字段 (公共字段为空时保留原值)
    pub fn overlay(&self, inputs: RateInputs) -> RateInputs {
        RateInputs {
            rate_per_stitch: self.rate_per_stitch.or(inputs.rate_per_stitch),
            cost_factor: self.cost_factor.or(inputs.cost_factor),
            motif_rate: self.motif_rate.or(inputs.motif_rate),
            lace_rate: self.lace_rate.or(inputs.lace_rate),
            ..inputs
        }
    }
}

/// 非法状态转换
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无效的状态转换: from={from} to={to}")]
pub struct InvalidLockTransition {
    pub from: String,
    pub to: String,
}

// ==========================================
// CommonFieldsLock - 锁定状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "fields", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommonFieldsLock {
    Unlocked,
    Locked(CommonFields),
    AwaitingConfirm(CommonFields),
}

impl Default for CommonFieldsLock {
    fn default() -> Self {
        CommonFieldsLock::Unlocked
    }
}

impl fmt::Display for CommonFieldsLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommonFieldsLock::Unlocked => write!(f, "UNLOCKED"),
            CommonFieldsLock::Locked(_) => write!(f, "LOCKED"),
            CommonFieldsLock::AwaitingConfirm(_) => write!(f, "AWAITING_CONFIRM"),
        }
    }
}

impl CommonFieldsLock {
    fn reject(self, to: &str) -> InvalidLockTransition {
        InvalidLockTransition {
            from: self.to_string(),
            to: to.to_string(),
        }
    }

    /// Unlocked -> Locked
    pub fn lock(self, fields: CommonFields) -> Result<Self, InvalidLockTransition> {
        match self {
            CommonFieldsLock::Unlocked => Ok(CommonFieldsLock::Locked(fields)),
            other => Err(other.reject("LOCKED")),
        }
    }

    /// Locked -> AwaitingConfirm
    pub fn request_unlock(self) -> Result<Self, InvalidLockTransition> {
        match self {
            CommonFieldsLock::Locked(fields) => Ok(CommonFieldsLock::AwaitingConfirm(fields)),
            other => Err(other.reject("AWAITING_CONFIRM")),
        }
    }

    /// AwaitingConfirm -> Unlocked
    pub fn confirm_unlock(self) -> Result<Self, InvalidLockTransition> {
        match self {
            CommonFieldsLock::AwaitingConfirm(_) => Ok(CommonFieldsLock::Unlocked),
            other => Err(other.reject("UNLOCKED")),
        }
    }

    /// AwaitingConfirm -> Locked
    pub fn cancel_unlock(self) -> Result<Self, InvalidLockTransition> {
        match self {
            CommonFieldsLock::AwaitingConfirm(fields) => Ok(CommonFieldsLock::Locked(fields)),
            other => Err(other.reject("LOCKED")),
        }
    }

    /// 当前生效的锁定字段 (等待确认期间仍然生效)
    pub fn locked_fields(&self) -> Option<&CommonFields> {
        match self {
            CommonFieldsLock::Unlocked => None,
            CommonFieldsLock::Locked(fields) | CommonFieldsLock::AwaitingConfirm(fields) => {
                Some(fields)
            }
        }
    }

    /// 解析新明细的录入字段: 锁定时公共字段以锁定值为准
    pub fn resolve_inputs(&self, inputs: RateInputs) -> RateInputs {
        match self.locked_fields() {
            Some(fields) => fields.overlay(inputs),
            None => inputs,
        }
    }
}
