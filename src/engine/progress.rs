// ==========================================
// 刺绣合同核算系统 - 进度汇总引擎
// ==========================================
// 职责: 明细 -> 合同 -> 外发商 的完成度与进度分类
// ==========================================
// remaining = max(0, planned - used)
// percent   = min(100, used / planned × 100) (planned > 0),否则 0
// 合同进度按针数加权: Σused / Σplanned
// 剩余天数 = ceil(预计天数合计) - 已过天数 (可为负,表示逾期)
// ==========================================

use crate::domain::clipping::{ClippingItem, Vendor};
use crate::domain::contract::Contract;
use crate::domain::contract_item::ContractItem;
use crate::domain::machine::MachineAssignment;
use crate::domain::types::{ProgressStatus, VendorContractStatus};
use crate::engine::allocation::AllocationLedger;
use crate::engine::clipping::ClippingLedger;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 完成百分比
pub fn completion_percent(used: f64, planned: f64) -> f64 {
    if planned > 0.0 {
        (used / planned * 100.0).min(100.0)
    } else {
        0.0
    }
}

// ==========================================
// 输出结构
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProgress {
    pub item_id: String,
    pub planned: f64,
    pub used: f64,
    pub remaining: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractProgress {
    pub contract_id: String,
    pub planned: f64,
    pub used: f64,
    pub remaining: f64,
    pub percent: f64,
    pub status: ProgressStatus,
    pub items: Vec<ItemProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaysLeft {
    pub contract_id: String,
    pub total_estimated_days: i64,
    pub elapsed_days: i64,
    pub days_left: i64,
    pub overdue: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorContractProgress {
    pub contract_id: String,
    pub quantity_sent: i64,
    pub quantity_received: i64,
    pub percent: f64,
    pub status: VendorContractStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorProgress {
    pub vendor_id: String,
    pub vendor_name: String,
    pub quantity_sent: i64,
    pub quantity_received: i64,
    pub percent: f64,
    pub contracts: Vec<VendorContractProgress>,
}

/// 合同综合报表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractReport {
    pub contract_id: String,
    pub contract_no: String,
    pub progress: ContractProgress,
    pub days_left: DaysLeft,
    pub clipping: Vec<VendorContractProgress>,
}

// ==========================================
// ProgressAggregator - 进度汇总引擎
// ==========================================
pub struct ProgressAggregator {
    // 无状态引擎
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self {}
    }

    /// 进度分类
    pub fn classify(percent: f64, contract_active: bool) -> ProgressStatus {
        if !contract_active {
            ProgressStatus::Inactive
        } else if percent >= 100.0 {
            ProgressStatus::Completed
        } else if percent > 0.0 {
            ProgressStatus::InProgress
        } else {
            ProgressStatus::Active
        }
    }

    /// 明细进度
    pub fn item_progress(&self, item: &ContractItem) -> ItemProgress {
        let planned = item.planned_total_stitches();
        let used = item.used_stitches;
        ItemProgress {
            item_id: item.item_id.clone(),
            planned,
            used,
            remaining: (planned - used).max(0.0),
            percent: completion_percent(used, planned),
        }
    }

    /// 合同进度 (仅统计该合同下有效明细)
    pub fn contract_progress(&self, contract: &Contract, items: &[ContractItem]) -> ContractProgress {
        let items: Vec<ItemProgress> = items
            .iter()
            .filter(|i| i.is_active && i.contract_id == contract.contract_id)
            .map(|i| self.item_progress(i))
            .collect();

        let planned: f64 = items.iter().map(|p| p.planned).sum();
        let used: f64 = items.iter().map(|p| p.used).sum();
        let percent = completion_percent(used, planned);

        ContractProgress {
            contract_id: contract.contract_id.clone(),
            planned,
            used,
            remaining: (planned - used).max(0.0),
            percent,
            status: Self::classify(percent, contract.is_active),
            items,
        }
    }

    /// 剩余天数
    ///
    /// # 参数
    /// - `assignments`: 合同下全部有效明细的机台分配
    /// - `today`: 计算基准日
    pub fn days_left(
        &self,
        contract: &Contract,
        assignments: &[MachineAssignment],
        today: NaiveDate,
    ) -> DaysLeft {
        let total_estimated_days = AllocationLedger::total_estimated_days(assignments);
        let elapsed_days = contract.elapsed_days(today);
        let days_left = total_estimated_days - elapsed_days;

        DaysLeft {
            contract_id: contract.contract_id.clone(),
            total_estimated_days,
            elapsed_days,
            days_left,
            overdue: days_left < 0,
        }
    }

    /// 按合同汇总外发
    pub fn clipping_by_contract(&self, clips: &[ClippingItem]) -> Vec<VendorContractProgress> {
        let mut grouped: BTreeMap<&str, Vec<ClippingItem>> = BTreeMap::new();
        for clip in clips {
            grouped
                .entry(clip.contract_id.as_str())
                .or_default()
                .push(clip.clone());
        }

        grouped
            .into_iter()
            .map(|(contract_id, items)| {
                let quantity_sent: i64 = items.iter().map(|c| c.quantity_sent).sum();
                let quantity_received: i64 = items.iter().map(|c| c.quantity_received).sum();
                VendorContractProgress {
                    contract_id: contract_id.to_string(),
                    quantity_sent,
                    quantity_received,
                    percent: completion_percent(quantity_received as f64, quantity_sent as f64),
                    status: ClippingLedger::contract_status(&items),
                }
            })
            .collect()
    }

    /// 外发商进度 (按合同 + 总体)
    pub fn vendor_progress(&self, vendor: &Vendor, clips: &[ClippingItem]) -> VendorProgress {
        let own: Vec<ClippingItem> = clips
            .iter()
            .filter(|c| c.vendor_id == vendor.vendor_id)
            .cloned()
            .collect();

        let quantity_sent: i64 = own.iter().map(|c| c.quantity_sent).sum();
        let quantity_received: i64 = own.iter().map(|c| c.quantity_received).sum();

        VendorProgress {
            vendor_id: vendor.vendor_id.clone(),
            vendor_name: vendor.vendor_name.clone(),
            quantity_sent,
            quantity_received,
            percent: completion_percent(quantity_received as f64, quantity_sent as f64),
            contracts: self.clipping_by_contract(&own),
        }
    }
}
