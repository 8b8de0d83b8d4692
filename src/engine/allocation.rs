// ==========================================
// 刺绣合同核算系统 - 机台分配引擎
// ==========================================
// 职责: 将明细计划针数分配到多个机台,计算预计天数
// 红线: avg_stitches_per_day <= 0 拒绝整次保存
// 红线: 分配合计 != 计划总针数 只告警,不拒绝 (允许人工覆盖)
// ==========================================

use crate::domain::contract_item::ContractItem;
use crate::domain::machine::{Machine, MachineAssignment};
use crate::domain::types::ConsistencyWarning;
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::instrument;

/// 针数比较容差
const STITCH_TOLERANCE: f64 = 1e-6;

// ==========================================
// AssignmentInput - 单机台分配输入 (已完成数值解析)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentInput {
    pub machine_id: String,
    pub assigned_stitches: f64,
    pub avg_stitches_per_day: f64,
    pub repeats: f64,
}

// ==========================================
// AllocationPlan - 分配结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub item_id: String,
    pub assignments: Vec<MachineAssignment>,
    pub planned_total_stitches: f64,
    pub assigned_total_stitches: f64,
    pub total_estimated_days: i64,
    pub warnings: Vec<ConsistencyWarning>,
}

// ==========================================
// AllocationLedger - 机台分配引擎
// ==========================================
pub struct AllocationLedger {
    // 无状态引擎
}

impl Default for AllocationLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationLedger {
    pub fn new() -> Self {
        Self {}
    }

    /// 预计天数 = ceil(分配针数 / 日均针数)
    pub fn estimated_days(assigned_stitches: f64, avg_stitches_per_day: f64) -> EngineResult<i64> {
        if !avg_stitches_per_day.is_finite() || avg_stitches_per_day <= 0.0 {
            return Err(EngineError::validation(
                "avg_stitches_per_day",
                format!("日均针数必须大于0 (实际={})", avg_stitches_per_day),
            ));
        }
        Ok((assigned_stitches / avg_stitches_per_day).ceil() as i64)
    }

    /// 生成明细的整体分配方案
    ///
    /// # 参数
    /// - `item`: 合同明细 (必须有效)
    /// - `machines`: 已查到的机台 (输入中出现但不在此列表的机台视为不存在)
    /// - `inputs`: 分配输入
    ///
    /// # 返回
    /// - Ok(AllocationPlan): 分配方案 + 软告警
    /// - Err(EngineError): 任一硬约束违反,整次保存拒绝
    #[instrument(skip(self, item, machines, inputs), fields(
        item_id = %item.item_id,
        input_count = inputs.len()
    ))]
    pub fn plan(
        &self,
        item: &ContractItem,
        machines: &[Machine],
        inputs: &[AssignmentInput],
    ) -> EngineResult<AllocationPlan> {
        if !item.is_active {
            return Err(EngineError::inactive("ContractItem", &item.item_id));
        }
        if inputs.is_empty() {
            return Err(EngineError::validation("assignments", "至少需要一个机台分配"));
        }

        let mut seen = HashSet::new();
        let mut assignments = Vec::with_capacity(inputs.len());

        for input in inputs {
            let machine = machines
                .iter()
                .find(|m| m.machine_id == input.machine_id)
                .ok_or_else(|| EngineError::not_found("Machine", &input.machine_id))?;
            if !machine.is_active {
                return Err(EngineError::inactive("Machine", &machine.machine_id));
            }
            if !seen.insert(input.machine_id.as_str()) {
                return Err(EngineError::validation(
                    "machine_id",
                    format!("机台重复分配: {}", input.machine_id),
                ));
            }
            if !input.assigned_stitches.is_finite() || input.assigned_stitches < 0.0 {
                return Err(EngineError::validation(
                    "assigned_stitches",
                    format!("分配针数不能为负 (machine={})", input.machine_id),
                ));
            }

            let estimated_days =
                Self::estimated_days(input.assigned_stitches, input.avg_stitches_per_day)?;

            assignments.push(MachineAssignment {
                item_id: item.item_id.clone(),
                machine_id: input.machine_id.clone(),
                assigned_stitches: input.assigned_stitches,
                avg_stitches_per_day: input.avg_stitches_per_day,
                repeats: input.repeats,
                estimated_days,
            });
        }

        let planned_total_stitches = item.planned_total_stitches();
        let assigned_total_stitches: f64 = assignments.iter().map(|a| a.assigned_stitches).sum();

        let mut warnings = Vec::new();
        if (assigned_total_stitches - planned_total_stitches).abs() > STITCH_TOLERANCE {
            tracing::warn!(
                item_id = %item.item_id,
                planned_total_stitches,
                assigned_total_stitches,
                "分配针数合计与计划总针数不一致"
            );
            warnings.push(ConsistencyWarning::AssignedSumMismatch {
                item_id: item.item_id.clone(),
                planned_stitches: planned_total_stitches,
                assigned_stitches: assigned_total_stitches,
            });
        }

        let total_estimated_days = Self::total_estimated_days(&assignments);

        Ok(AllocationPlan {
            item_id: item.item_id.clone(),
            assignments,
            planned_total_stitches,
            assigned_total_stitches,
            total_estimated_days,
            warnings,
        })
    }

    /// 预计天数合计 (合同级: 传入合同下全部明细的分配)
    pub fn total_estimated_days(assignments: &[MachineAssignment]) -> i64 {
        assignments.iter().map(|a| a.estimated_days).sum()
    }
}
