// ==========================================
// 刺绣合同核算系统 - 机台分配 API
// ==========================================
// 职责: 机台维护、明细机台分配整体保存、预计天数查询
// 红线: 任一分配硬约束违反,整次保存拒绝 (不做部分写入)
// 红线: 分配合计与计划不一致只告警
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::audit;
use crate::api::error::{ApiError, ApiResult};
use crate::api::input::{parse_non_negative, parse_number, require_id};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::machine::{Machine, MachineAssignment};
use crate::domain::types::MutationOutcome;
use crate::engine::allocation::{AllocationLedger, AllocationPlan, AssignmentInput};
use crate::repository::{
    ActionLogRepository, AssignmentRepository, ContractItemRepository, MachineRepository,
};

// ==========================================
// RawAssignment - 单机台分配原始输入
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAssignment {
    pub machine_id: String,
    pub assigned_stitches: String,
    pub avg_stitches_per_day: String,
    pub repeats: String,
}

impl RawAssignment {
    fn parse(&self) -> ApiResult<AssignmentInput> {
        Ok(AssignmentInput {
            machine_id: require_id("机台ID", &self.machine_id)?.to_string(),
            assigned_stitches: parse_number("assigned_stitches", &self.assigned_stitches)?,
            avg_stitches_per_day: parse_number("avg_stitches_per_day", &self.avg_stitches_per_day)?,
            repeats: parse_non_negative("repeats", &self.repeats)?,
        })
    }
}

// ==========================================
// AllocationApi - 机台分配 API
// ==========================================
pub struct AllocationApi {
    item_repo: Arc<ContractItemRepository>,
    machine_repo: Arc<MachineRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    ledger: AllocationLedger,
}

impl AllocationApi {
    pub fn new(
        item_repo: Arc<ContractItemRepository>,
        machine_repo: Arc<MachineRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            item_repo,
            machine_repo,
            assignment_repo,
            action_log_repo,
            ledger: AllocationLedger::new(),
        }
    }

    // ==========================================
    // 机台
    // ==========================================

    /// 新增或重命名机台 (同时启用)
    pub fn register_machine(
        &self,
        machine_id: &str,
        machine_name: &str,
        operator: &str,
    ) -> ApiResult<Machine> {
        let machine_id = require_id("机台ID", machine_id)?;
        let name = machine_name.trim();
        let machine = Machine {
            machine_id: machine_id.to_string(),
            machine_name: if name.is_empty() { machine_id.to_string() } else { name.to_string() },
            is_active: true,
        };
        self.machine_repo.upsert(&machine)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::UpsertMachine,
            operator,
            None,
            None,
            Some(serde_json::json!({
                "machine_id": machine.machine_id,
                "machine_name": machine.machine_name,
                "is_active": true,
            })),
            format!("登记机台: {}", machine.machine_id),
        ));

        Ok(machine)
    }

    /// 启用/停用机台 (停用后不可再分配或录入)
    pub fn set_machine_active(
        &self,
        machine_id: &str,
        is_active: bool,
        operator: &str,
    ) -> ApiResult<()> {
        let machine_id = require_id("机台ID", machine_id)?;
        self.machine_repo.set_active(machine_id, is_active)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::UpsertMachine,
            operator,
            None,
            None,
            Some(serde_json::json!({ "machine_id": machine_id, "is_active": is_active })),
            format!("机台{}: {}", if is_active { "启用" } else { "停用" }, machine_id),
        ));
        Ok(())
    }

    pub fn list_machines(&self) -> ApiResult<Vec<Machine>> {
        Ok(self.machine_repo.list_active()?)
    }

    // ==========================================
    // 分配
    // ==========================================

    /// 整体保存明细的机台分配
    ///
    /// # 返回
    /// - Ok(MutationOutcome<AllocationPlan>): 保存后的方案 + 一致性告警
    /// - Err(ApiError): 任一输入非法/机台不存在或停用/日均针数 <= 0
    #[instrument(skip(self, raw), fields(count = raw.len()))]
    pub fn save_assignments(
        &self,
        item_id: &str,
        raw: &[RawAssignment],
        operator: &str,
    ) -> ApiResult<MutationOutcome<AllocationPlan>> {
        let item_id = require_id("明细ID", item_id)?;
        let item = self
            .item_repo
            .find_by_id(item_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ContractItem(id={})不存在", item_id)))?;

        let inputs = raw
            .iter()
            .map(RawAssignment::parse)
            .collect::<ApiResult<Vec<_>>>()?;

        let machine_ids: Vec<String> = inputs.iter().map(|i| i.machine_id.clone()).collect();
        let machines = self.machine_repo.find_by_ids(&machine_ids)?;

        let plan = self.ledger.plan(&item, &machines, &inputs)?;
        self.assignment_repo
            .replace_for_item(&item.item_id, &plan.assignments)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::SaveAssignments,
            operator,
            Some(&item.contract_id),
            Some(&item.item_id),
            Some(serde_json::json!({
                "assignments": plan.assignments,
                "planned_total_stitches": plan.planned_total_stitches,
                "assigned_total_stitches": plan.assigned_total_stitches,
                "warnings": plan.warnings,
            })),
            format!(
                "保存机台分配: {}台, 预计{}天",
                plan.assignments.len(),
                plan.total_estimated_days
            ),
        ));

        if plan.warnings.is_empty() {
            info!(item_id = %item.item_id, total_estimated_days = plan.total_estimated_days, "机台分配已保存");
        } else {
            warn!(item_id = %item.item_id, warnings = plan.warnings.len(), "机台分配已保存(含一致性告警)");
        }

        let warnings = plan.warnings.clone();
        Ok(MutationOutcome::new(plan, warnings))
    }

    pub fn get_assignments(&self, item_id: &str) -> ApiResult<Vec<MachineAssignment>> {
        let item_id = require_id("明细ID", item_id)?;
        Ok(self.assignment_repo.find_by_item(item_id)?)
    }

    /// 合同预计天数合计 (全部有效明细、全部机台)
    pub fn total_estimated_days(&self, contract_id: &str) -> ApiResult<i64> {
        let contract_id = require_id("合同ID", contract_id)?;
        let assignments = self.assignment_repo.find_by_contract(contract_id)?;
        Ok(AllocationLedger::total_estimated_days(&assignments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::Contract;
    use crate::domain::contract_item::{ContractItem, RateInputs};
    use crate::domain::types::ConsistencyWarning;
    use crate::repository::ContractRepository;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn setup() -> (AllocationApi, ContractItem) {
        let conn = Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()));
        let contract = Contract::new(
            "HT-1".to_string(),
            None,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            None,
        );
        ContractRepository::new(conn.clone()).insert(&contract).unwrap();
        let item = ContractItem::new(
            contract.contract_id.clone(),
            RateInputs {
                stitch_per_repeat: Some(1000.0),
                repeat_count: Some(50.0),
                ..Default::default()
            },
        );
        ContractItemRepository::new(conn.clone()).insert(&item).unwrap();

        let api = AllocationApi::new(
            Arc::new(ContractItemRepository::new(conn.clone())),
            Arc::new(MachineRepository::new(conn.clone())),
            Arc::new(AssignmentRepository::new(conn.clone())),
            Arc::new(ActionLogRepository::new(conn)),
        );
        api.register_machine("X", "一号机", "u").unwrap();
        api.register_machine("Y", "", "u").unwrap();
        (api, item)
    }

    fn raw(machine_id: &str, assigned: &str, avg: &str) -> RawAssignment {
        RawAssignment {
            machine_id: machine_id.to_string(),
            assigned_stitches: assigned.to_string(),
            avg_stitches_per_day: avg.to_string(),
            repeats: String::new(),
        }
    }

    #[test]
    fn test_save_balanced_assignments() {
        let (api, item) = setup();
        let outcome = api
            .save_assignments(
                &item.item_id,
                &[raw("X", "30000", "7000"), raw("Y", "20000", "5000")],
                "u",
            )
            .unwrap();
        assert!(!outcome.has_warnings());
        assert_eq!(outcome.value.assignments[0].estimated_days, 5);
        assert_eq!(outcome.value.assignments[1].estimated_days, 4);
        assert_eq!(api.total_estimated_days(&item.contract_id).unwrap(), 9);
        assert_eq!(api.list_machines().unwrap()[1].machine_name, "Y");
    }

    #[test]
    fn test_mismatch_is_saved_with_warning() {
        let (api, item) = setup();
        let outcome = api
            .save_assignments(&item.item_id, &[raw("X", "40000", "1000")], "u")
            .unwrap();
        assert!(matches!(
            outcome.warnings[0],
            ConsistencyWarning::AssignedSumMismatch { .. }
        ));
        assert_eq!(api.get_assignments(&item.item_id).unwrap().len(), 1);
    }

    #[test]
    fn test_hard_violation_rejects_whole_save() {
        let (api, item) = setup();
        api.save_assignments(&item.item_id, &[raw("X", "50000", "1000")], "u")
            .unwrap();

        let err = api
            .save_assignments(
                &item.item_id,
                &[raw("X", "25000", "1000"), raw("Y", "25000", "0")],
                "u",
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        api.set_machine_active("Y", false, "u").unwrap();
        assert!(api
            .save_assignments(&item.item_id, &[raw("Y", "50000", "1000")], "u")
            .is_err());
        assert!(api
            .save_assignments(&item.item_id, &[raw("Z", "50000", "1000")], "u")
            .is_err());
        assert!(api
            .save_assignments(&item.item_id, &[raw("X", "abc", "1000")], "u")
            .is_err());

        // 原分配保持不变
        let rows = api.get_assignments(&item.item_id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].assigned_stitches, 50_000.0);
    }
}
