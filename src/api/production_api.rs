// ==========================================
// 刺绣合同核算系统 - 生产记录 API
// ==========================================
// 职责: 生产记录录入/修改、余量与录入上限查询、全量重算、日产量汇总
// 红线: 记录与累计同事务写入; 修改先冲销再计入
// 红线: 超计划只告警,不拒绝
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::audit;
use crate::api::error::{ApiError, ApiResult};
use crate::api::input::{
    optional_text, parse_date, parse_non_negative, parse_number, parse_shift, require_id,
};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::contract_item::ContractItem;
use crate::domain::production::{DailyProduction, EntryRevision, ProductionEntry};
use crate::domain::types::{ConsistencyWarning, MutationOutcome};
use crate::engine::consumption::{ConsumptionTracker, EntryDelta, EntryTally, ItemBalance};
use crate::repository::{
    ActionLogRepository, AssignmentRepository, ContractItemRepository, MachineRepository,
    ProductionRepository,
};

/// 重算差异容差
const DRIFT_TOLERANCE: f64 = 1e-6;

// ==========================================
// 原始输入
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEntry {
    pub item_id: String,
    pub machine_id: String,
    pub entry_date: String,
    pub shift: String,
    pub stitches: String,
    pub repeats: String,
    pub operator_name: Option<String>,
}

/// 修改字段 (None 表示不修改)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEntryRevision {
    pub machine_id: Option<String>,
    pub entry_date: Option<String>,
    pub shift: Option<String>,
    pub stitches: Option<String>,
    pub repeats: Option<String>,
    pub operator_name: Option<String>,
}

impl RawEntryRevision {
    fn parse(&self) -> ApiResult<EntryRevision> {
        Ok(EntryRevision {
            machine_id: match &self.machine_id {
                Some(m) => Some(require_id("机台ID", m)?.to_string()),
                None => None,
            },
            entry_date: self
                .entry_date
                .as_deref()
                .map(|d| parse_date("entry_date", d))
                .transpose()?,
            shift: self.shift.as_deref().map(parse_shift).transpose()?,
            stitches: self
                .stitches
                .as_deref()
                .map(|s| parse_number("stitches", s))
                .transpose()?,
            repeats: self
                .repeats
                .as_deref()
                .map(|r| parse_non_negative("repeats", r))
                .transpose()?,
            operator_name: optional_text(self.operator_name.as_deref()),
        })
    }
}

/// 全量重算结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescanReport {
    pub item_id: String,
    pub before: EntryTally,
    pub after: EntryTally,
    pub drift_found: bool,
}

fn tally_drifted(before: &EntryTally, after: &EntryTally) -> bool {
    let differs = |a: f64, b: f64| (a - b).abs() > DRIFT_TOLERANCE;
    if differs(before.used_stitches, after.used_stitches)
        || differs(before.used_repeats, after.used_repeats)
    {
        return true;
    }
    let machines = before
        .machine_stitches
        .keys()
        .chain(after.machine_stitches.keys());
    for machine_id in machines {
        let b = before.machine_stitches.get(machine_id).copied().unwrap_or(0.0);
        let a = after.machine_stitches.get(machine_id).copied().unwrap_or(0.0);
        if differs(b, a) {
            return true;
        }
    }
    false
}

// ==========================================
// ProductionApi - 生产记录 API
// ==========================================
pub struct ProductionApi {
    item_repo: Arc<ContractItemRepository>,
    machine_repo: Arc<MachineRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    production_repo: Arc<ProductionRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    tracker: ConsumptionTracker,
}

impl ProductionApi {
    pub fn new(
        item_repo: Arc<ContractItemRepository>,
        machine_repo: Arc<MachineRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        production_repo: Arc<ProductionRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            item_repo,
            machine_repo,
            assignment_repo,
            production_repo,
            action_log_repo,
            tracker: ConsumptionTracker::new(),
        }
    }

    /// 录入生产记录
    ///
    /// # 返回
    /// - Ok(MutationOutcome<ProductionEntry>): 记录 + 超计划告警
    /// - Err(ApiError): 明细/机台/分配不存在或停用、针数 <= 0
    #[instrument(skip(self, raw), fields(item_id = %raw.item_id, machine_id = %raw.machine_id))]
    pub fn record_entry(
        &self,
        raw: &RawEntry,
        operator: &str,
    ) -> ApiResult<MutationOutcome<ProductionEntry>> {
        let item_id = require_id("明细ID", &raw.item_id)?;
        let machine_id = require_id("机台ID", &raw.machine_id)?;
        let entry = ProductionEntry::new(
            item_id.to_string(),
            machine_id.to_string(),
            parse_date("entry_date", &raw.entry_date)?,
            parse_shift(&raw.shift)?,
            parse_number("stitches", &raw.stitches)?,
            parse_non_negative("repeats", &raw.repeats)?,
            optional_text(raw.operator_name.as_deref()),
        );

        let item = self.load_item(item_id)?;
        self.validate(&item, &entry)?;

        self.production_repo
            .record(&entry, &EntryDelta::for_new(&entry))?;

        let warnings = self.warnings_after(item_id)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::RecordEntry,
            operator,
            Some(&item.contract_id),
            Some(&item.item_id),
            Some(serde_json::json!({
                "entry_id": entry.entry_id,
                "machine_id": entry.machine_id,
                "entry_date": entry.entry_date.to_string(),
                "shift": entry.shift.to_string(),
                "stitches": entry.stitches,
                "repeats": entry.repeats,
                "warnings": warnings,
            })),
            format!("录入生产记录: {}针 @{}", entry.stitches, entry.machine_id),
        ));

        info!(entry_id = %entry.entry_id, stitches = entry.stitches, "生产记录已录入");
        Ok(MutationOutcome::new(entry, warnings))
    }

    /// 修改生产记录 (可改机台)
    #[instrument(skip(self, raw))]
    pub fn update_entry(
        &self,
        entry_id: &str,
        raw: &RawEntryRevision,
        operator: &str,
    ) -> ApiResult<MutationOutcome<ProductionEntry>> {
        let entry_id = require_id("记录ID", entry_id)?;
        let old = self
            .production_repo
            .find_by_id(entry_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ProductionEntry(id={})不存在", entry_id)))?;

        let revised = raw.parse()?.apply_to(&old);
        let item = self.load_item(&old.item_id)?;
        self.validate(&item, &revised)?;

        let delta = EntryDelta::between(&old, &revised);
        self.production_repo.revise(&old, &revised, &delta)?;

        let warnings = self.warnings_after(&old.item_id)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::UpdateEntry,
            operator,
            Some(&item.contract_id),
            Some(&item.item_id),
            Some(serde_json::json!({
                "entry_id": entry_id,
                "old": { "machine_id": old.machine_id, "stitches": old.stitches, "repeats": old.repeats },
                "new": { "machine_id": revised.machine_id, "stitches": revised.stitches, "repeats": revised.repeats },
                "delta": delta,
                "warnings": warnings,
            })),
            format!("修改生产记录: {} -> {}针", old.stitches, revised.stitches),
        ));

        info!(entry_id = %entry_id, item_delta = delta.item_stitches, "生产记录已修改");
        Ok(MutationOutcome::new(revised, warnings))
    }

    /// 新记录可录入上限 = min(明细剩余, 机台待产)
    pub fn entry_ceiling(&self, item_id: &str, machine_id: &str) -> ApiResult<f64> {
        let item = self.load_item(require_id("明细ID", item_id)?)?;
        let machine_id = require_id("机台ID", machine_id)?;
        let assignment = self
            .assignment_repo
            .find_by_item_and_machine(&item.item_id, machine_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "MachineAssignment(id={}/{})不存在",
                    item.item_id, machine_id
                ))
            })?;
        let machine_used = self.assignment_repo.usage_for(&item.item_id, machine_id)?;
        Ok(ConsumptionTracker::entry_ceiling(
            &item,
            assignment.assigned_stitches,
            machine_used,
        ))
    }

    /// 明细余量视图 (含各机台待产与录入上限)
    pub fn item_balance(&self, item_id: &str) -> ApiResult<ItemBalance> {
        let item = self.load_item(require_id("明细ID", item_id)?)?;
        let assignments = self.assignment_repo.find_by_item(&item.item_id)?;
        let usages = self.assignment_repo.usage_by_item(&item.item_id)?;
        Ok(self.tracker.balance(&item, &assignments, &usages))
    }

    /// 由全部记录重算累计并覆盖
    pub fn rescan_item(&self, item_id: &str, operator: &str) -> ApiResult<RescanReport> {
        let item = self.load_item(require_id("明细ID", item_id)?)?;
        let (before, after) = self
            .production_repo
            .rescan_with(&item.item_id, |entries| self.tracker.rescan(entries))?;
        let drift_found = tally_drifted(&before, &after);

        if drift_found {
            warn!(
                item_id = %item.item_id,
                before = before.used_stitches,
                after = after.used_stitches,
                "累计与记录不一致，已按记录重算"
            );
        }

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::RescanItem,
            operator,
            Some(&item.contract_id),
            Some(&item.item_id),
            Some(serde_json::json!({
                "before": before,
                "after": after,
                "drift_found": drift_found,
            })),
            format!("全量重算累计: drift={}", drift_found),
        ));

        Ok(RescanReport {
            item_id: item.item_id,
            before,
            after,
            drift_found,
        })
    }

    pub fn daily_summary(&self, item_id: &str) -> ApiResult<Vec<DailyProduction>> {
        let item_id = require_id("明细ID", item_id)?;
        Ok(self.production_repo.daily_summary(item_id)?)
    }

    pub fn list_entries(&self, item_id: &str) -> ApiResult<Vec<ProductionEntry>> {
        let item_id = require_id("明细ID", item_id)?;
        Ok(self.production_repo.find_by_item(item_id)?)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn load_item(&self, item_id: &str) -> ApiResult<ContractItem> {
        self.item_repo
            .find_by_id(item_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ContractItem(id={})不存在", item_id)))
    }

    fn validate(&self, item: &ContractItem, entry: &ProductionEntry) -> ApiResult<()> {
        let machine = self.machine_repo.find_by_id(&entry.machine_id)?;
        let assignment = self
            .assignment_repo
            .find_by_item_and_machine(&entry.item_id, &entry.machine_id)?;
        self.tracker
            .validate_entry(item, machine.as_ref(), assignment.as_ref(), entry)?;
        Ok(())
    }

    fn warnings_after(&self, item_id: &str) -> ApiResult<Vec<ConsistencyWarning>> {
        let item = self.load_item(item_id)?;
        let assignments = self.assignment_repo.find_by_item(item_id)?;
        let usages = self.assignment_repo.usage_by_item(item_id)?;
        let balance = self.tracker.balance(&item, &assignments, &usages);
        Ok(self.tracker.over_consumption_warnings(&balance))
    }
}
