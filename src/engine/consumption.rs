// ==========================================
// 刺绣合同核算系统 - 生产消耗跟踪引擎
// ==========================================
// 职责: 校验生产记录、计算累计增量、计算剩余/机台待产/录入上限
// 红线: 修改记录必须先冲销旧贡献再计入新贡献,累计不得重复
// 红线: 超计划只告警 (软上限),不拒绝
// ==========================================
// machine_pending = max(0, assigned[item,machine] - used[item,machine])
// remaining       = max(0, planned[item] - used[item])
// entry_ceiling   = min(remaining, machine_pending)
// ==========================================

use crate::domain::contract_item::ContractItem;
use crate::domain::machine::{Machine, MachineAssignment, MachineUsage};
use crate::domain::production::ProductionEntry;
use crate::domain::types::ConsistencyWarning;
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

// ==========================================
// EntryDelta - 累计增量
// ==========================================
// 记录新增与修改统一表达为增量,由仓储层原子地累加
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDelta {
    pub item_id: String,
    pub item_stitches: f64,
    pub item_repeats: f64,
    pub machine_stitches: Vec<(String, f64)>, // (machine_id, 针数增量)
}

impl EntryDelta {
    /// 新增记录的增量
    pub fn for_new(entry: &ProductionEntry) -> Self {
        Self {
            item_id: entry.item_id.clone(),
            item_stitches: entry.stitches,
            item_repeats: entry.repeats,
            machine_stitches: vec![(entry.machine_id.clone(), entry.stitches)],
        }
    }

    /// 修改记录的增量: 冲销旧贡献 + 计入新贡献
    pub fn between(old: &ProductionEntry, new: &ProductionEntry) -> Self {
        let machine_stitches = if old.machine_id == new.machine_id {
            vec![(new.machine_id.clone(), new.stitches - old.stitches)]
        } else {
            vec![
                (old.machine_id.clone(), -old.stitches),
                (new.machine_id.clone(), new.stitches),
            ]
        };

        Self {
            item_id: new.item_id.clone(),
            item_stitches: new.stitches - old.stitches,
            item_repeats: new.repeats - old.repeats,
            machine_stitches,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.item_stitches == 0.0
            && self.item_repeats == 0.0
            && self.machine_stitches.iter().all(|(_, d)| *d == 0.0)
    }
}

// ==========================================
// 余量视图
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineBalance {
    pub machine_id: String,
    pub assigned_stitches: f64,
    pub used_stitches: f64,
    pub machine_pending: f64,
    pub entry_ceiling: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBalance {
    pub item_id: String,
    pub planned_stitches: f64,
    pub used_stitches: f64,
    pub used_repeats: f64,
    pub remaining_stitches: f64,
    pub machines: Vec<MachineBalance>,
}

// ==========================================
// EntryTally - 全量重算结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryTally {
    pub used_stitches: f64,
    pub used_repeats: f64,
    pub machine_stitches: BTreeMap<String, f64>,
}

// ==========================================
// ConsumptionTracker - 生产消耗跟踪引擎
// ==========================================
pub struct ConsumptionTracker {
    // 无状态引擎
}

impl Default for ConsumptionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumptionTracker {
    pub fn new() -> Self {
        Self {}
    }

    /// 机台待产针数
    pub fn machine_pending(assigned_stitches: f64, used_stitches: f64) -> f64 {
        (assigned_stitches - used_stitches).max(0.0)
    }

    /// 新记录可录入上限
    pub fn entry_ceiling(item: &ContractItem, assigned_stitches: f64, machine_used: f64) -> f64 {
        item.remaining_stitches()
            .min(Self::machine_pending(assigned_stitches, machine_used))
    }

    /// 校验生产记录的硬约束
    ///
    /// # 硬约束
    /// - 明细存在且有效
    /// - 机台存在且有效
    /// - (明细, 机台) 存在分配
    /// - stitches > 0, repeats >= 0
    #[instrument(skip_all, fields(item_id = %entry.item_id, machine_id = %entry.machine_id))]
    pub fn validate_entry(
        &self,
        item: &ContractItem,
        machine: Option<&Machine>,
        assignment: Option<&MachineAssignment>,
        entry: &ProductionEntry,
    ) -> EngineResult<()> {
        if item.item_id != entry.item_id {
            return Err(EngineError::validation("item_id", "生产记录与明细不匹配"));
        }
        if !item.is_active {
            return Err(EngineError::inactive("ContractItem", &item.item_id));
        }

        let machine = machine.ok_or_else(|| EngineError::not_found("Machine", &entry.machine_id))?;
        if !machine.is_active {
            return Err(EngineError::inactive("Machine", &machine.machine_id));
        }

        match assignment {
            Some(a) if a.item_id == entry.item_id && a.machine_id == entry.machine_id => {}
            _ => {
                return Err(EngineError::not_found(
                    "MachineAssignment",
                    &format!("{}/{}", entry.item_id, entry.machine_id),
                ))
            }
        }

        if !entry.stitches.is_finite() || entry.stitches <= 0.0 {
            return Err(EngineError::validation(
                "stitches",
                format!("针数必须大于0 (实际={})", entry.stitches),
            ));
        }
        if !entry.repeats.is_finite() || entry.repeats < 0.0 {
            return Err(EngineError::validation(
                "repeats",
                format!("循环数不能为负 (实际={})", entry.repeats),
            ));
        }

        Ok(())
    }

    /// 计算明细余量视图
    pub fn balance(
        &self,
        item: &ContractItem,
        assignments: &[MachineAssignment],
        usages: &[MachineUsage],
    ) -> ItemBalance {
        let remaining_stitches = item.remaining_stitches();

        let machines = assignments
            .iter()
            .filter(|a| a.item_id == item.item_id)
            .map(|a| {
                let used = usages
                    .iter()
                    .find(|u| u.item_id == a.item_id && u.machine_id == a.machine_id)
                    .map(|u| u.used_stitches)
                    .unwrap_or(0.0);
                let machine_pending = Self::machine_pending(a.assigned_stitches, used);
                MachineBalance {
                    machine_id: a.machine_id.clone(),
                    assigned_stitches: a.assigned_stitches,
                    used_stitches: used,
                    machine_pending,
                    entry_ceiling: remaining_stitches.min(machine_pending),
                }
            })
            .collect();

        ItemBalance {
            item_id: item.item_id.clone(),
            planned_stitches: item.planned_total_stitches(),
            used_stitches: item.used_stitches,
            used_repeats: item.used_repeats,
            remaining_stitches,
            machines,
        }
    }

    /// 超计划告警 (基于应用增量后的累计)
    pub fn over_consumption_warnings(&self, balance: &ItemBalance) -> Vec<ConsistencyWarning> {
        let mut warnings = Vec::new();

        if balance.planned_stitches > 0.0 && balance.used_stitches > balance.planned_stitches {
            warnings.push(ConsistencyWarning::OverConsumption {
                item_id: balance.item_id.clone(),
                planned_stitches: balance.planned_stitches,
                used_stitches: balance.used_stitches,
            });
        }

        for machine in &balance.machines {
            if machine.used_stitches > machine.assigned_stitches {
                warnings.push(ConsistencyWarning::MachineOverConsumption {
                    item_id: balance.item_id.clone(),
                    machine_id: machine.machine_id.clone(),
                    assigned_stitches: machine.assigned_stitches,
                    used_stitches: machine.used_stitches,
                });
            }
        }

        for w in &warnings {
            tracing::warn!(warning = %w, "生产消耗超出计划");
        }

        warnings
    }

    /// 由全部记录重算累计 (与录入顺序无关)
    pub fn rescan(&self, entries: &[ProductionEntry]) -> EntryTally {
        let mut tally = EntryTally::default();
        for entry in entries {
            tally.used_stitches += entry.stitches;
            tally.used_repeats += entry.repeats;
            *tally
                .machine_stitches
                .entry(entry.machine_id.clone())
                .or_insert(0.0) += entry.stitches;
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract_item::RateInputs;
    use crate::domain::types::Shift;
    use chrono::NaiveDate;

    fn item() -> ContractItem {
        ContractItem::new(
            "C1".to_string(),
            RateInputs {
                stitch_per_repeat: Some(1000.0),
                repeat_count: Some(50.0),
                ..Default::default()
            },
        )
    }

    fn machine(id: &str) -> Machine {
        Machine {
            machine_id: id.to_string(),
            machine_name: id.to_string(),
            is_active: true,
        }
    }

    fn assignment(item_id: &str, machine_id: &str, assigned: f64) -> MachineAssignment {
        MachineAssignment {
            item_id: item_id.to_string(),
            machine_id: machine_id.to_string(),
            assigned_stitches: assigned,
            avg_stitches_per_day: 1000.0,
            repeats: 0.0,
            estimated_days: 0,
        }
    }

    fn entry(item_id: &str, machine_id: &str, stitches: f64) -> ProductionEntry {
        ProductionEntry::new(
            item_id.to_string(),
            machine_id.to_string(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            Shift::Day,
            stitches,
            1.0,
            Some("张三".to_string()),
        )
    }

    #[test]
    fn test_validate_entry_accepts_assigned_machine() {
        let tracker = ConsumptionTracker::new();
        let item = item();
        let a = assignment(&item.item_id, "X", 30_000.0);
        let e = entry(&item.item_id, "X", 10_000.0);
        assert!(tracker
            .validate_entry(&item, Some(&machine("X")), Some(&a), &e)
            .is_ok());
    }

    #[test]
    fn test_validate_entry_hard_failures() {
        let tracker = ConsumptionTracker::new();
        let item = item();
        let a = assignment(&item.item_id, "X", 30_000.0);

        let zero = entry(&item.item_id, "X", 0.0);
        assert!(matches!(
            tracker.validate_entry(&item, Some(&machine("X")), Some(&a), &zero),
            Err(EngineError::Validation { .. })
        ));

        let unassigned = entry(&item.item_id, "Y", 100.0);
        assert!(matches!(
            tracker.validate_entry(&item, Some(&machine("Y")), None, &unassigned),
            Err(EngineError::NotFound { .. })
        ));

        let ok = entry(&item.item_id, "X", 100.0);
        assert!(matches!(
            tracker.validate_entry(&item, None, Some(&a), &ok),
            Err(EngineError::NotFound { .. })
        ));

        let mut deleted = item.clone();
        deleted.is_active = false;
        assert!(matches!(
            tracker.validate_entry(&deleted, Some(&machine("X")), Some(&a), &ok),
            Err(EngineError::Inactive { .. })
        ));
    }

    #[test]
    fn test_balance_scenario() {
        // 计划 50,000; X 分配 30,000; Y 分配 20,000; X 已产 10,000
        let tracker = ConsumptionTracker::new();
        let mut item = item();
        item.used_stitches = 10_000.0;
        let assignments = vec![
            assignment(&item.item_id, "X", 30_000.0),
            assignment(&item.item_id, "Y", 20_000.0),
        ];
        let usages = vec![MachineUsage {
            item_id: item.item_id.clone(),
            machine_id: "X".to_string(),
            used_stitches: 10_000.0,
        }];

        let balance = tracker.balance(&item, &assignments, &usages);
        assert_eq!(balance.remaining_stitches, 40_000.0);
        assert_eq!(balance.machines[0].machine_pending, 20_000.0);
        assert_eq!(balance.machines[0].entry_ceiling, 20_000.0);
        assert_eq!(balance.machines[1].machine_pending, 20_000.0);
        assert!(tracker.over_consumption_warnings(&balance).is_empty());
    }

    #[test]
    fn test_entry_ceiling_bounded_by_item_remaining() {
        let mut item = item();
        item.used_stitches = 45_000.0;
        assert_eq!(ConsumptionTracker::entry_ceiling(&item, 30_000.0, 10_000.0), 5_000.0);
        item.used_stitches = 60_000.0;
        assert_eq!(ConsumptionTracker::entry_ceiling(&item, 30_000.0, 10_000.0), 0.0);
    }

    #[test]
    fn test_over_consumption_is_warning() {
        let tracker = ConsumptionTracker::new();
        let mut item = item();
        item.used_stitches = 55_000.0;
        let assignments = vec![assignment(&item.item_id, "X", 50_000.0)];
        let usages = vec![MachineUsage {
            item_id: item.item_id.clone(),
            machine_id: "X".to_string(),
            used_stitches: 55_000.0,
        }];

        let balance = tracker.balance(&item, &assignments, &usages);
        assert_eq!(balance.remaining_stitches, 0.0);
        assert_eq!(balance.machines[0].machine_pending, 0.0);

        let warnings = tracker.over_consumption_warnings(&balance);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_delta_between_same_machine_nets_out() {
        let old = entry("I1", "X", 10_000.0);
        let mut new = old.clone();
        new.stitches = 8_000.0;
        new.repeats = 3.0;

        let delta = EntryDelta::between(&old, &new);
        assert_eq!(delta.item_stitches, -2_000.0);
        assert_eq!(delta.item_repeats, 2.0);
        assert_eq!(delta.machine_stitches, vec![("X".to_string(), -2_000.0)]);
    }

    #[test]
    fn test_delta_between_machines_moves_contribution() {
        let old = entry("I1", "X", 10_000.0);
        let mut new = old.clone();
        new.machine_id = "Y".to_string();

        let delta = EntryDelta::between(&old, &new);
        assert_eq!(delta.item_stitches, 0.0);
        assert_eq!(
            delta.machine_stitches,
            vec![("X".to_string(), -10_000.0), ("Y".to_string(), 10_000.0)]
        );
        assert!(!delta.is_zero());
        assert!(EntryDelta::between(&old, &old).is_zero());
    }

    #[test]
    fn test_rescan_independent_of_order() {
        let tracker = ConsumptionTracker::new();
        let entries = vec![
            entry("I1", "X", 10_000.0),
            entry("I1", "Y", 2_500.0),
            entry("I1", "X", 7_000.0),
        ];
        let mut reversed = entries.clone();
        reversed.reverse();

        let a = tracker.rescan(&entries);
        let b = tracker.rescan(&reversed);
        assert_eq!(a, b);
        assert_eq!(a.used_stitches, 19_500.0);
        assert_eq!(a.used_repeats, 3.0);
        assert_eq!(a.machine_stitches.get("X"), Some(&17_000.0));

        // 增量累加与全量重算一致
        let incremental: f64 = entries.iter().map(|e| EntryDelta::for_new(e).item_stitches).sum();
        assert_eq!(incremental, a.used_stitches);
    }
}
