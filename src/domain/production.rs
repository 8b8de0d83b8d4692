// ==========================================
// 刺绣合同核算系统 - 生产记录领域模型
// ==========================================
// 红线: 记录只追加/修改,不静默丢弃
// ==========================================

use crate::domain::types::Shift;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionEntry - 生产记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionEntry {
    pub entry_id: String,
    pub item_id: String,
    pub machine_id: String,
    pub entry_date: NaiveDate,
    pub shift: Shift,
    pub stitches: f64,                  // 本次针数 (> 0)
    pub repeats: f64,                   // 本次循环数
    pub operator_name: Option<String>,  // 操作工
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ProductionEntry {
    pub fn new(
        item_id: String,
        machine_id: String,
        entry_date: NaiveDate,
        shift: Shift,
        stitches: f64,
        repeats: f64,
        operator_name: Option<String>,
    ) -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            item_id,
            machine_id,
            entry_date,
            shift,
            stitches,
            repeats,
            operator_name,
            created_at: now,
            updated_at: now,
        }
    }
}

// ==========================================
// EntryRevision - 生产记录修改字段
// ==========================================
// None 表示该字段保持不变
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryRevision {
    pub machine_id: Option<String>,
    pub entry_date: Option<NaiveDate>,
    pub shift: Option<Shift>,
    pub stitches: Option<f64>,
    pub repeats: Option<f64>,
    pub operator_name: Option<String>,
}

impl EntryRevision {
    /// 将修改应用到原记录,返回新记录
    pub fn apply_to(&self, entry: &ProductionEntry) -> ProductionEntry {
        let mut revised = entry.clone();
        if let Some(machine_id) = &self.machine_id {
            revised.machine_id = machine_id.clone();
        }
        if let Some(date) = self.entry_date {
            revised.entry_date = date;
        }
        if let Some(shift) = self.shift {
            revised.shift = shift;
        }
        if let Some(stitches) = self.stitches {
            revised.stitches = stitches;
        }
        if let Some(repeats) = self.repeats {
            revised.repeats = repeats;
        }
        if let Some(operator) = &self.operator_name {
            revised.operator_name = Some(operator.clone());
        }
        revised.updated_at = chrono::Local::now().naive_local();
        revised
    }
}

// ==========================================
// DailyProduction - 日产量汇总 (按日期+机台)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProduction {
    pub entry_date: NaiveDate,
    pub machine_id: String,
    pub stitches: f64,
    pub repeats: f64,
    pub entry_count: i64,
}
