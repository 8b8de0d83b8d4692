// ==========================================
// 刺绣合同核算系统 - 机台与机台分配领域模型
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Machine - 绣花机台
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub machine_id: String,    // 机台编号
    pub machine_name: String,  // 机台名称
    pub is_active: bool,       // 停用标志
}

// ==========================================
// MachineAssignment - 机台分配
// ==========================================
// (item_id, machine_id) 唯一; 每次保存整体替换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineAssignment {
    pub item_id: String,
    pub machine_id: String,
    pub assigned_stitches: f64,     // 分配针数
    pub avg_stitches_per_day: f64,  // 日均针数 (> 0)
    pub repeats: f64,               // 分配循环数
    pub estimated_days: i64,        // 预计天数 = ceil(分配 / 日均)
}

// ==========================================
// MachineUsage - 机台实际消耗
// ==========================================
// 与分配分表存放: 整体替换分配时不丢失实绩
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineUsage {
    pub item_id: String,
    pub machine_id: String,
    pub used_stitches: f64,
}
