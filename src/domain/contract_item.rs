// ==========================================
// 刺绣合同核算系统 - 合同明细领域模型
// ==========================================
// 录入字段 (RateInputs) + 派生缓存 (DerivedRates) + 生产累计
// 红线: planned_total_stitches 只由两个因子计算,不单独存储/修改
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// RateInputs - 计价录入字段
// ==========================================
// None 表示未录入或非数字输入
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RateInputs {
    pub stitch_per_repeat: Option<f64>, // S: 每循环针数
    pub rate_per_stitch: Option<f64>,   // Rs: 每针单价
    pub cost_factor: Option<f64>,       // G: 码数系数 (gazana)
    pub repeat_count: Option<f64>,      // R: 循环数
    pub piece_count: Option<f64>,       // P: 件数
    pub motif_rate: Option<f64>,        // 贴花单价
    pub motif_qty: Option<f64>,         // 贴花数量
    pub lace_rate: Option<f64>,         // 花边单价
    pub lace_qty: Option<f64>,          // 花边数量
}

impl RateInputs {
    /// S / Rs / G 任一变化都会使每循环单价的人工覆写失效
    pub fn repeat_basis_changed(&self, other: &RateInputs) -> bool {
        self.stitch_per_repeat != other.stitch_per_repeat
            || self.rate_per_stitch != other.rate_per_stitch
            || self.cost_factor != other.cost_factor
    }

    /// 逐字段合并: 本次未得到数值的字段沿用 previous
    pub fn or(self, previous: &RateInputs) -> RateInputs {
        RateInputs {
            stitch_per_repeat: self.stitch_per_repeat.or(previous.stitch_per_repeat),
            rate_per_stitch: self.rate_per_stitch.or(previous.rate_per_stitch),
            cost_factor: self.cost_factor.or(previous.cost_factor),
            repeat_count: self.repeat_count.or(previous.repeat_count),
            piece_count: self.piece_count.or(previous.piece_count),
            motif_rate: self.motif_rate.or(previous.motif_rate),
            motif_qty: self.motif_qty.or(previous.motif_qty),
            lace_rate: self.lace_rate.or(previous.lace_rate),
            lace_qty: self.lace_qty.or(previous.lace_qty),
        }
    }
}

// ==========================================
// DerivedRates - 派生计价字段
// ==========================================
// 每个字段都是显式可选值: 输入不全时保留上次结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedRates {
    pub calculated_rate: Option<f64>,
    pub rate_per_repeat: Option<f64>,
    pub total_rate: Option<f64>,
    pub heads: u32,
    pub rate_per_piece: Option<f64>,
    pub piece_amount: Option<f64>,
    pub motif_amount: Option<f64>,
    pub lace_amount: Option<f64>,
    pub final_total_rate: Option<f64>,
}

// ==========================================
// ContractItem - 合同明细
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractItem {
    // ===== 主键 =====
    pub item_id: String,
    pub contract_id: String,

    // ===== 描述字段 =====
    pub design_no: Option<String>, // 花型编号
    pub fabric: Option<String>,    // 面料
    pub color: Option<String>,     // 颜色

    // ===== 计价 =====
    pub inputs: RateInputs,
    pub rates: DerivedRates,
    pub rate_per_repeat_overridden: bool, // 每循环单价是否人工覆写

    // ===== 生产累计 =====
    pub used_stitches: f64,
    pub used_repeats: f64,

    // ===== 软删除 =====
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ContractItem {
    /// 创建新明细（派生字段为空,由 RateCascade 填充）
    pub fn new(contract_id: String, inputs: RateInputs) -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            item_id: uuid::Uuid::new_v4().to_string(),
            contract_id,
            design_no: None,
            fabric: None,
            color: None,
            inputs,
            rates: DerivedRates::default(),
            rate_per_repeat_overridden: false,
            used_stitches: 0.0,
            used_repeats: 0.0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// 计划总针数 = 每循环针数 × 循环数 (任一缺失为 0)
    pub fn planned_total_stitches(&self) -> f64 {
        match (self.inputs.stitch_per_repeat, self.inputs.repeat_count) {
            (Some(s), Some(r)) => s * r,
            _ => 0.0,
        }
    }

    /// 剩余针数 (不为负)
    pub fn remaining_stitches(&self) -> f64 {
        (self.planned_total_stitches() - self.used_stitches).max(0.0)
    }
}
