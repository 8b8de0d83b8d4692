// ==========================================
// 刺绣合同核算系统 - 计价级联计算引擎
// ==========================================
// 职责: 由针数/循环/件数录入派生各级单价与金额
// 红线: 纯函数、确定性、幂等; 不抛错
// 红线: 某步输入缺失时,该派生字段保留上次值 (不归零、不报错)
// ==========================================
// 级联顺序:
// 1) calculated_rate  = round4(S × Rs / 1000 × 2.77)
// 2) rate_per_repeat  = round4(calculated_rate × G)   (可人工覆写)
// 3) total_rate       = round4(R × rate_per_repeat)
// 4) heads            = lookup(G)                     (ε 精确匹配,未命中为 0)
// 5) rate_per_piece   = round4(rate_per_repeat / heads) (heads > 0)
// 6) piece_amount     = round4(rate_per_piece × P)
// 7) motif/lace       = round4(单价 × 数量)
// 8) final_total_rate = round(total_rate + piece_amount)
// ==========================================

use crate::domain::contract_item::{ContractItem, DerivedRates, RateInputs};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 针数换算除数
pub const DEFAULT_STITCH_DIVISOR: f64 = 1000.0;
/// 单价倍率
pub const DEFAULT_RATE_MULTIPLIER: f64 = 2.77;
/// 码数系数匹配容差
pub const DEFAULT_COST_FACTOR_EPSILON: f64 = 0.001;

/// 保留 4 位小数
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// 只接受有限数值
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

// ==========================================
// 码数系数 -> 机头数 映射
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostFactorHeads {
    pub cost_factor: f64,
    pub heads: u32,
}

/// 默认映射表 (每机头 0.8425 码)
pub fn default_cost_factor_heads() -> Vec<CostFactorHeads> {
    [
        (3.37, 4),
        (5.055, 6),
        (6.74, 8),
        (10.11, 12),
        (13.48, 16),
        (15.165, 18),
        (20.22, 24),
    ]
    .into_iter()
    .map(|(cost_factor, heads)| CostFactorHeads { cost_factor, heads })
    .collect()
}

// ==========================================
// RateCascadeConfig - 计价参数
// ==========================================
// 默认值可被 config_kv 覆写 (见 ConfigManager::load_rate_cascade_config)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCascadeConfig {
    pub stitch_divisor: f64,
    pub rate_multiplier: f64,
    pub cost_factor_epsilon: f64,
    pub cost_factor_heads: Vec<CostFactorHeads>,
}

impl Default for RateCascadeConfig {
    fn default() -> Self {
        Self {
            stitch_divisor: DEFAULT_STITCH_DIVISOR,
            rate_multiplier: DEFAULT_RATE_MULTIPLIER,
            cost_factor_epsilon: DEFAULT_COST_FACTOR_EPSILON,
            cost_factor_heads: default_cost_factor_heads(),
        }
    }
}

// ==========================================
// RateCascade - 计价级联引擎
// ==========================================
pub struct RateCascade {
    config: RateCascadeConfig,
}

impl RateCascade {
    pub fn new(config: RateCascadeConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(RateCascadeConfig::default())
    }

    pub fn config(&self) -> &RateCascadeConfig {
        &self.config
    }

    /// 码数系数查机头数 (ε 内精确匹配,未命中返回 0)
    pub fn lookup_heads(&self, cost_factor: f64) -> u32 {
        self.config
            .cost_factor_heads
            .iter()
            .find(|entry| (entry.cost_factor - cost_factor).abs() < self.config.cost_factor_epsilon)
            .map(|entry| entry.heads)
            .unwrap_or(0)
    }

    /// 执行级联计算
    ///
    /// # 参数
    /// - `inputs`: 录入字段
    /// - `previous`: 上次派生结果 (输入不全的字段沿用)
    /// - `rate_per_repeat_override`: 人工覆写的每循环单价
    ///
    /// # 返回
    /// 新的派生结果; 相同输入重复计算结果不变
    #[instrument(skip(self))]
    pub fn compute(
        &self,
        inputs: &RateInputs,
        previous: &DerivedRates,
        rate_per_repeat_override: Option<f64>,
    ) -> DerivedRates {
        let s = finite(inputs.stitch_per_repeat);
        let rs = finite(inputs.rate_per_stitch);
        let g = finite(inputs.cost_factor);
        let divisor = Some(self.config.stitch_divisor).filter(|d| *d > 0.0);

        // 1) 计算单价
        let calculated_rate = match (s, rs, divisor) {
            (Some(s), Some(rs), Some(d)) => Some(round4(s * rs / d * self.config.rate_multiplier)),
            _ => previous.calculated_rate,
        };

        // 2) 每循环单价
        let rate_per_repeat = match finite(rate_per_repeat_override) {
            Some(manual) => Some(manual),
            None => match (calculated_rate, g) {
                (Some(rate), Some(g)) => Some(round4(rate * g)),
                _ => previous.rate_per_repeat,
            },
        };

        // 3) 总价
        let total_rate = match (finite(inputs.repeat_count), rate_per_repeat) {
            (Some(r), Some(rpr)) => Some(round4(r * rpr)),
            _ => previous.total_rate,
        };

        // 4) 机头数
        let heads = match g {
            Some(g) => self.lookup_heads(g),
            None => previous.heads,
        };

        // 5) 每件单价
        let rate_per_piece = match rate_per_repeat {
            Some(rpr) if heads > 0 => Some(round4(rpr / heads as f64)),
            _ => previous.rate_per_piece,
        };

        // 6) 件数金额
        let piece_amount = match (rate_per_piece, finite(inputs.piece_count)) {
            (Some(rpp), Some(p)) => Some(round4(rpp * p)),
            _ => previous.piece_amount,
        };

        // 7) 贴花/花边金额
        let motif_amount = match (finite(inputs.motif_rate), finite(inputs.motif_qty)) {
            (Some(rate), Some(qty)) => Some(round4(rate * qty)),
            _ => previous.motif_amount,
        };
        let lace_amount = match (finite(inputs.lace_rate), finite(inputs.lace_qty)) {
            (Some(rate), Some(qty)) => Some(round4(rate * qty)),
            _ => previous.lace_amount,
        };

        // 8) 最终总价 (取整)
        let final_total_rate = match (total_rate, piece_amount) {
            (Some(total), Some(piece)) => Some((total + piece).round()),
            _ => previous.final_total_rate,
        };

        DerivedRates {
            calculated_rate,
            rate_per_repeat,
            total_rate,
            heads,
            rate_per_piece,
            piece_amount,
            motif_amount,
            lace_amount,
            final_total_rate,
        }
    }

    /// 对明细执行级联 (覆写标志为真时沿用当前每循环单价)
    pub fn apply_to_item(&self, item: &mut ContractItem) {
        let override_value = if item.rate_per_repeat_overridden {
            item.rates.rate_per_repeat
        } else {
            None
        };
        item.rates = self.compute(&item.inputs, &item.rates, override_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Option<f64>, expected: f64) {
        let v = actual.expect("字段应有值");
        assert!((v - expected).abs() < 1e-6, "actual={}, expected={}", v, expected);
    }

    fn full_inputs() -> RateInputs {
        RateInputs {
            stitch_per_repeat: Some(1000.0),
            rate_per_stitch: Some(0.05),
            cost_factor: Some(10.11),
            repeat_count: Some(5.0),
            piece_count: Some(24.0),
            motif_rate: Some(1.5),
            motif_qty: Some(10.0),
            lace_rate: Some(0.25),
            lace_qty: Some(3.0),
        }
    }

    #[test]
    fn test_full_cascade() {
        let cascade = RateCascade::with_default_config();
        let rates = cascade.compute(&full_inputs(), &DerivedRates::default(), None);

        assert_close(rates.calculated_rate, 0.1385);
        assert_close(rates.rate_per_repeat, 1.4002);
        assert_close(rates.total_rate, 7.001);
        assert_eq!(rates.heads, 12);
        assert_close(rates.rate_per_piece, 0.1167);
        assert_close(rates.piece_amount, 2.8008);
        assert_close(rates.motif_amount, 15.0);
        assert_close(rates.lace_amount, 0.75);
        assert_close(rates.final_total_rate, 10.0);
    }

    #[test]
    fn test_large_volume_scale() {
        // 一百万针/循环: calculated_rate = 138.5
        let cascade = RateCascade::with_default_config();
        let inputs = RateInputs {
            stitch_per_repeat: Some(1_000_000.0),
            ..full_inputs()
        };
        let rates = cascade.compute(&inputs, &DerivedRates::default(), None);

        assert_close(rates.calculated_rate, 138.5);
        assert_close(rates.rate_per_repeat, 1400.235);
        assert_close(rates.total_rate, 7001.175);
    }

    #[test]
    fn test_idempotent() {
        let cascade = RateCascade::with_default_config();
        let first = cascade.compute(&full_inputs(), &DerivedRates::default(), None);
        let second = cascade.compute(&full_inputs(), &first, None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_input_keeps_previous_value() {
        let cascade = RateCascade::with_default_config();
        let first = cascade.compute(&full_inputs(), &DerivedRates::default(), None);

        let mut partial = full_inputs();
        partial.repeat_count = None;
        partial.rate_per_stitch = None;
        let second = cascade.compute(&partial, &first, None);

        assert_eq!(second.calculated_rate, first.calculated_rate);
        assert_eq!(second.total_rate, first.total_rate);
    }

    #[test]
    fn test_missing_input_without_history_stays_empty() {
        let cascade = RateCascade::with_default_config();
        let inputs = RateInputs {
            stitch_per_repeat: Some(1000.0),
            ..Default::default()
        };
        let rates = cascade.compute(&inputs, &DerivedRates::default(), None);
        assert_eq!(rates, DerivedRates::default());
    }

    #[test]
    fn test_non_finite_input_suppresses_step() {
        let cascade = RateCascade::with_default_config();
        let mut inputs = full_inputs();
        inputs.rate_per_stitch = Some(f64::NAN);
        let rates = cascade.compute(&inputs, &DerivedRates::default(), None);
        assert_eq!(rates.calculated_rate, None);
        assert_eq!(rates.rate_per_repeat, None);
    }

    #[test]
    fn test_unmapped_cost_factor_leaves_rate_per_piece() {
        let cascade = RateCascade::with_default_config();
        let first = cascade.compute(&full_inputs(), &DerivedRates::default(), None);

        let mut inputs = full_inputs();
        inputs.cost_factor = Some(7.0);
        let second = cascade.compute(&inputs, &first, None);

        assert_eq!(second.heads, 0);
        assert_close(second.rate_per_repeat, 0.9695);
        assert_eq!(second.rate_per_piece, first.rate_per_piece);
    }

    #[test]
    fn test_lookup_heads_epsilon() {
        let cascade = RateCascade::with_default_config();
        assert_eq!(cascade.lookup_heads(10.1105), 12);
        assert_eq!(cascade.lookup_heads(10.112), 0);
        assert_eq!(cascade.lookup_heads(5.055), 6);
    }

    #[test]
    fn test_manual_override_honored() {
        let cascade = RateCascade::with_default_config();
        let rates = cascade.compute(&full_inputs(), &DerivedRates::default(), Some(2.0));
        assert_close(rates.rate_per_repeat, 2.0);
        assert_close(rates.total_rate, 10.0);
        // 已有计算单价不受覆写影响
        assert_close(rates.calculated_rate, 0.1385);
    }

    #[test]
    fn test_apply_to_item_respects_override_flag() {
        let cascade = RateCascade::with_default_config();
        let mut item = ContractItem::new("C1".to_string(), full_inputs());
        cascade.apply_to_item(&mut item);
        assert_close(item.rates.rate_per_repeat, 1.4002);

        item.rates.rate_per_repeat = Some(3.0);
        item.rate_per_repeat_overridden = true;
        cascade.apply_to_item(&mut item);
        assert_close(item.rates.rate_per_repeat, 3.0);
        assert_close(item.rates.total_rate, 15.0);

        item.rate_per_repeat_overridden = false;
        cascade.apply_to_item(&mut item);
        assert_close(item.rates.rate_per_repeat, 1.4002);
    }

    #[test]
    fn test_custom_config() {
        let cascade = RateCascade::new(RateCascadeConfig {
            rate_multiplier: 3.0,
            cost_factor_heads: vec![CostFactorHeads {
                cost_factor: 2.0,
                heads: 2,
            }],
            ..Default::default()
        });
        let inputs = RateInputs {
            stitch_per_repeat: Some(2000.0),
            rate_per_stitch: Some(0.5),
            cost_factor: Some(2.0),
            ..Default::default()
        };
        let rates = cascade.compute(&inputs, &DerivedRates::default(), None);
        assert_close(rates.calculated_rate, 3.0);
        assert_close(rates.rate_per_repeat, 6.0);
        assert_close(rates.rate_per_piece, 3.0);
    }
}
