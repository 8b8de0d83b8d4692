// ==========================================
// 刺绣合同核算系统 - 原始输入解析
// ==========================================
// 表现层以原始字符串调用全部操作,在此统一解析
// 计价字段: 空/非数字 -> None (级联保留上次值,不报错)
// 数量/日期/班次: 非法即 ValidationError
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::contract_item::RateInputs;
use crate::domain::types::Shift;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 日期格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 解析可选数值 (千分位逗号忽略; 空/非数字/非有限值 -> None)
pub fn parse_optional_number(raw: Option<&str>) -> Option<f64> {
    let cleaned = raw?.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 解析必填数值
pub fn parse_number(field: &str, raw: &str) -> ApiResult<f64> {
    parse_optional_number(Some(raw))
        .ok_or_else(|| ApiError::ValidationError(format!("{}: 不是有效数字 ({:?})", field, raw)))
}

/// 解析非负数值 (空输入视为 0)
pub fn parse_non_negative(field: &str, raw: &str) -> ApiResult<f64> {
    if raw.trim().is_empty() {
        return Ok(0.0);
    }
    let value = parse_number(field, raw)?;
    if value < 0.0 {
        return Err(ApiError::ValidationError(format!("{}: 不能为负 ({})", field, value)));
    }
    Ok(value)
}

/// 解析整数数量 (外发/收回件数)
pub fn parse_quantity(field: &str, raw: &str) -> ApiResult<i64> {
    raw.trim()
        .replace(',', "")
        .parse::<i64>()
        .map_err(|_| ApiError::ValidationError(format!("{}: 不是有效整数 ({:?})", field, raw)))
}

/// 解析日期 (YYYY-MM-DD)
pub fn parse_date(field: &str, raw: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ApiError::ValidationError(format!("{}: 日期格式应为YYYY-MM-DD ({:?})", field, raw)))
}

/// 解析可选日期 (空 -> None)
pub fn parse_optional_date(field: &str, raw: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(field, s).map(Some),
    }
}

pub fn parse_shift(raw: &str) -> ApiResult<Shift> {
    Shift::parse(raw)
        .ok_or_else(|| ApiError::ValidationError(format!("shift: 班次应为DAY/NIGHT ({:?})", raw)))
}

/// 校验必填标识
pub fn require_id<'a>(field: &str, raw: &'a str) -> ApiResult<&'a str> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(id)
}

/// 可选文本 (去空白,空串 -> None)
pub fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ==========================================
// RawRateInputs - 明细计价原始输入
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRateInputs {
    pub stitch_per_repeat: Option<String>,
    pub rate_per_stitch: Option<String>,
    pub cost_factor: Option<String>,
    pub repeat_count: Option<String>,
    pub piece_count: Option<String>,
    pub motif_rate: Option<String>,
    pub motif_qty: Option<String>,
    pub lace_rate: Option<String>,
    pub lace_qty: Option<String>,
}

impl RawRateInputs {
    pub fn parse(&self) -> RateInputs {
        RateInputs {
            stitch_per_repeat: parse_optional_number(self.stitch_per_repeat.as_deref()),
            rate_per_stitch: parse_optional_number(self.rate_per_stitch.as_deref()),
            cost_factor: parse_optional_number(self.cost_factor.as_deref()),
            repeat_count: parse_optional_number(self.repeat_count.as_deref()),
            piece_count: parse_optional_number(self.piece_count.as_deref()),
            motif_rate: parse_optional_number(self.motif_rate.as_deref()),
            motif_qty: parse_optional_number(self.motif_qty.as_deref()),
            lace_rate: parse_optional_number(self.lace_rate.as_deref()),
            lace_qty: parse_optional_number(self.lace_qty.as_deref()),
        }
    }
}
