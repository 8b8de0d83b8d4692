// ==========================================
// 刺绣合同核算系统 - 合同头领域模型
// ==========================================
// 合同头 (日期/状态) 由外部 CRUD 维护,引擎只读取
// ==========================================

use crate::domain::types::ContractStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Contract - 合同
// ==========================================
// 红线: 只软删除 (is_active = false),不物理删除
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub contract_id: String,               // 合同ID (UUID)
    pub contract_no: String,               // 合同编号
    pub customer_name: Option<String>,     // 客户名称
    pub start_date: NaiveDate,             // 开工日期 (计算已用天数)
    pub delivery_date: Option<NaiveDate>,  // 交货日期
    pub status: ContractStatus,            // 合同状态
    pub is_active: bool,                   // 软删除标志
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Contract {
    /// 创建新合同（自动生成 UUID 和时间戳）
    pub fn new(
        contract_no: String,
        customer_name: Option<String>,
        start_date: NaiveDate,
        delivery_date: Option<NaiveDate>,
    ) -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            contract_id: uuid::Uuid::new_v4().to_string(),
            contract_no,
            customer_name,
            start_date,
            delivery_date,
            status: ContractStatus::Draft,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// 自开工日起已过天数 (开工前为 0)
    pub fn elapsed_days(&self, today: NaiveDate) -> i64 {
        (today - self.start_date).num_days().max(0)
    }
}
