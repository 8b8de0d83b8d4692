// ==========================================
// 刺绣合同核算系统 - 外发 (Clipping) 领域模型
// ==========================================
// 红线: quantity_received <= quantity_sent (强制,不只是展示)
// ==========================================

use crate::domain::types::ClipStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Vendor - 外发加工商
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub vendor_id: String,
    pub vendor_name: String,
    pub contact: Option<String>,
    pub is_active: bool,
}

impl Vendor {
    pub fn new(vendor_name: String, contact: Option<String>) -> Self {
        Self {
            vendor_id: uuid::Uuid::new_v4().to_string(),
            vendor_name,
            contact,
            is_active: true,
        }
    }
}

// ==========================================
// ClippingItem - 外发单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClippingItem {
    pub clip_id: String,
    pub item_id: String,
    pub contract_id: String,
    pub vendor_id: String,
    pub quantity_sent: i64,                     // 发出数量
    pub quantity_received: i64,                 // 累计收回 (单调递增)
    pub date_sent: NaiveDate,
    pub last_received_date: Option<NaiveDate>,
    pub status: ClipStatus,
}

impl ClippingItem {
    /// 待收回数量
    pub fn outstanding(&self) -> i64 {
        (self.quantity_sent - self.quantity_received).max(0)
    }
}
