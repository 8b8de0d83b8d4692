// ==========================================
// 刺绣合同核算系统 - 外发 (Clipping) 台账引擎
// ==========================================
// 职责: 外发/收回校验、状态推导、外发商-合同汇总状态
// 红线: quantity > 0 且 received + quantity <= sent,否则拒绝
// 红线: 收回数量单调递增
// ==========================================

use crate::domain::clipping::{ClippingItem, Vendor};
use crate::domain::contract_item::ContractItem;
use crate::domain::types::{ClipStatus, VendorContractStatus};
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDate;
use tracing::instrument;

// ==========================================
// ClippingLedger - 外发台账引擎
// ==========================================
pub struct ClippingLedger {
    // 无状态引擎
}

impl Default for ClippingLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ClippingLedger {
    pub fn new() -> Self {
        Self {}
    }

    /// 状态推导
    pub fn derive_status(quantity_sent: i64, quantity_received: i64) -> ClipStatus {
        if quantity_received >= quantity_sent && quantity_sent > 0 {
            ClipStatus::Completed
        } else if quantity_received > 0 {
            ClipStatus::PartiallyReceived
        } else {
            ClipStatus::Sent
        }
    }

    /// 生成外发单
    #[instrument(skip(self, item, vendor), fields(item_id = %item.item_id, vendor_id = %vendor.vendor_id))]
    pub fn dispatch(
        &self,
        item: &ContractItem,
        vendor: &Vendor,
        quantity: i64,
        date_sent: NaiveDate,
    ) -> EngineResult<ClippingItem> {
        if !item.is_active {
            return Err(EngineError::inactive("ContractItem", &item.item_id));
        }
        if !vendor.is_active {
            return Err(EngineError::inactive("Vendor", &vendor.vendor_id));
        }
        if quantity <= 0 {
            return Err(EngineError::validation(
                "quantity",
                format!("外发数量必须大于0 (实际={})", quantity),
            ));
        }

        Ok(ClippingItem {
            clip_id: uuid::Uuid::new_v4().to_string(),
            item_id: item.item_id.clone(),
            contract_id: item.contract_id.clone(),
            vendor_id: vendor.vendor_id.clone(),
            quantity_sent: quantity,
            quantity_received: 0,
            date_sent,
            last_received_date: None,
            status: ClipStatus::Sent,
        })
    }

    /// 收回
    ///
    /// # 返回
    /// - Ok(ClippingItem): 收回后的外发单
    /// - Err(EngineError::Validation): 数量非正、超收、日期早于发出
    #[instrument(skip(self, clip), fields(clip_id = %clip.clip_id))]
    pub fn receive(
        &self,
        clip: &ClippingItem,
        quantity: i64,
        received_date: NaiveDate,
    ) -> EngineResult<ClippingItem> {
        if quantity <= 0 {
            return Err(EngineError::validation(
                "quantity",
                format!("收回数量必须大于0 (实际={})", quantity),
            ));
        }
        let outstanding = clip.outstanding();
        if quantity > outstanding {
            return Err(EngineError::validation(
                "quantity",
                format!(
                    "收回数量超过待收数量: 本次={}, 待收={} (发出={}, 已收={})",
                    quantity, outstanding, clip.quantity_sent, clip.quantity_received
                ),
            ));
        }
        if received_date < clip.date_sent {
            return Err(EngineError::validation(
                "received_date",
                format!("收回日期{}早于发出日期{}", received_date, clip.date_sent),
            ));
        }

        let quantity_received = clip.quantity_received + quantity;
        Ok(ClippingItem {
            quantity_received,
            // 分次收回可补录较早日期: 只保留最晚收回日
            last_received_date: clip.last_received_date.max(Some(received_date)),
            status: Self::derive_status(clip.quantity_sent, quantity_received),
            ..clip.clone()
        })
    }

    /// 外发商-合同汇总状态
    /// - 全部 Completed -> Completed
    /// - 存在记录且未全部完成 -> Ongoing
    /// - 无记录 -> Pending
    pub fn contract_status(items: &[ClippingItem]) -> VendorContractStatus {
        if items.is_empty() {
            VendorContractStatus::Pending
        } else if items.iter().all(|c| c.status == ClipStatus::Completed) {
            VendorContractStatus::Completed
        } else {
            VendorContractStatus::Ongoing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract_item::RateInputs;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, day).unwrap()
    }

    fn sent_clip(quantity: i64) -> ClippingItem {
        let ledger = ClippingLedger::new();
        let item = ContractItem::new("C1".to_string(), RateInputs::default());
        let vendor = Vendor::new("外发厂A".to_string(), None);
        ledger.dispatch(&item, &vendor, quantity, date(1)).unwrap()
    }

    #[test]
    fn test_dispatch_starts_as_sent() {
        let clip = sent_clip(100);
        assert_eq!(clip.quantity_received, 0);
        assert_eq!(clip.status, ClipStatus::Sent);
        assert_eq!(clip.contract_id, "C1");
    }

    #[test]
    fn test_dispatch_rejects_bad_input() {
        let ledger = ClippingLedger::new();
        let item = ContractItem::new("C1".to_string(), RateInputs::default());
        let mut vendor = Vendor::new("外发厂A".to_string(), None);
        assert!(ledger.dispatch(&item, &vendor, 0, date(1)).is_err());

        vendor.is_active = false;
        assert!(matches!(
            ledger.dispatch(&item, &vendor, 10, date(1)),
            Err(EngineError::Inactive { .. })
        ));
    }

    #[test]
    fn test_receive_scenario() {
        // 发出100: 收40 -> 收61 拒绝 -> 收60 完成
        let ledger = ClippingLedger::new();
        let clip = sent_clip(100);

        let clip = ledger.receive(&clip, 40, date(3)).unwrap();
        assert_eq!(clip.status, ClipStatus::PartiallyReceived);
        assert_eq!(clip.last_received_date, Some(date(3)));

        let rejected = ledger.receive(&clip, 61, date(4));
        assert!(matches!(rejected, Err(EngineError::Validation { .. })));

        let clip = ledger.receive(&clip, 60, date(5)).unwrap();
        assert_eq!(clip.quantity_received, 100);
        assert_eq!(clip.status, ClipStatus::Completed);
        assert_eq!(clip.outstanding(), 0);
    }

    #[test]
    fn test_receive_rejects_non_positive_and_early_date() {
        let ledger = ClippingLedger::new();
        let clip = sent_clip(10);
        assert!(ledger.receive(&clip, 0, date(2)).is_err());
        assert!(ledger.receive(&clip, -3, date(2)).is_err());

        let early = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        assert!(ledger.receive(&clip, 1, early).is_err());
    }

    #[test]
    fn test_last_received_date_never_moves_back() {
        let ledger = ClippingLedger::new();
        let clip = ledger.receive(&sent_clip(10), 3, date(8)).unwrap();
        let clip = ledger.receive(&clip, 3, date(5)).unwrap();
        assert_eq!(clip.quantity_received, 6);
        assert_eq!(clip.last_received_date, Some(date(8)));
    }

    #[test]
    fn test_contract_status_rollup() {
        let ledger = ClippingLedger::new();
        assert_eq!(ClippingLedger::contract_status(&[]), VendorContractStatus::Pending);

        let done = ledger.receive(&sent_clip(5), 5, date(2)).unwrap();
        let open = sent_clip(5);
        assert_eq!(
            ClippingLedger::contract_status(&[done.clone(), open]),
            VendorContractStatus::Ongoing
        );
        assert_eq!(
            ClippingLedger::contract_status(&[done]),
            VendorContractStatus::Completed
        );
    }
}
