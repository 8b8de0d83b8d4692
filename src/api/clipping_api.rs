// ==========================================
// 刺绣合同核算系统 - 外发 (Clipping) API
// ==========================================
// 职责: 外发商维护、外发、收回、外发商进度
// 红线: received + quantity <= sent (引擎校验 + SQL 守卫双重保证)
// ==========================================

use std::sync::Arc;

use tracing::{info, instrument};

use crate::api::audit;
use crate::api::error::{ApiError, ApiResult};
use crate::api::input::{optional_text, parse_date, parse_quantity, require_id};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::clipping::{ClippingItem, Vendor};
use crate::engine::clipping::ClippingLedger;
use crate::engine::progress::{ProgressAggregator, VendorProgress};
use crate::repository::{
    ActionLogRepository, ClippingRepository, ContractItemRepository, VendorRepository,
};

// ==========================================
// ClippingApi - 外发 API
// ==========================================
pub struct ClippingApi {
    item_repo: Arc<ContractItemRepository>,
    vendor_repo: Arc<VendorRepository>,
    clipping_repo: Arc<ClippingRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    ledger: ClippingLedger,
    aggregator: ProgressAggregator,
}

impl ClippingApi {
    pub fn new(
        item_repo: Arc<ContractItemRepository>,
        vendor_repo: Arc<VendorRepository>,
        clipping_repo: Arc<ClippingRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            item_repo,
            vendor_repo,
            clipping_repo,
            action_log_repo,
            ledger: ClippingLedger::new(),
            aggregator: ProgressAggregator::new(),
        }
    }

    // ==========================================
    // 外发商
    // ==========================================

    pub fn create_vendor(
        &self,
        vendor_name: &str,
        contact: Option<&str>,
        operator: &str,
    ) -> ApiResult<Vendor> {
        let vendor_name = require_id("外发商名称", vendor_name)?;
        let vendor = Vendor::new(vendor_name.to_string(), optional_text(contact));
        self.vendor_repo.insert(&vendor)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::CreateVendor,
            operator,
            None,
            None,
            Some(serde_json::json!({
                "vendor_id": vendor.vendor_id,
                "vendor_name": vendor.vendor_name,
            })),
            format!("新增外发商: {}", vendor.vendor_name),
        ));

        Ok(vendor)
    }

    pub fn list_vendors(&self) -> ApiResult<Vec<Vendor>> {
        Ok(self.vendor_repo.list_active()?)
    }

    // ==========================================
    // 外发 / 收回
    // ==========================================

    /// 外发
    ///
    /// # 参数
    /// - quantity: 外发数量 (正整数)
    /// - date_sent: 发出日期 (YYYY-MM-DD)
    #[instrument(skip(self))]
    pub fn send(
        &self,
        item_id: &str,
        vendor_id: &str,
        quantity: &str,
        date_sent: &str,
        operator: &str,
    ) -> ApiResult<ClippingItem> {
        let item_id = require_id("明细ID", item_id)?;
        let vendor_id = require_id("外发商ID", vendor_id)?;
        let quantity = parse_quantity("quantity", quantity)?;
        let date_sent = parse_date("date_sent", date_sent)?;

        let item = self
            .item_repo
            .find_by_id(item_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ContractItem(id={})不存在", item_id)))?;
        let vendor = self
            .vendor_repo
            .find_by_id(vendor_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Vendor(id={})不存在", vendor_id)))?;

        let clip = self.ledger.dispatch(&item, &vendor, quantity, date_sent)?;
        self.clipping_repo.insert(&clip)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::SendClipping,
            operator,
            Some(&clip.contract_id),
            Some(&clip.item_id),
            Some(serde_json::json!({
                "clip_id": clip.clip_id,
                "vendor_id": clip.vendor_id,
                "quantity_sent": clip.quantity_sent,
                "date_sent": clip.date_sent.to_string(),
            })),
            format!("外发{}件至{}", quantity, vendor.vendor_name),
        ));

        info!(clip_id = %clip.clip_id, quantity, "外发单已创建");
        Ok(clip)
    }

    /// 收回
    ///
    /// # 返回
    /// - Ok(ClippingItem): 收回后的外发单 (状态已推导)
    /// - Err(ValidationError): 数量非正、超收、日期早于发出
    #[instrument(skip(self))]
    pub fn receive(
        &self,
        clip_id: &str,
        quantity: &str,
        received_date: &str,
        operator: &str,
    ) -> ApiResult<ClippingItem> {
        let clip_id = require_id("外发单ID", clip_id)?;
        let quantity = parse_quantity("quantity", quantity)?;
        let received_date = parse_date("received_date", received_date)?;

        let clip = self
            .clipping_repo
            .find_by_id(clip_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ClippingItem(id={})不存在", clip_id)))?;

        // 引擎预校验给出明确原因; 并发下以 SQL 守卫为准
        self.ledger.receive(&clip, quantity, received_date)?;
        let updated = self
            .clipping_repo
            .apply_receipt(clip_id, quantity, received_date)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::ReceiveClipping,
            operator,
            Some(&updated.contract_id),
            Some(&updated.item_id),
            Some(serde_json::json!({
                "clip_id": updated.clip_id,
                "quantity": quantity,
                "quantity_received": updated.quantity_received,
                "quantity_sent": updated.quantity_sent,
                "status": updated.status.to_string(),
            })),
            format!(
                "收回{}件 ({}/{})",
                quantity, updated.quantity_received, updated.quantity_sent
            ),
        ));

        info!(clip_id = %updated.clip_id, status = %updated.status, "外发收回已登记");
        Ok(updated)
    }

    pub fn get_clip(&self, clip_id: &str) -> ApiResult<ClippingItem> {
        let clip_id = require_id("外发单ID", clip_id)?;
        self.clipping_repo
            .find_by_id(clip_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ClippingItem(id={})不存在", clip_id)))
    }

    /// 外发商进度 (按合同 + 总体)
    pub fn vendor_progress(&self, vendor_id: &str) -> ApiResult<VendorProgress> {
        let vendor_id = require_id("外发商ID", vendor_id)?;
        let vendor = self
            .vendor_repo
            .find_by_id(vendor_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Vendor(id={})不存在", vendor_id)))?;
        let clips = self.clipping_repo.find_by_vendor(&vendor.vendor_id)?;
        Ok(self.aggregator.vendor_progress(&vendor, &clips))
    }
}
