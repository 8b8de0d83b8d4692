// ==========================================
// 刺绣合同核算系统 - 合同与明细计价 API
// ==========================================
// 职责: 合同/明细维护、计价级联、每循环单价覆写、公共字段锁定
// 红线: 所有写入必须记录 ActionLog
// 红线: S/Rs/G 变化时丢弃每循环单价的人工覆写
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::api::audit;
use crate::api::error::{ApiError, ApiResult};
use crate::api::input::{
    optional_text, parse_date, parse_number, parse_optional_date, require_id, RawRateInputs,
};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::contract::Contract;
use crate::domain::contract_item::ContractItem;
use crate::domain::session::{CommonFields, CommonFieldsLock};
use crate::domain::types::ContractStatus;
use crate::engine::rate_cascade::RateCascade;
use crate::repository::{ActionLogRepository, ContractItemRepository, ContractRepository};

// ==========================================
// ItemDetails - 明细描述字段
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDetails {
    pub design_no: Option<String>,
    pub fabric: Option<String>,
    pub color: Option<String>,
}

// ==========================================
// ContractApi - 合同与明细计价 API
// ==========================================

/// 合同与明细计价API
///
/// 职责：
/// 1. 合同创建、状态维护、软删除
/// 2. 明细新增/修改 (原始字符串输入 -> 计价级联)
/// 3. 每循环单价人工覆写
/// 4. 公共字段锁定状态机
/// 5. ActionLog记录
pub struct ContractApi {
    contract_repo: Arc<ContractRepository>,
    item_repo: Arc<ContractItemRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    cascade: Arc<RateCascade>,
}

impl ContractApi {
    pub fn new(
        contract_repo: Arc<ContractRepository>,
        item_repo: Arc<ContractItemRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        cascade: Arc<RateCascade>,
    ) -> Self {
        Self {
            contract_repo,
            item_repo,
            action_log_repo,
            cascade,
        }
    }

    // ==========================================
    // 合同
    // ==========================================

    /// 创建合同
    ///
    /// # 参数
    /// - contract_no: 合同编号 (唯一)
    /// - customer_name: 客户名称 (可选)
    /// - start_date: 开工日期 (YYYY-MM-DD)
    /// - delivery_date: 交货日期 (可选)
    /// - operator: 操作人
    pub fn create_contract(
        &self,
        contract_no: &str,
        customer_name: Option<&str>,
        start_date: &str,
        delivery_date: Option<&str>,
        operator: &str,
    ) -> ApiResult<Contract> {
        let contract_no = require_id("合同编号", contract_no)?;
        let start_date = parse_date("start_date", start_date)?;
        let delivery_date = parse_optional_date("delivery_date", delivery_date)?;
        if let Some(delivery) = delivery_date {
            if delivery < start_date {
                return Err(ApiError::ValidationError(format!(
                    "delivery_date: 交货日期{}早于开工日期{}",
                    delivery, start_date
                )));
            }
        }

        let contract = Contract::new(
            contract_no.to_string(),
            optional_text(customer_name),
            start_date,
            delivery_date,
        );
        self.contract_repo.insert(&contract)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::CreateContract,
            operator,
            Some(&contract.contract_id),
            None,
            Some(serde_json::json!({
                "contract_no": contract.contract_no,
                "start_date": start_date.to_string(),
                "delivery_date": delivery_date.map(|d| d.to_string()),
            })),
            format!("创建合同: {}", contract.contract_no),
        ));

        info!(contract_id = %contract.contract_id, contract_no = %contract.contract_no, "合同已创建");
        Ok(contract)
    }

    pub fn get_contract(&self, contract_id: &str) -> ApiResult<Contract> {
        let contract_id = require_id("合同ID", contract_id)?;
        self.contract_repo
            .find_by_id(contract_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Contract(id={})不存在", contract_id)))
    }

    pub fn list_active_contracts(&self) -> ApiResult<Vec<Contract>> {
        Ok(self.contract_repo.list_active()?)
    }

    /// 修改合同状态 (DRAFT / ACTIVE / COMPLETED)
    pub fn set_contract_status(
        &self,
        contract_id: &str,
        status: &str,
        operator: &str,
    ) -> ApiResult<Contract> {
        let contract = self.active_contract(contract_id)?;
        let normalized = status.trim().to_uppercase();
        if !matches!(normalized.as_str(), "DRAFT" | "ACTIVE" | "COMPLETED") {
            return Err(ApiError::ValidationError(format!(
                "status: 合同状态应为DRAFT/ACTIVE/COMPLETED ({:?})",
                status
            )));
        }
        let new_status = ContractStatus::from_str(&normalized);
        self.contract_repo.update_status(&contract.contract_id, new_status)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::UpdateContractStatus,
            operator,
            Some(&contract.contract_id),
            None,
            Some(serde_json::json!({
                "from": contract.status.to_string(),
                "to": new_status.to_string(),
            })),
            format!("合同状态: {} -> {}", contract.status, new_status),
        ));

        self.get_contract(&contract.contract_id)
    }

    /// 软删除合同 (连同全部明细)
    pub fn deactivate_contract(&self, contract_id: &str, operator: &str) -> ApiResult<()> {
        let contract = self.active_contract(contract_id)?;
        self.contract_repo.deactivate(&contract.contract_id)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::DeactivateContract,
            operator,
            Some(&contract.contract_id),
            None,
            None,
            format!("软删除合同: {}", contract.contract_no),
        ));

        info!(contract_id = %contract.contract_id, "合同已软删除");
        Ok(())
    }

    // ==========================================
    // 明细
    // ==========================================

    /// 新增明细
    ///
    /// # 参数
    /// - contract_id: 合同ID (必须有效)
    /// - details: 描述字段
    /// - raw: 计价原始输入 (非数字视为未录入)
    /// - lock: 当前公共字段锁定状态 (锁定时公共字段以锁定值为准)
    /// - operator: 操作人
    #[instrument(skip(self, details, raw, lock))]
    pub fn add_item(
        &self,
        contract_id: &str,
        details: &ItemDetails,
        raw: &RawRateInputs,
        lock: &CommonFieldsLock,
        operator: &str,
    ) -> ApiResult<ContractItem> {
        let contract = self.active_contract(contract_id)?;

        let inputs = lock.resolve_inputs(raw.parse());
        let mut item = ContractItem::new(contract.contract_id.clone(), inputs);
        item.design_no = optional_text(details.design_no.as_deref());
        item.fabric = optional_text(details.fabric.as_deref());
        item.color = optional_text(details.color.as_deref());
        self.cascade.apply_to_item(&mut item);

        self.item_repo.insert(&item)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::AddItem,
            operator,
            Some(&contract.contract_id),
            Some(&item.item_id),
            Some(serde_json::json!({
                "inputs": item.inputs,
                "rates": item.rates,
                "common_fields_locked": lock.locked_fields().is_some(),
            })),
            format!("新增明细: 计划针数={}", item.planned_total_stitches()),
        ));

        info!(item_id = %item.item_id, "明细已新增");
        Ok(item)
    }

    /// 修改明细计价录入并重算级联
    ///
    /// # 说明
    /// - 未得到数值的字段沿用原录入值
    /// - S/Rs/G 任一数值变化: 丢弃每循环单价覆写,按公式重算
    /// - 仅 R/P/贴花/花边 变化: 覆写值继续生效
    #[instrument(skip(self, raw))]
    pub fn update_item_inputs(
        &self,
        item_id: &str,
        raw: &RawRateInputs,
        operator: &str,
    ) -> ApiResult<ContractItem> {
        let mut item = self.active_item(item_id)?;
        // 非数字/空输入不覆盖已录入值
        let new_inputs = raw.parse().or(&item.inputs);

        let override_dropped =
            item.rate_per_repeat_overridden && item.inputs.repeat_basis_changed(&new_inputs);
        if override_dropped {
            item.rate_per_repeat_overridden = false;
            info!(item_id = %item.item_id, "计价基数变化，每循环单价覆写失效");
        }

        item.inputs = new_inputs;
        self.cascade.apply_to_item(&mut item);
        self.item_repo.update_pricing(&item)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::UpdateItemInputs,
            operator,
            Some(&item.contract_id),
            Some(&item.item_id),
            Some(serde_json::json!({
                "inputs": item.inputs,
                "rates": item.rates,
                "override_dropped": override_dropped,
            })),
            "修改计价录入".to_string(),
        ));

        self.get_item(&item.item_id)
    }

    /// 人工覆写每循环单价 (下游字段随之重算)
    pub fn override_rate_per_repeat(
        &self,
        item_id: &str,
        raw_value: &str,
        operator: &str,
    ) -> ApiResult<ContractItem> {
        let mut item = self.active_item(item_id)?;
        let value = parse_number("rate_per_repeat", raw_value)?;
        if value < 0.0 {
            return Err(ApiError::ValidationError(format!(
                "rate_per_repeat: 不能为负 ({})",
                value
            )));
        }

        let previous = item.rates.rate_per_repeat;
        item.rates.rate_per_repeat = Some(value);
        item.rate_per_repeat_overridden = true;
        self.cascade.apply_to_item(&mut item);
        self.item_repo.update_pricing(&item)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::OverrideRatePerRepeat,
            operator,
            Some(&item.contract_id),
            Some(&item.item_id),
            Some(serde_json::json!({
                "previous": previous,
                "override": value,
            })),
            format!("覆写每循环单价: {:?} -> {}", previous, value),
        ));

        self.get_item(&item.item_id)
    }

    /// 修改描述字段 (不影响计价)
    pub fn update_item_details(
        &self,
        item_id: &str,
        details: &ItemDetails,
        operator: &str,
    ) -> ApiResult<ContractItem> {
        let mut item = self.active_item(item_id)?;
        item.design_no = optional_text(details.design_no.as_deref());
        item.fabric = optional_text(details.fabric.as_deref());
        item.color = optional_text(details.color.as_deref());
        self.item_repo.update_pricing(&item)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::UpdateItemDetails,
            operator,
            Some(&item.contract_id),
            Some(&item.item_id),
            serde_json::to_value(details).ok(),
            "修改明细描述".to_string(),
        ));

        self.get_item(&item.item_id)
    }

    /// 软删除明细
    pub fn deactivate_item(&self, item_id: &str, operator: &str) -> ApiResult<()> {
        let item = self.active_item(item_id)?;
        self.item_repo.deactivate(&item.item_id)?;

        audit::record(&self.action_log_repo, ActionLog::new(
            ActionType::DeactivateItem,
            operator,
            Some(&item.contract_id),
            Some(&item.item_id),
            None,
            "软删除明细".to_string(),
        ));

        info!(item_id = %item.item_id, "明细已软删除");
        Ok(())
    }

    pub fn get_item(&self, item_id: &str) -> ApiResult<ContractItem> {
        let item_id = require_id("明细ID", item_id)?;
        self.item_repo
            .find_by_id(item_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ContractItem(id={})不存在", item_id)))
    }

    pub fn list_items(&self, contract_id: &str) -> ApiResult<Vec<ContractItem>> {
        let contract_id = require_id("合同ID", contract_id)?;
        Ok(self.item_repo.find_active_by_contract(contract_id)?)
    }

    // ==========================================
    // 公共字段锁定
    // ==========================================

    /// 锁定公共字段 (取自当前录入)
    pub fn lock_common_fields(
        &self,
        lock: CommonFieldsLock,
        raw: &RawRateInputs,
    ) -> ApiResult<CommonFieldsLock> {
        Ok(lock.lock(CommonFields::from_inputs(&raw.parse()))?)
    }

    /// 申请解锁 (进入待确认)
    pub fn request_unlock(&self, lock: CommonFieldsLock) -> ApiResult<CommonFieldsLock> {
        Ok(lock.request_unlock()?)
    }

    /// 确认解锁
    pub fn confirm_unlock(&self, lock: CommonFieldsLock) -> ApiResult<CommonFieldsLock> {
        Ok(lock.confirm_unlock()?)
    }

    /// 取消解锁 (回到锁定)
    pub fn cancel_unlock(&self, lock: CommonFieldsLock) -> ApiResult<CommonFieldsLock> {
        Ok(lock.cancel_unlock()?)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn active_contract(&self, contract_id: &str) -> ApiResult<Contract> {
        let contract = self.get_contract(contract_id)?;
        if !contract.is_active {
            return Err(ApiError::ValidationError(format!(
                "Contract(id={})已停用",
                contract.contract_id
            )));
        }
        Ok(contract)
    }

    fn active_item(&self, item_id: &str) -> ApiResult<ContractItem> {
        let item = self.get_item(item_id)?;
        if !item.is_active {
            return Err(ApiError::ValidationError(format!(
                "ContractItem(id={})已停用",
                item.item_id
            )));
        }
        Ok(item)
    }
}
