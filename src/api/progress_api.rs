// ==========================================
// 刺绣合同核算系统 - 进度汇总 API
// ==========================================
// 职责: 明细/合同进度、剩余天数、合同综合报表
// 只读: 不产生任何写入
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;

use crate::api::error::{ApiError, ApiResult};
use crate::api::input::{parse_date, require_id};
use crate::domain::contract::Contract;
use crate::engine::progress::{
    ContractProgress, ContractReport, DaysLeft, ItemProgress, ProgressAggregator,
};
use crate::repository::{
    AssignmentRepository, ClippingRepository, ContractItemRepository, ContractRepository,
};

// ==========================================
// ProgressApi - 进度汇总 API
// ==========================================
pub struct ProgressApi {
    contract_repo: Arc<ContractRepository>,
    item_repo: Arc<ContractItemRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    clipping_repo: Arc<ClippingRepository>,
    aggregator: ProgressAggregator,
}

impl ProgressApi {
    pub fn new(
        contract_repo: Arc<ContractRepository>,
        item_repo: Arc<ContractItemRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        clipping_repo: Arc<ClippingRepository>,
    ) -> Self {
        Self {
            contract_repo,
            item_repo,
            assignment_repo,
            clipping_repo,
            aggregator: ProgressAggregator::new(),
        }
    }

    pub fn item_progress(&self, item_id: &str) -> ApiResult<ItemProgress> {
        let item_id = require_id("明细ID", item_id)?;
        let item = self
            .item_repo
            .find_by_id(item_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ContractItem(id={})不存在", item_id)))?;
        Ok(self.aggregator.item_progress(&item))
    }

    pub fn contract_progress(&self, contract_id: &str) -> ApiResult<ContractProgress> {
        let contract = self.load_contract(contract_id)?;
        let items = self.item_repo.find_active_by_contract(&contract.contract_id)?;
        Ok(self.aggregator.contract_progress(&contract, &items))
    }

    /// 剩余天数
    ///
    /// # 参数
    /// - today: 计算基准日 (YYYY-MM-DD,由调用方提供)
    pub fn days_left(&self, contract_id: &str, today: &str) -> ApiResult<DaysLeft> {
        let today = parse_date("today", today)?;
        let contract = self.load_contract(contract_id)?;
        self.days_left_on(&contract, today)
    }

    /// 合同综合报表: 明细进度 + 合同进度 + 剩余天数 + 外发汇总
    pub fn contract_report(&self, contract_id: &str, today: &str) -> ApiResult<ContractReport> {
        let today = parse_date("today", today)?;
        let contract = self.load_contract(contract_id)?;
        self.report_for(&contract, today)
    }

    /// 全部有效合同的综合报表
    pub fn report_all(&self, today: NaiveDate) -> ApiResult<Vec<ContractReport>> {
        self.contract_repo
            .list_active()?
            .iter()
            .map(|contract| self.report_for(contract, today))
            .collect()
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn load_contract(&self, contract_id: &str) -> ApiResult<Contract> {
        let contract_id = require_id("合同ID", contract_id)?;
        self.contract_repo
            .find_by_id(contract_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Contract(id={})不存在", contract_id)))
    }

    fn days_left_on(&self, contract: &Contract, today: NaiveDate) -> ApiResult<DaysLeft> {
        let assignments = self.assignment_repo.find_by_contract(&contract.contract_id)?;
        Ok(self.aggregator.days_left(contract, &assignments, today))
    }

    fn report_for(&self, contract: &Contract, today: NaiveDate) -> ApiResult<ContractReport> {
        let items = self.item_repo.find_active_by_contract(&contract.contract_id)?;
        let clips = self.clipping_repo.find_by_contract(&contract.contract_id)?;

        Ok(ContractReport {
            contract_id: contract.contract_id.clone(),
            contract_no: contract.contract_no.clone(),
            progress: self.aggregator.contract_progress(contract, &items),
            days_left: self.days_left_on(contract, today)?,
            clipping: self.aggregator.clipping_by_contract(&clips),
        })
    }
}
