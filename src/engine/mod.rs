// ==========================================
// 刺绣合同核算系统 - 引擎层
// ==========================================
// 职责: 实现核算与进度规则,不拼 SQL
// 红线: Engine 不拼 SQL; 硬约束返回 EngineError,软约束返回告警
// ==========================================

pub mod allocation;
pub mod clipping;
pub mod consumption;
pub mod error;
pub mod progress;
pub mod rate_cascade;

// 重导出核心引擎
pub use allocation::{AllocationLedger, AllocationPlan, AssignmentInput};
pub use clipping::ClippingLedger;
pub use consumption::{ConsumptionTracker, EntryDelta, EntryTally, ItemBalance, MachineBalance};
pub use error::{EngineError, EngineResult};
pub use progress::{
    completion_percent, ContractProgress, ContractReport, DaysLeft, ItemProgress,
    ProgressAggregator, VendorContractProgress, VendorProgress,
};
pub use rate_cascade::{round4, CostFactorHeads, RateCascade, RateCascadeConfig};
