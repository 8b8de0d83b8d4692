// ==========================================
// 刺绣合同核算系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、状态机
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod clipping;
pub mod contract;
pub mod contract_item;
pub mod machine;
pub mod production;
pub mod session;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use clipping::{ClippingItem, Vendor};
pub use contract::Contract;
pub use contract_item::{ContractItem, DerivedRates, RateInputs};
pub use machine::{Machine, MachineAssignment, MachineUsage};
pub use production::{DailyProduction, EntryRevision, ProductionEntry};
pub use session::{CommonFields, CommonFieldsLock, InvalidLockTransition};
pub use types::{
    ClipStatus, ConsistencyWarning, ContractStatus, MutationOutcome, ProgressStatus, Shift,
    VendorContractStatus,
};
