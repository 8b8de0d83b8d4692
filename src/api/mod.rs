// ==========================================
// 刺绣合同核算系统 - API 层
// ==========================================
// 职责: 接收原始输入,调用引擎与仓储,写入操作日志
// ==========================================

pub mod allocation_api;
mod audit;
pub mod clipping_api;
pub mod contract_api;
pub mod error;
pub mod input;
pub mod production_api;
pub mod progress_api;

// 重导出核心类型
pub use allocation_api::{AllocationApi, RawAssignment};
pub use clipping_api::ClippingApi;
pub use contract_api::{ContractApi, ItemDetails};
pub use error::{ApiError, ApiResult};
pub use input::RawRateInputs;
pub use production_api::{ProductionApi, RawEntry, RawEntryRevision, RescanReport};
pub use progress_api::ProgressApi;
