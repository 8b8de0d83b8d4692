// ==========================================
// 刺绣合同核算系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 一次变更 = 一个事务,累计使用原子增量
// ==========================================

pub mod action_log_repo;
pub mod assignment_repo;
pub mod clipping_repo;
pub mod contract_item_repo;
pub mod contract_repo;
pub mod error;
pub mod machine_repo;
pub mod production_repo;
pub mod vendor_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use assignment_repo::AssignmentRepository;
pub use clipping_repo::ClippingRepository;
pub use contract_item_repo::ContractItemRepository;
pub use contract_repo::ContractRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use machine_repo::MachineRepository;
pub use production_repo::ProductionRepository;
pub use vendor_repo::VendorRepository;
