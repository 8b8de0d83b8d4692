// ==========================================
// 刺绣合同核算系统 - 核心库
// ==========================================
// 职责: 合同明细计价、机台分配、生产录入、外发剪花与进度汇总
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 核算规则
pub mod engine;

// 配置层 - 费率参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ClipStatus, ContractStatus, MutationOutcome, ProgressStatus, Shift, VendorContractStatus,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, ClippingItem, CommonFieldsLock, Contract, ContractItem, Machine,
    MachineAssignment, ProductionEntry, Vendor,
};

// 引擎
pub use engine::{
    AllocationLedger, ClippingLedger, ConsumptionTracker, ProgressAggregator, RateCascade,
};

// API
pub use api::{AllocationApi, ClippingApi, ContractApi, ProductionApi, ProgressApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "刺绣合同核算系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
