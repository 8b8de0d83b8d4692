// ==========================================
// 刺绣合同核算系统 - 引擎层错误类型
// ==========================================
// 硬约束违反: 操作整体中止,不产生部分状态变更
// 软约束 (ConsistencyWarning) 不走错误通道
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("数据验证失败 (field={field}): {message}")]
    Validation { field: String, message: String },

    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("引用已停用: {entity} with id={id}")]
    Inactive { entity: String, id: String },
}

impl EngineError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn inactive(entity: &str, id: &str) -> Self {
        EngineError::Inactive {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
