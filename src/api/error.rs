// ==========================================
// 刺绣合同核算系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Engine/Repository错误为用户友好的错误消息
// 红线: 错误信息必须包含显式原因
// ==========================================

use crate::domain::session::InvalidLockTransition;
use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("版本冲突: {0}")]
    VersionConflict(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::VersionConflict { message } => ApiError::VersionConflict(message),

            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::ValidationError(format!("检查约束违反: {}", msg))
            }
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),

            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation { field, message } => {
                ApiError::ValidationError(format!("{}: {}", field, message))
            }
            EngineError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            EngineError::Inactive { entity, id } => {
                ApiError::ValidationError(format!("{}(id={})已停用", entity, id))
            }
        }
    }
}

impl From<InvalidLockTransition> for ApiError {
    fn from(err: InvalidLockTransition) -> Self {
        ApiError::InvalidStateTransition {
            from: err.from,
            to: err.to,
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "ContractItem".to_string(),
            id: "I001".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("ContractItem"));
                assert!(msg.contains("I001"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = RepositoryError::VersionConflict {
            message: "E1".to_string(),
        }
        .into();
        assert!(matches!(api_err, ApiError::VersionConflict(_)));
    }

    #[test]
    fn test_engine_error_conversion() {
        let api_err: ApiError = EngineError::validation("stitches", "针数必须大于0").into();
        match api_err {
            ApiError::ValidationError(msg) => assert!(msg.starts_with("stitches")),
            _ => panic!("Expected ValidationError"),
        }

        // 停用对象属于输入校验失败
        let api_err: ApiError = EngineError::inactive("Machine", "X").into();
        match api_err {
            ApiError::ValidationError(msg) => assert!(msg.contains("已停用")),
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_lock_transition_conversion() {
        let err = crate::domain::session::CommonFieldsLock::Unlocked
            .request_unlock()
            .unwrap_err();
        let api_err: ApiError = err.into();
        assert!(matches!(api_err, ApiError::InvalidStateTransition { .. }));
    }
}
