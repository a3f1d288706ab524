// ==========================================
// 钱币收藏管理 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把导入层/仓储层错误转换为用户可读的错误消息
// ==========================================

use crate::importer::error::{ImportError, ParseError};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 导入流程错误
    // ==========================================
    /// 文件无法解析，需重新选择文件
    #[error("文件解析失败: {0}")]
    ParseFailed(String),

    /// 必填字段未映射（每个字段一条 "{label} is required"）
    #[error("必填字段未映射: {}", .messages.join(", "))]
    MissingRequiredFields { messages: Vec<String> },

    #[error("尚未创建收藏集，请先创建收藏集")]
    NoCollection,

    /// 存储拒绝整批写入（原样透出原因）
    #[error("批量写入失败: {0}")]
    CommitFailed(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

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

impl ApiError {
    /// 是否可在当前会话内恢复（不需要重新选择文件）
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ApiError::MissingRequiredFields { .. }
                | ApiError::InvalidInput(_)
                | ApiError::CommitFailed(_)
                | ApiError::NoCollection
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
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
            RepositoryError::ConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("约束违反: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Parse(e) => ApiError::from(e),
            ImportError::MissingRequiredFields(_) => ApiError::MissingRequiredFields {
                messages: err.missing_field_messages(),
            },
            ImportError::UnknownField(field) => {
                ApiError::InvalidInput(format!("未知字段: {}", field))
            }
            ImportError::UnknownColumn(column) => {
                ApiError::InvalidInput(format!("源文件中不存在列: {}", column))
            }
            ImportError::NoCollection => ApiError::NoCollection,
            ImportError::CommitRejected(e) => ApiError::CommitFailed(e.to_string()),
            ImportError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            ImportError::Other(e) => ApiError::Other(e),
        }
    }
}

impl From<ParseError> for ApiError {
    fn from(err: ParseError) -> Self {
        ApiError::ParseFailed(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
