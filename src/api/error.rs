// ==========================================
// 商品目录批量导入系统 - API 层错误类型
// ==========================================
// 职责: 定义 API 层错误类型,转换下层错误为调用方友好的错误消息
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 权限 =====
    #[error("权限不足: {0}")]
    PermissionDenied(String),

    // ===== 业务规则错误 =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("作业状态不允许该操作: {0}")]
    InvalidJobState(String),

    // ===== 导入错误 =====
    #[error("文件导入失败: {0}")]
    ImportFailed(String),

    // ===== 数据访问错误 =====
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 ImportError 转换
// 目的: 将流水线错误映射为调用方可判别的 API 错误
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::JobNotFound(id) => ApiError::NotFound(format!("作业不存在: {}", id)),
            ImportError::AlreadyCommitted(id) => {
                ApiError::InvalidJobState(format!("作业已提交,拒绝重复提交: {}", id))
            }
            ImportError::JobNotCommittable { job_id, status } => ApiError::InvalidJobState(
                format!("作业不可提交: job={}, status={}", job_id, status),
            ),
            ImportError::UnsupportedFormat(msg)
            | ImportError::WorkbookUnreadable(msg) => ApiError::InvalidInput(msg),
            ImportError::SheetMissing(sheet) => {
                ApiError::InvalidInput(format!("缺少必需工作表: {}", sheet))
            }
            ImportError::ColumnMissing { sheet, column } => {
                ApiError::InvalidInput(format!("工作表 {} 缺少必需列: {}", sheet, column))
            }
            ImportError::Repository(repo_err) => ApiError::from(repo_err),
            other => ApiError::ImportFailed(other.to_string()),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, key } => {
                ApiError::NotFound(format!("{}(key={})不存在", entity, key))
            }
            RepositoryError::InvalidStateTransition { job_id, from } => {
                ApiError::InvalidJobState(format!("作业 {} 当前状态 {} 不允许转换", job_id, from))
            }
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
