// ==========================================
// 商品目录批量导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 错误分级:
// - 作业级: 文件不可读/表缺失 → validate 直接失败,不创建作业
// - 行级:   解析/解析引用/校验问题 → 进入报告 Issue,不在此枚举
// - 提交级: 前置条件/事务失败 → commit 返回错误
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件/工作簿错误(作业级) =====
    #[error("文件格式不支持: {0}(仅支持 .xlsx 或 CSV 工作簿)")]
    UnsupportedFormat(String),

    #[error("工作簿解析失败: {0}")]
    WorkbookUnreadable(String),

    #[error("缺少必需工作表: {0}")]
    SheetMissing(String),

    #[error("工作表 {sheet} 缺少必需列: {column}")]
    ColumnMissing { sheet: String, column: String },

    // ===== 作业生命周期错误(提交级) =====
    #[error("作业不存在: {0}")]
    JobNotFound(String),

    #[error("作业不可提交: job={job_id}, status={status}")]
    JobNotCommittable { job_id: String, status: String },

    #[error("作业已提交,拒绝重复提交: job={0}")]
    AlreadyCommitted(String),

    #[error("作业快照缺失: job={0}")]
    SnapshotMissing(String),

    // ===== 提交执行错误 =====
    #[error("提交失败,事务已回滚: {0}")]
    CommitAborted(String),

    // ===== 下层错误 =====
    #[error("仓储错误: {0}")]
    Repository(#[from] crate::repository::error::RepositoryError),

    #[error("序列化失败: {0}")]
    Serialization(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::WorkbookUnreadable(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::WorkbookUnreadable(format!("CSV 解析失败: {}", err))
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::Serialization(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
