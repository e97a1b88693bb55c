// ==========================================
// 商品目录批量导入系统 - 导入作业仓储 Trait
// ==========================================
// 职责: 定义作业与快照的数据访问接口(不包含业务逻辑)
// 红线: 作业从不删除(审计保留);快照不可变且按内容哈希去重
// ==========================================

use crate::domain::import::ImportJob;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ImportJobRepository Trait
// ==========================================
// 用途: 导入作业生命周期 + 快照制品存取
// 实现者: ImportJobRepositoryImpl(rusqlite)
#[async_trait]
pub trait ImportJobRepository: Send + Sync {
    // ===== 作业生命周期 =====

    /// 插入新作业(校验阶段创建)
    async fn insert_job(&self, job: &ImportJob) -> RepositoryResult<()>;

    /// 覆写作业状态、报告与统计(提交阶段收尾)
    async fn update_job(&self, job: &ImportJob) -> RepositoryResult<()>;

    /// 按 id 查作业
    async fn get_job(&self, job_id: &str) -> RepositoryResult<Option<ImportJob>>;

    /// 状态 CAS: 仅当作业处于可提交状态时置为 COMMITTING
    ///
    /// # 返回
    /// - Ok(true): 本调用赢得提交权
    /// - Ok(false): 作业不存在、不可提交或已被并发提交占用
    ///
    /// # 说明
    /// - 并发重复提交必须在此被拒绝,不依赖目录表约束兜底
    async fn try_mark_committing(&self, job_id: &str) -> RepositoryResult<bool>;

    /// 查询最近的作业(按创建时间倒序)
    async fn recent_jobs(&self, limit: usize) -> RepositoryResult<Vec<ImportJob>>;

    // ===== 快照制品 =====

    /// 持久化快照字节(内容寻址)
    ///
    /// # 返回
    /// - Ok(true): 新制品已写入
    /// - Ok(false): 相同哈希的制品已存在,被复用
    async fn put_snapshot(&self, content_hash: &str, content: &[u8]) -> RepositoryResult<bool>;

    /// 按内容哈希读取快照字节
    async fn get_snapshot(&self, content_hash: &str) -> RepositoryResult<Option<Vec<u8>>>;
}
