// ==========================================
// 商品目录批量导入系统 - 提交引擎
// ==========================================
// 职责: 从快照执行一次性事务化提交
// 流程: 状态 CAS → 读快照 → 重新规范化/解析(以当前存储为准)
//       → 构建计划 → 单事务依赖有序 upsert → 提交后验证 → 终态
// 红线:
// - 提交对每个作业只允许发生一次,并发重复提交由状态 CAS 拒绝
// - allow_partial=false: 任一行失败 → 整体回滚,零实体落库
// - 提交后验证只做诊断标记,绝不回滚(事务已提交)
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::import::{CommitCounts, CommitOutcome, DbVerify, ImportJob, RowFailure};
use crate::domain::types::JobStatus;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::plan::build_upsert_plan;
use crate::importer::resolution::ResolutionContext;
use crate::importer::row_normalizer::RowNormalizer;
use crate::importer::snapshot::SnapshotStore;
use crate::importer::workbook::read_workbook;
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::RepositoryError;
use crate::repository::import_job_repo::ImportJobRepository;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// CommitEngine
// ==========================================
pub struct CommitEngine<R, J, C>
where
    R: CatalogRepository,
    J: ImportJobRepository,
    C: ImportConfigReader,
{
    catalog_repo: R,
    job_repo: J,
    config: C,
}

impl<R, J, C> CommitEngine<R, J, C>
where
    R: CatalogRepository,
    J: ImportJobRepository,
    C: ImportConfigReader,
{
    pub fn new(catalog_repo: R, job_repo: J, config: C) -> Self {
        Self {
            catalog_repo,
            job_repo,
            config,
        }
    }

    /// 提交作业
    ///
    /// # 前置条件
    /// - 作业存在且处于可提交状态(校验通过/带警告通过)
    /// - 作业未被提交过 —— 已 SUCCESS 的作业重复提交被拒绝,绝不静默重放
    ///
    /// # 参数
    /// - allow_partial: 行级尽力而为开关
    #[instrument(skip(self), fields(job_id = %job_id, allow_partial))]
    pub async fn commit(&self, job_id: &str, allow_partial: bool) -> ImportResult<CommitOutcome> {
        // === 步骤 1: 前置检查 ===
        let job = self
            .job_repo
            .get_job(job_id)
            .await?
            .ok_or_else(|| ImportError::JobNotFound(job_id.to_string()))?;
        if job.status == JobStatus::Success {
            return Err(ImportError::AlreadyCommitted(job_id.to_string()));
        }
        if !job.status.is_commit_eligible() {
            return Err(ImportError::JobNotCommittable {
                job_id: job_id.to_string(),
                status: job.status.to_string(),
            });
        }

        // === 步骤 2: 状态 CAS(并发第二个提交在此拿到 false) ===
        if !self.job_repo.try_mark_committing(job_id).await? {
            let current = self
                .job_repo
                .get_job(job_id)
                .await?
                .map(|j| j.status)
                .unwrap_or(JobStatus::Failed);
            if current == JobStatus::Success {
                return Err(ImportError::AlreadyCommitted(job_id.to_string()));
            }
            return Err(ImportError::JobNotCommittable {
                job_id: job_id.to_string(),
                status: current.to_string(),
            });
        }
        info!(job_id = %job_id, "已获得提交权,开始执行");

        // CAS 之后的任何失败都必须把作业落到 FAILED 终态,不得悬停在 COMMITTING
        match self.execute(job, allow_partial).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(job_id = %job_id, error = %err, "提交失败,作业转 FAILED");
                let failure = RowFailure {
                    sheet: "(作业级)".to_string(),
                    row: 0,
                    reason: err.to_string(),
                };
                self.finish(
                    job_id,
                    JobStatus::Failed,
                    CommitCounts::default(),
                    vec![failure],
                    DbVerify::default(),
                )
                .await
                .ok();
                Err(err)
            }
        }
    }

    /// CAS 成功后的提交主体
    async fn execute(&self, job: ImportJob, allow_partial: bool) -> ImportResult<CommitOutcome> {
        let job_id = job.job_id.clone();

        // === 步骤 3: 读快照(绝不重读原始请求) ===
        debug!("步骤 3: 读取快照");
        let snapshot_hash = job
            .snapshot_hash
            .as_deref()
            .ok_or_else(|| ImportError::SnapshotMissing(job_id.clone()))?;
        let store = SnapshotStore::new(&self.job_repo);
        let bytes = store.load(snapshot_hash, &job_id).await?;

        // === 步骤 4: 重新规范化 + 以当前存储状态重新解析 ===
        // 实体自校验以来可能已变化,这是有意为之: 提交以活存储为准重算引用
        debug!("步骤 4: 重新规范化与解析");
        let workbook = read_workbook(&bytes)?;
        let input = RowNormalizer.normalize(&workbook)?;
        let mut ctx = ResolutionContext::load(&self.catalog_repo).await?;
        let status_values = self.config.get_status_values().await?;

        // === 步骤 5: 构建依赖有序 upsert 计划(纯计算) ===
        debug!("步骤 5: 构建 upsert 计划");
        let build = build_upsert_plan(&job_id, job.mode, &input, &mut ctx, &status_values);
        let mut row_failures = build.row_failures;

        // allow_partial=false: 构建期已有行失败 → 不开事务,整体判 FAILED
        if !allow_partial && !row_failures.is_empty() {
            warn!(
                job_id = %job_id,
                failures = row_failures.len(),
                "存在行级失败且不允许部分提交,零实体落库"
            );
            return self
                .finish(
                    &job_id,
                    JobStatus::Failed,
                    CommitCounts {
                        rows_failed: row_failures.len(),
                        ..CommitCounts::default()
                    },
                    row_failures,
                    DbVerify::default(),
                )
                .await;
        }

        // === 步骤 6: 单事务执行计划 ===
        debug!(steps = build.plan.step_count(), "步骤 6: 事务化执行计划");
        let application = match self
            .catalog_repo
            .apply_upsert_plan(&build.plan, allow_partial)
            .await
        {
            Ok(application) => application,
            Err(RepositoryError::DatabaseTransactionError(reason)) => {
                // allow_partial=false 的行级失败走到这里: 事务已回滚
                warn!(job_id = %job_id, reason = %reason, "事务回滚,零实体落库");
                row_failures.push(RowFailure {
                    sheet: "(事务)".to_string(),
                    row: 0,
                    reason,
                });
                return self
                    .finish(
                        &job_id,
                        JobStatus::Failed,
                        CommitCounts {
                            rows_failed: row_failures.len(),
                            ..CommitCounts::default()
                        },
                        row_failures,
                        DbVerify::default(),
                    )
                    .await;
            }
            Err(other) => return Err(other.into()),
        };

        let mut counts = application.counts;
        counts.rows_failed += row_failures.len();
        row_failures.extend(application.row_failures);

        // === 步骤 7: 提交后验证(重新查库,只记诊断标记) ===
        debug!(created = application.created.len(), "步骤 7: 提交后验证");
        let db_verify = self.catalog_repo.verify_created(&application.created).await?;
        if !db_verify.created_entities_found_in_db {
            warn!(
                job_id = %job_id,
                missing = ?db_verify.missing_entities,
                "提交后验证未确认全部创建实体(诊断标记,不回滚)"
            );
        }

        // === 步骤 8: 终态判定 ===
        let status = if row_failures.is_empty() {
            JobStatus::Success
        } else {
            JobStatus::Partial
        };
        info!(
            job_id = %job_id,
            status = %status,
            created = application.created.len(),
            failed_rows = row_failures.len(),
            "提交完成"
        );
        self.finish(&job_id, status, counts, row_failures, db_verify)
            .await
    }

    /// 写回作业终态与提交结果
    async fn finish(
        &self,
        job_id: &str,
        status: JobStatus,
        counts: CommitCounts,
        row_failures: Vec<RowFailure>,
        db_verify: DbVerify,
    ) -> ImportResult<CommitOutcome> {
        let mut job = self
            .job_repo
            .get_job(job_id)
            .await?
            .ok_or_else(|| ImportError::JobNotFound(job_id.to_string()))?;
        job.status = status;
        job.report.status = status;
        job.report.commit_counts = Some(counts.clone());
        job.report.row_failures = row_failures.clone();
        job.report.db_verify = Some(db_verify.clone());
        self.job_repo.update_job(&job).await?;

        Ok(CommitOutcome {
            job_id: job_id.to_string(),
            status,
            counts,
            row_failures,
            db_verify,
        })
    }
}
