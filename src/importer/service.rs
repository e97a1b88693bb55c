// ==========================================
// 商品目录批量导入系统 - 校验服务
// ==========================================
// 职责: 整合校验阶段流程,从原始字节到作业与报告
// 流程: 解码 → 规范化 → 解析 → 校验 → 快照 → 建作业
// 红线:
// - 校验只读目录存储(唯一写入是快照制品),可跨作业并行
// - 无法解析为工作表的输入直接失败,不创建作业
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::import::{ImportJob, ImportReport};
use crate::domain::plan::UpsertPlan;
use crate::domain::types::{ImportMode, IssueSeverity, JobKind, JobStatus};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::plan::build_upsert_plan;
use crate::importer::resolution::ResolutionContext;
use crate::importer::row_normalizer::RowNormalizer;
use crate::importer::snapshot::SnapshotStore;
use crate::importer::validation::ValidationEngine;
use crate::importer::workbook::read_workbook;
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::import_job_repo::ImportJobRepository;
use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

// ==========================================
// CatalogImportService - 校验阶段服务
// ==========================================
pub struct CatalogImportService<R, J, C>
where
    R: CatalogRepository,
    J: ImportJobRepository,
    C: ImportConfigReader,
{
    catalog_repo: R,
    job_repo: J,
    config: C,
}

impl<R, J, C> CatalogImportService<R, J, C>
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

    /// 校验上传内容并创建导入作业
    ///
    /// # 参数
    /// - bytes: 原始工作簿字节(xlsx 或 CSV 工作簿束)
    /// - mode: strict/smart
    ///
    /// # 返回
    /// - Ok(ImportJob): 含完整报告;非校验失败时已持久化快照
    /// - Err: 输入无法解析为工作表(作业级失败,不创建作业)
    ///
    /// # 幂等性
    /// - 相同字节重复校验产生相同的 issues/counts/快照哈希
    #[instrument(skip(self, bytes), fields(job_id, mode = %mode))]
    pub async fn validate(&self, bytes: &[u8], mode: ImportMode) -> ImportResult<ImportJob> {
        let job_id = Uuid::new_v4().to_string();
        info!(job_id = %job_id, bytes = bytes.len(), "开始校验导入内容");

        // === 步骤 1: 解码工作簿 ===
        debug!("步骤 1: 解码工作簿");
        let workbook = read_workbook(bytes)?;

        // === 步骤 2: 行规范化 ===
        debug!("步骤 2: 行规范化");
        let input = RowNormalizer.normalize(&workbook)?;
        info!(
            products = input.products.len(),
            variants = input.variants.len(),
            "规范化完成"
        );

        // === 步骤 3: 构建解析上下文(每作业一次,按参数传递) ===
        debug!("步骤 3: 构建解析上下文");
        let mut ctx = ResolutionContext::load(&self.catalog_repo).await?;

        // === 步骤 4: 校验 ===
        debug!("步骤 4: 行级校验");
        let engine = ValidationEngine::new(
            self.config.get_registered_spec_keys().await?,
            self.config.get_status_values().await?,
        );
        let outcome = engine.validate(&input, &mut ctx, mode);

        // === 步骤 5: 快照(校验失败的作业不留快照) ===
        let snapshot = if outcome.status != JobStatus::FailedValidation {
            debug!("步骤 5: 持久化快照");
            let store = SnapshotStore::new(&self.job_repo);
            Some(store.persist(bytes).await?)
        } else {
            debug!("步骤 5: 校验失败,跳过快照");
            None
        };

        // === 步骤 6: 组装报告并建作业 ===
        let error_count = outcome
            .issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .count();
        let warning_count = outcome
            .issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .count();

        let report = ImportReport {
            status: outcome.status,
            counts: outcome.counts,
            issues: outcome.issues,
            candidates: ctx.candidates,
            normalization: input.stats,
            snapshot: snapshot.clone(),
            data_products: input.products,
            data_variants: input.variants,
            commit_counts: None,
            row_failures: Vec::new(),
            db_verify: None,
        };
        let now = Utc::now();
        let job = ImportJob {
            job_id: job_id.clone(),
            kind: JobKind::Catalog,
            mode,
            status: report.status,
            snapshot_hash: snapshot.map(|s| s.content_hash),
            error_count,
            warning_count,
            report,
            created_at: now,
            updated_at: now,
        };
        self.job_repo.insert_job(&job).await?;

        info!(
            job_id = %job_id,
            status = %job.status,
            errors = error_count,
            warnings = warning_count,
            candidates = job.report.candidates.len(),
            "校验完成,作业已创建"
        );
        Ok(job)
    }

    /// 批量校验多份上传内容(并发执行)
    ///
    /// # 说明
    /// - 校验是只读为主的操作,可安全并行;每份内容独立成作业,互不影响
    /// - 单份失败不影响其他份,结果按输入顺序返回
    pub async fn validate_many(
        &self,
        files: Vec<Vec<u8>>,
        mode: ImportMode,
    ) -> Vec<Result<ImportJob, String>> {
        use futures::future::join_all;

        info!(count = files.len(), "开始批量校验");
        let tasks = files.into_iter().map(|bytes| async move {
            self.validate(&bytes, mode)
                .await
                .map_err(|e| format!("校验失败: {}", e))
        });
        let results = join_all(tasks).await;
        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量校验完成"
        );
        results
    }

    /// 干跑预览: 从快照计算 upsert 计划,零副作用
    ///
    /// # 说明
    /// - 与真实提交共用计划构建函数,但不开事务、不落库、不变更作业状态
    #[instrument(skip(self))]
    pub async fn plan_preview(&self, job_id: &str) -> ImportResult<UpsertPlan> {
        let job = self
            .job_repo
            .get_job(job_id)
            .await?
            .ok_or_else(|| ImportError::JobNotFound(job_id.to_string()))?;
        let snapshot_hash = job
            .snapshot_hash
            .as_deref()
            .ok_or_else(|| ImportError::SnapshotMissing(job_id.to_string()))?;

        let store = SnapshotStore::new(&self.job_repo);
        let bytes = store.load(snapshot_hash, job_id).await?;
        let workbook = read_workbook(&bytes)?;
        let input = RowNormalizer.normalize(&workbook)?;
        let mut ctx = ResolutionContext::load(&self.catalog_repo).await?;
        let status_values = self.config.get_status_values().await?;

        let outcome = build_upsert_plan(job_id, job.mode, &input, &mut ctx, &status_values);
        debug!(
            job_id = %job_id,
            steps = outcome.plan.step_count(),
            excluded = outcome.row_failures.len(),
            "干跑计划计算完成"
        );
        Ok(outcome.plan)
    }

    /// 按 id 查作业
    pub async fn get_job(&self, job_id: &str) -> ImportResult<ImportJob> {
        self.job_repo
            .get_job(job_id)
            .await?
            .ok_or_else(|| ImportError::JobNotFound(job_id.to_string()))
    }

    /// 最近作业列表
    pub async fn recent_jobs(&self, limit: usize) -> ImportResult<Vec<ImportJob>> {
        Ok(self.job_repo.recent_jobs(limit).await?)
    }
}
