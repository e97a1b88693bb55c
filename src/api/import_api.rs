// ==========================================
// 商品目录批量导入 API
// ==========================================
// 职责: 封装导入流水线的外部操作(传输无关)
// 操作: validate / commit / plan / report / template
// 红线: 全部操作先过提权角色检查(RoleGuard)
// ==========================================

use crate::api::auth::RoleGuard;
use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::import::{CommitCounts, DbVerify, ImportJob, ImportReport, RowFailure};
use crate::domain::plan::UpsertPlan;
use crate::domain::types::{ImportMode, JobStatus};
use crate::importer::{
    reference_from_store, CatalogImportService, CommitEngine, CsvBundleCodec, ReportGenerator,
    SheetCodec,
};
use crate::repository::{
    CatalogRepository, CatalogRepositoryImpl, ImportJobRepositoryImpl,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 校验响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    /// 作业 ID
    pub job_id: String,
    /// 作业状态
    pub status: JobStatus,
    /// 完整校验报告(问题/统计/候选/快照引用)
    pub report: ImportReport,
}

/// 提交响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    /// 作业 ID
    pub job_id: String,
    /// 终态: SUCCESS / PARTIAL / FAILED
    pub status: JobStatus,
    /// 落库统计
    pub counts: CommitCounts,
    /// 行级失败明细(allow_partial 时逐行记录)
    pub row_failures: Vec<RowFailure>,
    /// 提交后持久化验证结果
    pub db_verify: DbVerify,
}

// ==========================================
// ImportApi
// ==========================================
pub struct ImportApi {
    db_path: String,
    guard: Box<dyn RoleGuard>,
}

impl ImportApi {
    /// 创建新的 ImportApi 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - guard: 提权角色检查(外部鉴权协作方)
    pub fn new(db_path: String, guard: Box<dyn RoleGuard>) -> Self {
        Self { db_path, guard }
    }

    /// 校验上传内容,创建导入作业
    ///
    /// # 参数
    /// - bytes: 原始工作簿字节(xlsx 或 CSV 工作簿束)
    /// - mode: strict/smart
    pub async fn validate(&self, bytes: &[u8], mode: ImportMode) -> ApiResult<ValidateResponse> {
        self.guard.ensure_catalog_admin()?;
        let service = self.create_service()?;
        let job = service.validate(bytes, mode).await?;
        Ok(ValidateResponse {
            job_id: job.job_id,
            status: job.status,
            report: job.report,
        })
    }

    /// 提交作业(一次性状态转换)
    ///
    /// # 参数
    /// - job_id: 作业 ID
    /// - allow_partial: 行级尽力而为开关
    pub async fn commit(&self, job_id: &str, allow_partial: bool) -> ApiResult<CommitResponse> {
        self.guard.ensure_catalog_admin()?;
        let engine = self.create_commit_engine()?;
        let outcome = engine.commit(job_id, allow_partial).await?;
        info!(
            job_id = %job_id,
            status = %outcome.status,
            "提交操作完成"
        );
        Ok(CommitResponse {
            job_id: outcome.job_id,
            status: outcome.status,
            counts: outcome.counts,
            row_failures: outcome.row_failures,
            db_verify: outcome.db_verify,
        })
    }

    /// 干跑预览: 计算 upsert 计划,零副作用
    pub async fn plan(&self, job_id: &str) -> ApiResult<UpsertPlan> {
        self.guard.ensure_catalog_admin()?;
        let service = self.create_service()?;
        Ok(service.plan_preview(job_id).await?)
    }

    /// 下载作业报告(多表文档)
    pub async fn report(&self, job_id: &str) -> ApiResult<Vec<u8>> {
        self.guard.ensure_catalog_admin()?;
        let service = self.create_service()?;
        let job = service.get_job(job_id).await?;
        let workbook = ReportGenerator.render(&job);
        CsvBundleCodec
            .write(&workbook)
            .map_err(|e| ApiError::InternalError(format!("报告渲染失败: {}", e)))
    }

    /// 下载规范空模板(列约定 + Reference 合法值表)
    pub async fn template(&self) -> ApiResult<Vec<u8>> {
        self.guard.ensure_catalog_admin()?;
        let catalog_repo = CatalogRepositoryImpl::new(&self.db_path)?;
        let config = ConfigManager::new(&self.db_path)?;

        let categories = catalog_repo.load_categories().await?;
        let brands = catalog_repo.load_brands().await?;
        let series = catalog_repo.load_series().await?;
        let status_values = config.get_status_values().await?;

        let reference = reference_from_store(&categories, &brands, &series, &status_values);
        let workbook = ReportGenerator.template(&reference);
        CsvBundleCodec
            .write(&workbook)
            .map_err(|e| ApiError::InternalError(format!("模板渲染失败: {}", e)))
    }

    /// 查询单个作业
    pub async fn get_job(&self, job_id: &str) -> ApiResult<ImportJob> {
        self.guard.ensure_catalog_admin()?;
        let service = self.create_service()?;
        Ok(service.get_job(job_id).await?)
    }

    /// 查询最近作业
    pub async fn recent_jobs(&self, limit: usize) -> ApiResult<Vec<ImportJob>> {
        self.guard.ensure_catalog_admin()?;
        let limit = limit.clamp(1, 100);
        let service = self.create_service()?;
        Ok(service.recent_jobs(limit).await?)
    }

    /// 创建校验服务实例
    fn create_service(
        &self,
    ) -> ApiResult<CatalogImportService<CatalogRepositoryImpl, ImportJobRepositoryImpl, ConfigManager>>
    {
        Ok(CatalogImportService::new(
            CatalogRepositoryImpl::new(&self.db_path)?,
            ImportJobRepositoryImpl::new(&self.db_path)?,
            ConfigManager::new(&self.db_path)?,
        ))
    }

    /// 创建提交引擎实例
    fn create_commit_engine(
        &self,
    ) -> ApiResult<CommitEngine<CatalogRepositoryImpl, ImportJobRepositoryImpl, ConfigManager>>
    {
        Ok(CommitEngine::new(
            CatalogRepositoryImpl::new(&self.db_path)?,
            ImportJobRepositoryImpl::new(&self.db_path)?,
            ConfigManager::new(&self.db_path)?,
        ))
    }
}
