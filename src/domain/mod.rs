// ==========================================
// 商品目录批量导入系统 - 领域模型层
// ==========================================
// 依据: Catalog_Import_Design_v1.0.md - 3. 目录数据模型 / 4. 导入流水线
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含流水线逻辑
// ==========================================

pub mod catalog;
pub mod import;
pub mod plan;
pub mod types;

// 重导出核心类型
pub use catalog::{
    Brand, Category, Product, Series, Variant, DEFAULT_PRODUCT_STATUS, MAX_CATEGORY_DEPTH,
};
pub use import::{
    Candidate, CandidateKey, CommitCounts, CommitOutcome, DbVerify, ImportCounts, ImportJob,
    ImportReport, Issue, NormalizationStats, ProductRow, RowFailure, SnapshotRef, VariantRow,
};
pub use plan::{
    BrandStep, CategoryStep, CreatedEntity, PlanApplication, PlanRef, ProductStep, SeriesStep,
    UpsertPlan, VariantStep,
};
pub use types::{
    CandidateType, EntityKind, ImportMode, IssueSeverity, JobKind, JobStatus, StepActionKind,
};
