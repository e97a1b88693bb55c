// ==========================================
// 商品目录批量导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 两阶段批量导入流水线(校验 → 快照 → 提交)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 两阶段流水线
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施(连接初始化/PRAGMA 统一/schema 引导)
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    CandidateType, EntityKind, ImportMode, IssueSeverity, JobKind, JobStatus, StepActionKind,
};

// 领域实体
pub use domain::{
    Brand, Candidate, Category, CommitOutcome, DbVerify, ImportCounts, ImportJob, ImportReport,
    Issue, Product, Series, UpsertPlan, Variant,
};

// 流水线组件
pub use importer::{
    CatalogImportService, CommitEngine, ImportError, ReportGenerator, RowNormalizer,
    ValidationEngine,
};

// API
pub use api::{ImportApi, Role, StaticRoleGuard};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "商品目录批量导入系统";
