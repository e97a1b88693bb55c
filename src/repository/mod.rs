// ==========================================
// 商品目录批量导入系统 - 数据仓储层
// ==========================================
// 职责: 数据访问(目录实体 + 导入作业/快照)
// 红线: Repository 不含业务规则,只做数据 CRUD
// ==========================================

pub mod catalog_repo;
pub mod catalog_repo_impl;
pub mod error;
pub mod import_job_repo;
pub mod import_job_repo_impl;

// 重导出核心类型
pub use catalog_repo::CatalogRepository;
pub use catalog_repo_impl::CatalogRepositoryImpl;
pub use error::{RepositoryError, RepositoryResult};
pub use import_job_repo::ImportJobRepository;
pub use import_job_repo_impl::ImportJobRepositoryImpl;
