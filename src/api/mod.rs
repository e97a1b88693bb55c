// ==========================================
// 商品目录批量导入系统 - API 层
// ==========================================
// 职责: 导入流水线的外部操作封装(传输无关,HTTP 为参考绑定)
// ==========================================

pub mod auth;
pub mod error;
pub mod import_api;

// 重导出核心类型
pub use auth::{Role, RoleGuard, StaticRoleGuard};
pub use error::{ApiError, ApiResult};
pub use import_api::{CommitResponse, ImportApi, ValidateResponse};
