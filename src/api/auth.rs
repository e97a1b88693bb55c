// ==========================================
// 商品目录批量导入系统 - 权限校验接口
// ==========================================
// 职责: 导入操作前的提权角色检查
// 红线: 鉴权是外部协作方,这里只定义接口与静态参考实现;
//       validate/commit/report/template 一律先过此检查
// ==========================================

use crate::api::error::{ApiError, ApiResult};

/// 调用方角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    CatalogAdmin, // 目录管理员(允许批量导入)
    Viewer,       // 只读角色
}

// ==========================================
// RoleGuard Trait
// ==========================================
// 实现者: 外部鉴权系统;参考实现 StaticRoleGuard
pub trait RoleGuard: Send + Sync {
    /// 断言调用方具备目录管理员权限
    fn ensure_catalog_admin(&self) -> ApiResult<()>;
}

/// 静态角色参考实现(进程内固定角色)
pub struct StaticRoleGuard {
    role: Role,
}

impl StaticRoleGuard {
    pub fn new(role: Role) -> Self {
        Self { role }
    }
}

impl RoleGuard for StaticRoleGuard {
    fn ensure_catalog_admin(&self) -> ApiResult<()> {
        match self.role {
            Role::CatalogAdmin => Ok(()),
            Role::Viewer => Err(ApiError::PermissionDenied(
                "批量导入需要目录管理员角色".to_string(),
            )),
        }
    }
}
