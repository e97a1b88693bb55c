// ==========================================
// 商品目录批量导入系统 - 领域类型定义
// ==========================================
// 依据: Catalog_Import_Design_v1.0.md - 2. 导入作业状态机
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 导入模式 (Import Mode)
// ==========================================
// strict: 任何缺失引用都视为错误
// smart: 缺失引用转为候选实体,延迟到提交时创建
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportMode {
    Strict, // 严格模式
    Smart,  // 智能模式
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Strict => write!(f, "STRICT"),
            ImportMode::Smart => write!(f, "SMART"),
        }
    }
}

impl ImportMode {
    /// 从字符串解析（大小写不敏感）
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "STRICT" => Some(ImportMode::Strict),
            "SMART" => Some(ImportMode::Smart),
            _ => None,
        }
    }
}

// ==========================================
// 作业状态 (Job Status)
// ==========================================
// 状态机: pending → {failed_validation | validation_warnings | validation_passed}
//         → [commit] → {success | partial | failed}
// 红线: 提交只允许发生一次,Committing 为提交中的过渡态(状态 CAS 占位)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,            // 初始态(校验进行中)
    FailedValidation,   // 校验失败(存在错误行,不可提交)
    ValidationWarnings, // 校验通过但有警告(可提交)
    ValidationPassed,   // 校验完全通过(可提交)
    Committing,         // 提交进行中(并发重复提交在此被拒绝)
    Success,            // 提交成功
    Partial,            // 部分提交(allow_partial 且存在失败行)
    Failed,             // 提交失败(整体回滚)
}

impl JobStatus {
    /// 是否可提交(仅校验通过/带警告通过的作业可提交)
    pub fn is_commit_eligible(&self) -> bool {
        matches!(
            self,
            JobStatus::ValidationPassed | JobStatus::ValidationWarnings
        )
    }

    /// 是否为提交后的终态
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Partial | JobStatus::Failed
        )
    }

    /// 数据库存储格式(SCREAMING_SNAKE_CASE)
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::FailedValidation => "FAILED_VALIDATION",
            JobStatus::ValidationWarnings => "VALIDATION_WARNINGS",
            JobStatus::ValidationPassed => "VALIDATION_PASSED",
            JobStatus::Committing => "COMMITTING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Partial => "PARTIAL",
            JobStatus::Failed => "FAILED",
        }
    }

    /// 从数据库存储格式解析
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(JobStatus::Pending),
            "FAILED_VALIDATION" => Some(JobStatus::FailedValidation),
            "VALIDATION_WARNINGS" => Some(JobStatus::ValidationWarnings),
            "VALIDATION_PASSED" => Some(JobStatus::ValidationPassed),
            "COMMITTING" => Some(JobStatus::Committing),
            "SUCCESS" => Some(JobStatus::Success),
            "PARTIAL" => Some(JobStatus::Partial),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 作业类型 (Job Kind)
// ==========================================
// 当前仅有目录导入一种;保留枚举以兼容后续导入类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    Catalog, // 商品目录导入(Products + Variants 双表)
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Catalog => "CATALOG",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CATALOG" => Some(JobKind::Catalog),
            _ => None,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 问题级别 (Issue Severity)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueSeverity {
    Info,    // 提示(仅记录)
    Warning, // 警告(允许提交)
    Error,   // 错误(阻断提交)
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSeverity::Info => write!(f, "INFO"),
            IssueSeverity::Warning => write!(f, "WARNING"),
            IssueSeverity::Error => write!(f, "ERROR"),
        }
    }
}

// ==========================================
// 候选实体类型 (Candidate Type)
// ==========================================
// smart 模式下发现的缺失引用实体
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateType {
    Category, // 类目(层级)
    Series,   // 系列(按类目限定)
    Brand,    // 品牌(扁平)
}

impl fmt::Display for CandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateType::Category => write!(f, "CATEGORY"),
            CandidateType::Series => write!(f, "SERIES"),
            CandidateType::Brand => write!(f, "BRAND"),
        }
    }
}

// ==========================================
// 实体类型 (Entity Kind)
// ==========================================
// upsert 计划的依赖顺序: Category → Brand → Series → Product → Variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Category,
    Brand,
    Series,
    Product,
    Variant,
}

// ==========================================
// 步骤动作 (Step Action)
// ==========================================
// upsert 语义: 按键命中则更新,未命中则创建,键冲突时绝不产生重复实体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepActionKind {
    Create,
    Update,
}

impl fmt::Display for StepActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepActionKind::Create => write!(f, "CREATE"),
            StepActionKind::Update => write!(f, "UPDATE"),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Category => write!(f, "CATEGORY"),
            EntityKind::Brand => write!(f, "BRAND"),
            EntityKind::Series => write!(f, "SERIES"),
            EntityKind::Product => write!(f, "PRODUCT"),
            EntityKind::Variant => write!(f, "VARIANT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_roundtrip() {
        // 所有状态的存储格式必须可逆
        let all = [
            JobStatus::Pending,
            JobStatus::FailedValidation,
            JobStatus::ValidationWarnings,
            JobStatus::ValidationPassed,
            JobStatus::Committing,
            JobStatus::Success,
            JobStatus::Partial,
            JobStatus::Failed,
        ];
        for status in all {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_commit_eligibility() {
        assert!(JobStatus::ValidationPassed.is_commit_eligible());
        assert!(JobStatus::ValidationWarnings.is_commit_eligible());
        assert!(!JobStatus::FailedValidation.is_commit_eligible());
        assert!(!JobStatus::Success.is_commit_eligible());
        assert!(!JobStatus::Committing.is_commit_eligible());
    }

    #[test]
    fn test_import_mode_parse() {
        assert_eq!(ImportMode::parse("smart"), Some(ImportMode::Smart));
        assert_eq!(ImportMode::parse(" STRICT "), Some(ImportMode::Strict));
        assert_eq!(ImportMode::parse("fuzzy"), None);
    }
}
