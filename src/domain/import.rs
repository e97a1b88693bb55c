// ==========================================
// 商品目录批量导入系统 - 导入领域模型
// ==========================================
// 依据: Catalog_Import_Design_v1.0.md - 4. 两阶段导入流水线
// 流程: 校验(validate) → 快照(snapshot) → 提交(commit)
// 红线: 提交永远从快照读取,绝不重读原始请求
// ==========================================

use crate::domain::types::{
    CandidateType, ImportMode, IssueSeverity, JobKind, JobStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// ProductRow - 规范化后的商品行
// ==========================================
// 用途: 导入管道中间产物(表格解析 → 空值规范化 → 此结构)
// 生命周期: 仅在校验/提交流程内
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductRow {
    pub brand_ref: Option<String>,        // 品牌引用(名称或 slug)
    pub category_ref: Option<String>,     // 类目路径("a/b/c" 或 "a>b>c")
    pub series_ref: Option<String>,       // 系列引用(按行类目限定解析)
    pub name: Option<String>,             // 商品名
    pub slug: Option<String>,             // 商品 slug(upsert 键)
    pub title_primary: Option<String>,    // 主语言标题
    pub title_secondary: Option<String>,  // 次语言标题
    pub status: Option<String>,
    pub is_featured: Option<String>,      // 原始布尔文本,提交时解释
    pub long_description: Option<String>,
    pub general_features: Option<String>,
    pub short_specs: Option<String>,
    pub taxonomy_tags: Option<String>,

    // 元信息
    pub row_number: usize, // 1-based,相对表头(表头下一行 = 1)
    // 多行合并来源(同 slug 连续行合并时记录被并入的行号)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_rows: Vec<usize>,
}

// ==========================================
// VariantRow - 规范化后的型号行
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantRow {
    pub product_slug: Option<String>, // 父商品引用(外键)
    pub model_code: Option<String>,   // 全局唯一键
    pub name_primary: Option<String>, // 缺省时提交阶段回填父商品标题
    pub name_secondary: Option<String>,
    pub sku: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<String>,
    pub list_price: Option<String>,
    pub stock_qty: Option<String>,
    // 开放的 Spec:<key> 列(schema-on-read)
    pub specs: BTreeMap<String, String>,

    // 元信息
    pub row_number: usize,
}

// ==========================================
// Issue - 单个校验/提交问题
// ==========================================
// 用途: 校验引擎输出,只存在于作业报告中,不独立持久化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub row: usize,                 // 1-based,相对表头
    pub severity: IssueSeverity,
    pub code: String,               // 机器可读问题码(如 brand_not_found)
    pub column: Option<String>,     // 问题列(模板列名)
    pub value: Option<String>,      // 触发问题的原始值
    pub message: String,            // 人类可读描述
    pub expected: Option<String>,   // 期望值说明
}

impl Issue {
    pub fn error(row: usize, code: &str, column: &str, message: String) -> Self {
        Self {
            row,
            severity: IssueSeverity::Error,
            code: code.to_string(),
            column: Some(column.to_string()),
            value: None,
            message,
            expected: None,
        }
    }

    pub fn warning(row: usize, code: &str, column: &str, message: String) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            ..Self::error(row, code, column, message)
        }
    }

    pub fn info(row: usize, code: &str, column: &str, message: String) -> Self {
        Self {
            severity: IssueSeverity::Info,
            ..Self::error(row, code, column, message)
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }
}

// ==========================================
// Candidate - 候选实体
// ==========================================
// smart 模式下发现的缺失引用,延迟到提交阶段创建
// 去重键: (candidate_type, slug, parent_slug);行号溯源列表持续累积
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_type: CandidateType,
    pub slug: String,
    pub name: String,                  // 建议显示名(取自首个引用行的原始文本)
    pub parent_slug: Option<String>,   // 层级父引用(类目父 slug / 系列所属类目 slug)
    pub rows: Vec<usize>,              // 引用行号溯源(去重后累积)
}

/// 候选实体去重键
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateKey {
    pub candidate_type: CandidateType,
    pub slug: String,
    pub parent_slug: Option<String>,
}

impl CandidateKey {
    /// upsert 计划内的待建实体引用键(如 "CATEGORY:tools/power-tools")
    pub fn plan_key(&self) -> String {
        match &self.parent_slug {
            Some(parent) => format!("{}:{}/{}", self.candidate_type, parent, self.slug),
            None => format!("{}:{}", self.candidate_type, self.slug),
        }
    }
}

// ==========================================
// ImportCounts - 校验/提交统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    // 行级统计
    pub total_product_rows: usize,
    pub total_variant_rows: usize,
    pub valid_product_rows: usize,
    pub valid_variant_rows: usize,
    pub error_rows: usize,   // 含 ERROR 问题的不同行数
    pub warning_rows: usize, // 含 WARNING(且无 ERROR)问题的不同行数

    // 实体级创建/更新预测(只读 diff,校验阶段不落库)
    pub categories_to_create: usize,
    pub brands_to_create: usize,
    pub series_to_create: usize,
    pub products_to_create: usize,
    pub products_to_update: usize,
    pub variants_to_create: usize,
    pub variants_to_update: usize,
}

// ==========================================
// NormalizationStats - 规范化统计
// ==========================================
// 报告 Normalization 表的来源
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub empty_sentinels_normalized: usize, // 空值哨兵替换次数("-"/"N/A"等 → 缺失)
    pub merged_product_rows: usize,        // 同 slug 连续商品行合并次数
    pub renamed_duplicate_names: usize,    // 同商品下重名型号消歧次数
}

// ==========================================
// SnapshotRef - 快照引用
// ==========================================
// 作业报告只存哈希与制品引用,绝不内联字节
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRef {
    pub content_hash: String,  // SHA-256 十六进制
    pub artifact_ref: String,  // 制品引用(import_snapshot/<hash>)
    pub byte_len: usize,
    pub reused: bool, // 相同内容的历史快照被复用
}

// ==========================================
// DbVerify - 提交后持久化验证
// ==========================================
// 事务提交后对每个声称创建的实体重新查库确认;
// 验证失败只做诊断标记,绝不回滚(事务已提交)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbVerify {
    pub created_entities_found_in_db: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_entities: Vec<String>, // 未查到的实体键(如 "BRAND:acme")
}

// ==========================================
// RowFailure - 提交阶段的行级失败
// ==========================================
// allow_partial = true 时逐行记录;false 时整体回滚不产生此记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowFailure {
    pub sheet: String,  // Products / Variants
    pub row: usize,
    pub reason: String,
}

// ==========================================
// CommitCounts - 提交落库统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitCounts {
    pub categories_created: usize,
    pub brands_created: usize,
    pub series_created: usize,
    pub products_created: usize,
    pub products_updated: usize,
    pub variants_created: usize,
    pub variants_updated: usize,
    pub rows_failed: usize,
}

// ==========================================
// ImportReport - 作业报告
// ==========================================
// 校验阶段写入,提交阶段补充;持久化为 import_job.report_json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub status: JobStatus,
    pub counts: ImportCounts,
    pub issues: Vec<Issue>,
    pub candidates: Vec<Candidate>,
    pub normalization: NormalizationStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotRef>,

    // 规范化行(报告 Data 表来源,结构上可直接重新提交)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_products: Vec<ProductRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_variants: Vec<VariantRow>,

    // 提交阶段补充
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_counts: Option<CommitCounts>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub row_failures: Vec<RowFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_verify: Option<DbVerify>,
}

impl ImportReport {
    /// 按级别统计问题行数(同一行取最高级别)
    pub fn distinct_rows_by_severity(issues: &[Issue]) -> (usize, usize) {
        use std::collections::HashMap;
        let mut row_max: HashMap<usize, IssueSeverity> = HashMap::new();
        for issue in issues {
            row_max
                .entry(issue.row)
                .and_modify(|s| *s = (*s).max(issue.severity))
                .or_insert(issue.severity);
        }
        let error_rows = row_max
            .values()
            .filter(|s| **s == IssueSeverity::Error)
            .count();
        let warning_rows = row_max
            .values()
            .filter(|s| **s == IssueSeverity::Warning)
            .count();
        (error_rows, warning_rows)
    }
}

// ==========================================
// ImportJob - 导入作业
// ==========================================
// 校验时创建,提交时变更状态;流水线从不删除作业(留作审计)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    pub job_id: String, // UUID
    pub kind: JobKind,
    pub mode: ImportMode,
    pub status: JobStatus,
    pub report: ImportReport,
    pub snapshot_hash: Option<String>, // 校验失败的作业没有快照
    pub error_count: usize,
    pub warning_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// CommitOutcome - 提交结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub job_id: String,
    pub status: JobStatus, // SUCCESS / PARTIAL / FAILED
    pub counts: CommitCounts,
    pub row_failures: Vec<RowFailure>,
    pub db_verify: DbVerify,
}
