// ==========================================
// 商品目录批量导入系统 - 报告生成器
// ==========================================
// 职责: 作业报告 → 多表下载文档;规范空模板生成
// 红线: 纯只读渲染,不做任何解析/校验逻辑
// 表结构: Summary / Issues / Products / Variants / Candidates / Normalization
// (Products/Variants 即规范化数据表,沿用模板列名,结构上可直接重新提交)
// ==========================================

use crate::domain::catalog::{Brand, Category, Series};
use crate::domain::import::{ImportJob, ProductRow, VariantRow};
use crate::domain::types::CandidateType;
use crate::importer::columns::{
    CONTRACT_VERSION, PRODUCT_COLUMNS, SHEET_PRODUCTS, SHEET_REFERENCE, SHEET_VARIANTS,
    SPEC_COLUMN_PREFIX, VARIANT_COLUMNS,
};
use crate::importer::workbook::{Sheet, Workbook};
use std::collections::BTreeSet;
use std::collections::HashMap;

// ==========================================
// ReferenceData - Reference 表数据
// ==========================================
// 供电子表格工具做下拉校验的合法枚举值
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub brands: Vec<String>,         // 品牌 slug
    pub category_paths: Vec<String>, // 类目全路径(slug,"a/b/c")
    pub series: Vec<String>,         // "类目路径/系列 slug"
    pub status_values: Vec<String>,
}

/// 从已载实体计算 Reference 数据(纯函数)
pub fn reference_from_store(
    categories: &[Category],
    brands: &[Brand],
    series: &[Series],
    status_values: &[String],
) -> ReferenceData {
    // id → (parent_id, slug),自底向上拼全路径
    let by_id: HashMap<i64, (&Option<i64>, &str)> = categories
        .iter()
        .map(|c| (c.category_id, (&c.parent_id, c.slug.as_str())))
        .collect();
    let path_of = |mut id: i64| -> String {
        let mut segments = Vec::new();
        while let Some((parent, slug)) = by_id.get(&id) {
            segments.push(slug.to_string());
            match parent {
                Some(parent_id) => id = *parent_id,
                None => break,
            }
        }
        segments.reverse();
        segments.join("/")
    };

    let category_paths: Vec<String> = categories
        .iter()
        .map(|c| path_of(c.category_id))
        .collect();
    let series_paths = series
        .iter()
        .map(|s| format!("{}/{}", path_of(s.category_id), s.slug))
        .collect();

    ReferenceData {
        brands: brands.iter().map(|b| b.slug.clone()).collect(),
        category_paths,
        series: series_paths,
        status_values: status_values.to_vec(),
    }
}

// ==========================================
// ReportGenerator
// ==========================================
pub struct ReportGenerator;

impl ReportGenerator {
    /// 渲染作业报告为多表文档
    pub fn render(&self, job: &ImportJob) -> Workbook {
        let mut workbook = Workbook::new();
        workbook.push_sheet(self.summary_sheet(job));
        workbook.push_sheet(self.issues_sheet(job));
        workbook.push_sheet(products_sheet(&job.report.data_products));
        workbook.push_sheet(variants_sheet(&job.report.data_variants));
        workbook.push_sheet(self.candidates_sheet(job));
        workbook.push_sheet(self.normalization_sheet(job));
        workbook
    }

    /// 渲染规范空模板(列约定 + Reference 合法值表)
    pub fn template(&self, reference: &ReferenceData) -> Workbook {
        let mut workbook = Workbook::new();

        let mut products = Sheet::new(SHEET_PRODUCTS);
        products.rows.push(
            PRODUCT_COLUMNS
                .iter()
                .map(|c| c.canonical.to_string())
                .collect(),
        );
        workbook.push_sheet(products);

        let mut variants = Sheet::new(SHEET_VARIANTS);
        variants.rows.push(
            VARIANT_COLUMNS
                .iter()
                .map(|c| c.canonical.to_string())
                .collect(),
        );
        workbook.push_sheet(variants);

        let mut sheet = Sheet::new(SHEET_REFERENCE);
        sheet.rows.push(vec![
            "Kind".to_string(),
            "Value".to_string(),
            format!("Contract {}", CONTRACT_VERSION),
        ]);
        for value in &reference.brands {
            sheet
                .rows
                .push(vec!["brand".to_string(), value.clone(), String::new()]);
        }
        for value in &reference.category_paths {
            sheet
                .rows
                .push(vec!["category".to_string(), value.clone(), String::new()]);
        }
        for value in &reference.series {
            sheet
                .rows
                .push(vec!["series".to_string(), value.clone(), String::new()]);
        }
        for value in &reference.status_values {
            sheet
                .rows
                .push(vec!["status".to_string(), value.clone(), String::new()]);
        }
        workbook.push_sheet(sheet);

        workbook
    }

    fn summary_sheet(&self, job: &ImportJob) -> Sheet {
        let mut sheet = Sheet::new("Summary");
        sheet
            .rows
            .push(vec!["Key".to_string(), "Value".to_string()]);
        let counts = &job.report.counts;
        let mut push = |key: &str, value: String| {
            sheet.rows.push(vec![key.to_string(), value]);
        };
        push("job_id", job.job_id.clone());
        push("kind", job.kind.to_string());
        push("mode", job.mode.to_string());
        push("status", job.status.to_string());
        push("total_product_rows", counts.total_product_rows.to_string());
        push("total_variant_rows", counts.total_variant_rows.to_string());
        push("valid_product_rows", counts.valid_product_rows.to_string());
        push("valid_variant_rows", counts.valid_variant_rows.to_string());
        push("error_rows", counts.error_rows.to_string());
        push("warning_rows", counts.warning_rows.to_string());
        push("categories_to_create", counts.categories_to_create.to_string());
        push("brands_to_create", counts.brands_to_create.to_string());
        push("series_to_create", counts.series_to_create.to_string());
        push("products_to_create", counts.products_to_create.to_string());
        push("products_to_update", counts.products_to_update.to_string());
        push("variants_to_create", counts.variants_to_create.to_string());
        push("variants_to_update", counts.variants_to_update.to_string());
        if let Some(snapshot) = &job.report.snapshot {
            push("snapshot_hash", snapshot.content_hash.clone());
        }
        if let Some(commit) = &job.report.commit_counts {
            push("committed_categories", commit.categories_created.to_string());
            push("committed_brands", commit.brands_created.to_string());
            push("committed_series", commit.series_created.to_string());
            push(
                "committed_products",
                format!(
                    "created={} updated={}",
                    commit.products_created, commit.products_updated
                ),
            );
            push(
                "committed_variants",
                format!(
                    "created={} updated={}",
                    commit.variants_created, commit.variants_updated
                ),
            );
            push("commit_rows_failed", commit.rows_failed.to_string());
        }
        if let Some(verify) = &job.report.db_verify {
            push(
                "db_verify.created_entities_found_in_db",
                verify.created_entities_found_in_db.to_string(),
            );
        }
        sheet
    }

    fn issues_sheet(&self, job: &ImportJob) -> Sheet {
        let mut sheet = Sheet::new("Issues");
        sheet.rows.push(
            ["Row", "Severity", "Code", "Column", "Value", "Message", "Expected"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        for issue in &job.report.issues {
            sheet.rows.push(vec![
                issue.row.to_string(),
                issue.severity.to_string(), // 渲染端按级别着色的键
                issue.code.clone(),
                issue.column.clone().unwrap_or_default(),
                issue.value.clone().unwrap_or_default(),
                issue.message.clone(),
                issue.expected.clone().unwrap_or_default(),
            ]);
        }
        for failure in &job.report.row_failures {
            sheet.rows.push(vec![
                failure.row.to_string(),
                "ERROR".to_string(),
                "commit_row_failed".to_string(),
                failure.sheet.clone(),
                String::new(),
                failure.reason.clone(),
                String::new(),
            ]);
        }
        sheet
    }

    fn candidates_sheet(&self, job: &ImportJob) -> Sheet {
        let mut sheet = Sheet::new("Candidates");
        sheet.rows.push(
            ["Type", "Slug", "Name", "Parent", "Rows"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        // 按实体类型分组展示(类目 → 系列 → 品牌)
        for kind in [
            CandidateType::Category,
            CandidateType::Series,
            CandidateType::Brand,
        ] {
            for candidate in job
                .report
                .candidates
                .iter()
                .filter(|c| c.candidate_type == kind)
            {
                let rows_compact = candidate
                    .rows
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                sheet.rows.push(vec![
                    candidate.candidate_type.to_string(),
                    candidate.slug.clone(),
                    candidate.name.clone(),
                    candidate.parent_slug.clone().unwrap_or_default(),
                    rows_compact,
                ]);
            }
        }
        sheet
    }

    fn normalization_sheet(&self, job: &ImportJob) -> Sheet {
        let mut sheet = Sheet::new("Normalization");
        sheet
            .rows
            .push(vec!["Metric".to_string(), "Count".to_string()]);
        let stats = &job.report.normalization;
        sheet.rows.push(vec![
            "empty_sentinels_normalized".to_string(),
            stats.empty_sentinels_normalized.to_string(),
        ]);
        sheet.rows.push(vec![
            "merged_product_rows".to_string(),
            stats.merged_product_rows.to_string(),
        ]);
        sheet.rows.push(vec![
            "renamed_duplicate_names".to_string(),
            stats.renamed_duplicate_names.to_string(),
        ]);
        sheet
    }
}

/// 规范化商品行 → 模板列顺序的数据表
fn products_sheet(rows: &[ProductRow]) -> Sheet {
    let mut sheet = Sheet::new(SHEET_PRODUCTS);
    sheet.rows.push(
        PRODUCT_COLUMNS
            .iter()
            .map(|c| c.canonical.to_string())
            .collect(),
    );
    for row in rows {
        let cell = |v: &Option<String>| v.clone().unwrap_or_default();
        sheet.rows.push(vec![
            cell(&row.brand_ref),
            cell(&row.category_ref),
            cell(&row.series_ref),
            cell(&row.name),
            cell(&row.slug),
            cell(&row.title_primary),
            cell(&row.title_secondary),
            cell(&row.status),
            cell(&row.is_featured),
            cell(&row.long_description),
            cell(&row.general_features),
            cell(&row.short_specs),
            cell(&row.taxonomy_tags),
        ]);
    }
    sheet
}

/// 规范化型号行 → 固定列 + 全部出现过的 Spec:<key> 列
fn variants_sheet(rows: &[VariantRow]) -> Sheet {
    let spec_keys: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.specs.keys().map(|k| k.as_str()))
        .collect();

    let mut sheet = Sheet::new(SHEET_VARIANTS);
    let mut header: Vec<String> = VARIANT_COLUMNS
        .iter()
        .map(|c| c.canonical.to_string())
        .collect();
    header.extend(
        spec_keys
            .iter()
            .map(|k| format!("{}{}", SPEC_COLUMN_PREFIX, k)),
    );
    sheet.rows.push(header);

    for row in rows {
        let cell = |v: &Option<String>| v.clone().unwrap_or_default();
        let mut cells = vec![
            cell(&row.product_slug),
            cell(&row.model_code),
            cell(&row.name_primary),
            cell(&row.name_secondary),
            cell(&row.sku),
            cell(&row.dimensions),
            cell(&row.weight),
            cell(&row.list_price),
            cell(&row.stock_qty),
        ];
        for key in &spec_keys {
            cells.push(row.specs.get(*key).cloned().unwrap_or_default());
        }
        sheet.rows.push(cells);
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::{
        Candidate, ImportCounts, ImportReport, Issue, NormalizationStats,
    };
    use crate::domain::types::{ImportMode, JobKind, JobStatus};
    use chrono::Utc;

    fn sample_job() -> ImportJob {
        let report = ImportReport {
            status: JobStatus::ValidationWarnings,
            counts: ImportCounts {
                total_product_rows: 2,
                total_variant_rows: 1,
                ..ImportCounts::default()
            },
            issues: vec![Issue::warning(
                2,
                "invalid_status",
                "Status",
                "状态取值不在枚举范围内".to_string(),
            )],
            candidates: vec![Candidate {
                candidate_type: CandidateType::Brand,
                slug: "acme".to_string(),
                name: "Acme".to_string(),
                parent_slug: None,
                rows: vec![1, 3, 12],
            }],
            normalization: NormalizationStats {
                empty_sentinels_normalized: 4,
                merged_product_rows: 1,
                renamed_duplicate_names: 0,
            },
            snapshot: None,
            data_products: vec![ProductRow {
                brand_ref: Some("Acme".to_string()),
                slug: Some("drill".to_string()),
                row_number: 1,
                ..ProductRow::default()
            }],
            data_variants: Vec::new(),
            commit_counts: None,
            row_failures: Vec::new(),
            db_verify: None,
        };
        ImportJob {
            job_id: "job-1".to_string(),
            kind: JobKind::Catalog,
            mode: ImportMode::Smart,
            status: report.status,
            report,
            snapshot_hash: None,
            error_count: 0,
            warning_count: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_contains_all_sheets() {
        let workbook = ReportGenerator.render(&sample_job());
        for name in [
            "Summary",
            "Issues",
            SHEET_PRODUCTS,
            SHEET_VARIANTS,
            "Candidates",
            "Normalization",
        ] {
            assert!(workbook.sheet(name).is_some(), "缺少 {} 表", name);
        }
    }

    #[test]
    fn test_candidate_rows_rendered_compact() {
        let workbook = ReportGenerator.render(&sample_job());
        let candidates = workbook.sheet("Candidates").unwrap();
        assert_eq!(candidates.rows[1][4], "1,3,12");
    }

    #[test]
    fn test_template_headers_match_contract() {
        let workbook = ReportGenerator.template(&ReferenceData::default());
        let products = workbook.sheet(SHEET_PRODUCTS).unwrap();
        let expected: Vec<String> = PRODUCT_COLUMNS
            .iter()
            .map(|c| c.canonical.to_string())
            .collect();
        assert_eq!(products.rows[0], expected);

        let variants = workbook.sheet(SHEET_VARIANTS).unwrap();
        assert_eq!(variants.rows[0].len(), VARIANT_COLUMNS.len());
        assert!(workbook.sheet(SHEET_REFERENCE).is_some());
    }

    #[test]
    fn test_reference_paths_from_store() {
        let now = Utc::now();
        let categories = vec![
            Category {
                category_id: 1,
                parent_id: None,
                slug: "tools".to_string(),
                name: "Tools".to_string(),
                depth: 1,
                created_at: now,
                updated_at: now,
            },
            Category {
                category_id: 2,
                parent_id: Some(1),
                slug: "drills".to_string(),
                name: "Drills".to_string(),
                depth: 2,
                created_at: now,
                updated_at: now,
            },
        ];
        let series = vec![Series {
            series_id: 7,
            category_id: 2,
            slug: "premium".to_string(),
            name: "Premium".to_string(),
            created_at: now,
            updated_at: now,
        }];
        let reference =
            reference_from_store(&categories, &[], &series, &["active".to_string()]);
        assert!(reference
            .category_paths
            .contains(&"tools/drills".to_string()));
        assert_eq!(reference.series, vec!["tools/drills/premium".to_string()]);
    }
}
