// ==========================================
// 商品目录批量导入系统 - 校验引擎
// ==========================================
// 职责: 行级规则校验 → Issue 聚合 → 统计 → 作业状态判定
// 必填字段:
// - Products: 品牌/类目/系列引用、商品名、商品 slug、主标题
// - Variants: 商品 slug(外部引用)、型号编码;显示名可缺省
//   (显示名回填父商品标题由提交引擎执行,校验不得擅自假定)
// 状态判定(优先级,先命中先生效):
//   error_rows > 0 → FAILED_VALIDATION;warning_rows > 0 → VALIDATION_WARNINGS;
//   否则 → VALIDATION_PASSED
// ==========================================

use crate::domain::import::{ImportCounts, ImportReport, Issue};
use crate::domain::types::{ImportMode, JobStatus};
use crate::importer::resolution::{ResolutionContext, ResolvedRef};
use crate::importer::row_normalizer::NormalizedInput;
use crate::importer::taxonomy::parse_category_path;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// 布尔列的可接受真值/假值
const TRUTHY: &[&str] = &["1", "y", "yes", "true", "是"];
const FALSY: &[&str] = &["0", "n", "no", "false", "否"];

/// 解释布尔文本(None = 无法解释)
pub fn parse_boolean(raw: &str) -> Option<bool> {
    let lowered = raw.trim().to_lowercase();
    if TRUTHY.contains(&lowered.as_str()) {
        return Some(true);
    }
    if FALSY.contains(&lowered.as_str()) {
        return Some(false);
    }
    None
}

// ==========================================
// ValidationOutcome - 校验结果
// ==========================================
#[derive(Debug)]
pub struct ValidationOutcome {
    pub issues: Vec<Issue>,
    pub counts: ImportCounts,
    pub status: JobStatus,
}

// ==========================================
// ValidationEngine
// ==========================================
pub struct ValidationEngine {
    registered_spec_keys: HashSet<String>,
    status_values: Vec<String>,
}

impl ValidationEngine {
    pub fn new(registered_spec_keys: HashSet<String>, status_values: Vec<String>) -> Self {
        Self {
            registered_spec_keys,
            status_values,
        }
    }

    /// 校验规范化输入
    ///
    /// # 参数
    /// - input: 规范化行记录
    /// - ctx: 本作业的解析上下文(候选实体在其中去重累积)
    /// - mode: strict/smart
    pub fn validate(
        &self,
        input: &NormalizedInput,
        ctx: &mut ResolutionContext,
        mode: ImportMode,
    ) -> ValidationOutcome {
        let mut issues = Vec::new();

        // 未识别列(表头级问题,行号 0 表示表头)
        for (sheet, column) in &input.unknown_columns {
            issues.push(
                Issue::info(0, "unknown_column", column, format!("{} 表存在未识别列", sheet))
                    .with_value(column.clone()),
            );
        }

        // 多行合并时被放弃的冲突值
        for (row, column, discarded) in &input.merge_conflicts {
            issues.push(
                Issue::warning(
                    *row,
                    "merge_conflict_value_discarded",
                    column,
                    "同 slug 合并行存在不同取值,保留首值".to_string(),
                )
                .with_value(discarded.clone()),
            );
        }

        self.validate_products(input, ctx, mode, &mut issues);
        self.validate_variants(input, ctx, &mut issues);

        let counts = self.build_counts(input, ctx, &issues);
        let status = derive_status(counts.error_rows, counts.warning_rows);

        debug!(
            issues = issues.len(),
            error_rows = counts.error_rows,
            warning_rows = counts.warning_rows,
            status = %status,
            "校验完成"
        );
        ValidationOutcome {
            issues,
            counts,
            status,
        }
    }

    // ===== Products 表 =====

    fn validate_products(
        &self,
        input: &NormalizedInput,
        ctx: &mut ResolutionContext,
        mode: ImportMode,
        issues: &mut Vec<Issue>,
    ) {
        let mut seen_slugs: HashMap<&str, usize> = HashMap::new();

        for row in &input.products {
            self.require(issues, row.row_number, "Brand", &row.brand_ref);
            self.require(issues, row.row_number, "Category", &row.category_ref);
            self.require(issues, row.row_number, "Series", &row.series_ref);
            self.require(issues, row.row_number, "Product Name", &row.name);
            self.require(issues, row.row_number, "Product Slug", &row.slug);
            self.require(issues, row.row_number, "Title (primary)", &row.title_primary);

            // 非连续重复 slug: 无法合并,按键 upsert 会互相覆盖 → 硬错误
            if let Some(slug) = &row.slug {
                if let Some(first_row) = seen_slugs.get(slug.as_str()) {
                    issues.push(
                        Issue::error(
                            row.row_number,
                            "duplicate_product_slug",
                            "Product Slug",
                            format!("商品 slug 与第 {} 行重复(非连续,未合并)", first_row),
                        )
                        .with_value(slug.clone()),
                    );
                } else {
                    seen_slugs.insert(slug.as_str(), row.row_number);
                }
            }

            // 品牌解析
            if let Some(brand_ref) = &row.brand_ref {
                if let Err(failure) = ctx.resolve_brand(brand_ref, mode, row.row_number) {
                    issues.push(
                        Issue::error(
                            row.row_number,
                            failure.issue_code(),
                            "Brand",
                            failure.message(),
                        )
                        .with_value(brand_ref.clone()),
                    );
                }
            }

            // 类目路径解析(解析错误在两种模式下都是硬错误)
            let category = match &row.category_ref {
                None => None,
                Some(category_ref) => match parse_category_path(category_ref) {
                    Err(parse_err) => {
                        issues.push(
                            Issue::error(
                                row.row_number,
                                parse_err.issue_code(),
                                "Category",
                                parse_err.to_string(),
                            )
                            .with_value(category_ref.clone()),
                        );
                        None
                    }
                    Ok(segments) => {
                        match ctx.resolve_category_path(&segments, mode, row.row_number) {
                            Err(failure) => {
                                issues.push(
                                    Issue::error(
                                        row.row_number,
                                        failure.issue_code(),
                                        "Category",
                                        failure.message(),
                                    )
                                    .with_value(category_ref.clone()),
                                );
                                None
                            }
                            Ok(resolution) => Some(resolution),
                        }
                    }
                },
            };

            // 系列解析(类目解析失败时跳过,避免级联噪音)
            if let (Some(series_ref), Some(category)) = (&row.series_ref, &category) {
                match ctx.resolve_series(series_ref, category, mode, row.row_number) {
                    Err(failure) => {
                        issues.push(
                            Issue::error(
                                row.row_number,
                                failure.issue_code(),
                                "Series",
                                failure.message(),
                            )
                            .with_value(series_ref.clone()),
                        );
                    }
                    Ok(ResolvedRef::Candidate(key)) => {
                        // 同 slug 系列存在于其他类目: 行类目覆写生效,落库状态会变化 → 警告
                        let category_id = match category.leaf {
                            ResolvedRef::Existing(id) => Some(id),
                            _ => None,
                        };
                        if ctx.series_exists_elsewhere(&key.slug, category_id) {
                            issues.push(
                                Issue::warning(
                                    row.row_number,
                                    "series_category_overridden",
                                    "Series",
                                    format!(
                                        "系列 {} 存在于其他类目,将按行类目 {} 新建(不跨类目回退)",
                                        key.slug, category.leaf_path
                                    ),
                                )
                                .with_value(series_ref.clone()),
                            );
                        }
                    }
                    Ok(ResolvedRef::Existing(_)) => {}
                }
            }

            // 状态枚举
            match &row.status {
                None => {
                    issues.push(Issue::info(
                        row.row_number,
                        "status_defaulted",
                        "Status",
                        format!(
                            "状态缺省,提交时使用默认值 {}",
                            crate::domain::catalog::DEFAULT_PRODUCT_STATUS
                        ),
                    ));
                }
                Some(status) => {
                    if !self.status_values.iter().any(|s| s.eq_ignore_ascii_case(status)) {
                        issues.push(
                            Issue::warning(
                                row.row_number,
                                "invalid_status",
                                "Status",
                                "状态取值不在枚举范围内,提交时使用默认值".to_string(),
                            )
                            .with_value(status.clone())
                            .with_expected(self.status_values.join("|")),
                        );
                    }
                }
            }

            // 推荐标记布尔解释
            if let Some(raw) = &row.is_featured {
                if parse_boolean(raw).is_none() {
                    issues.push(
                        Issue::warning(
                            row.row_number,
                            "invalid_boolean",
                            "Is Featured",
                            "无法解释为布尔值,提交时按否处理".to_string(),
                        )
                        .with_value(raw.clone())
                        .with_expected("1|0|Y|N|YES|NO|TRUE|FALSE|是|否"),
                    );
                }
            }
        }
    }

    // ===== Variants 表 =====

    fn validate_variants(
        &self,
        input: &NormalizedInput,
        ctx: &mut ResolutionContext,
        issues: &mut Vec<Issue>,
    ) {
        // 文件内商品 slug 集合(型号可以引用同文件新建的商品)
        let file_product_slugs: HashSet<&str> = input
            .products
            .iter()
            .filter_map(|p| p.slug.as_deref())
            .collect();

        let mut seen_model_codes: HashMap<&str, usize> = HashMap::new();

        for row in &input.variants {
            self.require(issues, row.row_number, "Product Slug", &row.product_slug);
            self.require(issues, row.row_number, "Model Code", &row.model_code);

            // 父商品引用: 文件内或存储中必须存在(商品不是候选实体,不可延迟)
            let parent_product_id = match &row.product_slug {
                None => None,
                Some(slug) => {
                    let in_store = ctx.product_by_slug(slug).map(|(id, _)| id);
                    if in_store.is_none() && !file_product_slugs.contains(slug.as_str()) {
                        issues.push(
                            Issue::error(
                                row.row_number,
                                "product_not_found",
                                "Product Slug",
                                format!("引用的商品不存在(文件内与存储中均无): {}", slug),
                            )
                            .with_value(slug.clone()),
                        );
                    }
                    in_store
                }
            };

            // model_code 全局唯一
            if let Some(model_code) = &row.model_code {
                // 文件内重复(第二次出现起)
                if let Some(first_row) = seen_model_codes.get(model_code.as_str()) {
                    issues.push(
                        Issue::error(
                            row.row_number,
                            "duplicate_model_code",
                            "Model Code",
                            format!("型号编码与第 {} 行重复(全局唯一约束)", first_row),
                        )
                        .with_value(model_code.clone()),
                    );
                } else {
                    seen_model_codes.insert(model_code.as_str(), row.row_number);

                    // 与存储冲突: 已归属其他商品 → 硬错误,与模式无关
                    if let Some((_, owner_product_id)) = ctx.variant_owner(model_code) {
                        let same_product = parent_product_id == Some(owner_product_id);
                        if !same_product {
                            issues.push(
                                Issue::error(
                                    row.row_number,
                                    "model_code_conflict",
                                    "Model Code",
                                    format!(
                                        "型号编码已归属其他商品(product_id={})",
                                        owner_product_id
                                    ),
                                )
                                .with_value(model_code.clone()),
                            );
                        }
                    }
                }
            }

            // 数值列解释(失败降级为警告,取值按缺失处理)
            self.check_number(issues, row.row_number, "Weight", &row.weight);
            self.check_number(issues, row.row_number, "List Price", &row.list_price);
            self.check_integer(issues, row.row_number, "Stock Qty", &row.stock_qty);

            // 未注册的规格键(schema-on-read 白名单)
            for key in row.specs.keys() {
                if !self.registered_spec_keys.contains(key) {
                    issues.push(
                        Issue::info(
                            row.row_number,
                            "unregistered_spec_key",
                            &format!("Spec:{}", key),
                            "规格键未在规格键目录注册".to_string(),
                        )
                        .with_value(key.clone()),
                    );
                }
            }
        }
    }

    // ===== 统计与状态 =====

    fn build_counts(
        &self,
        input: &NormalizedInput,
        ctx: &ResolutionContext,
        issues: &[Issue],
    ) -> ImportCounts {
        let (error_rows, warning_rows) = ImportReport::distinct_rows_by_severity(issues);
        let error_row_set: HashSet<usize> = issues
            .iter()
            .filter(|i| i.severity == crate::domain::types::IssueSeverity::Error)
            .map(|i| i.row)
            .collect();

        let row_ok = |row: usize, merged: &[usize]| {
            !error_row_set.contains(&row) && merged.iter().all(|r| !error_row_set.contains(r))
        };

        let mut counts = ImportCounts {
            total_product_rows: input.raw_product_row_count,
            total_variant_rows: input.raw_variant_row_count,
            error_rows,
            warning_rows,
            ..ImportCounts::default()
        };

        let (categories_to_create, series_to_create, brands_to_create) = ctx.candidate_counts();
        counts.categories_to_create = categories_to_create;
        counts.series_to_create = series_to_create;
        counts.brands_to_create = brands_to_create;

        for row in &input.products {
            if !row_ok(row.row_number, &row.merged_rows) {
                continue;
            }
            counts.valid_product_rows += 1;
            if let Some(slug) = &row.slug {
                if ctx.product_by_slug(slug).is_some() {
                    counts.products_to_update += 1;
                } else {
                    counts.products_to_create += 1;
                }
            }
        }
        for row in &input.variants {
            if !row_ok(row.row_number, &[]) {
                continue;
            }
            counts.valid_variant_rows += 1;
            if let Some(model_code) = &row.model_code {
                if ctx.variant_owner(model_code).is_some() {
                    counts.variants_to_update += 1;
                } else {
                    counts.variants_to_create += 1;
                }
            }
        }
        counts
    }

    // ===== 工具方法 =====

    fn require(
        &self,
        issues: &mut Vec<Issue>,
        row: usize,
        column: &str,
        value: &Option<String>,
    ) {
        if value.is_none() {
            issues.push(Issue::error(
                row,
                "required_field_missing",
                column,
                format!("必填字段缺失: {}", column),
            ));
        }
    }

    fn check_number(
        &self,
        issues: &mut Vec<Issue>,
        row: usize,
        column: &str,
        value: &Option<String>,
    ) {
        if let Some(raw) = value {
            if raw.parse::<f64>().is_err() {
                issues.push(
                    Issue::warning(
                        row,
                        "invalid_number",
                        column,
                        "无法解析为数值,取值按缺失处理".to_string(),
                    )
                    .with_value(raw.clone()),
                );
            }
        }
    }

    fn check_integer(
        &self,
        issues: &mut Vec<Issue>,
        row: usize,
        column: &str,
        value: &Option<String>,
    ) {
        if let Some(raw) = value {
            if raw.parse::<i64>().is_err() {
                issues.push(
                    Issue::warning(
                        row,
                        "invalid_number",
                        column,
                        "无法解析为整数,取值按缺失处理".to_string(),
                    )
                    .with_value(raw.clone()),
                );
            }
        }
    }
}

/// 作业状态判定(优先级: 错误 > 警告 > 通过)
pub fn derive_status(error_rows: usize, warning_rows: usize) -> JobStatus {
    if error_rows > 0 {
        JobStatus::FailedValidation
    } else if warning_rows > 0 {
        JobStatus::ValidationWarnings
    } else {
        JobStatus::ValidationPassed
    }
}
