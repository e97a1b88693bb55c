// ==========================================
// 商品目录批量导入系统 - Upsert 计划构建
// ==========================================
// 职责: 规范化行 + 解析上下文 → 依赖有序的 upsert 计划(纯计算)
// 红线:
// - 无副作用,不开启事务 —— 干跑预览与真实提交共用此函数,
//   预览绝不通过"开事务再强制回滚"实现
// - 依赖顺序: Category → Brand → Series → Product → Variant
// ==========================================

use crate::domain::catalog::DEFAULT_PRODUCT_STATUS;
use crate::domain::import::RowFailure;
use crate::domain::plan::{
    BrandStep, CategoryStep, PlanRef, ProductStep, SeriesStep, UpsertPlan, VariantStep,
};
use crate::domain::types::{CandidateType, ImportMode, StepActionKind};
use crate::importer::resolution::ResolutionContext;
use crate::importer::row_normalizer::NormalizedInput;
use crate::importer::taxonomy::parse_category_path;
use crate::importer::validation::parse_boolean;
use std::collections::{HashMap, HashSet};
use tracing::debug;

// ==========================================
// PlanBuildOutcome - 计划构建结果
// ==========================================
#[derive(Debug)]
pub struct PlanBuildOutcome {
    pub plan: UpsertPlan,
    /// 构建期被排除的行(提交阶段按 allow_partial 语义处理)
    pub row_failures: Vec<RowFailure>,
}

/// 构建 upsert 计划
///
/// # 说明
/// - 提交阶段对快照重新规范化并以"当前存储状态"重建解析上下文后调用;
///   实体自校验以来的漂移(被删/新建)在此按 upsert 语义重新吸收
pub fn build_upsert_plan(
    job_id: &str,
    mode: ImportMode,
    input: &NormalizedInput,
    ctx: &mut ResolutionContext,
    status_values: &[String],
) -> PlanBuildOutcome {
    let mut plan = UpsertPlan::new(job_id.to_string(), mode);
    let mut row_failures = Vec::new();
    let fail = |failures: &mut Vec<RowFailure>, sheet: &str, row: usize, reason: String| {
        failures.push(RowFailure {
            sheet: sheet.to_string(),
            row,
            reason,
        });
    };

    // === 商品步骤(同时驱动候选发现) ===
    let mut planned_product_slugs: HashSet<String> = HashSet::new();
    let mut failed_product_slugs: HashSet<String> = HashSet::new();

    for row in &input.products {
        let (Some(brand_ref), Some(category_ref), Some(series_ref)) =
            (&row.brand_ref, &row.category_ref, &row.series_ref)
        else {
            fail(
                &mut row_failures,
                "Products",
                row.row_number,
                "必填引用缺失(品牌/类目/系列)".to_string(),
            );
            note_failed_slug(&mut failed_product_slugs, row.slug.as_deref());
            continue;
        };
        let (Some(name), Some(slug), Some(title_primary)) =
            (&row.name, &row.slug, &row.title_primary)
        else {
            fail(
                &mut row_failures,
                "Products",
                row.row_number,
                "必填字段缺失(商品名/slug/主标题)".to_string(),
            );
            note_failed_slug(&mut failed_product_slugs, row.slug.as_deref());
            continue;
        };

        if planned_product_slugs.contains(slug) {
            fail(
                &mut row_failures,
                "Products",
                row.row_number,
                format!("商品 slug 重复(非连续,未合并): {}", slug),
            );
            continue;
        }

        // 引用解析(strict 模式缺失 → 行失败;smart → 候选)
        let brand = match ctx.resolve_brand(brand_ref, mode, row.row_number) {
            Ok(resolved) => resolved,
            Err(failure) => {
                fail(&mut row_failures, "Products", row.row_number, failure.message());
                note_failed_slug(&mut failed_product_slugs, Some(slug));
                continue;
            }
        };
        let category = match parse_category_path(category_ref) {
            Err(parse_err) => {
                fail(
                    &mut row_failures,
                    "Products",
                    row.row_number,
                    parse_err.to_string(),
                );
                note_failed_slug(&mut failed_product_slugs, Some(slug));
                continue;
            }
            Ok(segments) => match ctx.resolve_category_path(&segments, mode, row.row_number) {
                Ok(resolution) => resolution,
                Err(failure) => {
                    fail(&mut row_failures, "Products", row.row_number, failure.message());
                    note_failed_slug(&mut failed_product_slugs, Some(slug));
                    continue;
                }
            },
        };
        let series = match ctx.resolve_series(series_ref, &category, mode, row.row_number) {
            Ok(resolved) => resolved,
            Err(failure) => {
                fail(&mut row_failures, "Products", row.row_number, failure.message());
                note_failed_slug(&mut failed_product_slugs, Some(slug));
                continue;
            }
        };

        let (action, product_id) = match ctx.product_by_slug(slug) {
            Some((id, _)) => (StepActionKind::Update, Some(id)),
            None => (StepActionKind::Create, None),
        };
        let status = normalize_status(row.status.as_deref(), status_values);
        let is_featured = row
            .is_featured
            .as_deref()
            .and_then(parse_boolean)
            .unwrap_or(false);

        planned_product_slugs.insert(slug.clone());
        plan.products.push(ProductStep {
            action,
            product_id,
            slug: slug.clone(),
            name: name.clone(),
            brand: brand.to_plan_ref(),
            category: category.leaf.to_plan_ref(),
            series: series.to_plan_ref(),
            title_primary: title_primary.clone(),
            title_secondary: row.title_secondary.clone(),
            status,
            is_featured,
            long_description: row.long_description.clone(),
            general_features: row.general_features.clone(),
            short_specs: row.short_specs.clone(),
            taxonomy_tags: row.taxonomy_tags.clone(),
            row: row.row_number,
        });
    }

    // === 候选步骤(插入序即依赖序: 链内父先于子) ===
    for candidate in &ctx.candidates {
        let key = crate::domain::import::CandidateKey {
            candidate_type: candidate.candidate_type,
            slug: candidate.slug.clone(),
            parent_slug: candidate.parent_slug.clone(),
        };
        let plan_key = key.plan_key();
        match candidate.candidate_type {
            CandidateType::Category => {
                let info = ctx
                    .category_candidate_info
                    .get(&plan_key)
                    .cloned()
                    .unwrap_or(crate::importer::resolution::CategoryCandidateInfo {
                        parent: None,
                        depth: 1,
                    });
                plan.categories.push(CategoryStep {
                    key: plan_key,
                    parent: info.parent,
                    slug: candidate.slug.clone(),
                    name: candidate.name.clone(),
                    depth: info.depth,
                    rows: candidate.rows.clone(),
                });
            }
            CandidateType::Brand => {
                plan.brands.push(BrandStep {
                    key: plan_key,
                    slug: candidate.slug.clone(),
                    name: candidate.name.clone(),
                    rows: candidate.rows.clone(),
                });
            }
            CandidateType::Series => {
                let category = ctx
                    .series_candidate_info
                    .get(&plan_key)
                    .cloned()
                    .unwrap_or(PlanRef::Pending(format!(
                        "CATEGORY:{}",
                        candidate.parent_slug.clone().unwrap_or_default()
                    )));
                plan.series.push(SeriesStep {
                    key: plan_key,
                    category,
                    slug: candidate.slug.clone(),
                    name: candidate.name.clone(),
                    rows: candidate.rows.clone(),
                });
            }
        }
    }

    // === 型号步骤 ===
    let mut planned_model_codes: HashMap<String, usize> = HashMap::new();
    for row in &input.variants {
        let (Some(product_slug), Some(model_code)) = (&row.product_slug, &row.model_code) else {
            fail(
                &mut row_failures,
                "Variants",
                row.row_number,
                "必填字段缺失(商品 slug/型号编码)".to_string(),
            );
            continue;
        };

        if let Some(first_row) = planned_model_codes.get(model_code) {
            fail(
                &mut row_failures,
                "Variants",
                row.row_number,
                format!("型号编码与第 {} 行重复(全局唯一约束)", first_row),
            );
            continue;
        }

        // 父商品引用: 本计划内 > 存储中;两者皆无则失败
        let product = if planned_product_slugs.contains(product_slug) {
            PlanRef::Pending(format!("PRODUCT:{}", product_slug))
        } else if failed_product_slugs.contains(product_slug) {
            fail(
                &mut row_failures,
                "Variants",
                row.row_number,
                format!("父商品行失败: {}", product_slug),
            );
            continue;
        } else if let Some((id, _)) = ctx.product_by_slug(product_slug) {
            PlanRef::Existing(id)
        } else {
            fail(
                &mut row_failures,
                "Variants",
                row.row_number,
                format!("引用的商品不存在: {}", product_slug),
            );
            continue;
        };

        // model_code 与存储冲突检查(归属其他商品 → 硬失败)
        let (action, variant_id) = match ctx.variant_owner(model_code) {
            Some((variant_id, owner_product_id)) => {
                let same_product = match &product {
                    PlanRef::Existing(id) => *id == owner_product_id,
                    // 商品在本文件内重建: 若 slug 命中存储同商品则归属一致
                    PlanRef::Pending(_) => ctx
                        .product_by_slug(product_slug)
                        .map(|(id, _)| id == owner_product_id)
                        .unwrap_or(false),
                };
                if !same_product {
                    fail(
                        &mut row_failures,
                        "Variants",
                        row.row_number,
                        format!(
                            "型号编码已归属其他商品(product_id={}): {}",
                            owner_product_id, model_code
                        ),
                    );
                    continue;
                }
                (StepActionKind::Update, Some(variant_id))
            }
            None => (StepActionKind::Create, None),
        };

        planned_model_codes.insert(model_code.clone(), row.row_number);
        plan.variants.push(VariantStep {
            action,
            variant_id,
            product,
            model_code: model_code.clone(),
            name_primary: row.name_primary.clone(),
            name_secondary: row.name_secondary.clone(),
            sku: row.sku.clone(),
            dimensions: row.dimensions.clone(),
            weight: row.weight.as_deref().and_then(|v| v.parse().ok()),
            list_price: row.list_price.as_deref().and_then(|v| v.parse().ok()),
            stock_qty: row.stock_qty.as_deref().and_then(|v| v.parse().ok()),
            specs: row.specs.clone(),
            row: row.row_number,
        });
    }

    debug!(
        job_id = %job_id,
        steps = plan.step_count(),
        failures = row_failures.len(),
        "upsert 计划构建完成"
    );
    PlanBuildOutcome { plan, row_failures }
}

fn note_failed_slug(failed: &mut HashSet<String>, slug: Option<&str>) {
    if let Some(slug) = slug {
        failed.insert(slug.to_string());
    }
}

/// 状态归一: 合法枚举值小写化,非法/缺省取默认值
fn normalize_status(raw: Option<&str>, status_values: &[String]) -> String {
    match raw {
        Some(value) => status_values
            .iter()
            .find(|s| s.eq_ignore_ascii_case(value))
            .cloned()
            .unwrap_or_else(|| DEFAULT_PRODUCT_STATUS.to_string()),
        None => DEFAULT_PRODUCT_STATUS.to_string(),
    }
}
