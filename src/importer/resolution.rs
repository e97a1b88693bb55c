// ==========================================
// 商品目录批量导入系统 - 引用解析上下文
// ==========================================
// 职责: 行内品牌/类目/系列引用 → 已存实体引用 或 候选实体
// 红线:
// - 上下文在 validate/commit 开始时构建一次,按参数传递,绝不进程级全局
// - 系列解析永远限定 (类目, slug),禁止全局 slug 回退
// - 候选实体按 (类型, slug, 父路径) 去重,行号溯源持续累积
// ==========================================

use crate::domain::import::{Candidate, CandidateKey};
use crate::domain::plan::PlanRef;
use crate::domain::types::{CandidateType, ImportMode};
use crate::importer::taxonomy::{slugify, PathSegment};
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::RepositoryResult;
use std::collections::HashMap;
use tracing::debug;

// ==========================================
// ResolvedRef - 解析结果引用
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRef {
    Existing(i64),           // 存储中已存在
    Candidate(CandidateKey), // smart 模式下的待建候选
}

impl ResolvedRef {
    pub fn to_plan_ref(&self) -> PlanRef {
        match self {
            ResolvedRef::Existing(id) => PlanRef::Existing(*id),
            ResolvedRef::Candidate(key) => PlanRef::Pending(key.plan_key()),
        }
    }
}

// ==========================================
// CategoryResolution - 类目路径解析结果
// ==========================================
#[derive(Debug, Clone)]
pub struct CategoryResolution {
    pub leaf: ResolvedRef,
    pub leaf_path: String, // slug 路径(如 "tools/power-tools"),系列候选的父引用
}

// ==========================================
// ResolutionFailure - strict 模式解析失败
// ==========================================
// 校验引擎转为 ERROR 级 Issue;解析在第一个缺失段即停止
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    BrandNotFound {
        name: String,
        slug: String,
    },
    CategoryNotFound {
        segment: String,
        parent_context: String, // 已解析的父路径("(根)" 表示根层)
    },
    SeriesNotFound {
        name: String,
        slug: String,
        category_path: String,
    },
}

impl ResolutionFailure {
    pub fn issue_code(&self) -> &'static str {
        match self {
            ResolutionFailure::BrandNotFound { .. } => "brand_not_found",
            ResolutionFailure::CategoryNotFound { .. } => "category_not_found",
            ResolutionFailure::SeriesNotFound { .. } => "series_not_found",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ResolutionFailure::BrandNotFound { name, slug } => {
                format!("品牌不存在: {}(slug={})", name, slug)
            }
            ResolutionFailure::CategoryNotFound {
                segment,
                parent_context,
            } => format!("类目段不存在: {}(父级: {})", segment, parent_context),
            ResolutionFailure::SeriesNotFound {
                name,
                slug,
                category_path,
            } => format!(
                "系列不存在: {}(slug={},限定类目: {})",
                name, slug, category_path
            ),
        }
    }
}

/// 类目候选的计划构建信息
#[derive(Debug, Clone)]
pub struct CategoryCandidateInfo {
    pub parent: Option<PlanRef>, // None = 根
    pub depth: i32,
}

// ==========================================
// ResolutionContext - 按作业构建的解析上下文
// ==========================================
// 查找缓存构建一次,作业结束即丢弃
pub struct ResolutionContext {
    // 已存实体缓存
    categories: HashMap<(i64, String), i64>, // (parent_key, slug) → category_id
    brands: HashMap<String, i64>,            // slug → brand_id
    series: HashMap<(i64, String), i64>,     // (category_id, slug) → series_id
    series_slugs: HashMap<String, Vec<i64>>, // slug → 所在类目 id 列表(跨类目诊断用)
    products: HashMap<String, (i64, String)>, // slug → (product_id, title_primary)
    variants: HashMap<String, (i64, i64)>,   // model_code → (variant_id, product_id)

    // 候选实体(按键去重,插入序即依赖序: 链内父先于子)
    seen_candidates: HashMap<CandidateKey, usize>,
    pub candidates: Vec<Candidate>,
    pub category_candidate_info: HashMap<String, CategoryCandidateInfo>, // plan_key →
    pub series_candidate_info: HashMap<String, PlanRef>, // plan_key → 类目引用
}

impl ResolutionContext {
    /// 从目录存储批量预载查找缓存
    pub async fn load(repo: &dyn CatalogRepository) -> RepositoryResult<Self> {
        let mut ctx = Self {
            categories: HashMap::new(),
            brands: HashMap::new(),
            series: HashMap::new(),
            series_slugs: HashMap::new(),
            products: HashMap::new(),
            variants: HashMap::new(),
            seen_candidates: HashMap::new(),
            candidates: Vec::new(),
            category_candidate_info: HashMap::new(),
            series_candidate_info: HashMap::new(),
        };

        for category in repo.load_categories().await? {
            let parent_key = category.parent_id.unwrap_or(0);
            ctx.categories
                .insert((parent_key, category.slug), category.category_id);
        }
        for brand in repo.load_brands().await? {
            ctx.brands.insert(brand.slug, brand.brand_id);
        }
        for series in repo.load_series().await? {
            ctx.series_slugs
                .entry(series.slug.clone())
                .or_default()
                .push(series.category_id);
            ctx.series
                .insert((series.category_id, series.slug), series.series_id);
        }
        for (product_id, slug, title) in repo.load_product_keys().await? {
            ctx.products.insert(slug, (product_id, title));
        }
        for (variant_id, model_code, product_id) in repo.load_variant_keys().await? {
            ctx.variants.insert(model_code, (variant_id, product_id));
        }

        debug!(
            categories = ctx.categories.len(),
            brands = ctx.brands.len(),
            series = ctx.series.len(),
            products = ctx.products.len(),
            variants = ctx.variants.len(),
            "解析上下文预载完成"
        );
        Ok(ctx)
    }

    // ===== 品牌解析 =====

    /// 解析品牌引用
    pub fn resolve_brand(
        &mut self,
        raw: &str,
        mode: ImportMode,
        row: usize,
    ) -> Result<ResolvedRef, ResolutionFailure> {
        let slug = slugify(raw);
        if let Some(&id) = self.brands.get(&slug) {
            return Ok(ResolvedRef::Existing(id));
        }
        match mode {
            ImportMode::Strict => Err(ResolutionFailure::BrandNotFound {
                name: raw.trim().to_string(),
                slug,
            }),
            ImportMode::Smart => {
                let key = CandidateKey {
                    candidate_type: CandidateType::Brand,
                    slug,
                    parent_slug: None,
                };
                self.note_candidate(&key, raw.trim(), row);
                Ok(ResolvedRef::Candidate(key))
            }
        }
    }

    // ===== 类目解析 =====

    /// 解析类目路径: 从根逐段限定父级解析
    ///
    /// # 语义
    /// - 命中则下钻;缺失段及其全部后代:
    ///   strict → 在第一个缺失段停止并报错;smart → 成为候选链
    /// - smart 模式不在此创建任何实体,创建延迟到提交阶段
    pub fn resolve_category_path(
        &mut self,
        segments: &[PathSegment],
        mode: ImportMode,
        row: usize,
    ) -> Result<CategoryResolution, ResolutionFailure> {
        let mut current: Option<ResolvedRef> = None;
        let mut parent_key: i64 = 0;
        let mut path_so_far = String::new();
        let mut missing = false;

        for (idx, segment) in segments.iter().enumerate() {
            if !missing {
                if let Some(&id) = self.categories.get(&(parent_key, segment.slug.clone())) {
                    current = Some(ResolvedRef::Existing(id));
                    parent_key = id;
                    push_path(&mut path_so_far, &segment.slug);
                    continue;
                }
                // 首个缺失段
                if mode == ImportMode::Strict {
                    return Err(ResolutionFailure::CategoryNotFound {
                        segment: segment.name.clone(),
                        parent_context: if path_so_far.is_empty() {
                            "(根)".to_string()
                        } else {
                            path_so_far.clone()
                        },
                    });
                }
                missing = true;
            }

            // smart: 缺失段及其下所有段成为候选链(父引用指向前一段)
            let key = CandidateKey {
                candidate_type: CandidateType::Category,
                slug: segment.slug.clone(),
                parent_slug: if path_so_far.is_empty() {
                    None
                } else {
                    Some(path_so_far.clone())
                },
            };
            let parent_ref = current.as_ref().map(|r| r.to_plan_ref());
            self.note_candidate(&key, &segment.name, row);
            self.category_candidate_info
                .entry(key.plan_key())
                .or_insert(CategoryCandidateInfo {
                    parent: parent_ref,
                    depth: (idx + 1) as i32,
                });
            current = Some(ResolvedRef::Candidate(key));
            push_path(&mut path_so_far, &segment.slug);
        }

        Ok(CategoryResolution {
            leaf: current.expect("路径至少一段"),
            leaf_path: path_so_far,
        })
    }

    // ===== 系列解析 =====

    /// 解析系列引用(永远限定在行类目范围内)
    pub fn resolve_series(
        &mut self,
        raw: &str,
        category: &CategoryResolution,
        mode: ImportMode,
        row: usize,
    ) -> Result<ResolvedRef, ResolutionFailure> {
        let slug = slugify(raw);
        if let ResolvedRef::Existing(category_id) = category.leaf {
            if let Some(&id) = self.series.get(&(category_id, slug.clone())) {
                return Ok(ResolvedRef::Existing(id));
            }
        }
        // 类目本身是候选时,系列必然尚不存在
        match mode {
            ImportMode::Strict => Err(ResolutionFailure::SeriesNotFound {
                name: raw.trim().to_string(),
                slug,
                category_path: category.leaf_path.clone(),
            }),
            ImportMode::Smart => {
                let key = CandidateKey {
                    candidate_type: CandidateType::Series,
                    slug,
                    parent_slug: Some(category.leaf_path.clone()),
                };
                self.note_candidate(&key, raw.trim(), row);
                self.series_candidate_info
                    .entry(key.plan_key())
                    .or_insert_with(|| category.leaf.to_plan_ref());
                Ok(ResolvedRef::Candidate(key))
            }
        }
    }

    /// 同 slug 系列是否存在于其他类目(跨类目覆写的诊断信号,绝不用于回退)
    pub fn series_exists_elsewhere(&self, slug: &str, category_id: Option<i64>) -> bool {
        match self.series_slugs.get(slug) {
            None => false,
            Some(category_ids) => category_ids
                .iter()
                .any(|id| Some(*id) != category_id),
        }
    }

    // ===== 商品/型号查询 =====

    /// 按 slug 查已存商品: (product_id, title_primary)
    pub fn product_by_slug(&self, slug: &str) -> Option<(i64, &str)> {
        self.products
            .get(slug)
            .map(|(id, title)| (*id, title.as_str()))
    }

    /// 按 model_code 查已存型号归属: (variant_id, product_id)
    pub fn variant_owner(&self, model_code: &str) -> Option<(i64, i64)> {
        self.variants.get(model_code).copied()
    }

    // ===== 候选登记 =====

    /// 候选去重登记: 键首见则新建,行号溯源持续累积
    fn note_candidate(&mut self, key: &CandidateKey, name: &str, row: usize) {
        match self.seen_candidates.get(key) {
            Some(&idx) => {
                let rows = &mut self.candidates[idx].rows;
                if rows.last() != Some(&row) {
                    rows.push(row);
                }
            }
            None => {
                self.seen_candidates
                    .insert(key.clone(), self.candidates.len());
                self.candidates.push(Candidate {
                    candidate_type: key.candidate_type,
                    slug: key.slug.clone(),
                    name: name.to_string(),
                    parent_slug: key.parent_slug.clone(),
                    rows: vec![row],
                });
            }
        }
    }

    /// 各类型候选数量: (category, series, brand)
    pub fn candidate_counts(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for candidate in &self.candidates {
            match candidate.candidate_type {
                CandidateType::Category => counts.0 += 1,
                CandidateType::Series => counts.1 += 1,
                CandidateType::Brand => counts.2 += 1,
            }
        }
        counts
    }
}

fn push_path(path: &mut String, slug: &str) {
    if !path.is_empty() {
        path.push('/');
    }
    path.push_str(slug);
}
