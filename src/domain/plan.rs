// ==========================================
// 商品目录批量导入系统 - Upsert 计划模型
// ==========================================
// 依据: Catalog_Import_Design_v1.0.md - 5. 提交引擎
// 用途: 提交阶段的纯计算产物;干跑预览与真实提交共用同一计划结构
// 依赖顺序: Category → Brand → Series → Product → Variant
// 红线: 计划构建无副作用;落库由仓储按计划机械执行
// ==========================================

use crate::domain::import::{CommitCounts, RowFailure};
use crate::domain::types::{EntityKind, ImportMode, StepActionKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// PlanRef - 计划内实体引用
// ==========================================
// Existing: 校验时已存在于存储中的实体
// Pending: 同一提交内更早步骤将创建的实体(键为 CandidateKey::plan_key
//          或 "PRODUCT:<slug>"),后续步骤通过 created-map 取得真实 id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanRef {
    Existing(i64),
    Pending(String),
}

// ==========================================
// 计划步骤
// ==========================================

/// 类目创建步骤(已存在的类目不产生步骤;父级先于子级出现)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStep {
    pub key: String,             // plan_key,供子级/商品引用
    pub parent: Option<PlanRef>, // None = 根类目
    pub slug: String,
    pub name: String,
    pub depth: i32,
    pub rows: Vec<usize>, // 引用行溯源
}

/// 品牌创建步骤
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandStep {
    pub key: String,
    pub slug: String,
    pub name: String,
    pub rows: Vec<usize>,
}

/// 系列创建步骤(类目限定)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesStep {
    pub key: String,
    pub category: PlanRef,
    pub slug: String,
    pub name: String,
    pub rows: Vec<usize>,
}

/// 商品 upsert 步骤
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductStep {
    pub action: StepActionKind,
    pub product_id: Option<i64>, // Update 时已知
    pub slug: String,
    pub name: String,
    pub brand: PlanRef,
    pub category: PlanRef,
    pub series: PlanRef,
    pub title_primary: String,
    pub title_secondary: Option<String>,
    pub status: String,
    pub is_featured: bool,
    pub long_description: Option<String>,
    pub general_features: Option<String>,
    pub short_specs: Option<String>,
    pub taxonomy_tags: Option<String>,
    pub row: usize,
}

/// 型号 upsert 步骤
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantStep {
    pub action: StepActionKind,
    pub variant_id: Option<i64>,
    pub product: PlanRef,
    pub model_code: String,
    // None = 行内未提供显示名,落库时回填父商品主标题(默认继承规则)
    pub name_primary: Option<String>,
    pub name_secondary: Option<String>,
    pub sku: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<f64>,
    pub list_price: Option<f64>,
    pub stock_qty: Option<i64>,
    pub specs: BTreeMap<String, String>,
    pub row: usize,
}

// ==========================================
// UpsertPlan - 完整提交计划
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertPlan {
    pub job_id: String,
    pub mode: ImportMode,
    pub categories: Vec<CategoryStep>,
    pub brands: Vec<BrandStep>,
    pub series: Vec<SeriesStep>,
    pub products: Vec<ProductStep>,
    pub variants: Vec<VariantStep>,
}

impl UpsertPlan {
    pub fn new(job_id: String, mode: ImportMode) -> Self {
        Self {
            job_id,
            mode,
            categories: Vec::new(),
            brands: Vec::new(),
            series: Vec::new(),
            products: Vec::new(),
            variants: Vec::new(),
        }
    }

    pub fn step_count(&self) -> usize {
        self.categories.len()
            + self.brands.len()
            + self.series.len()
            + self.products.len()
            + self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.step_count() == 0
    }
}

// ==========================================
// CreatedEntity - 落库时声称创建的实体
// ==========================================
// 提交后验证(db_verify)据此逐个重新查库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedEntity {
    pub kind: EntityKind,
    pub key: String, // 自然键展示(品牌/商品为 slug,型号为 model_code,层级实体为 plan_key)
    pub id: i64,
}

// ==========================================
// PlanApplication - 仓储执行计划后的结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanApplication {
    pub counts: CommitCounts,
    pub created: Vec<CreatedEntity>,
    pub row_failures: Vec<RowFailure>,
}
