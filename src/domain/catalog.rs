// ==========================================
// 商品目录批量导入系统 - 目录实体模型
// ==========================================
// 依据: Catalog_Import_Design_v1.0.md - 3. 目录数据模型
// 红线: 目录存储是外部协作方,导入层只通过 upsert 键访问
// 键约定:
// - Category: (parent_id, slug),层级深度 ≤ 3
// - Series:   (category_id, slug),绝不按 slug 全局解析
// - Brand:    slug
// - Product:  slug
// - Variant:  model_code,全局唯一
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 类目最大层级深度(第 4 级为硬解析错误,与模式无关)
pub const MAX_CATEGORY_DEPTH: usize = 3;

// ==========================================
// Category - 类目(层级实体)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub category_id: i64,           // 主键
    pub parent_id: Option<i64>,     // 父类目(NULL = 根)
    pub slug: String,               // 键片段(同一父级下唯一)
    pub name: String,               // 显示名
    pub depth: i32,                 // 层级(1-based,≤ MAX_CATEGORY_DEPTH)
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// Brand - 品牌(扁平实体)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub brand_id: i64,
    pub slug: String, // 全局唯一键
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// Series - 系列(按类目限定)
// ==========================================
// 红线: 系列解析必须限定在类目范围内,
//       禁止按 slug 全局查找后静默回退到其他类目下的同名系列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub series_id: i64,
    pub category_id: i64, // 所属类目(键的一部分)
    pub slug: String,     // 键片段(同一类目下唯一)
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// Product - 商品
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: i64,
    pub slug: String, // 全局唯一键
    pub name: String,
    pub brand_id: i64,
    pub category_id: i64,
    pub series_id: i64,
    pub title_primary: String,            // 主语言标题(必填)
    pub title_secondary: Option<String>,  // 次语言标题
    pub status: String,                   // 枚举值,参照 Reference 表
    pub is_featured: bool,
    pub long_description: Option<String>,
    pub general_features: Option<String>,
    pub short_specs: Option<String>,
    pub taxonomy_tags: Option<String>,    // 补充分类标签(原样保存)
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// Variant - 商品型号
// ==========================================
// 红线: model_code 全系统唯一,跨商品重复是硬错误而非警告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub variant_id: i64,
    pub product_id: i64,
    pub model_code: String, // 全局唯一键
    pub name_primary: String, // 缺省时在提交阶段回填父商品主标题
    pub name_secondary: Option<String>,
    pub sku: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<f64>,
    pub list_price: Option<f64>,
    pub stock_qty: Option<i64>,
    // 自由规格键值(schema-on-read),键需在规格键目录中注册
    pub specs: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 商品状态的默认取值(未配置 Reference 数据时的兜底)
pub fn default_status_values() -> Vec<String> {
    vec![
        "active".to_string(),
        "inactive".to_string(),
        "discontinued".to_string(),
    ]
}

/// 缺省商品状态
pub const DEFAULT_PRODUCT_STATUS: &str = "active";
