// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、目录数据种子、工作簿构造
// ==========================================
#![allow(dead_code)]

use catalog_import::api::{ImportApi, Role, StaticRoleGuard};
use catalog_import::db;
use catalog_import::importer::columns::{
    PRODUCT_COLUMNS, SHEET_PRODUCTS, SHEET_VARIANTS, VARIANT_COLUMNS,
};
use catalog_import::importer::workbook::{CsvBundleCodec, Sheet, SheetCodec, Workbook};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件(需要保持存活)
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = db::open_sqlite_connection(&db_path)?;
    db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建具备目录管理员角色的测试 API
pub fn create_test_api(db_path: &str) -> ImportApi {
    ImportApi::new(
        db_path.to_string(),
        Box::new(StaticRoleGuard::new(Role::CatalogAdmin)),
    )
}

// ==========================================
// 目录数据种子
// ==========================================

pub fn seed_category(
    conn: &Connection,
    parent_id: Option<i64>,
    slug: &str,
    name: &str,
    depth: i32,
) -> Result<i64, Box<dyn Error>> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO category (parent_id, parent_key, slug, name, depth, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![parent_id, parent_id.unwrap_or(0), slug, name, depth, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn seed_brand(conn: &Connection, slug: &str, name: &str) -> Result<i64, Box<dyn Error>> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO brand (slug, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![slug, name, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn seed_series(
    conn: &Connection,
    category_id: i64,
    slug: &str,
    name: &str,
) -> Result<i64, Box<dyn Error>> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO series (category_id, slug, name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![category_id, slug, name, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn seed_product(
    conn: &Connection,
    slug: &str,
    title_primary: &str,
    brand_id: i64,
    category_id: i64,
    series_id: i64,
) -> Result<i64, Box<dyn Error>> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO product (slug, name, brand_id, category_id, series_id, title_primary,
         status, is_featured, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active', 0, ?7, ?7)",
        params![slug, title_primary, brand_id, category_id, series_id, title_primary, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn seed_variant(
    conn: &Connection,
    product_id: i64,
    model_code: &str,
    name_primary: &str,
) -> Result<i64, Box<dyn Error>> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO variant (product_id, model_code, name_primary, specs_json, created_at, updated_at)
         VALUES (?1, ?2, ?3, '{}', ?4, ?4)",
        params![product_id, model_code, name_primary, now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// 常用种子组合: 类目 tools + 品牌 acme + 系列 basic,返回 (category_id, brand_id, series_id)
pub fn seed_basic_catalog(conn: &Connection) -> Result<(i64, i64, i64), Box<dyn Error>> {
    let category_id = seed_category(conn, None, "tools", "Tools", 1)?;
    let brand_id = seed_brand(conn, "acme", "Acme")?;
    let series_id = seed_series(conn, category_id, "basic", "Basic")?;
    Ok((category_id, brand_id, series_id))
}

// ==========================================
// 工作簿构造
// ==========================================

/// 商品行构造: 必填 6 字段 + 其余留空
pub fn product_row(
    brand: &str,
    category: &str,
    series: &str,
    name: &str,
    slug: &str,
    title: &str,
) -> Vec<String> {
    let mut cells = vec![String::new(); PRODUCT_COLUMNS.len()];
    cells[0] = brand.to_string();
    cells[1] = category.to_string();
    cells[2] = series.to_string();
    cells[3] = name.to_string();
    cells[4] = slug.to_string();
    cells[5] = title.to_string();
    cells
}

/// 型号行构造: 商品 slug + 型号编码 + 显示名(可空)
pub fn variant_row(product_slug: &str, model_code: &str, name: &str) -> Vec<String> {
    let mut cells = vec![String::new(); VARIANT_COLUMNS.len()];
    cells[0] = product_slug.to_string();
    cells[1] = model_code.to_string();
    cells[2] = name.to_string();
    cells
}

/// 构造双表工作簿字节(CSV 工作簿束)
pub fn workbook_bytes(
    product_rows: Vec<Vec<String>>,
    variant_rows: Vec<Vec<String>>,
) -> Vec<u8> {
    workbook_bytes_with_spec_columns(product_rows, &[], variant_rows)
}

/// 构造带开放 Spec:<key> 列的工作簿字节
pub fn workbook_bytes_with_spec_columns(
    product_rows: Vec<Vec<String>>,
    variant_extra_columns: &[&str],
    variant_rows: Vec<Vec<String>>,
) -> Vec<u8> {
    let mut workbook = Workbook::new();

    let mut products = Sheet::new(SHEET_PRODUCTS);
    products.rows.push(
        PRODUCT_COLUMNS
            .iter()
            .map(|c| c.canonical.to_string())
            .collect(),
    );
    products.rows.extend(product_rows);
    workbook.push_sheet(products);

    let mut variants = Sheet::new(SHEET_VARIANTS);
    let mut header: Vec<String> = VARIANT_COLUMNS
        .iter()
        .map(|c| c.canonical.to_string())
        .collect();
    header.extend(variant_extra_columns.iter().map(|s| s.to_string()));
    variants.rows.push(header);
    variants.rows.extend(variant_rows);
    workbook.push_sheet(variants);

    CsvBundleCodec.write(&workbook).expect("工作簿编码失败")
}
