// ==========================================
// 模板列约定测试
// ==========================================
// 测试目标: template() 输出与列约定逐列一致(版本化契约,测试强制)
// ==========================================

mod test_helpers;

use catalog_import::importer::columns::{
    PRODUCT_COLUMNS, SHEET_PRODUCTS, SHEET_REFERENCE, SHEET_VARIANTS, VARIANT_COLUMNS,
};
use catalog_import::importer::workbook::read_workbook;
use catalog_import::logging;
use test_helpers::*;

#[tokio::test]
async fn test_template_products_columns_exact_order() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = create_test_api(&db_path);

    let bytes = api.template().await.unwrap();
    let workbook = read_workbook(&bytes).unwrap();

    let products = workbook.sheet(SHEET_PRODUCTS).expect("模板应含 Products 表");
    let expected = [
        "Brand",
        "Category",
        "Series",
        "Product Name",
        "Product Slug",
        "Title (primary)",
        "Title (secondary)",
        "Status",
        "Is Featured",
        "Long Description",
        "General Features",
        "Short Specs",
        "Taxonomy",
    ];
    assert_eq!(products.rows[0], expected.map(|s| s.to_string()).to_vec());
    // 常量表与模板互相印证
    assert_eq!(PRODUCT_COLUMNS.len(), expected.len());
}

#[tokio::test]
async fn test_template_variants_fixed_columns() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = create_test_api(&db_path);

    let bytes = api.template().await.unwrap();
    let workbook = read_workbook(&bytes).unwrap();

    let variants = workbook.sheet(SHEET_VARIANTS).expect("模板应含 Variants 表");
    let expected = [
        "Product Slug",
        "Model Code",
        "Variant Name (primary)",
        "Variant Name (secondary)",
        "SKU",
        "Dimensions",
        "Weight",
        "List Price",
        "Stock Qty",
    ];
    assert_eq!(variants.rows[0], expected.map(|s| s.to_string()).to_vec());
    assert_eq!(VARIANT_COLUMNS.len(), expected.len());
}

#[tokio::test]
async fn test_template_reference_lists_enumerated_values() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        let (category_id, _brand, _series) = seed_basic_catalog(&conn).unwrap();
        seed_category(&conn, Some(category_id), "drills", "Drills", 2).unwrap();
    }
    let api = create_test_api(&db_path);

    let bytes = api.template().await.unwrap();
    let workbook = read_workbook(&bytes).unwrap();
    let reference = workbook.sheet(SHEET_REFERENCE).expect("模板应含 Reference 表");

    let has_row = |kind: &str, value: &str| {
        reference
            .rows
            .iter()
            .skip(1)
            .any(|row| row[0] == kind && row[1] == value)
    };
    assert!(has_row("brand", "acme"));
    assert!(has_row("category", "tools"));
    assert!(has_row("category", "tools/drills"));
    assert!(has_row("series", "tools/basic"));
    assert!(has_row("status", "active"));
}

#[tokio::test]
async fn test_template_is_directly_validatable() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = create_test_api(&db_path);

    // 空模板回灌校验: 结构合法,零数据行
    let bytes = api.template().await.unwrap();
    let response = api
        .validate(&bytes, catalog_import::domain::types::ImportMode::Strict)
        .await
        .unwrap();
    assert_eq!(response.report.counts.total_product_rows, 0);
    assert_eq!(response.report.counts.total_variant_rows, 0);
}
