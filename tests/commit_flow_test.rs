// ==========================================
// 提交流程集成测试
// ==========================================
// 测试目标: 提交引擎的事务语义、一次性提交、部分提交、提交后验证
// ==========================================

mod test_helpers;

use catalog_import::api::ApiError;
use catalog_import::domain::types::{ImportMode, JobStatus};
use catalog_import::logging;
use catalog_import::repository::{CatalogRepository, CatalogRepositoryImpl};
use test_helpers::*;

/// 各实体表记录数: (category, brand, series, product, variant)
async fn entity_counts(db_path: &str) -> (usize, usize, usize, usize, usize) {
    let repo = CatalogRepositoryImpl::new(db_path).unwrap();
    repo.entity_counts().await.unwrap()
}

#[tokio::test]
async fn test_smart_commit_creates_brand_then_product_with_verification() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        // 类目/系列存在,品牌 acme 缺失 → smart 候选
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        let category_id = seed_category(&conn, None, "tools", "Tools", 1).unwrap();
        seed_series(&conn, category_id, "basic", "Basic").unwrap();
    }
    let api = create_test_api(&db_path);

    let bytes = workbook_bytes(
        vec![product_row("acme", "tools", "basic", "Drill", "drill", "Drill X")],
        vec![],
    );
    let validated = api.validate(&bytes, ImportMode::Smart).await.unwrap();
    assert_eq!(validated.status, JobStatus::ValidationPassed);

    let committed = api.commit(&validated.job_id, false).await.unwrap();
    assert_eq!(committed.status, JobStatus::Success);
    assert_eq!(committed.counts.brands_created, 1);
    assert_eq!(committed.counts.products_created, 1);
    // 提交后验证: 声称创建的实体都能重新查到
    assert!(committed.db_verify.created_entities_found_in_db);

    // 先建品牌,再建引用它的商品 —— 两者都真实落库
    let repo = CatalogRepositoryImpl::new(&db_path).unwrap();
    let brand = repo.get_brand_by_slug("acme").await.unwrap().expect("品牌应已创建");
    let product = repo
        .get_product_by_slug("drill")
        .await
        .unwrap()
        .expect("商品应已创建");
    assert_eq!(product.brand_id, brand.brand_id);
}

#[tokio::test]
async fn test_variant_display_name_defaults_to_parent_title() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        seed_basic_catalog(&conn).unwrap();
    }
    let api = create_test_api(&db_path);

    // 型号 X1 未提供显示名 → 提交后回填父商品主标题
    let bytes = workbook_bytes(
        vec![product_row("acme", "tools", "basic", "Drill", "drill", "Drill X")],
        vec![variant_row("drill", "X1", "")],
    );
    let validated = api.validate(&bytes, ImportMode::Strict).await.unwrap();
    assert!(validated.status.is_commit_eligible());

    let committed = api.commit(&validated.job_id, false).await.unwrap();
    assert_eq!(committed.status, JobStatus::Success);

    let repo = CatalogRepositoryImpl::new(&db_path).unwrap();
    let variant = repo
        .get_variant_by_model_code("X1")
        .await
        .unwrap()
        .expect("型号应已创建");
    assert_eq!(variant.name_primary, "Drill X"); // 不是空字符串
}

#[tokio::test]
async fn test_all_or_nothing_rolls_back_everything() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        seed_basic_catalog(&conn).unwrap();
    }
    let api = create_test_api(&db_path);

    // 3 行商品,校验时全部有效
    let bytes = workbook_bytes(
        vec![
            product_row("acme", "tools", "basic", "Drill", "drill", "Drill X"),
            product_row("acme", "tools", "basic", "Saw", "saw", "Saw Y"),
            product_row("acme", "tools", "basic", "Hammer", "hammer", "Hammer Z"),
        ],
        vec![variant_row("drill", "DX-1", "标准版")],
    );
    let validated = api.validate(&bytes, ImportMode::Strict).await.unwrap();
    assert_eq!(validated.status, JobStatus::ValidationPassed);

    let before = entity_counts(&db_path).await;

    // 校验与提交之间品牌被删除(有意漂移): strict 重解析使 3 行全部失败
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        conn.execute("DELETE FROM brand WHERE slug = 'acme'", []).unwrap();
    }
    let before_commit = entity_counts(&db_path).await;
    assert_eq!(before_commit.1, before.1 - 1);

    let committed = api.commit(&validated.job_id, false).await.unwrap();
    assert_eq!(committed.status, JobStatus::Failed);

    // 全有或全无: 即使部分行本可成功,本次提交落库实体数为 0
    let after = entity_counts(&db_path).await;
    assert_eq!(after, before_commit);

    // 作业终态 FAILED
    let job = api.get_job(&validated.job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_allow_partial_commits_union_of_successful_rows() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        let (category_id, _brand, _series) = seed_basic_catalog(&conn).unwrap();
        seed_brand(&conn, "globex", "Globex").unwrap();
        seed_series(&conn, category_id, "pro", "Pro").unwrap();
    }
    let api = create_test_api(&db_path);

    let bytes = workbook_bytes(
        vec![
            product_row("acme", "tools", "basic", "Drill", "drill", "Drill X"),
            product_row("globex", "tools", "pro", "Saw", "saw", "Saw Y"),
        ],
        vec![
            variant_row("drill", "DX-1", "标准版"),
            variant_row("saw", "SX-1", "标准版"),
        ],
    );
    let validated = api.validate(&bytes, ImportMode::Strict).await.unwrap();
    assert_eq!(validated.status, JobStatus::ValidationPassed);

    // 漂移: 仅删除 globex 品牌 → saw 行失败,drill 行应照常落库
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        conn.execute("DELETE FROM brand WHERE slug = 'globex'", []).unwrap();
    }

    let committed = api.commit(&validated.job_id, true).await.unwrap();
    assert_eq!(committed.status, JobStatus::Partial);
    assert_eq!(committed.counts.products_created, 1);
    assert_eq!(committed.counts.variants_created, 1);
    assert!(committed.counts.rows_failed >= 2); // saw 商品行 + 其型号行

    let repo = CatalogRepositoryImpl::new(&db_path).unwrap();
    assert!(repo.get_product_by_slug("drill").await.unwrap().is_some());
    assert!(repo.get_product_by_slug("saw").await.unwrap().is_none());
    assert!(repo.get_variant_by_model_code("DX-1").await.unwrap().is_some());
    assert!(repo.get_variant_by_model_code("SX-1").await.unwrap().is_none());

    // 失败行可归因到具体行号
    let job = api.get_job(&validated.job_id).await.unwrap();
    assert!(job
        .report
        .row_failures
        .iter()
        .any(|f| f.sheet == "Products" && f.row == 2));
}

#[tokio::test]
async fn test_double_commit_rejected_without_duplicating_entities() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        seed_basic_catalog(&conn).unwrap();
    }
    let api = create_test_api(&db_path);

    let bytes = workbook_bytes(
        vec![product_row("acme", "tools", "basic", "Drill", "drill", "Drill X")],
        vec![variant_row("drill", "DX-1", "标准版")],
    );
    let validated = api.validate(&bytes, ImportMode::Strict).await.unwrap();

    let first = api.commit(&validated.job_id, false).await.unwrap();
    assert_eq!(first.status, JobStatus::Success);
    let counts_after_first = entity_counts(&db_path).await;

    // 重复提交被状态检查拒绝,实体数不变
    let second = api.commit(&validated.job_id, false).await;
    assert!(matches!(second, Err(ApiError::InvalidJobState(_))));
    assert_eq!(entity_counts(&db_path).await, counts_after_first);
}

#[tokio::test]
async fn test_commit_rejected_for_failed_validation_job() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = create_test_api(&db_path);

    // 缺品牌等必填 → 校验失败
    let bytes = workbook_bytes(
        vec![product_row("", "", "", "Drill", "drill", "Drill X")],
        vec![],
    );
    let validated = api.validate(&bytes, ImportMode::Strict).await.unwrap();
    assert_eq!(validated.status, JobStatus::FailedValidation);

    let result = api.commit(&validated.job_id, false).await;
    assert!(matches!(result, Err(ApiError::InvalidJobState(_))));
}

#[tokio::test]
async fn test_smart_commit_creates_category_chain_in_order() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        seed_category(&conn, None, "tools", "Tools", 1).unwrap();
        seed_brand(&conn, "acme", "Acme").unwrap();
    }
    let api = create_test_api(&db_path);

    // tools 存在,power-tools/drills 及系列 premium 全部待建
    let bytes = workbook_bytes(
        vec![product_row(
            "acme",
            "Tools/Power Tools/Drills",
            "Premium",
            "Drill",
            "drill",
            "Drill X",
        )],
        vec![],
    );
    let validated = api.validate(&bytes, ImportMode::Smart).await.unwrap();
    assert!(validated.status.is_commit_eligible());
    assert_eq!(validated.report.counts.categories_to_create, 2);
    assert_eq!(validated.report.counts.series_to_create, 1);

    let committed = api.commit(&validated.job_id, false).await.unwrap();
    assert_eq!(committed.status, JobStatus::Success);
    assert_eq!(committed.counts.categories_created, 2);
    assert_eq!(committed.counts.series_created, 1);
    assert!(committed.db_verify.created_entities_found_in_db);

    // 层级结构正确: tools → power-tools → drills,系列挂在叶子类目下
    let repo = CatalogRepositoryImpl::new(&db_path).unwrap();
    let tools = repo.get_category(None, "tools").await.unwrap().unwrap();
    let power_tools = repo
        .get_category(Some(tools.category_id), "power-tools")
        .await
        .unwrap()
        .expect("power-tools 应已创建");
    let drills = repo
        .get_category(Some(power_tools.category_id), "drills")
        .await
        .unwrap()
        .expect("drills 应已创建");
    assert_eq!(drills.depth, 3);
    assert!(repo
        .get_series(drills.category_id, "premium")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_commit_upsert_updates_existing_product_without_duplicate() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        let (category_id, brand_id, series_id) = seed_basic_catalog(&conn).unwrap();
        seed_product(&conn, "drill", "旧标题", brand_id, category_id, series_id).unwrap();
    }
    let api = create_test_api(&db_path);

    let bytes = workbook_bytes(
        vec![product_row("acme", "tools", "basic", "Drill", "drill", "新标题")],
        vec![],
    );
    let validated = api.validate(&bytes, ImportMode::Strict).await.unwrap();
    assert_eq!(validated.report.counts.products_to_update, 1);
    assert_eq!(validated.report.counts.products_to_create, 0);

    let committed = api.commit(&validated.job_id, false).await.unwrap();
    assert_eq!(committed.status, JobStatus::Success);
    assert_eq!(committed.counts.products_updated, 1);
    assert_eq!(committed.counts.products_created, 0);

    // 按键命中 → 更新而非重复创建
    let (_c, _b, _s, product_count, _v) = entity_counts(&db_path).await;
    assert_eq!(product_count, 1);
    let repo = CatalogRepositoryImpl::new(&db_path).unwrap();
    let product = repo.get_product_by_slug("drill").await.unwrap().unwrap();
    assert_eq!(product.title_primary, "新标题");
}
