// ==========================================
// 校验流程集成测试
// ==========================================
// 测试目标: 校验阶段的幂等性、模式语义、空值哨兵、作业级失败
// ==========================================

mod test_helpers;

use catalog_import::domain::types::{CandidateType, ImportMode, JobStatus};
use catalog_import::logging;
use test_helpers::*;

#[tokio::test]
async fn test_validate_idempotent_same_bytes() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().expect("建库失败");
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        seed_basic_catalog(&conn).unwrap();
    }
    let api = create_test_api(&db_path);

    let bytes = workbook_bytes(
        vec![product_row("Acme", "Tools", "Basic", "Drill", "drill", "Drill X")],
        vec![variant_row("drill", "DX-1", "标准版")],
    );

    let first = api.validate(&bytes, ImportMode::Strict).await.unwrap();
    let second = api.validate(&bytes, ImportMode::Strict).await.unwrap();

    // 相同字节 → 相同问题/统计/快照哈希
    assert_eq!(first.report.issues.len(), second.report.issues.len());
    assert_eq!(first.report.counts, second.report.counts);
    let first_hash = first.report.snapshot.as_ref().unwrap().content_hash.clone();
    let second_snapshot = second.report.snapshot.as_ref().unwrap();
    assert_eq!(first_hash, second_snapshot.content_hash);
    // 第二次校验复用已持久化的快照制品
    assert!(second_snapshot.reused);
    // 作业各自独立(审计保留)
    assert_ne!(first.job_id, second.job_id);
}

#[tokio::test]
async fn test_scenario_strict_brand_not_found() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        // 类目与系列存在,品牌 acme 不存在
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        let category_id = seed_category(&conn, None, "tools", "Tools", 1).unwrap();
        seed_series(&conn, category_id, "basic", "Basic").unwrap();
    }
    let api = create_test_api(&db_path);

    let bytes = workbook_bytes(
        vec![product_row("acme", "tools", "basic", "Drill", "drill", "Drill X")],
        vec![],
    );
    let response = api.validate(&bytes, ImportMode::Strict).await.unwrap();

    assert_eq!(response.status, JobStatus::FailedValidation);
    assert!(response
        .report
        .issues
        .iter()
        .any(|i| i.code == "brand_not_found" && i.row == 1));
    // 校验失败的作业不留快照
    assert!(response.report.snapshot.is_none());
}

#[tokio::test]
async fn test_scenario_smart_brand_becomes_candidate() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        let category_id = seed_category(&conn, None, "tools", "Tools", 1).unwrap();
        seed_series(&conn, category_id, "basic", "Basic").unwrap();
    }
    let api = create_test_api(&db_path);

    let bytes = workbook_bytes(
        vec![
            product_row("acme", "tools", "basic", "Drill", "drill", "Drill X"),
            product_row("acme", "tools", "basic", "Saw", "saw", "Saw Y"),
        ],
        vec![],
    );
    let response = api.validate(&bytes, ImportMode::Smart).await.unwrap();

    assert_eq!(response.status, JobStatus::ValidationPassed);
    // 同一缺失品牌只报一个候选,行号累积
    let brand_candidates: Vec<_> = response
        .report
        .candidates
        .iter()
        .filter(|c| c.candidate_type == CandidateType::Brand)
        .collect();
    assert_eq!(brand_candidates.len(), 1);
    assert_eq!(brand_candidates[0].slug, "acme");
    assert_eq!(brand_candidates[0].rows, vec![1, 2]);
    // 候选不是问题: 没有 error 级 Issue
    assert_eq!(response.report.counts.error_rows, 0);
    assert_eq!(response.report.counts.brands_to_create, 1);
    assert_eq!(response.report.counts.products_to_create, 2);
}

#[tokio::test]
async fn test_empty_sentinels_treated_as_absent_before_required_checks() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        seed_basic_catalog(&conn).unwrap();
    }
    let api = create_test_api(&db_path);

    // 品牌列分别用各哨兵值填充,必须一律判为必填缺失
    for sentinel in ["", "-", "N/A", "null", "NaN", "none", "UNDEFINED"] {
        let bytes = workbook_bytes(
            vec![product_row(sentinel, "tools", "basic", "Drill", "drill", "Drill X")],
            vec![],
        );
        let response = api.validate(&bytes, ImportMode::Smart).await.unwrap();
        assert_eq!(
            response.status,
            JobStatus::FailedValidation,
            "哨兵 {:?} 未被归一为缺失",
            sentinel
        );
        assert!(
            response
                .report
                .issues
                .iter()
                .any(|i| i.code == "required_field_missing" && i.column.as_deref() == Some("Brand")),
            "哨兵 {:?} 应产生必填缺失问题",
            sentinel
        );
    }
}

#[tokio::test]
async fn test_category_depth_bound_in_both_modes() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        seed_basic_catalog(&conn).unwrap();
    }
    let api = create_test_api(&db_path);

    let bytes = workbook_bytes(
        vec![product_row("acme", "a/b/c/d", "basic", "Drill", "drill", "Drill X")],
        vec![],
    );
    // 4 级路径在两种模式下都是硬错误
    for mode in [ImportMode::Strict, ImportMode::Smart] {
        let response = api.validate(&bytes, mode).await.unwrap();
        assert_eq!(response.status, JobStatus::FailedValidation);
        assert!(response
            .report
            .issues
            .iter()
            .any(|i| i.code == "taxonomy_path_too_deep"));
    }
}

#[tokio::test]
async fn test_mixed_delimiters_rejected() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = create_test_api(&db_path);

    let bytes = workbook_bytes(
        vec![product_row("acme", "a/b>c", "basic", "Drill", "drill", "Drill X")],
        vec![],
    );
    let response = api.validate(&bytes, ImportMode::Smart).await.unwrap();
    assert!(response
        .report
        .issues
        .iter()
        .any(|i| i.code == "taxonomy_mixed_delimiters"));
}

#[tokio::test]
async fn test_duplicate_model_code_within_file_is_hard_error() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        seed_basic_catalog(&conn).unwrap();
    }
    let api = create_test_api(&db_path);

    // 两个不同商品的型号共用 model_code → 第二行硬错误,与模式无关
    let bytes = workbook_bytes(
        vec![
            product_row("acme", "tools", "basic", "Drill", "drill", "Drill X"),
            product_row("acme", "tools", "basic", "Saw", "saw", "Saw Y"),
        ],
        vec![
            variant_row("drill", "X1", "甲"),
            variant_row("saw", "X1", "乙"),
        ],
    );
    for mode in [ImportMode::Strict, ImportMode::Smart] {
        let response = api.validate(&bytes, mode).await.unwrap();
        assert_eq!(response.status, JobStatus::FailedValidation);
        let duplicate_issues: Vec<_> = response
            .report
            .issues
            .iter()
            .filter(|i| i.code == "duplicate_model_code")
            .collect();
        assert_eq!(duplicate_issues.len(), 1);
        assert_eq!(duplicate_issues[0].row, 2);
    }
}

#[tokio::test]
async fn test_unreadable_input_creates_no_job() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = create_test_api(&db_path);

    // 既非 xlsx 又非工作簿束标记的内容 → 作业级失败
    let result = api.validate(b"garbage,not,a,workbook\n1,2,3\n", ImportMode::Strict).await;
    assert!(result.is_err());

    // 不得留下任何作业记录
    let jobs = api.recent_jobs(10).await.unwrap();
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn test_scoped_series_not_resolved_across_categories() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        // 系列 premium 只存在于类目 A 下
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        let category_a = seed_category(&conn, None, "cat-a", "Cat A", 1).unwrap();
        seed_category(&conn, None, "cat-b", "Cat B", 1).unwrap();
        seed_series(&conn, category_a, "premium", "Premium").unwrap();
        seed_brand(&conn, "acme", "Acme").unwrap();
    }
    let api = create_test_api(&db_path);

    // 行类目为 B: 绝不回退到 A 下的同名系列
    let bytes = workbook_bytes(
        vec![product_row("acme", "cat-b", "premium", "Drill", "drill", "Drill X")],
        vec![],
    );
    let strict = api.validate(&bytes, ImportMode::Strict).await.unwrap();
    assert_eq!(strict.status, JobStatus::FailedValidation);
    assert!(strict
        .report
        .issues
        .iter()
        .any(|i| i.code == "series_not_found"));

    // smart: 在 B 下生成候选,并警告跨类目覆写
    let smart = api.validate(&bytes, ImportMode::Smart).await.unwrap();
    assert_eq!(smart.status, JobStatus::ValidationWarnings);
    assert!(smart
        .report
        .issues
        .iter()
        .any(|i| i.code == "series_category_overridden"));
    let series_candidate = smart
        .report
        .candidates
        .iter()
        .find(|c| c.candidate_type == CandidateType::Series)
        .expect("应有系列候选");
    assert_eq!(series_candidate.parent_slug, Some("cat-b".to_string()));
}

#[tokio::test]
async fn test_unregistered_spec_key_is_info_only() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = catalog_import::db::open_sqlite_connection(&db_path).unwrap();
        seed_basic_catalog(&conn).unwrap();
        conn.execute(
            "INSERT INTO spec_key_catalog (spec_key) VALUES ('Color')",
            [],
        )
        .unwrap();
    }
    let api = create_test_api(&db_path);

    let mut variant = variant_row("drill", "DX-1", "标准版");
    variant.push("red".to_string()); // Spec:Color(已注册)
    variant.push("220V".to_string()); // Spec:Voltage(未注册)
    let bytes = workbook_bytes_with_spec_columns(
        vec![product_row("acme", "tools", "basic", "Drill", "drill", "Drill X")],
        &["Spec:Color", "Spec:Voltage"],
        vec![variant],
    );

    let response = api.validate(&bytes, ImportMode::Strict).await.unwrap();
    // 未注册规格键只产生 INFO,不影响状态
    assert_eq!(response.status, JobStatus::ValidationPassed);
    let spec_issues: Vec<_> = response
        .report
        .issues
        .iter()
        .filter(|i| i.code == "unregistered_spec_key")
        .collect();
    assert_eq!(spec_issues.len(), 1);
    assert_eq!(spec_issues[0].value.as_deref(), Some("Voltage"));
}
