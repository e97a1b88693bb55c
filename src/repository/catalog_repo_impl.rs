// ==========================================
// 商品目录批量导入系统 - 目录仓储实现
// ==========================================
// 职责: 实现目录数据访问(使用 rusqlite)
// 红线: Repository 不含业务规则,只按计划机械执行 CRUD
// 并发: 提交在单个写事务内执行;层级创建前对父范围取 advisory 锁
// ==========================================

use crate::db;
use crate::domain::catalog::{Brand, Category, Product, Series, Variant};
use crate::domain::import::{CommitCounts, DbVerify, RowFailure};
use crate::domain::plan::{
    CreatedEntity, PlanApplication, PlanRef, ProductStep, UpsertPlan, VariantStep,
};
use crate::domain::types::EntityKind;
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

// ==========================================
// CatalogRepositoryImpl
// ==========================================
pub struct CatalogRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepositoryImpl {
    /// 创建新的 Repository 实例(打开连接并引导 schema)
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        db::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 基于共享连接创建(测试及同库多仓储场景)
    pub fn from_shared(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

/// rfc3339 → DateTime<Utc>
fn parse_ts(field: &str, raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: e.to_string(),
        })
}

/// category.parent_key 归一(NULL 根类目用 0 占位,保证 UNIQUE 生效)
fn parent_key_of(parent_id: Option<i64>) -> i64 {
    parent_id.unwrap_or(0)
}

// ==========================================
// 事务内的单步执行
// ==========================================

/// 取得父范围 advisory 锁(存在且持有者不同 → 锁冲突)
fn acquire_scope_lock(tx: &Transaction, scope_key: &str, job_id: &str) -> RepositoryResult<()> {
    let now = Utc::now().to_rfc3339();
    let inserted = tx.execute(
        "INSERT OR IGNORE INTO scope_lock (scope_key, job_id, acquired_at) VALUES (?1, ?2, ?3)",
        params![scope_key, job_id, now],
    )?;
    if inserted == 0 {
        let holder: String = tx.query_row(
            "SELECT job_id FROM scope_lock WHERE scope_key = ?1",
            params![scope_key],
            |row| row.get(0),
        )?;
        if holder != job_id {
            return Err(RepositoryError::ScopeLockHeld {
                scope: scope_key.to_string(),
                holder,
            });
        }
    }
    Ok(())
}

/// 类目 create-if-absent(锁定父范围后执行,返回 (id, 是否新建))
fn upsert_category(
    tx: &Transaction,
    job_id: &str,
    parent_id: Option<i64>,
    slug: &str,
    name: &str,
    depth: i32,
) -> RepositoryResult<(i64, bool)> {
    let parent_key = parent_key_of(parent_id);
    acquire_scope_lock(tx, &format!("category-parent:{}", parent_key), job_id)?;

    let existing: Option<i64> = tx
        .query_row(
            "SELECT category_id FROM category WHERE parent_key = ?1 AND slug = ?2",
            params![parent_key, slug],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok((id, false));
    }

    let now = Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO category (parent_id, parent_key, slug, name, depth, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![parent_id, parent_key, slug, name, depth, now],
    )?;
    Ok((tx.last_insert_rowid(), true))
}

/// 品牌 create-if-absent
fn upsert_brand(tx: &Transaction, slug: &str, name: &str) -> RepositoryResult<(i64, bool)> {
    let existing: Option<i64> = tx
        .query_row(
            "SELECT brand_id FROM brand WHERE slug = ?1",
            params![slug],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok((id, false));
    }
    let now = Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO brand (slug, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![slug, name, now],
    )?;
    Ok((tx.last_insert_rowid(), true))
}

/// 系列 create-if-absent(键永远含类目,红线: 无全局 slug 回退)
fn upsert_series(
    tx: &Transaction,
    category_id: i64,
    slug: &str,
    name: &str,
) -> RepositoryResult<(i64, bool)> {
    let existing: Option<i64> = tx
        .query_row(
            "SELECT series_id FROM series WHERE category_id = ?1 AND slug = ?2",
            params![category_id, slug],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok((id, false));
    }
    let now = Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO series (category_id, slug, name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![category_id, slug, name, now],
    )?;
    Ok((tx.last_insert_rowid(), true))
}

/// 商品 upsert(按 slug 命中则更新,未命中则创建)
fn upsert_product(
    tx: &Transaction,
    step: &ProductStep,
    brand_id: i64,
    category_id: i64,
    series_id: i64,
) -> RepositoryResult<(i64, bool)> {
    let existing: Option<i64> = tx
        .query_row(
            "SELECT product_id FROM product WHERE slug = ?1",
            params![step.slug],
            |row| row.get(0),
        )
        .optional()?;
    let now = Utc::now().to_rfc3339();

    if let Some(id) = existing {
        tx.execute(
            "UPDATE product SET name = ?1, brand_id = ?2, category_id = ?3, series_id = ?4,
             title_primary = ?5, title_secondary = ?6, status = ?7, is_featured = ?8,
             long_description = ?9, general_features = ?10, short_specs = ?11,
             taxonomy_tags = ?12, updated_at = ?13
             WHERE product_id = ?14",
            params![
                step.name,
                brand_id,
                category_id,
                series_id,
                step.title_primary,
                step.title_secondary,
                step.status,
                step.is_featured as i64,
                step.long_description,
                step.general_features,
                step.short_specs,
                step.taxonomy_tags,
                now,
                id,
            ],
        )?;
        return Ok((id, false));
    }

    tx.execute(
        "INSERT INTO product (slug, name, brand_id, category_id, series_id, title_primary,
         title_secondary, status, is_featured, long_description, general_features,
         short_specs, taxonomy_tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
        params![
            step.slug,
            step.name,
            brand_id,
            category_id,
            series_id,
            step.title_primary,
            step.title_secondary,
            step.status,
            step.is_featured as i64,
            step.long_description,
            step.general_features,
            step.short_specs,
            step.taxonomy_tags,
            now,
        ],
    )?;
    Ok((tx.last_insert_rowid(), true))
}

/// 型号 upsert(按 model_code 命中则更新;显示名缺省回填父商品主标题)
fn upsert_variant(
    tx: &Transaction,
    step: &VariantStep,
    product_id: i64,
) -> RepositoryResult<(i64, bool)> {
    // 默认继承规则: 行内未提供显示名时使用父商品主标题
    let name_primary = match &step.name_primary {
        Some(name) => name.clone(),
        None => tx.query_row(
            "SELECT title_primary FROM product WHERE product_id = ?1",
            params![product_id],
            |row| row.get(0),
        )?,
    };
    let specs_json = serde_json::to_string(&step.specs)?;
    let now = Utc::now().to_rfc3339();

    let existing: Option<(i64, i64)> = tx
        .query_row(
            "SELECT variant_id, product_id FROM variant WHERE model_code = ?1",
            params![step.model_code],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    if let Some((id, owner_product_id)) = existing {
        // model_code 全局唯一: 已归属其他商品时是硬错误,不得静默改挂
        if owner_product_id != product_id {
            return Err(RepositoryError::UniqueConstraintViolation(format!(
                "model_code {} 已归属其他商品 (product_id={})",
                step.model_code, owner_product_id
            )));
        }
        tx.execute(
            "UPDATE variant SET name_primary = ?1, name_secondary = ?2, sku = ?3,
             dimensions = ?4, weight = ?5, list_price = ?6, stock_qty = ?7,
             specs_json = ?8, updated_at = ?9
             WHERE variant_id = ?10",
            params![
                name_primary,
                step.name_secondary,
                step.sku,
                step.dimensions,
                step.weight,
                step.list_price,
                step.stock_qty,
                specs_json,
                now,
                id,
            ],
        )?;
        return Ok((id, false));
    }

    tx.execute(
        "INSERT INTO variant (product_id, model_code, name_primary, name_secondary, sku,
         dimensions, weight, list_price, stock_qty, specs_json, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            product_id,
            step.model_code,
            name_primary,
            step.name_secondary,
            step.sku,
            step.dimensions,
            step.weight,
            step.list_price,
            step.stock_qty,
            specs_json,
            now,
        ],
    )?;
    Ok((tx.last_insert_rowid(), true))
}

// ==========================================
// 计划执行器(事务内状态)
// ==========================================
struct PlanExecutor<'a> {
    tx: &'a Transaction<'a>,
    job_id: &'a str,
    allow_partial: bool,
    created_map: HashMap<String, i64>, // plan_key → 真实 id(同提交内可见性)
    failed_keys: HashSet<String>,      // 创建失败的 plan_key(级联使依赖行失败)
    counts: CommitCounts,
    created: Vec<CreatedEntity>,
    row_failures: Vec<RowFailure>,
}

impl<'a> PlanExecutor<'a> {
    /// 解析计划引用为真实 id(Pending 引用查 created_map)
    fn resolve_ref(&self, planref: &PlanRef) -> Result<i64, String> {
        match planref {
            PlanRef::Existing(id) => Ok(*id),
            PlanRef::Pending(key) => {
                if self.failed_keys.contains(key) {
                    return Err(format!("依赖的候选实体创建失败: {}", key));
                }
                self.created_map
                    .get(key)
                    .copied()
                    .ok_or_else(|| format!("候选实体尚未创建: {}", key))
            }
        }
    }

    /// 行级失败处理: allow_partial 记录后跳过,否则向上抛出整体回滚
    fn row_failed(
        &mut self,
        sheet: &str,
        row: usize,
        reason: String,
    ) -> RepositoryResult<()> {
        if self.allow_partial {
            warn!(sheet = sheet, row = row, reason = %reason, "行级提交失败,跳过");
            self.row_failures.push(RowFailure {
                sheet: sheet.to_string(),
                row,
                reason,
            });
            self.counts.rows_failed += 1;
            Ok(())
        } else {
            Err(RepositoryError::DatabaseTransactionError(format!(
                "行 {} 提交失败,整体回滚: {}",
                row, reason
            )))
        }
    }

    fn run(&mut self, plan: &UpsertPlan) -> RepositoryResult<()> {
        // === 第 1 层: 类目(父级先于子级) ===
        for step in &plan.categories {
            let parent_id = match &step.parent {
                None => None,
                Some(parent) => match self.resolve_ref(parent) {
                    Ok(id) => Some(id),
                    Err(reason) => {
                        self.failed_keys.insert(step.key.clone());
                        for row in &step.rows {
                            self.row_failed("Products", *row, reason.clone())?;
                        }
                        continue;
                    }
                },
            };
            match upsert_category(
                self.tx,
                self.job_id,
                parent_id,
                &step.slug,
                &step.name,
                step.depth,
            ) {
                Ok((id, inserted)) => {
                    self.created_map.insert(step.key.clone(), id);
                    if inserted {
                        self.counts.categories_created += 1;
                        self.created.push(CreatedEntity {
                            kind: EntityKind::Category,
                            key: step.key.clone(),
                            id,
                        });
                    }
                }
                Err(RepositoryError::ScopeLockHeld { scope, holder }) => {
                    // 锁冲突属于基础设施错误,不做行级降级
                    return Err(RepositoryError::ScopeLockHeld { scope, holder });
                }
                Err(e) => {
                    self.failed_keys.insert(step.key.clone());
                    for row in &step.rows {
                        self.row_failed("Products", *row, e.to_string())?;
                    }
                }
            }
        }

        // === 第 2 层: 品牌 ===
        for step in &plan.brands {
            match upsert_brand(self.tx, &step.slug, &step.name) {
                Ok((id, inserted)) => {
                    self.created_map.insert(step.key.clone(), id);
                    if inserted {
                        self.counts.brands_created += 1;
                        self.created.push(CreatedEntity {
                            kind: EntityKind::Brand,
                            key: step.slug.clone(),
                            id,
                        });
                    }
                }
                Err(e) => {
                    self.failed_keys.insert(step.key.clone());
                    for row in &step.rows {
                        self.row_failed("Products", *row, e.to_string())?;
                    }
                }
            }
        }

        // === 第 3 层: 系列(类目限定) ===
        for step in &plan.series {
            let category_id = match self.resolve_ref(&step.category) {
                Ok(id) => id,
                Err(reason) => {
                    self.failed_keys.insert(step.key.clone());
                    for row in &step.rows {
                        self.row_failed("Products", *row, reason.clone())?;
                    }
                    continue;
                }
            };
            match upsert_series(self.tx, category_id, &step.slug, &step.name) {
                Ok((id, inserted)) => {
                    self.created_map.insert(step.key.clone(), id);
                    if inserted {
                        self.counts.series_created += 1;
                        self.created.push(CreatedEntity {
                            kind: EntityKind::Series,
                            key: step.key.clone(),
                            id,
                        });
                    }
                }
                Err(e) => {
                    self.failed_keys.insert(step.key.clone());
                    for row in &step.rows {
                        self.row_failed("Products", *row, e.to_string())?;
                    }
                }
            }
        }

        // === 第 4 层: 商品 ===
        for step in &plan.products {
            let product_key = format!("PRODUCT:{}", step.slug);
            let refs = (
                self.resolve_ref(&step.brand),
                self.resolve_ref(&step.category),
                self.resolve_ref(&step.series),
            );
            let (brand_id, category_id, series_id) = match refs {
                (Ok(b), Ok(c), Ok(s)) => (b, c, s),
                (b, c, s) => {
                    let reason = [b.err(), c.err(), s.err()]
                        .into_iter()
                        .flatten()
                        .collect::<Vec<_>>()
                        .join("; ");
                    self.failed_keys.insert(product_key);
                    self.row_failed("Products", step.row, reason)?;
                    continue;
                }
            };
            match upsert_product(self.tx, step, brand_id, category_id, series_id) {
                Ok((id, inserted)) => {
                    self.created_map.insert(product_key, id);
                    if inserted {
                        self.counts.products_created += 1;
                        self.created.push(CreatedEntity {
                            kind: EntityKind::Product,
                            key: step.slug.clone(),
                            id,
                        });
                    } else {
                        self.counts.products_updated += 1;
                    }
                }
                Err(e) => {
                    self.failed_keys.insert(product_key);
                    self.row_failed("Products", step.row, e.to_string())?;
                }
            }
        }

        // === 第 5 层: 型号 ===
        for step in &plan.variants {
            let product_id = match self.resolve_ref(&step.product) {
                Ok(id) => id,
                Err(reason) => {
                    self.row_failed("Variants", step.row, reason)?;
                    continue;
                }
            };
            match upsert_variant(self.tx, step, product_id) {
                Ok((id, inserted)) => {
                    if inserted {
                        self.counts.variants_created += 1;
                        self.created.push(CreatedEntity {
                            kind: EntityKind::Variant,
                            key: step.model_code.clone(),
                            id,
                        });
                    } else {
                        self.counts.variants_updated += 1;
                    }
                }
                Err(e) => {
                    self.row_failed("Variants", step.row, e.to_string())?;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for CatalogRepositoryImpl {
    async fn load_categories(&self) -> RepositoryResult<Vec<Category>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT category_id, parent_id, slug, name, depth, created_at, updated_at
             FROM category ORDER BY category_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i32>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (category_id, parent_id, slug, name, depth, created_at, updated_at) = row?;
            out.push(Category {
                category_id,
                parent_id,
                slug,
                name,
                depth,
                created_at: parse_ts("created_at", &created_at)?,
                updated_at: parse_ts("updated_at", &updated_at)?,
            });
        }
        Ok(out)
    }

    async fn load_brands(&self) -> RepositoryResult<Vec<Brand>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT brand_id, slug, name, created_at, updated_at FROM brand ORDER BY brand_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (brand_id, slug, name, created_at, updated_at) = row?;
            out.push(Brand {
                brand_id,
                slug,
                name,
                created_at: parse_ts("created_at", &created_at)?,
                updated_at: parse_ts("updated_at", &updated_at)?,
            });
        }
        Ok(out)
    }

    async fn load_series(&self) -> RepositoryResult<Vec<Series>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT series_id, category_id, slug, name, created_at, updated_at
             FROM series ORDER BY series_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (series_id, category_id, slug, name, created_at, updated_at) = row?;
            out.push(Series {
                series_id,
                category_id,
                slug,
                name,
                created_at: parse_ts("created_at", &created_at)?,
                updated_at: parse_ts("updated_at", &updated_at)?,
            });
        }
        Ok(out)
    }

    async fn load_product_keys(&self) -> RepositoryResult<Vec<(i64, String, String)>> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT product_id, slug, title_primary FROM product ORDER BY product_id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    async fn load_variant_keys(&self) -> RepositoryResult<Vec<(i64, String, i64)>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare("SELECT variant_id, model_code, product_id FROM variant ORDER BY variant_id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    async fn apply_upsert_plan(
        &self,
        plan: &UpsertPlan,
        allow_partial: bool,
    ) -> RepositoryResult<PlanApplication> {
        let conn = self.lock_conn()?;
        let tx = conn.unchecked_transaction()?;

        debug!(
            job_id = %plan.job_id,
            steps = plan.step_count(),
            allow_partial = allow_partial,
            "开始执行 upsert 计划"
        );

        let mut executor = PlanExecutor {
            tx: &tx,
            job_id: &plan.job_id,
            allow_partial,
            created_map: HashMap::new(),
            failed_keys: HashSet::new(),
            counts: CommitCounts::default(),
            created: Vec::new(),
            row_failures: Vec::new(),
        };
        executor.run(plan)?;

        // 释放本作业取得的全部父范围锁(事务内)
        tx.execute(
            "DELETE FROM scope_lock WHERE job_id = ?1",
            params![plan.job_id],
        )?;

        let application = PlanApplication {
            counts: executor.counts,
            created: executor.created,
            row_failures: executor.row_failures,
        };
        tx.commit()?;
        Ok(application)
    }

    async fn verify_created(&self, created: &[CreatedEntity]) -> RepositoryResult<DbVerify> {
        let conn = self.lock_conn()?;
        let mut missing = Vec::new();

        for entity in created {
            // 按主键重新查库,绝不复用内存对象
            let (table, pk) = match entity.kind {
                EntityKind::Category => ("category", "category_id"),
                EntityKind::Brand => ("brand", "brand_id"),
                EntityKind::Series => ("series", "series_id"),
                EntityKind::Product => ("product", "product_id"),
                EntityKind::Variant => ("variant", "variant_id"),
            };
            let found: Option<i64> = conn
                .query_row(
                    &format!("SELECT {} FROM {} WHERE {} = ?1", pk, table, pk),
                    params![entity.id],
                    |row| row.get(0),
                )
                .optional()?;
            if found.is_none() {
                missing.push(format!("{}:{}", entity.kind, entity.key));
            }
        }

        Ok(DbVerify {
            created_entities_found_in_db: missing.is_empty(),
            missing_entities: missing,
        })
    }

    async fn get_category(
        &self,
        parent_id: Option<i64>,
        slug: &str,
    ) -> RepositoryResult<Option<Category>> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                "SELECT category_id, parent_id, slug, name, depth, created_at, updated_at
                 FROM category WHERE parent_key = ?1 AND slug = ?2",
                params![parent_key_of(parent_id), slug],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i32>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((category_id, parent_id, slug, name, depth, created_at, updated_at)) => {
                Ok(Some(Category {
                    category_id,
                    parent_id,
                    slug,
                    name,
                    depth,
                    created_at: parse_ts("created_at", &created_at)?,
                    updated_at: parse_ts("updated_at", &updated_at)?,
                }))
            }
        }
    }

    async fn get_brand_by_slug(&self, slug: &str) -> RepositoryResult<Option<Brand>> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                "SELECT brand_id, slug, name, created_at, updated_at FROM brand WHERE slug = ?1",
                params![slug],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((brand_id, slug, name, created_at, updated_at)) => Ok(Some(Brand {
                brand_id,
                slug,
                name,
                created_at: parse_ts("created_at", &created_at)?,
                updated_at: parse_ts("updated_at", &updated_at)?,
            })),
        }
    }

    async fn get_series(
        &self,
        category_id: i64,
        slug: &str,
    ) -> RepositoryResult<Option<Series>> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                "SELECT series_id, category_id, slug, name, created_at, updated_at
                 FROM series WHERE category_id = ?1 AND slug = ?2",
                params![category_id, slug],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((series_id, category_id, slug, name, created_at, updated_at)) => {
                Ok(Some(Series {
                    series_id,
                    category_id,
                    slug,
                    name,
                    created_at: parse_ts("created_at", &created_at)?,
                    updated_at: parse_ts("updated_at", &updated_at)?,
                }))
            }
        }
    }

    async fn get_product_by_slug(&self, slug: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                "SELECT product_id, slug, name, brand_id, category_id, series_id, title_primary,
                 title_secondary, status, is_featured, long_description, general_features,
                 short_specs, taxonomy_tags, created_at, updated_at
                 FROM product WHERE slug = ?1",
                params![slug],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, i64>(9)?,
                        row.get::<_, Option<String>>(10)?,
                        row.get::<_, Option<String>>(11)?,
                        row.get::<_, Option<String>>(12)?,
                        row.get::<_, Option<String>>(13)?,
                        row.get::<_, String>(14)?,
                        row.get::<_, String>(15)?,
                    ))
                },
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((
                product_id,
                slug,
                name,
                brand_id,
                category_id,
                series_id,
                title_primary,
                title_secondary,
                status,
                is_featured,
                long_description,
                general_features,
                short_specs,
                taxonomy_tags,
                created_at,
                updated_at,
            )) => Ok(Some(Product {
                product_id,
                slug,
                name,
                brand_id,
                category_id,
                series_id,
                title_primary,
                title_secondary,
                status,
                is_featured: is_featured != 0,
                long_description,
                general_features,
                short_specs,
                taxonomy_tags,
                created_at: parse_ts("created_at", &created_at)?,
                updated_at: parse_ts("updated_at", &updated_at)?,
            })),
        }
    }

    async fn get_variant_by_model_code(
        &self,
        model_code: &str,
    ) -> RepositoryResult<Option<Variant>> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                "SELECT variant_id, product_id, model_code, name_primary, name_secondary, sku,
                 dimensions, weight, list_price, stock_qty, specs_json, created_at, updated_at
                 FROM variant WHERE model_code = ?1",
                params![model_code],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, Option<f64>>(7)?,
                        row.get::<_, Option<f64>>(8)?,
                        row.get::<_, Option<i64>>(9)?,
                        row.get::<_, String>(10)?,
                        row.get::<_, String>(11)?,
                        row.get::<_, String>(12)?,
                    ))
                },
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((
                variant_id,
                product_id,
                model_code,
                name_primary,
                name_secondary,
                sku,
                dimensions,
                weight,
                list_price,
                stock_qty,
                specs_json,
                created_at,
                updated_at,
            )) => Ok(Some(Variant {
                variant_id,
                product_id,
                model_code,
                name_primary,
                name_secondary,
                sku,
                dimensions,
                weight,
                list_price,
                stock_qty,
                specs: serde_json::from_str(&specs_json)?,
                created_at: parse_ts("created_at", &created_at)?,
                updated_at: parse_ts("updated_at", &updated_at)?,
            })),
        }
    }

    async fn entity_counts(&self) -> RepositoryResult<(usize, usize, usize, usize, usize)> {
        let conn = self.lock_conn()?;
        let count = |table: &str| -> RepositoryResult<usize> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        };
        Ok((
            count("category")?,
            count("brand")?,
            count("series")?,
            count("product")?,
            count("variant")?,
        ))
    }
}
