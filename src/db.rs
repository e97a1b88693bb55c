// ==========================================
// 商品目录批量导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为,避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 提供 schema 引导(幂等建表)
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout(毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等初始化全部表结构
///
/// 键约定(与目录存储的 upsert 键一一对应):
/// - category: UNIQUE(parent_key, slug) — parent_id 为 NULL 时 parent_key 归一为 0
/// - series:   UNIQUE(category_id, slug)
/// - brand:    UNIQUE(slug)
/// - product:  UNIQUE(slug)
/// - variant:  UNIQUE(model_code) — 全局唯一
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS category (
            category_id   INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_id     INTEGER REFERENCES category(category_id),
            -- SQLite 的 UNIQUE 对 NULL 不去重,根类目用 0 占位保证键唯一
            parent_key    INTEGER NOT NULL DEFAULT 0,
            slug          TEXT NOT NULL,
            name          TEXT NOT NULL,
            depth         INTEGER NOT NULL,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL,
            UNIQUE(parent_key, slug)
        );

        CREATE TABLE IF NOT EXISTS brand (
            brand_id      INTEGER PRIMARY KEY AUTOINCREMENT,
            slug          TEXT NOT NULL UNIQUE,
            name          TEXT NOT NULL,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS series (
            series_id     INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id   INTEGER NOT NULL REFERENCES category(category_id),
            slug          TEXT NOT NULL,
            name          TEXT NOT NULL,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL,
            UNIQUE(category_id, slug)
        );

        CREATE TABLE IF NOT EXISTS product (
            product_id        INTEGER PRIMARY KEY AUTOINCREMENT,
            slug              TEXT NOT NULL UNIQUE,
            name              TEXT NOT NULL,
            brand_id          INTEGER NOT NULL REFERENCES brand(brand_id),
            category_id       INTEGER NOT NULL REFERENCES category(category_id),
            series_id         INTEGER NOT NULL REFERENCES series(series_id),
            title_primary     TEXT NOT NULL,
            title_secondary   TEXT,
            status            TEXT NOT NULL,
            is_featured       INTEGER NOT NULL DEFAULT 0,
            long_description  TEXT,
            general_features  TEXT,
            short_specs       TEXT,
            taxonomy_tags     TEXT,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS variant (
            variant_id     INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id     INTEGER NOT NULL REFERENCES product(product_id),
            model_code     TEXT NOT NULL UNIQUE,
            name_primary   TEXT NOT NULL,
            name_secondary TEXT,
            sku            TEXT,
            dimensions     TEXT,
            weight         REAL,
            list_price     REAL,
            stock_qty      INTEGER,
            specs_json     TEXT NOT NULL DEFAULT '{}',
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS import_job (
            job_id         TEXT PRIMARY KEY,
            kind           TEXT NOT NULL,
            mode           TEXT NOT NULL,
            status         TEXT NOT NULL,
            report_json    TEXT NOT NULL,
            snapshot_hash  TEXT,
            error_count    INTEGER NOT NULL DEFAULT 0,
            warning_count  INTEGER NOT NULL DEFAULT 0,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS import_snapshot (
            content_hash  TEXT PRIMARY KEY,
            content       BLOB NOT NULL,
            byte_len      INTEGER NOT NULL,
            created_at    TEXT NOT NULL
        );

        -- 提交阶段层级创建的父范围悲观锁(advisory)
        CREATE TABLE IF NOT EXISTS scope_lock (
            scope_key    TEXT PRIMARY KEY,
            job_id       TEXT NOT NULL,
            acquired_at  TEXT NOT NULL
        );

        -- 已注册的型号规格键目录(schema-on-read 的白名单)
        CREATE TABLE IF NOT EXISTS spec_key_catalog (
            spec_key    TEXT PRIMARY KEY,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 导入配置 KV(状态枚举值等)
        CREATE TABLE IF NOT EXISTS import_config_kv (
            key         TEXT PRIMARY KEY,
            value       TEXT NOT NULL,
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;
    Ok(())
}
