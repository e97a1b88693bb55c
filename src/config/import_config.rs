// ==========================================
// 商品目录批量导入系统 - 导入配置读取
// ==========================================
// 职责: 定义导入模块所需的配置读取接口及 rusqlite 实现
// 存储: import_config_kv 表 + spec_key_catalog 表
// 红线: 不包含配置写入之外的业务逻辑
// ==========================================

use crate::db;
use crate::domain::catalog::default_status_values;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager(从 SQLite 读取)
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取已注册的型号规格键目录(schema-on-read 白名单)
    ///
    /// # 默认值
    /// - 空集合(全部规格键产生 INFO 级未注册提示)
    async fn get_registered_spec_keys(&self) -> RepositoryResult<HashSet<String>>;

    /// 获取商品状态枚举值
    ///
    /// # 默认值
    /// - ["active", "inactive", "discontinued"]
    async fn get_status_values(&self) -> RepositoryResult<Vec<String>>;
}

// ==========================================
// ConfigManager - rusqlite 实现
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        db::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 基于共享连接创建(测试及同库多组件场景)
    pub fn from_shared(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 注册规格键(幂等)
    pub fn register_spec_key(&self, key: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        conn.execute(
            "INSERT OR IGNORE INTO spec_key_catalog (spec_key) VALUES (?1)",
            params![key],
        )?;
        Ok(())
    }

    /// 读取单个配置值
    pub fn get_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let value = conn
            .query_row(
                "SELECT value FROM import_config_kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_registered_spec_keys(&self) -> RepositoryResult<HashSet<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let mut stmt = conn.prepare("SELECT spec_key FROM spec_key_catalog")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = HashSet::new();
        for row in rows {
            keys.insert(row?);
        }
        Ok(keys)
    }

    async fn get_status_values(&self) -> RepositoryResult<Vec<String>> {
        // 逗号分隔的枚举值,未配置时使用默认集合
        match self.get_value("status_values")? {
            Some(raw) => Ok(raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()),
            None => Ok(default_status_values()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        ConfigManager::from_shared(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_spec_key_registration() {
        let config = memory_config();
        config.register_spec_key("Color").unwrap();
        config.register_spec_key("Color").unwrap(); // 幂等

        let keys = config.get_registered_spec_keys().await.unwrap();
        assert!(keys.contains("Color"));
        assert_eq!(keys.len(), 1);
    }

    #[tokio::test]
    async fn test_status_values_default_and_override() {
        let config = memory_config();
        let values = config.get_status_values().await.unwrap();
        assert_eq!(values, default_status_values());

        {
            let conn = config.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO import_config_kv (key, value) VALUES ('status_values', 'active, preorder')",
                [],
            )
            .unwrap();
        }
        let values = config.get_status_values().await.unwrap();
        assert_eq!(values, vec!["active".to_string(), "preorder".to_string()]);
    }
}
