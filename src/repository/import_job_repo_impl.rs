// ==========================================
// 商品目录批量导入系统 - 导入作业仓储实现
// ==========================================
// 职责: 实现作业与快照数据访问(使用 rusqlite)
// ==========================================

use crate::db;
use crate::domain::import::{ImportJob, ImportReport};
use crate::domain::types::{ImportMode, JobKind, JobStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_job_repo::ImportJobRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// ImportJobRepositoryImpl
// ==========================================
pub struct ImportJobRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ImportJobRepositoryImpl {
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

/// 行 → ImportJob
fn map_job_row(
    job_id: String,
    kind: String,
    mode: String,
    status: String,
    report_json: String,
    snapshot_hash: Option<String>,
    error_count: i64,
    warning_count: i64,
    created_at: String,
    updated_at: String,
) -> RepositoryResult<ImportJob> {
    let parse_ts = |field: &str, raw: &str| -> RepositoryResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| RepositoryError::FieldValueError {
                field: field.to_string(),
                message: e.to_string(),
            })
    };
    let report: ImportReport = serde_json::from_str(&report_json)?;
    Ok(ImportJob {
        kind: JobKind::parse(&kind).ok_or_else(|| RepositoryError::FieldValueError {
            field: "kind".to_string(),
            message: format!("未知作业类型: {}", kind),
        })?,
        mode: ImportMode::parse(&mode).ok_or_else(|| RepositoryError::FieldValueError {
            field: "mode".to_string(),
            message: format!("未知导入模式: {}", mode),
        })?,
        status: JobStatus::parse(&status).ok_or_else(|| RepositoryError::FieldValueError {
            field: "status".to_string(),
            message: format!("未知作业状态: {}", status),
        })?,
        report,
        snapshot_hash,
        error_count: error_count as usize,
        warning_count: warning_count as usize,
        created_at: parse_ts("created_at", &created_at)?,
        updated_at: parse_ts("updated_at", &updated_at)?,
        job_id,
    })
}

type JobRowTuple = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    i64,
    i64,
    String,
    String,
);

fn job_row_tuple(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRowTuple> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

const JOB_COLUMNS: &str = "job_id, kind, mode, status, report_json, snapshot_hash, \
                           error_count, warning_count, created_at, updated_at";

#[async_trait]
impl ImportJobRepository for ImportJobRepositoryImpl {
    async fn insert_job(&self, job: &ImportJob) -> RepositoryResult<()> {
        let conn = self.lock_conn()?;
        let report_json = serde_json::to_string(&job.report)?;
        conn.execute(
            "INSERT INTO import_job (job_id, kind, mode, status, report_json, snapshot_hash,
             error_count, warning_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.job_id,
                job.kind.as_str(),
                job.mode.to_string(),
                job.status.as_str(),
                report_json,
                job.snapshot_hash,
                job.error_count as i64,
                job.warning_count as i64,
                job.created_at.to_rfc3339(),
                job.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn update_job(&self, job: &ImportJob) -> RepositoryResult<()> {
        let conn = self.lock_conn()?;
        let report_json = serde_json::to_string(&job.report)?;
        let changed = conn.execute(
            "UPDATE import_job SET status = ?1, report_json = ?2, snapshot_hash = ?3,
             error_count = ?4, warning_count = ?5, updated_at = ?6
             WHERE job_id = ?7",
            params![
                job.status.as_str(),
                report_json,
                job.snapshot_hash,
                job.error_count as i64,
                job.warning_count as i64,
                Utc::now().to_rfc3339(),
                job.job_id,
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ImportJob".to_string(),
                key: job.job_id.clone(),
            });
        }
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> RepositoryResult<Option<ImportJob>> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM import_job WHERE job_id = ?1", JOB_COLUMNS),
                params![job_id],
                job_row_tuple,
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((
                job_id,
                kind,
                mode,
                status,
                report_json,
                snapshot_hash,
                error_count,
                warning_count,
                created_at,
                updated_at,
            )) => Ok(Some(map_job_row(
                job_id,
                kind,
                mode,
                status,
                report_json,
                snapshot_hash,
                error_count,
                warning_count,
                created_at,
                updated_at,
            )?)),
        }
    }

    async fn try_mark_committing(&self, job_id: &str) -> RepositoryResult<bool> {
        let conn = self.lock_conn()?;
        // 状态 CAS: 只有可提交状态的作业能进入 COMMITTING,
        // 并发的第二个提交在此拿到 changed = 0 而被拒绝
        let changed = conn.execute(
            "UPDATE import_job SET status = ?1, updated_at = ?2
             WHERE job_id = ?3 AND status IN (?4, ?5)",
            params![
                JobStatus::Committing.as_str(),
                Utc::now().to_rfc3339(),
                job_id,
                JobStatus::ValidationPassed.as_str(),
                JobStatus::ValidationWarnings.as_str(),
            ],
        )?;
        debug!(job_id = %job_id, acquired = changed == 1, "提交状态 CAS");
        Ok(changed == 1)
    }

    async fn recent_jobs(&self, limit: usize) -> RepositoryResult<Vec<ImportJob>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM import_job ORDER BY created_at DESC LIMIT ?1",
            JOB_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit as i64], job_row_tuple)?;
        let mut out = Vec::new();
        for row in rows {
            let (
                job_id,
                kind,
                mode,
                status,
                report_json,
                snapshot_hash,
                error_count,
                warning_count,
                created_at,
                updated_at,
            ) = row?;
            out.push(map_job_row(
                job_id,
                kind,
                mode,
                status,
                report_json,
                snapshot_hash,
                error_count,
                warning_count,
                created_at,
                updated_at,
            )?);
        }
        Ok(out)
    }

    async fn put_snapshot(&self, content_hash: &str, content: &[u8]) -> RepositoryResult<bool> {
        let conn = self.lock_conn()?;
        // 内容寻址: 相同哈希的制品只存一份,重复提交直接复用
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO import_snapshot (content_hash, content, byte_len, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                content_hash,
                content,
                content.len() as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(inserted == 1)
    }

    async fn get_snapshot(&self, content_hash: &str) -> RepositoryResult<Option<Vec<u8>>> {
        let conn = self.lock_conn()?;
        let content: Option<Vec<u8>> = conn
            .query_row(
                "SELECT content FROM import_snapshot WHERE content_hash = ?1",
                params![content_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content)
    }
}
