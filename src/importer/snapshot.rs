// ==========================================
// 商品目录批量导入系统 - 快照存储
// ==========================================
// 职责: 校验通过的原始字节的内容寻址持久化
// 红线:
// - 快照不可变;相同内容(同哈希)只存一份,重复上传直接复用
// - 提交永远从快照读取,与校验时刻解耦、可重放
// ==========================================

use crate::domain::import::SnapshotRef;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::import_job_repo::ImportJobRepository;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// 计算内容哈希(SHA-256 十六进制小写)
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

// ==========================================
// SnapshotStore
// ==========================================
pub struct SnapshotStore<'a> {
    job_repo: &'a dyn ImportJobRepository,
}

impl<'a> SnapshotStore<'a> {
    pub fn new(job_repo: &'a dyn ImportJobRepository) -> Self {
        Self { job_repo }
    }

    /// 持久化校验输入并返回快照引用
    pub async fn persist(&self, bytes: &[u8]) -> ImportResult<SnapshotRef> {
        let hash = content_hash(bytes);
        let inserted = self.job_repo.put_snapshot(&hash, bytes).await?;
        if inserted {
            info!(hash = %hash, bytes = bytes.len(), "快照已持久化");
        } else {
            debug!(hash = %hash, "相同内容快照已存在,复用");
        }
        Ok(SnapshotRef {
            artifact_ref: format!("import_snapshot/{}", hash),
            content_hash: hash,
            byte_len: bytes.len(),
            reused: !inserted,
        })
    }

    /// 按哈希读取快照字节(提交阶段唯一的输入来源)
    pub async fn load(&self, content_hash: &str, job_id: &str) -> ImportResult<Vec<u8>> {
        self.job_repo
            .get_snapshot(content_hash)
            .await?
            .ok_or_else(|| ImportError::SnapshotMissing(job_id.to_string()))
    }
}
