// ==========================================
// 商品目录批量导入系统 - 导入流水线层
// ==========================================
// 职责: 两阶段批量导入(校验 → 快照 → 提交)
// 流程: 解码 → 规范化 → 引用解析 → 校验 → 快照
//       → [独立调用] 提交(依赖有序 upsert + 提交后验证) → 报告
// ==========================================

// 模块声明
pub mod columns;
pub mod commit;
pub mod error;
pub mod plan;
pub mod report;
pub mod resolution;
pub mod row_normalizer;
pub mod service;
pub mod snapshot;
pub mod taxonomy;
pub mod validation;
pub mod workbook;

// 重导出核心类型
pub use commit::CommitEngine;
pub use error::{ImportError, ImportResult};
pub use plan::{build_upsert_plan, PlanBuildOutcome};
pub use report::{reference_from_store, ReferenceData, ReportGenerator};
pub use resolution::{CategoryResolution, ResolutionContext, ResolutionFailure, ResolvedRef};
pub use row_normalizer::{NormalizedInput, RowNormalizer, EMPTY_SENTINELS};
pub use service::CatalogImportService;
pub use snapshot::{content_hash, SnapshotStore};
pub use taxonomy::{parse_category_path, slugify, PathSegment, TaxonomyParseError};
pub use validation::{derive_status, ValidationEngine, ValidationOutcome};
pub use workbook::{read_workbook, CsvBundleCodec, Sheet, SheetCodec, Workbook, XlsxSheetReader};
