// ==========================================
// 商品目录批量导入系统 - 配置层
// ==========================================
// 职责: 导入相关配置(规格键目录、状态枚举值)
// 存储: import_config_kv / spec_key_catalog 表
// ==========================================

pub mod import_config;

// 重导出核心配置管理器
pub use import_config::{ConfigManager, ImportConfigReader};
