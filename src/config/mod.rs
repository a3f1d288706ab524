// ==========================================
// 钱币收藏管理 - 配置层
// ==========================================
// 职责: 导入配置管理（预览分页、占位标题、标题合成规则）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, get_default_db_path, ConfigManager};
pub use import_config_trait::ImportConfigReader;
