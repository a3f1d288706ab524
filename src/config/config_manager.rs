// ==========================================
// 钱币收藏管理 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::importer::preview::{DEFAULT_PAGE_INCREMENT, DEFAULT_PAGE_SIZE};
use crate::importer::row_transformer::{
    DEFAULT_CONTINENT_PLACEHOLDERS, DEFAULT_PLACEHOLDER_TITLE_PREFIX,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::debug!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取正整数配置，非法值回退默认
    fn get_positive_usize(&self, key: &str, default: usize) -> RepositoryResult<usize> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => {
                tracing::warn!(config_key = key, raw_value = %value, default, "配置值非法，使用默认值");
                Ok(default)
            }
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_preview_page_size(&self) -> RepositoryResult<usize> {
        self.get_positive_usize(config_keys::PREVIEW_PAGE_SIZE, DEFAULT_PAGE_SIZE)
    }

    async fn get_preview_increment(&self) -> RepositoryResult<usize> {
        self.get_positive_usize(config_keys::PREVIEW_INCREMENT, DEFAULT_PAGE_INCREMENT)
    }

    async fn get_placeholder_title_prefix(&self) -> RepositoryResult<String> {
        let value = self.get_config_or_default(
            config_keys::PLACEHOLDER_TITLE_PREFIX,
            DEFAULT_PLACEHOLDER_TITLE_PREFIX,
        )?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok(DEFAULT_PLACEHOLDER_TITLE_PREFIX.to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }

    async fn get_continent_placeholders(&self) -> RepositoryResult<Vec<String>> {
        let defaults = || {
            DEFAULT_CONTINENT_PLACEHOLDERS
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        };

        let Some(value) = self.get_global_config_value(config_keys::CONTINENT_PLACEHOLDERS)?
        else {
            return Ok(defaults());
        };

        match serde_json::from_str::<Vec<String>>(&value) {
            Ok(list) => Ok(list),
            Err(e) => {
                tracing::warn!(
                    config_key = config_keys::CONTINENT_PLACEHOLDERS,
                    raw_value = %value,
                    error = %e,
                    "洲级占位配置格式错误，使用默认配置"
                );
                Ok(defaults())
            }
        }
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 COIN_IMPORT_DB_PATH（非空时）
/// - 用户数据目录/coin-collection/coins.db
/// - 无法获取数据目录时: ./coins.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./coins.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("coin-collection");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("coins.db");
        }
    }

    path.to_string_lossy().to_string()
}

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "COIN_IMPORT_DB_PATH";

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 预览
    pub const PREVIEW_PAGE_SIZE: &str = "import.preview_page_size";
    pub const PREVIEW_INCREMENT: &str = "import.preview_increment";

    // 标题合成
    pub const PLACEHOLDER_TITLE_PREFIX: &str = "import.placeholder_title_prefix";
    pub const CONTINENT_PLACEHOLDERS: &str = "import.continent_placeholders"; // JSON 数组
}
