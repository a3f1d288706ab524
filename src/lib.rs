// ==========================================
// 钱币收藏管理 - 批量导入核心库
// ==========================================
// 技术栈: Rust + SQLite
// 流程: 表格文件 → 列映射 → 行转换 → 预览 → 原子批量提交
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 导入流程接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{CellValue, CoinRecord, Collection, ParsedTable, COIN_SCHEMA};

// 导入
pub use importer::{
    BatchCommitter, ColumnMapper, ColumnMapping, ImportError, ImportPreview, ImportSession,
    ImportStage, RowTransformer, UniversalFileParser,
};

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "钱币收藏管理 - 批量导入";
