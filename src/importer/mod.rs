// ==========================================
// 钱币收藏管理 - 导入层
// ==========================================
// 职责: 表格文件 → 映射 → 转换 → 预览 → 批量提交
// 支持: CSV, Excel(.xlsx), JSON
// ==========================================

// 模块声明
pub mod batch_committer;
pub mod column_mapper;
pub mod data_cleaner;
pub mod error;
pub mod file_parser;
pub mod import_trait;
pub mod preview;
pub mod row_transformer;
pub mod session;

// 重导出核心类型
pub use batch_committer::{BatchCommitter, CommitResult};
pub use column_mapper::{ColumnMapper, ColumnMapping};
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use error::{ImportError, ImportResult, MissingField, ParseError};
pub use file_parser::{CsvParser, ExcelParser, JsonParser, SourceFormat, UniversalFileParser};
pub use preview::ImportPreview;
pub use row_transformer::{RowTransformer, TransformContext, TransformOptions};
pub use session::{ImportSession, ImportStage, SessionOptions};

// 重导出 Trait 接口
pub use import_trait::{DataCleaner, FileParser};
