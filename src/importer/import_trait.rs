// ==========================================
// 钱币收藏管理 - 导入组件 Trait
// ==========================================
// 职责: 定义导入管道各阶段的组件接口（不包含实现）
// ==========================================

use crate::domain::table::{CellValue, ParsedTable};
use crate::importer::error::ParseError;
use chrono::NaiveDate;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser, ExcelParser, JsonParser
pub trait FileParser: Send + Sync {
    /// 将已读入内存的文件内容解析为统一表结构
    ///
    /// # 参数
    /// - bytes: 文件完整内容
    ///
    /// # 返回
    /// - Ok(ParsedTable): 表头 + 数据行（至少一行）
    /// - Err(ParseError): 内容损坏、无表头或无数据行
    fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedTable, ParseError>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 单元格值标准化接口（阶段 2）
// 实现者: DataCleanerImpl
pub trait DataCleaner: Send + Sync {
    /// 清洗文本字段（TRIM；空白 → None）
    fn clean_text(&self, value: &CellValue) -> Option<String>;

    /// 标准化年份
    ///
    /// # 规则
    /// - 整数 / 整数值浮点数 / 以数字开头的字符串 → 年份
    /// - 缺失、无法解析、< 1 或 > current_year → current_year
    fn normalize_year(&self, value: Option<&CellValue>, current_year: i32) -> i32;

    /// 标准化价格（无法解析 → None）
    fn normalize_price(&self, value: Option<&CellValue>) -> Option<f64>;

    /// 标准化日期（无法解析 / 缺失 → today）
    fn normalize_date(&self, value: Option<&CellValue>, today: NaiveDate) -> NaiveDate;
}
