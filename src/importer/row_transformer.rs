// ==========================================
// 钱币收藏管理 - 行转换器实现
// ==========================================
// 职责: 按已确认映射把每个源行转换为 CoinRecord
// 流程(单次纯函数): 空行判定 → 取值 → 类型标准化 → 默认值/标题合成 → 注入系统字段
// 红线: 单行异常只降级不失败；输出行数恒等于源数据行数
// ==========================================

use crate::domain::coin::CoinRecord;
use crate::domain::schema::field_names;
use crate::domain::table::{CellValue, ParsedTable};
use crate::importer::column_mapper::ColumnMapping;
use crate::importer::data_cleaner::DataCleaner as DataCleanerImpl;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_trait::DataCleaner;
use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, instrument};

/// 标题合成使用的源列（按表头名精确匹配）
pub mod title_columns {
    pub const TITLE: &str = "title";
    pub const SERIES: &str = "series";
    pub const REGION: &str = "region";
    pub const COUNTRY: &str = "country";
    pub const FEATURES: &str = "features";
}

pub const DEFAULT_PLACEHOLDER_TITLE_PREFIX: &str = "Untitled Coin";

pub const DEFAULT_CONTINENT_PLACEHOLDERS: &[&str] = &["Americas", "Europe", "Asia"];

const TITLE_SEPARATOR: &str = " - ";

// ==========================================
// TransformOptions - 可配置的合成规则
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
    pub placeholder_title_prefix: String,
    /// 地区列为这些占位值时不参与标题合成
    pub continent_placeholders: Vec<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            placeholder_title_prefix: DEFAULT_PLACEHOLDER_TITLE_PREFIX.to_string(),
            continent_placeholders: DEFAULT_CONTINENT_PLACEHOLDERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ==========================================
// TransformContext - 目标收藏集 + 转换时刻
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformContext {
    pub collection_id: String,
    /// 同一次转换内所有默认日期/占位年份都取自该值
    pub today: NaiveDate,
}

impl TransformContext {
    pub fn new(collection_id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            collection_id: collection_id.into(),
            today,
        }
    }

    /// 以本地当前日期构造
    pub fn for_today(collection_id: impl Into<String>) -> Self {
        Self::new(collection_id, chrono::Local::now().date_naive())
    }

    fn current_year(&self) -> i32 {
        self.today.year()
    }
}

// ==========================================
// RowTransformer
// ==========================================
pub struct RowTransformer {
    options: TransformOptions,
    cleaner: Box<dyn DataCleaner>,
}

impl Default for RowTransformer {
    fn default() -> Self {
        Self::new(TransformOptions::default())
    }
}

impl RowTransformer {
    pub fn new(options: TransformOptions) -> Self {
        Self::with_cleaner(options, Box::new(DataCleanerImpl))
    }

    pub fn with_cleaner(options: TransformOptions, cleaner: Box<dyn DataCleaner>) -> Self {
        Self { options, cleaner }
    }

    /// 转换整张表
    ///
    /// # 返回
    /// - Ok(Vec<CoinRecord>): 与 table.rows 一一对应（空行生成占位记录）
    /// - Err(NoCollection): 未提供目标收藏集
    #[instrument(skip_all, fields(rows = table.row_count()))]
    pub fn transform(
        &self,
        table: &ParsedTable,
        mapping: &ColumnMapping,
        context: Option<&TransformContext>,
    ) -> ImportResult<Vec<CoinRecord>> {
        let context = context.ok_or(ImportError::NoCollection)?;

        if !mapping.is_mapped(field_names::PURCHASE_DATE) {
            debug!(today = %context.today, "未映射购买日期列，统一使用当天日期");
        }

        let records: Vec<CoinRecord> = table
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| self.transform_row(table, mapping, row, idx + 1, context))
            .collect();

        info!(
            total = records.len(),
            collection_id = %context.collection_id,
            "行转换完成"
        );
        Ok(records)
    }

    /// 单行转换（row_number 从 1 开始）
    pub fn transform_row(
        &self,
        table: &ParsedTable,
        mapping: &ColumnMapping,
        row: &[CellValue],
        row_number: usize,
        context: &TransformContext,
    ) -> CoinRecord {
        let current_year = context.current_year();

        if ParsedTable::is_empty_row(row) {
            debug!(row_number, "空行，使用占位记录");
            return CoinRecord::placeholder(
                &context.collection_id,
                &self.options.placeholder_title_prefix,
                row_number,
                context.today,
                current_year,
            );
        }

        let mapped = |field: &str| mapping.get(field).and_then(|column| table.cell(row, column));
        let text = |field: &str| mapped(field).and_then(|v| self.cleaner.clean_text(v));

        let year_cell = mapped(field_names::YEAR);
        let year = self.cleaner.normalize_year(year_cell, current_year);
        if year_cell.and_then(|v| v.to_text()).is_some_and(|raw| raw != year.to_string()) {
            debug!(row_number, year, "年份无效或超出范围，使用当年占位");
        }

        let purchase_date = if mapping.is_mapped(field_names::PURCHASE_DATE) {
            self.cleaner
                .normalize_date(mapped(field_names::PURCHASE_DATE), context.today)
        } else {
            context.today
        };

        let purchase_price = mapped(field_names::PURCHASE_PRICE).and_then(|v| {
            let price = self.cleaner.normalize_price(Some(v));
            if price.is_none() && !v.is_blank() {
                debug!(row_number, raw = %v, "购买价格无法解析，置空");
            }
            price
        });

        CoinRecord {
            collection_id: context.collection_id.clone(),
            images: Vec::new(),
            title: self.resolve_title(table, row, year_cell),
            denomination: text(field_names::DENOMINATION),
            year,
            mint_mark: text(field_names::MINT_MARK),
            grade: text(field_names::GRADE),
            purchase_price,
            purchase_date,
            notes: text(field_names::NOTES),
        }
    }

    /// 标题: 源标题为非空字符串时取其 TRIM 值，否则合成
    fn resolve_title(
        &self,
        table: &ParsedTable,
        row: &[CellValue],
        year_cell: Option<&CellValue>,
    ) -> String {
        if let Some(title) = table
            .cell(row, title_columns::TITLE)
            .and_then(CellValue::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            return title.to_string();
        }

        let column_text = |column: &str| {
            table
                .cell(row, column)
                .and_then(CellValue::to_text)
                .filter(|t| !t.is_empty())
        };

        let region = column_text(title_columns::REGION).filter(|r| {
            !self
                .options
                .continent_placeholders
                .iter()
                .any(|placeholder| placeholder == r)
        });

        // 固定顺序: 年份 → 系列 → 地区 → 国家 → 特征
        let parts = [
            year_cell.and_then(CellValue::to_text).filter(|t| !t.is_empty()),
            column_text(title_columns::SERIES),
            region,
            column_text(title_columns::COUNTRY),
            column_text(title_columns::FEATURES),
        ];

        parts
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(TITLE_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::column_mapper::ColumnMapper;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn context() -> TransformContext {
        TransformContext::new("col-1", today())
    }

    fn table(columns: &[&str], rows: Vec<Vec<CellValue>>) -> ParsedTable {
        ParsedTable::new(columns.iter().map(|s| s.to_string()).collect(), rows)
    }

    fn auto_mapping(table: &ParsedTable) -> ColumnMapping {
        ColumnMapper::default().auto_map(&table.columns)
    }

    #[test]
    fn test_title_synthesis_order() {
        let t = table(
            &["year", "denomination", "series", "country", "features", "region"],
            vec![vec![
                CellValue::Int(1964),
                CellValue::from("Quarter"),
                CellValue::from("State Quarter"),
                CellValue::from("USA"),
                CellValue::from("Error Coin"),
                CellValue::from("Colorado"),
            ]],
        );
        let records = RowTransformer::default()
            .transform(&t, &auto_mapping(&t), Some(&context()))
            .unwrap();

        assert_eq!(
            records[0].title,
            "1964 - State Quarter - Colorado - USA - Error Coin"
        );
    }

    #[test]
    fn test_title_skips_continent_region_and_blank_parts() {
        let t = table(
            &["year", "series", "region", "country"],
            vec![vec![
                CellValue::from("1999"),
                CellValue::from("  "),
                CellValue::from("Europe"),
                CellValue::from(" France "),
            ]],
        );
        let records = RowTransformer::default()
            .transform(&t, &auto_mapping(&t), Some(&context()))
            .unwrap();

        assert_eq!(records[0].title, "1999 - France");
    }

    #[test]
    fn test_title_column_wins_and_is_trimmed() {
        let t = table(
            &["title", "year", "series"],
            vec![
                vec![
                    CellValue::from("  Colorado Quarter "),
                    CellValue::Int(2006),
                    CellValue::from("State Quarter"),
                ],
                // 非字符串标题 → 合成
                vec![CellValue::Int(42), CellValue::Int(2007), CellValue::Null],
            ],
        );
        let records = RowTransformer::default()
            .transform(&t, &auto_mapping(&t), Some(&context()))
            .unwrap();

        assert_eq!(records[0].title, "Colorado Quarter");
        assert_eq!(records[1].title, "2007");
    }

    #[test]
    fn test_title_empty_when_nothing_available() {
        let t = table(&["denomination"], vec![vec![CellValue::from("Dime")]]);
        let records = RowTransformer::default()
            .transform(&t, &auto_mapping(&t), Some(&context()))
            .unwrap();

        assert_eq!(records[0].title, "");
    }

    #[test]
    fn test_empty_rows_become_placeholders() {
        let t = table(
            &["year", "denomination"],
            vec![
                vec![CellValue::Int(1964), CellValue::from("Quarter")],
                vec![CellValue::Null, CellValue::from("")],
                vec![],
            ],
        );
        let records = RowTransformer::default()
            .transform(&t, &auto_mapping(&t), Some(&context()))
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].title, "Untitled Coin 2");
        assert_eq!(records[2].title, "Untitled Coin 3");
        assert_eq!(records[1].year, 2026);
        assert_eq!(records[1].purchase_date, today());
        assert!(records[1].images.is_empty());
        assert_eq!(records[1].denomination, None);
    }

    #[test]
    fn test_values_trimmed_and_typed() {
        let t = table(
            &["Denom", "Yr", "mint_mark", "purchase_price", "Bought", "notes"],
            vec![vec![
                CellValue::from("  Half Dollar "),
                CellValue::from(" 1964 "),
                CellValue::from(" D "),
                CellValue::from("$12.50"),
                CellValue::from("2020/05/01"),
                CellValue::from("   "),
            ]],
        );
        let mapper = ColumnMapper::default();
        let mut mapping = mapper.auto_map(&t.columns);
        mapper.assign(&mut mapping, &t.columns, "denomination", "Denom").unwrap();
        mapper.assign(&mut mapping, &t.columns, "year", "Yr").unwrap();
        mapper.assign(&mut mapping, &t.columns, "purchase_date", "Bought").unwrap();

        let records = RowTransformer::default()
            .transform(&t, &mapping, Some(&context()))
            .unwrap();
        let r = &records[0];

        assert_eq!(r.denomination.as_deref(), Some("Half Dollar"));
        assert_eq!(r.year, 1964);
        assert_eq!(r.mint_mark.as_deref(), Some("D"));
        assert_eq!(r.purchase_price, Some(12.5));
        assert_eq!(r.purchase_date.to_string(), "2020-05-01");
        assert_eq!(r.notes, None);
        assert_eq!(r.collection_id, "col-1");
        assert!(r.images.is_empty());
        assert_eq!(r.grade, None);
    }

    #[test]
    fn test_unmapped_date_defaults_to_today() {
        let t = table(
            &["year", "denomination", "date"],
            vec![vec![
                CellValue::Int(1964),
                CellValue::from("Quarter"),
                CellValue::from("2001-01-01"),
            ]],
        );
        let records = RowTransformer::default()
            .transform(&t, &auto_mapping(&t), Some(&context()))
            .unwrap();

        assert_eq!(records[0].purchase_date.to_string(), "2026-10-18");
    }

    #[test]
    fn test_missing_context_is_error() {
        let t = table(&["year"], vec![vec![CellValue::Int(1964)]]);
        let result = RowTransformer::default().transform(&t, &auto_mapping(&t), None);
        assert!(matches!(result, Err(ImportError::NoCollection)));
    }

    #[test]
    fn test_transform_is_deterministic() {
        let t = table(
            &["year", "denomination", "series"],
            vec![
                vec![CellValue::Int(1964), CellValue::from("Quarter"), CellValue::from("Washington")],
                vec![CellValue::Null],
            ],
        );
        let mapping = auto_mapping(&t);
        let transformer = RowTransformer::default();

        let first = transformer.transform(&t, &mapping, Some(&context())).unwrap();
        let second = transformer.transform(&t, &mapping, Some(&context())).unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_custom_placeholder_prefix() {
        let options = TransformOptions {
            placeholder_title_prefix: "Unnamed".to_string(),
            continent_placeholders: vec!["Oceania".to_string()],
        };
        let t = table(
            &["year", "region"],
            vec![vec![CellValue::Null], vec![CellValue::Int(1990), CellValue::from("Oceania")]],
        );
        let records = RowTransformer::new(options)
            .transform(&t, &auto_mapping(&t), Some(&context()))
            .unwrap();

        assert_eq!(records[0].title, "Unnamed 1");
        assert_eq!(records[1].title, "1990");
    }
}
