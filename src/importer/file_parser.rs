// ==========================================
// 钱币收藏管理 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析
// 支持: CSV (.csv) / Excel (.xlsx，仅第一个工作表) / JSON (.json，对象数组)
// ==========================================

use crate::domain::table::{CellValue, ParsedTable};
use crate::importer::error::ParseError;
use crate::importer::import_trait::FileParser;
use calamine::{Data, Reader, Xlsx};
use csv::{ReaderBuilder, StringRecord};
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, instrument};

/// 支持的文件类型（由扩展名判定）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
    Json,
}

impl SourceFormat {
    /// 根据文件名扩展名判定类型（大小写不敏感）
    pub fn from_file_name(file_name: &str) -> Result<Self, ParseError> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xlsx" => Ok(SourceFormat::Xlsx),
            "json" => Ok(SourceFormat::Json),
            _ => Err(ParseError::UnsupportedFormat(ext)),
        }
    }
}

/// 校验至少一行数据后构造 ParsedTable
fn finish_table(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<ParsedTable, ParseError> {
    if columns.is_empty() {
        return Err(ParseError::MissingHeader);
    }
    if rows.is_empty() {
        return Err(ParseError::NoDataRows);
    }
    Ok(ParsedTable::new(columns, rows))
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedTable, ParseError> {
        // 表头按普通记录读取，保留原样（不去空白、不去重）
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        let mut record = StringRecord::new();
        if !reader.read_record(&mut record)? {
            return Err(ParseError::MissingHeader);
        }
        let columns: Vec<String> = record.iter().map(|h| h.to_string()).collect();
        let mut next_line = record_start_line(&reader, &record, bytes) + embedded_newlines(&record) + 1;

        // csv 会跳过完全空白的行；按行号补回，保证数据行与源文件行一一对应
        let mut rows = Vec::new();
        while reader.read_record(&mut record)? {
            let start_line = record_start_line(&reader, &record, bytes);
            for _ in next_line..start_line {
                rows.push(vec![CellValue::String(String::new())]);
            }
            rows.push(
                record
                    .iter()
                    .map(|value| CellValue::String(value.to_string()))
                    .collect(),
            );
            next_line = start_line + embedded_newlines(&record) + 1;
        }

        finish_table(columns, rows)
    }
}

/// 引号字段内部的换行数（多行字段仍算一行记录）
fn embedded_newlines(record: &StringRecord) -> u64 {
    record
        .iter()
        .map(|field| field.bytes().filter(|b| *b == b'\n').count() as u64)
        .sum()
}

/// 刚读完的记录在源文件中的起始行号（从 1 开始）
///
/// 读取器的行号计到已消费的最后一个 `\n`；记录以 `\n` 结束时需回退一行，
/// 以 `\r` 结束（CRLF 的 `\n` 尚未消费）或到达文件末尾时不回退。
fn record_start_line(reader: &csv::Reader<&[u8]>, record: &StringRecord, bytes: &[u8]) -> u64 {
    let position = reader.position();
    let consumed = position.byte() as usize;
    let ended_with_newline = consumed > 0 && bytes.get(consumed - 1) == Some(&b'\n');
    position
        .line()
        .saturating_sub(embedded_newlines(record))
        .saturating_sub(ended_with_newline as u64)
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

/// calamine 单元格 → CellValue（数值保持数值类型）
pub fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::Int(v) => CellValue::Int(*v),
        Data::Float(v) => CellValue::Float(*v),
        Data::Bool(v) => CellValue::Bool(*v),
        Data::String(v) => CellValue::String(v.clone()),
        // 日期单元格保留序列号，交给日期标准化处理
        Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
        Data::DateTimeIso(v) | Data::DurationIso(v) => CellValue::String(v.clone()),
        Data::Error(e) => CellValue::String(e.to_string()),
    }
}

impl FileParser for ExcelParser {
    fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedTable, ParseError> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(ParseError::NoWorksheet)?;
        let range = workbook.worksheet_range(&sheet_name)?;
        debug!(sheet = %sheet_name, "读取工作表");

        // 提取表头（第一行）
        let mut rows_iter = range.rows();
        let header_row = rows_iter.next().ok_or(ParseError::MissingHeader)?;
        let columns: Vec<String> = header_row.iter().map(|cell| cell.to_string()).collect();

        let rows = rows_iter
            .map(|row| row.iter().map(cell_from_data).collect())
            .collect();

        finish_table(columns, rows)
    }
}

// ==========================================
// JSON Parser 实现
// ==========================================
pub struct JsonParser;

fn cell_from_json(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Bool(v) => CellValue::Bool(*v),
        Value::Number(n) => match n.as_i64() {
            Some(i) => CellValue::Int(i),
            None => n.as_f64().map(CellValue::Float).unwrap_or(CellValue::Null),
        },
        Value::String(s) => CellValue::String(s.clone()),
        // 嵌套结构保留为紧凑 JSON 文本
        nested => CellValue::String(nested.to_string()),
    }
}

impl FileParser for JsonParser {
    fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedTable, ParseError> {
        let value: Value = serde_json::from_slice(bytes)?;

        let items = match value {
            Value::Array(items) if !items.is_empty() => items,
            _ => {
                return Err(ParseError::InvalidJsonShape(
                    "需要非空的对象数组".to_string(),
                ))
            }
        };

        // 表头取第一个对象的键（保留插入顺序）
        let columns: Vec<String> = match &items[0] {
            Value::Object(first) => first.keys().cloned().collect(),
            _ => {
                return Err(ParseError::InvalidJsonShape(
                    "数组元素必须是对象".to_string(),
                ))
            }
        };

        let mut rows = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let object = item.as_object().ok_or_else(|| {
                ParseError::InvalidJsonShape(format!("第 {} 个元素不是对象", idx + 1))
            })?;
            rows.push(
                columns
                    .iter()
                    .map(|key| object.get(key).map(cell_from_json).unwrap_or(CellValue::Null))
                    .collect(),
            );
        }

        finish_table(columns, rows)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 读取并解析文件（扩展名不支持时不读取文件）
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub async fn parse<P: AsRef<Path>>(&self, file_path: P) -> Result<ParsedTable, ParseError> {
        let path = file_path.as_ref();
        let file_name = path.to_string_lossy().to_string();
        let format = SourceFormat::from_file_name(&file_name)?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ParseError::FileRead {
                path: file_name.clone(),
                source,
            })?;

        let table = self.parse_format(format, &bytes)?;
        info!(
            columns = table.columns.len(),
            rows = table.row_count(),
            "文件解析完成"
        );
        Ok(table)
    }

    /// 解析已上传到内存的文件（按文件名判定类型）
    pub fn parse_upload(&self, file_name: &str, bytes: &[u8]) -> Result<ParsedTable, ParseError> {
        let format = SourceFormat::from_file_name(file_name)?;
        self.parse_format(format, bytes)
    }

    fn parse_format(&self, format: SourceFormat, bytes: &[u8]) -> Result<ParsedTable, ParseError> {
        match format {
            SourceFormat::Csv => CsvParser.parse_bytes(bytes),
            SourceFormat::Xlsx => ExcelParser.parse_bytes(bytes),
            SourceFormat::Json => JsonParser.parse_bytes(bytes),
        }
    }
}
