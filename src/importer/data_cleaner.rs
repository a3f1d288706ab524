// ==========================================
// 钱币收藏管理 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 年份、价格、日期类型转换
// 原则: 单行数据异常只降级（占位 / 置空），不中断整批导入
// ==========================================

use crate::domain::table::CellValue;
use crate::importer::import_trait::DataCleaner as DataCleanerTrait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

/// Excel 日期序列号起点（1900 日期系统，已包含 1900-02-29 偏差）
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// 序列号上限（9999-12-31）
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &CellValue) -> Option<String> {
        value.to_text().filter(|v| !v.is_empty())
    }

    fn normalize_year(&self, value: Option<&CellValue>, current_year: i32) -> i32 {
        let parsed = match value {
            Some(CellValue::Int(v)) => i32::try_from(*v).ok(),
            Some(CellValue::Float(v)) if v.is_finite() => Some(v.trunc() as i32),
            Some(CellValue::String(s)) => parse_leading_int(s),
            _ => None,
        };

        match parsed {
            Some(year) if (1..=current_year).contains(&year) => year,
            _ => current_year,
        }
    }

    fn normalize_price(&self, value: Option<&CellValue>) -> Option<f64> {
        let price = match value? {
            CellValue::Int(v) => *v as f64,
            CellValue::Float(v) => *v,
            CellValue::String(s) => {
                let cleaned: String = s
                    .trim()
                    .trim_start_matches('$')
                    .chars()
                    .filter(|c| *c != ',')
                    .collect();
                cleaned.trim().parse::<f64>().ok()?
            }
            _ => return None,
        };

        price.is_finite().then_some(price)
    }

    fn normalize_date(&self, value: Option<&CellValue>, today: NaiveDate) -> NaiveDate {
        let parsed = match value {
            Some(CellValue::Int(v)) => parse_numeric_date(*v as f64),
            Some(CellValue::Float(v)) => parse_numeric_date(*v),
            Some(CellValue::String(s)) => parse_date_text(s.trim()),
            _ => None,
        };
        parsed.unwrap_or(today)
    }
}

/// 类似 parseInt: 读取开头的连续数字（"1964 D" → 1964）
fn parse_leading_int(value: &str) -> Option<i32> {
    let trimmed = value.trim();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i32>().ok()
}

/// 数值日期: YYYYMMDD 整数优先，其次 Excel 序列号
fn parse_numeric_date(value: f64) -> Option<NaiveDate> {
    if !value.is_finite() || value < 1.0 {
        return None;
    }

    if value.fract() == 0.0 && (10_000_101.0..=99_991_231.0).contains(&value) {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}", value as i64), "%Y%m%d") {
            return Some(date);
        }
    }

    if value > EXCEL_MAX_SERIAL {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_signed(Duration::days(value.trunc() as i64))
}

fn parse_date_text(value: &str) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
}
