// ==========================================
// 钱币收藏管理 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 解析错误 / 映射校验错误 / 前置条件错误 / 提交错误 / 状态机错误
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

// ==========================================
// ParseError - 文件解析错误（对会话致命，需重新选择文件）
// ==========================================
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("文件格式不支持: {0}（仅支持 .csv/.xlsx/.json）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {path}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV 解析失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel 解析失败: {0}")]
    Excel(#[from] calamine::XlsxError),

    #[error("Excel 文件无工作表")]
    NoWorksheet,

    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON 格式无效: {0}")]
    InvalidJsonShape(String),

    #[error("文件无表头")]
    MissingHeader,

    #[error("文件无数据行")]
    NoDataRows,
}

/// 未映射的必填字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    pub name: String,
    pub label: String,
}

fn join_labels(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(|f| format!("{} is required", f.label))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 解析错误 =====
    #[error(transparent)]
    Parse(#[from] ParseError),

    // ===== 映射错误（可恢复，映射界面保持打开）=====
    #[error("必填字段未映射: {}", join_labels(.0))]
    MissingRequiredFields(Vec<MissingField>),

    #[error("未知字段: {0}")]
    UnknownField(String),

    #[error("源文件中不存在列: {0}")]
    UnknownColumn(String),

    // ===== 前置条件错误 =====
    #[error("尚未创建收藏集，无法开始导入")]
    NoCollection,

    // ===== 提交错误（可恢复，会话状态保持不变）=====
    #[error("批量写入被拒绝: {0}")]
    CommitRejected(#[source] RepositoryError),

    // ===== 状态机错误 =====
    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 每个缺失必填字段对应的提示文本（"{label} is required"）
    pub fn missing_field_messages(&self) -> Vec<String> {
        match self {
            ImportError::MissingRequiredFields(fields) => {
                fields.iter().map(|f| format!("{} is required", f.label)).collect()
            }
            _ => Vec::new(),
        }
    }

    /// 是否可在当前阶段内恢复（不需要重新选择文件）
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ImportError::MissingRequiredFields(_)
                | ImportError::UnknownField(_)
                | ImportError::UnknownColumn(_)
                | ImportError::CommitRejected(_)
        )
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_per_field() {
        let err = ImportError::MissingRequiredFields(vec![
            MissingField {
                name: "denomination".into(),
                label: "Denomination".into(),
            },
            MissingField {
                name: "year".into(),
                label: "Year".into(),
            },
        ]);

        assert_eq!(
            err.missing_field_messages(),
            vec!["Denomination is required", "Year is required"]
        );
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("Year is required"));
    }

    #[test]
    fn test_parse_error_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ImportError::from(ParseError::FileRead {
            path: "coins.csv".into(),
            source: io,
        });

        assert!(!err.is_recoverable());
        // transparent: source 链直接指向 io::Error
        assert!(err.source().is_some());
    }
}
