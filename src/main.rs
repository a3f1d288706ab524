// ==========================================
// 钱币收藏管理 - 批量导入命令行入口
// ==========================================
// 流程: 解析文件 → 自动映射 + 覆写 → 校验 → 预览(JSON 行) → 可选提交
// ==========================================

use anyhow::{bail, Context, Result};
use clap::Parser;
use coin_collection_import::api::{ApiError, ImportApi};
use coin_collection_import::config::get_default_db_path;
use coin_collection_import::{logging, APP_NAME, VERSION};
use std::path::PathBuf;

/// 把 CSV / XLSX / JSON 表格导入钱币收藏集
#[derive(Debug, Parser)]
#[command(name = "coin-import", version, about)]
struct Args {
    /// 源文件（.csv / .xlsx / .json）
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// 数据库路径（默认读取 COIN_IMPORT_DB_PATH 或用户数据目录）
    #[arg(long, value_name = "PATH")]
    db: Option<String>,

    /// 覆写映射: 字段=源列（源列为空表示取消映射），可重复
    #[arg(long = "map", value_name = "FIELD=COLUMN", value_parser = parse_mapping)]
    mappings: Vec<(String, String)>,

    /// 预览显示的最少行数
    #[arg(long, value_name = "N")]
    show: Option<usize>,

    /// 确认后提交到收藏集（未指定时仅预览）
    #[arg(long)]
    commit: bool,

    /// 导入前创建收藏集
    #[arg(long, value_name = "NAME")]
    create_collection: Option<String>,

    /// 新收藏集描述
    #[arg(long, value_name = "TEXT", requires = "create_collection")]
    description: Option<String>,

    /// 以 JSON 格式输出日志
    #[arg(long)]
    log_json: bool,
}

fn parse_mapping(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, column)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), column.to_string()))
        }
        _ => Err(format!("映射格式应为 字段=源列: {}", raw)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    tracing::info!(version = VERSION, "{}", APP_NAME);

    let db_path = args.db.clone().unwrap_or_else(get_default_db_path);
    tracing::info!(db_path = %db_path, "使用数据库");

    let api = ImportApi::new(&db_path).with_context(|| format!("无法打开数据库: {}", db_path))?;

    if let Some(name) = args.create_collection.as_deref() {
        let collection = api.create_collection(name, args.description.as_deref())?;
        eprintln!("已创建收藏集: {} ({})", collection.name, collection.id);
    }

    let started = match api.start_import(&args.file).await {
        Ok(started) => started,
        Err(ApiError::NoCollection) => {
            bail!("尚未创建收藏集，请使用 --create-collection NAME 创建后再导入")
        }
        Err(e) => return Err(e.into()),
    };
    eprintln!(
        "已解析 {} 行，列: {}",
        started.row_count,
        started.columns.join(", ")
    );

    for (field, column) in &args.mappings {
        api.assign_mapping(field, column).await?;
    }

    let mut preview = match api.confirm_mapping().await {
        Ok(preview) => preview,
        Err(ApiError::MissingRequiredFields { messages }) => {
            for message in &messages {
                eprintln!("{}", message);
            }
            bail!("映射不完整，请使用 --map 字段=源列 补充");
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(wanted) = args.show {
        while preview.has_more && preview.visible.len() < wanted {
            preview = api.show_more().await?;
        }
    }

    for record in &preview.visible {
        println!("{}", serde_json::to_string(record)?);
    }
    eprintln!("预览 {}/{} 条", preview.visible.len(), preview.total);

    if !args.commit {
        api.cancel().await?;
        eprintln!("未指定 --commit，未写入任何记录");
        return Ok(());
    }

    let result = api.commit().await?;
    eprintln!(
        "已导入 {} 条记录到收藏集 {}（批次 {}，{} ms）",
        result.inserted_count, result.collection_id, result.batch_id, result.elapsed_ms
    );
    Ok(())
}
