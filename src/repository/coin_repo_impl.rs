// ==========================================
// 钱币收藏管理 - 钱币记录 Repository 实现
// ==========================================
// 职责: 实现 CoinRecordStore / CollectionProvider（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::{CoinRecord, Collection};
use crate::repository::coin_repo::{CoinRecordStore, CollectionProvider};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

// ==========================================
// SqliteCoinRepository
// ==========================================
pub struct SqliteCoinRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCoinRepository {
    /// 创建新的 Repository 实例（自动建表）
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

    /// 从已有连接创建仓储实例（调用方负责建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 共享连接（供 ConfigManager 复用）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在事务中批量插入钱币记录
    fn batch_insert_coins_tx(
        tx: &Transaction,
        collection_id: &str,
        records: &[CoinRecord],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO coins (
                id, collection_id, title, denomination, year, mint_mark, grade,
                purchase_price, purchase_date, notes, images, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12
            )
            "#,
        )?;

        let created_at = Utc::now();
        let mut count = 0;
        for record in records {
            let images = serde_json::to_string(&record.images)?;
            stmt.execute(params![
                Uuid::new_v4().to_string(),
                collection_id,
                record.title,
                record.denomination,
                record.year,
                record.mint_mark,
                record.grade,
                record.purchase_price,
                record.purchase_date,
                record.notes,
                images,
                created_at,
            ])?;
            count += 1;
        }

        Ok(count)
    }

    /// 创建收藏集
    ///
    /// # 参数
    /// - name: 名称（去除首尾空白后不得为空）
    /// - description: 描述（空白视为未填写）
    pub fn create_collection(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> RepositoryResult<Collection> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::ValidationError(
                "收藏集名称不能为空".to_string(),
            ));
        }

        let collection = Collection {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            created_at: Utc::now(),
        };

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO collections (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                collection.id,
                collection.name,
                collection.description,
                collection.created_at,
            ],
        )?;

        tracing::info!(collection_id = %collection.id, name = %collection.name, "收藏集已创建");
        Ok(collection)
    }

    /// 统计收藏集内钱币数量
    pub fn count_coins(&self, collection_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM coins WHERE collection_id = ?1",
            [collection_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 按插入顺序列出收藏集内钱币
    pub fn list_coins(&self, collection_id: &str) -> RepositoryResult<Vec<CoinRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT collection_id, images, title, denomination, year, mint_mark, grade,
                   purchase_price, purchase_date, notes
            FROM coins
            WHERE collection_id = ?1
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([collection_id], |row| {
            let images: String = row.get(1)?;
            let purchase_date: NaiveDate = row.get(8)?;
            Ok((
                images,
                CoinRecord {
                    collection_id: row.get(0)?,
                    images: Vec::new(),
                    title: row.get(2)?,
                    denomination: row.get(3)?,
                    year: row.get(4)?,
                    mint_mark: row.get(5)?,
                    grade: row.get(6)?,
                    purchase_price: row.get(7)?,
                    purchase_date,
                    notes: row.get(9)?,
                },
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (images, mut record) = row?;
            record.images = serde_json::from_str(&images)?;
            records.push(record);
        }
        Ok(records)
    }
}

fn map_collection_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Collection> {
    let created_at: DateTime<Utc> = row.get(3)?;
    Ok(Collection {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at,
    })
}

#[async_trait]
impl CoinRecordStore for SqliteCoinRepository {
    async fn create_many(
        &self,
        collection_id: &str,
        records: &[CoinRecord],
    ) -> RepositoryResult<usize> {
        if let Some(stray) = records.iter().find(|r| r.collection_id != collection_id) {
            return Err(RepositoryError::ValidationError(format!(
                "记录所属收藏集不一致: 期望 {}, 实际 {}",
                collection_id, stray.collection_id
            )));
        }

        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        // 任一行失败时 tx 在 drop 时回滚
        let count = Self::batch_insert_coins_tx(&tx, collection_id, records)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }
}

#[async_trait]
impl CollectionProvider for SqliteCoinRepository {
    async fn current_collection(&self) -> RepositoryResult<Option<Collection>> {
        let conn = self.get_conn()?;
        let collection = conn
            .query_row(
                r#"
                SELECT id, name, description, created_at
                FROM collections
                ORDER BY created_at DESC, rowid DESC
                LIMIT 1
                "#,
                [],
                map_collection_row,
            )
            .optional()?;
        Ok(collection)
    }
}
