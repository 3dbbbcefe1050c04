//! 单词记录数据库操作
//!
//! 提供 `WordStore` 契约在 rusqlite 上的实现。
//!
//! 支持两种使用方式：
//! 1. 使用 `Arc<Mutex<Connection>>` 进行线程安全操作
//! 2. 使用 `&Connection` 引用进行直接操作（适用于事务内操作）

use rusqlite::{params, Connection, ToSql};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::storage::models::{format_datetime, WordPatch, WordRecord, WordStats};
use crate::storage::{StorageError, StorageResult, WordStore};

const SELECT_COLUMNS: &str = "id, word, learned, ai_content, created_at, learned_at";

/// 单词记录仓库
pub struct WordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WordRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取连接锁
    fn get_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    // ============================================================
    // 内部实现方法（静态方法，接受 &Connection）
    // ============================================================

    /// 全表读取（内部实现）
    pub fn list_all_internal(conn: &Connection) -> StorageResult<Vec<WordRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM word_record ORDER BY id ASC");
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map([], |row| WordRecord::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// 按单词批量查询（内部实现）
    pub fn find_by_words_internal(
        conn: &Connection,
        candidates: &[String],
    ) -> StorageResult<Vec<WordRecord>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // 构建动态 IN 子句
        let placeholders: Vec<String> = candidates
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", i + 1))
            .collect();
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM word_record WHERE word IN ({}) ORDER BY id ASC",
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare(&sql)?;

        let params: Vec<&dyn ToSql> = candidates.iter().map(|s| s as &dyn ToSql).collect();
        let records = stmt
            .query_map(params.as_slice(), |row| WordRecord::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// 批量插入（内部实现），id 由存储层分配
    pub fn insert_many_internal(conn: &Connection, records: &[WordRecord]) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO word_record (word, learned, ai_content, created_at, learned_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;

            for record in records {
                let ai_content = record
                    .ai_content
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;

                stmt.execute(params![
                    record.word,
                    record.learned as i32,
                    ai_content,
                    format_datetime(record.created_at),
                    record.learned_at.map(format_datetime),
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    /// 部分字段更新（内部实现）
    pub fn update_fields_internal(
        conn: &Connection,
        id: i64,
        patch: &WordPatch,
    ) -> StorageResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut sets: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(learned) = patch.learned {
            values.push(Box::new(learned as i32));
            sets.push(format!("learned = ?{}", values.len()));
        }
        if let Some(learned_at) = &patch.learned_at {
            values.push(Box::new(learned_at.map(format_datetime)));
            sets.push(format!("learned_at = ?{}", values.len()));
        }
        if let Some(ai_content) = &patch.ai_content {
            let json = ai_content
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            values.push(Box::new(json));
            sets.push(format!("ai_content = ?{}", values.len()));
        }

        values.push(Box::new(id));
        let sql = format!(
            "UPDATE word_record SET {} WHERE id = ?{}",
            sets.join(", "),
            values.len()
        );

        let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, params.as_slice())?;

        Ok(())
    }

    /// 清空全部记录（内部实现）
    pub fn clear_all_internal(conn: &Connection) -> StorageResult<()> {
        conn.execute("DELETE FROM word_record", [])?;
        Ok(())
    }

    /// 统计总数与已掌握数（内部实现）
    pub fn count_stats_internal(conn: &Connection) -> StorageResult<WordStats> {
        let stats = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(learned), 0) FROM word_record",
            [],
            |row| {
                Ok(WordStats {
                    total: row.get(0)?,
                    learned: row.get(1)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// 未学习记录（内部实现）
    pub fn list_unlearned_internal(conn: &Connection) -> StorageResult<Vec<WordRecord>> {
        let sql =
            format!("SELECT {SELECT_COLUMNS} FROM word_record WHERE learned = 0 ORDER BY id ASC");
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map([], |row| WordRecord::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// 已掌握记录（内部实现），最近掌握的在前
    pub fn list_learned_internal(conn: &Connection) -> StorageResult<Vec<WordRecord>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM word_record WHERE learned = 1 ORDER BY learned_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map([], |row| WordRecord::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

impl WordStore for WordRepository {
    fn list_all(&self) -> StorageResult<Vec<WordRecord>> {
        let conn = self.get_conn()?;
        Self::list_all_internal(&conn)
    }

    fn find_by_words(&self, candidates: &[String]) -> StorageResult<Vec<WordRecord>> {
        let conn = self.get_conn()?;
        Self::find_by_words_internal(&conn, candidates)
    }

    fn insert_many(&self, records: &[WordRecord]) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::insert_many_internal(&conn, records)
    }

    fn update_fields(&self, id: i64, patch: &WordPatch) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::update_fields_internal(&conn, id, patch)
    }

    fn clear_all(&self) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::clear_all_internal(&conn)
    }

    fn count_stats(&self) -> StorageResult<WordStats> {
        let conn = self.get_conn()?;
        Self::count_stats_internal(&conn)
    }

    fn list_unlearned(&self) -> StorageResult<Vec<WordRecord>> {
        let conn = self.get_conn()?;
        Self::list_unlearned_internal(&conn)
    }

    fn list_learned(&self) -> StorageResult<Vec<WordRecord>> {
        let conn = self.get_conn()?;
        Self::list_learned_internal(&conn)
    }
}
