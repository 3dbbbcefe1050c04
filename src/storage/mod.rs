//! SQLite 本地存储模块
//!
//! 提供单词记录的本地持久化，支持：
//! - 词库的全表读取与按单词批量查询
//! - 批量插入与按 id 的部分字段更新
//! - 整库清空（备份/恢复流程使用）

// ============================================================
// 子模块声明
// ============================================================

pub mod migrations;
pub mod models;
pub mod word;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use migrations::run_migrations;
pub use models::{AiContent, WordPatch, WordRecord, WordStats};
pub use word::WordRepository;

// ============================================================
// 依赖导入
// ============================================================

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

// ============================================================
// 错误类型定义
// ============================================================

/// 存储模块错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("迁移错误: {0}")]
    Migration(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("锁获取失败: {0}")]
    LockError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// WordStore - 单词存储契约
// ============================================================

/// 单词存储契约
///
/// 各服务（导入、学习队列、备份）通过该 trait 注入存储依赖，
/// 测试可替换为内存数据库实现。每个调用自身是原子的，
/// 跨调用不提供事务保证。
pub trait WordStore: Send + Sync {
    /// 按插入顺序返回全部单词记录
    fn list_all(&self) -> StorageResult<Vec<WordRecord>>;

    /// 返回 `word` 命中候选集合的记录
    fn find_by_words(&self, candidates: &[String]) -> StorageResult<Vec<WordRecord>>;

    /// 批量插入记录，id 由存储层分配
    fn insert_many(&self, records: &[WordRecord]) -> StorageResult<()>;

    /// 按 id 更新部分字段，id 不存在时静默忽略
    fn update_fields(&self, id: i64, patch: &WordPatch) -> StorageResult<()>;

    /// 清空全部记录，不可恢复
    fn clear_all(&self) -> StorageResult<()>;

    /// 总数与已掌握数统计
    fn count_stats(&self) -> StorageResult<WordStats>;

    /// 未学习记录，按插入顺序
    fn list_unlearned(&self) -> StorageResult<Vec<WordRecord>>;

    /// 已掌握记录，按掌握时间倒序
    fn list_learned(&self) -> StorageResult<Vec<WordRecord>>;
}

// ============================================================
// DatabaseManager - 数据库连接管理器
// ============================================================

/// 数据库连接管理器
pub struct DatabaseManager {
    connection: Arc<Mutex<Connection>>,
    db_path: String,
}

impl DatabaseManager {
    /// 创建新的数据库管理器
    ///
    /// 自动启用 WAL 模式，并运行数据库迁移。
    pub fn new<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        let connection = Connection::open(&db_path)?;

        // WAL 模式提高并发读写性能
        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;

        let manager = Self {
            connection: Arc::new(Mutex::new(connection)),
            db_path: path_str,
        };

        manager.initialize()?;

        Ok(manager)
    }

    /// 创建内存数据库（用于测试）
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;

        connection.execute_batch("PRAGMA foreign_keys=ON;")?;

        let manager = Self {
            connection: Arc::new(Mutex::new(connection)),
            db_path: ":memory:".to_string(),
        };

        manager.initialize()?;

        Ok(manager)
    }

    /// 初始化数据库（运行迁移）
    pub fn initialize(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        migrations::run_migrations(&conn)?;
        Ok(())
    }

    /// 获取共享连接句柄
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.connection)
    }

    /// 获取数据库连接的锁
    pub fn get_connection(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// 获取数据库路径
    pub fn db_path(&self) -> &str {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_initializes_schema() {
        let db = DatabaseManager::in_memory().unwrap();
        let conn = db.get_connection().unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM word_record", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = DatabaseManager::in_memory().unwrap();
        // 重复初始化不应报错
        db.initialize().unwrap();
        db.initialize().unwrap();
    }
}
