//! 数据库迁移模块
//!
//! 管理 SQLite 数据库的版本迁移。每个迁移在独立事务中执行，
//! 迁移记录存储在 schema_migrations 表中。

use rusqlite::{params, Connection};

use crate::storage::{StorageError, StorageResult};

/// 当前数据库 schema 版本
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// 初始化 schema SQL (V1)
const INIT_SCHEMA: &str = include_str!("schema.sql");

/// 迁移记录
#[derive(Debug, Clone)]
pub struct Migration {
    /// 迁移版本号
    pub version: i32,
    /// 迁移名称/描述
    pub name: &'static str,
    /// 迁移 SQL 语句
    pub sql: &'static str,
}

/// 获取所有迁移定义，按版本号排序
fn get_migrations() -> Vec<Migration> {
    vec![
        // V1: 初始表结构
        Migration {
            version: 1,
            name: "初始表结构",
            sql: INIT_SCHEMA,
        },
    ]
}

/// 运行所有未应用的迁移
pub fn run_migrations(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let applied: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    for migration in get_migrations() {
        if migration.version <= applied {
            continue;
        }

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql).map_err(|e| {
            StorageError::Migration(format!("迁移 V{} ({}) 失败: {}", migration.version, migration.name, e))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
    }

    Ok(())
}

/// 获取已应用的 schema 版本
pub fn current_version(conn: &Connection) -> StorageResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}
