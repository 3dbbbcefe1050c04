//! 备份与恢复
//!
//! 将整个词库序列化为带版本号的 JSON 文档，或将外部文档合并回
//! 词库。恢复是纯增量操作：跳过已存在的单词，从不覆盖、从不删除。

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::storage::models::WordRecord;
use crate::storage::{StorageError, StorageResult, WordStore};

/// 备份文档格式版本
pub const BACKUP_VERSION: &str = "1.0.0";

/// 备份文档：整个词库的快照容器
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "Utc::now")]
    pub export_date: DateTime<Utc>,
    pub words: Vec<WordRecord>,
}

fn default_version() -> String {
    BACKUP_VERSION.to_string()
}

/// 备份/恢复错误
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("无效的备份文件格式: {0}")]
    Format(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 恢复结果统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    /// 新插入的单词数
    pub imported: usize,
    /// 因已存在而跳过的单词数
    pub skipped: usize,
}

/// 备份服务
pub struct BackupService {
    store: Arc<dyn WordStore>,
}

impl BackupService {
    pub fn new(store: Arc<dyn WordStore>) -> Self {
        Self { store }
    }

    /// 导出全部数据为 JSON 文本，不过滤、不分页
    pub async fn export(&self) -> StorageResult<String> {
        let words = self.store.list_all()?;
        let document = BackupDocument {
            version: BACKUP_VERSION.to_string(),
            export_date: Utc::now(),
            words,
        };

        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// 从 JSON 文本恢复
    ///
    /// 已存在的单词全部跳过，其余记录保留原有字段批量插入，
    /// id 由存储层重新分配。
    pub async fn restore(&self, json: &str) -> Result<RestoreReport, BackupError> {
        let document: BackupDocument = serde_json::from_str(json)?;

        let existing = self.store.list_all()?;
        let mut present: HashSet<String> = existing.into_iter().map(|w| w.word).collect();

        let total = document.words.len();
        let new_records: Vec<WordRecord> = document
            .words
            .into_iter()
            .filter(|w| present.insert(w.word.clone()))
            .map(|mut w| {
                w.id = None;
                w
            })
            .collect();

        let imported = new_records.len();
        if imported > 0 {
            self.store.insert_many(&new_records)?;
        }

        info!(imported, skipped = total - imported, "恢复完成");

        Ok(RestoreReport {
            imported,
            skipped: total - imported,
        })
    }

    /// 清空所有记录，不可恢复
    ///
    /// 二次确认是调用方（展示层）的职责。
    pub async fn clear_all(&self) -> StorageResult<()> {
        self.store.clear_all()
    }
}

/// 备份文件名约定
pub fn backup_filename(date: NaiveDate) -> String {
    format!("zenvocab-backup-{}.json", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{AiContent, WordPatch};
    use crate::storage::{DatabaseManager, WordRepository};
    use chrono::Utc;

    fn setup_store() -> Arc<dyn WordStore> {
        let db = DatabaseManager::in_memory().unwrap();
        Arc::new(WordRepository::new(db.connection()))
    }

    fn seed(store: &Arc<dyn WordStore>, words: &[&str]) {
        let now = Utc::now();
        let records: Vec<WordRecord> = words.iter().map(|w| WordRecord::new(*w, now)).collect();
        store.insert_many(&records).unwrap();
    }

    #[tokio::test]
    async fn test_export_restore_roundtrip() {
        let source = setup_store();
        seed(&source, &["cat", "dog"]);

        // 给 cat 附加生成内容并标记掌握，验证字段完整保留
        let all = source.list_all().unwrap();
        let cat_id = all[0].id.unwrap();
        source
            .update_fields(
                cat_id,
                &WordPatch::set_ai_content(AiContent {
                    example: "The cat sat on the mat.".to_string(),
                    example_translation: "猫坐在垫子上。".to_string(),
                    mnemonic: "谐音\"凯特\"养了一只猫".to_string(),
                }),
            )
            .unwrap();
        source
            .update_fields(cat_id, &WordPatch::set_learned(true, Some(Utc::now())))
            .unwrap();

        let json = BackupService::new(Arc::clone(&source)).export().await.unwrap();

        // 文档结构符合约定
        let document: BackupDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(document.version, BACKUP_VERSION);
        assert_eq!(document.words.len(), 2);

        // 恢复到空词库
        let target = setup_store();
        let report = BackupService::new(Arc::clone(&target))
            .restore(&json)
            .await
            .unwrap();
        assert_eq!(
            report,
            RestoreReport {
                imported: 2,
                skipped: 0
            }
        );

        let expected = source.list_all().unwrap();
        let restored = target.list_all().unwrap();
        for (a, b) in expected.iter().zip(restored.iter()) {
            assert_eq!(a.word, b.word);
            assert_eq!(a.learned, b.learned);
            assert_eq!(a.ai_content, b.ai_content);
            assert_eq!(a.created_at, b.created_at);
            assert_eq!(a.learned_at, b.learned_at);
        }
    }

    #[tokio::test]
    async fn test_restore_full_overlap_imports_zero() {
        let store = setup_store();
        seed(&store, &["cat", "dog"]);
        let service = BackupService::new(Arc::clone(&store));

        let json = service.export().await.unwrap();
        let report = service.restore(&json).await.unwrap();
        assert_eq!(
            report,
            RestoreReport {
                imported: 0,
                skipped: 2
            }
        );
        assert_eq!(store.list_all().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_restore_is_additive_never_overwrites() {
        let store = setup_store();
        seed(&store, &["cat"]);
        let cat_id = store.list_all().unwrap()[0].id.unwrap();
        store
            .update_fields(cat_id, &WordPatch::set_learned(true, Some(Utc::now())))
            .unwrap();

        // 备份文档里的 cat 是未学习状态，恢复不得覆盖已有记录
        let json = r#"{
            "version": "1.0.0",
            "exportDate": "2025-01-01T00:00:00Z",
            "words": [
                { "word": "cat", "learned": false, "createdAt": "2025-01-01T00:00:00Z" },
                { "word": "bird", "learned": false, "createdAt": "2025-01-01T00:00:00Z" }
            ]
        }"#;
        let report = BackupService::new(Arc::clone(&store))
            .restore(json)
            .await
            .unwrap();
        assert_eq!(
            report,
            RestoreReport {
                imported: 1,
                skipped: 1
            }
        );

        let all = store.list_all().unwrap();
        let cat = all.iter().find(|w| w.word == "cat").unwrap();
        assert!(cat.learned);
    }

    #[tokio::test]
    async fn test_restore_rejects_missing_words_field() {
        let store = setup_store();
        let service = BackupService::new(Arc::clone(&store));

        let err = service
            .restore(r#"{"version": "1.0.0"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Format(_)));

        let err = service
            .restore(r#"{"words": "not-an-array"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Format(_)));

        assert!(store.list_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = setup_store();
        seed(&store, &["cat", "dog"]);

        BackupService::new(Arc::clone(&store))
            .clear_all()
            .await
            .unwrap();
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_backup_filename_convention() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        assert_eq!(backup_filename(date), "zenvocab-backup-2026-08-07.json");
    }
}
