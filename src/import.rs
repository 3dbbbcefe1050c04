//! 单词导入与去重
//!
//! 将粘贴文本或 .txt 文件转换为一组新的、不重复的单词记录。
//! 与词库中已有单词重复的候选在写入前被过滤掉。

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::storage::models::WordRecord;
use crate::storage::{StorageError, StorageResult, WordStore};

/// 导入错误
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("仅支持 .txt 文本文件: {}", .0.display())]
    UnsupportedFile(PathBuf),

    #[error("读取文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 导入结果
///
/// 空输入与"全部已存在"是两种不同的结果，界面提示不同。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// 输入中没有任何有效行
    EmptyInput,
    /// 候选单词全部已在词库中
    AllDuplicates { candidates: usize },
    /// 成功插入若干新单词
    Imported { inserted: usize, skipped: usize },
}

/// 导入服务
pub struct ImportService {
    store: Arc<dyn WordStore>,
}

impl ImportService {
    pub fn new(store: Arc<dyn WordStore>) -> Self {
        Self { store }
    }

    /// 从原始文本导入，每行一个单词
    pub async fn import_text(&self, raw: &str) -> StorageResult<ImportOutcome> {
        let candidates = parse_words(raw);
        if candidates.is_empty() {
            return Ok(ImportOutcome::EmptyInput);
        }

        let existing = self.store.find_by_words(&candidates)?;
        let existing_set: HashSet<&str> = existing.iter().map(|w| w.word.as_str()).collect();

        let now = Utc::now();
        let new_records: Vec<WordRecord> = candidates
            .iter()
            .filter(|w| !existing_set.contains(w.as_str()))
            .map(|w| WordRecord::new(w.clone(), now))
            .collect();

        if new_records.is_empty() {
            return Ok(ImportOutcome::AllDuplicates {
                candidates: candidates.len(),
            });
        }

        self.store.insert_many(&new_records)?;

        let inserted = new_records.len();
        info!(inserted, skipped = candidates.len() - inserted, "导入完成");

        Ok(ImportOutcome::Imported {
            inserted,
            skipped: candidates.len() - inserted,
        })
    }

    /// 从 .txt 文件导入
    ///
    /// 文件名校验发生在读取之前，非 .txt 文件不触碰词库。
    pub async fn import_file(&self, path: &Path) -> Result<ImportOutcome, ImportError> {
        let is_txt = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if !is_txt {
            return Err(ImportError::UnsupportedFile(path.to_path_buf()));
        }

        let raw = tokio::fs::read_to_string(path).await?;
        Ok(self.import_text(&raw).await?)
    }
}

/// 拆分原始文本为候选单词
///
/// 按行拆分、去首尾空白、丢弃空行，再按首次出现顺序去重。
pub fn parse_words(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}
