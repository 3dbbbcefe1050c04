//! 学习队列
//!
//! 维护一页未学习单词的内存状态：展开/收起、按需生成 AI 内容、
//! 标记掌握与恢复。页内容是对词库的乐观视图，标记掌握后直接从
//! 内存页移除，不做确认性回读。

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::ai::AiGenerator;
use crate::storage::models::{AiContent, WordPatch, WordRecord};
use crate::storage::{StorageError, StorageResult, WordStore};

/// 队列配置
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// 每批加载的单词数
    pub page_size: usize,
    /// 低水位：页内剩余不多于该值时调度补页
    pub low_water: usize,
    /// 补页前的固定延迟
    pub refill_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            low_water: 5,
            refill_delay: Duration::from_millis(500),
        }
    }
}

/// 当前页的快照，供展示层读取
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub words: Vec<WordRecord>,
    pub expanded_id: Option<i64>,
    pub generating_id: Option<i64>,
    pub total_unlearned: usize,
}

/// 展开操作的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// 再次点击已展开的单词：收起
    Collapsed,
    /// 展开；`None` 表示本次没有可展示的内容（生成结果未能持久化），
    /// 收起后重新展开即可重试
    Expanded(Option<AiContent>),
}

#[derive(Default)]
struct QueueState {
    page: Vec<WordRecord>,
    expanded_id: Option<i64>,
    generating_id: Option<i64>,
    total_unlearned: usize,
}

/// 学习队列句柄，可克隆共享
#[derive(Clone)]
pub struct ReviewQueue {
    store: Arc<dyn WordStore>,
    generator: Arc<AiGenerator>,
    config: QueueConfig,
    state: Arc<Mutex<QueueState>>,
}

impl ReviewQueue {
    pub fn new(store: Arc<dyn WordStore>, generator: Arc<AiGenerator>, config: QueueConfig) -> Self {
        Self {
            store,
            generator,
            config,
            state: Arc::new(Mutex::new(QueueState::default())),
        }
    }

    fn lock_state(&self) -> StorageResult<MutexGuard<'_, QueueState>> {
        self.state
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    fn snapshot_of(state: &QueueState) -> PageSnapshot {
        PageSnapshot {
            words: state.page.clone(),
            expanded_id: state.expanded_id,
            generating_id: state.generating_id,
            total_unlearned: state.total_unlearned,
        }
    }

    /// 加载当前未学习单词的第一批
    pub async fn load_page(&self) -> StorageResult<PageSnapshot> {
        self.reload().await
    }

    /// 刷新加载下一批
    ///
    /// 没有游标：每次都重新取"当前未学习集合的前 N 个"，
    /// 已展示但尚未掌握的单词会被再次取到。
    pub async fn load_more(&self) -> StorageResult<PageSnapshot> {
        self.reload().await
    }

    async fn reload(&self) -> StorageResult<PageSnapshot> {
        let unlearned = self.store.list_unlearned()?;
        let total = unlearned.len();
        let page: Vec<WordRecord> = unlearned
            .into_iter()
            .take(self.config.page_size)
            .collect();

        let mut state = self.lock_state()?;
        state.total_unlearned = total;
        state.page = page;
        Ok(Self::snapshot_of(&state))
    }

    /// 展开或收起一个单词
    ///
    /// 展开没有缓存内容的单词时触发生成，成功后写回词库并
    /// 合并进内存页，不做整页重载。
    pub async fn expand(&self, id: i64) -> StorageResult<ExpandOutcome> {
        let word_text = {
            let mut state = self.lock_state()?;
            if state.expanded_id == Some(id) {
                state.expanded_id = None;
                return Ok(ExpandOutcome::Collapsed);
            }
            state.expanded_id = Some(id);

            let found = state
                .page
                .iter()
                .find(|w| w.id == Some(id))
                .map(|w| (w.word.clone(), w.ai_content.clone()));
            match found {
                None => return Ok(ExpandOutcome::Expanded(None)),
                Some((_, Some(cached))) => return Ok(ExpandOutcome::Expanded(Some(cached))),
                Some((text, None)) => {
                    state.generating_id = Some(id);
                    text
                }
            }
        };

        // 生成本身永不失败，只有持久化可能失败
        let content = self.generator.generate(&word_text).await;
        let persisted = self
            .store
            .update_fields(id, &WordPatch::set_ai_content(content.clone()));

        let mut state = self.lock_state()?;
        state.generating_id = None;
        match persisted {
            Ok(()) => {
                if let Some(entry) = state.page.iter_mut().find(|w| w.id == Some(id)) {
                    entry.ai_content = Some(content.clone());
                }
                Ok(ExpandOutcome::Expanded(Some(content)))
            }
            Err(err) => {
                warn!(id, error = %err, "生成内容写回失败，面板留空等待重试");
                Ok(ExpandOutcome::Expanded(None))
            }
        }
    }

    /// 标记单词为已掌握
    ///
    /// 词库写入成功后从内存页乐观移除；页内剩余不多于低水位时
    /// 调度一次延迟补页。
    pub async fn mark_learned(&self, id: i64) -> StorageResult<()> {
        self.store
            .update_fields(id, &WordPatch::set_learned(true, Some(Utc::now())))?;

        let should_refill = {
            let mut state = self.lock_state()?;
            state.page.retain(|w| w.id != Some(id));
            state.total_unlearned = state.total_unlearned.saturating_sub(1);
            if state.expanded_id == Some(id) {
                state.expanded_id = None;
            }
            state.page.len() <= self.config.low_water
        };

        if should_refill {
            let queue = self.clone();
            let delay = self.config.refill_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(err) = queue.load_more().await {
                    warn!(error = %err, "延迟补页失败");
                }
            });
        }

        Ok(())
    }

    /// 将已掌握的单词恢复到学习列表，learned_at 清空
    pub async fn mark_unlearned(&self, id: i64) -> StorageResult<()> {
        self.store
            .update_fields(id, &WordPatch::set_learned(false, None))
    }

    /// 已掌握单词列表，最近掌握的在前
    pub async fn learned_words(&self) -> StorageResult<Vec<WordRecord>> {
        self.store.list_learned()
    }

    /// 当前页状态快照
    pub fn snapshot(&self) -> StorageResult<PageSnapshot> {
        let state = self.lock_state()?;
        Ok(Self::snapshot_of(&state))
    }
}
