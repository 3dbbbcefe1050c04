//! ZenVocab 核心库
//!
//! 本地优先的极简背单词客户端：
//! - 导入单词列表（粘贴文本或 .txt 文件），自动去重
//! - 分批浏览未学习单词，按需生成 AI 例句与助记
//! - 标记掌握/恢复学习，进度统计
//! - 整库备份为带版本号的 JSON，增量恢复
//!
//! 所有数据存放在本地 SQLite；唯一的外部依赖是文本生成接口，
//! 其失败被完全吸收为默认内容，不会传导给调用方。

pub mod ai;
pub mod backup;
pub mod import;
pub mod logging;
pub mod review;
pub mod settings;
pub mod storage;

pub use ai::{AiGenerator, GeneratorConfig};
pub use backup::{backup_filename, BackupDocument, BackupService, RestoreReport, BACKUP_VERSION};
pub use import::{parse_words, ImportError, ImportOutcome, ImportService};
pub use review::{ExpandOutcome, PageSnapshot, QueueConfig, ReviewQueue};
pub use settings::{Preferences, PreferencesStore, Theme};
pub use storage::{
    AiContent, DatabaseManager, StorageError, StorageResult, WordPatch, WordRecord, WordRepository,
    WordStats, WordStore,
};
