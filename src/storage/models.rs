//! 数据模型定义
//!
//! 定义单词记录及相关数据结构，以及与数据库行之间的转换。
//! serde 字段名使用 camelCase，与备份 JSON 文件格式保持一致。

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};

// ============================================================
// AiContent - AI 生成的学习辅助内容
// ============================================================

/// AI 生成的学习辅助内容
///
/// 三个字段均为必填：不存在"部分生成"的内容，
/// 解析失败的残缺对象不会被持久化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiContent {
    /// 英文例句
    pub example: String,
    /// 例句的中文翻译
    pub example_translation: String,
    /// 中文助记方法
    pub mnemonic: String,
}

// ============================================================
// WordRecord - 单词记录
// ============================================================

/// 单词记录，唯一的持久化实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordRecord {
    /// 存储层分配的自增 id，首次持久化前为空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// 单词本身，作为去重键
    pub word: String,
    /// 是否已掌握
    pub learned: bool,
    /// 缓存的 AI 生成内容
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_content: Option<AiContent>,
    /// 导入时间
    pub created_at: DateTime<Utc>,
    /// 掌握时间，learned 为 true 时必有值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learned_at: Option<DateTime<Utc>>,
}

impl WordRecord {
    /// 创建一个新导入的未学习记录
    pub fn new(word: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            word: word.into(),
            learned: false,
            ai_content: None,
            created_at,
            learned_at: None,
        }
    }

    /// 从数据库行解析
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            word: row.get("word")?,
            learned: row.get::<_, i32>("learned")? != 0,
            // 残缺或损坏的 JSON 按"无内容"处理，保持全有或全无的不变量
            ai_content: row
                .get::<_, Option<String>>("ai_content")?
                .and_then(|s| serde_json::from_str(&s).ok()),
            created_at: parse_datetime(row.get::<_, String>("created_at")?),
            learned_at: row
                .get::<_, Option<String>>("learned_at")?
                .map(parse_datetime),
        })
    }
}

// ============================================================
// WordPatch - 部分字段更新
// ============================================================

/// 按 id 更新时携带的部分字段
///
/// 外层 `None` 表示该字段保持不变；内层 `None` 表示写入 NULL。
#[derive(Debug, Clone, Default)]
pub struct WordPatch {
    pub learned: Option<bool>,
    pub learned_at: Option<Option<DateTime<Utc>>>,
    pub ai_content: Option<Option<AiContent>>,
}

impl WordPatch {
    /// 切换掌握状态：learned_at 在掌握时写入、恢复时清空
    pub fn set_learned(learned: bool, at: Option<DateTime<Utc>>) -> Self {
        Self {
            learned: Some(learned),
            learned_at: Some(at),
            ..Default::default()
        }
    }

    /// 附加 AI 生成内容
    pub fn set_ai_content(content: AiContent) -> Self {
        Self {
            ai_content: Some(Some(content)),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.learned.is_none() && self.learned_at.is_none() && self.ai_content.is_none()
    }
}

// ============================================================
// WordStats - 词库统计
// ============================================================

/// 词库统计数据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordStats {
    /// 总单词数
    pub total: i64,
    /// 已掌握单词数
    pub learned: i64,
}

impl WordStats {
    pub fn unlearned(&self) -> i64 {
        self.total - self.learned
    }
}

// ============================================================
// 日期时间辅助函数
// ============================================================

/// 解析数据库中的日期时间字符串
pub(crate) fn parse_datetime(s: String) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S") {
        return DateTime::from_naive_utc_and_offset(dt, Utc);
    }

    Utc::now()
}

/// 格式化日期时间为字符串
///
/// 固定毫秒精度，保证文本排序与时间排序一致。
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
