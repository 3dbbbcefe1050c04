use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use zenvocab::{
    backup_filename, AiGenerator, BackupService, DatabaseManager, ExpandOutcome, ImportOutcome,
    ImportService, PreferencesStore, QueueConfig, ReviewQueue, Theme, WordRepository, WordStore,
};

#[derive(Parser)]
#[command(name = "zenvocab", about = "ZenVocab - 极简单词流", version)]
struct Cli {
    /// 数据库文件路径（默认为 ZENVOCAB_DB 或用户数据目录下的 zenvocab/zenvocab.db）
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 显示学习进度统计
    Stats,
    /// 导入单词，每行一个（给出文件路径或 --text 文本）
    Import {
        /// .txt 文件路径
        file: Option<PathBuf>,
        /// 直接粘贴的文本
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
    },
    /// 显示当前未学习单词批次
    Page,
    /// 展开一个单词，必要时生成 AI 辅助内容
    Expand { id: i64 },
    /// 标记单词为已掌握
    Learn { id: i64 },
    /// 将已掌握的单词恢复到学习列表
    Forget { id: i64 },
    /// 列出已掌握单词，最近掌握的在前
    Learned,
    /// 导出备份 JSON 文件
    Export {
        /// 输出路径，缺省为当前目录下按日期命名的文件
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 从备份 JSON 文件恢复（增量，不覆盖已有记录）
    Restore { file: PathBuf },
    /// 清空所有数据（不可恢复，需要二次确认）
    Clear {
        /// 跳过交互确认
        #[arg(long)]
        yes: bool,
    },
    /// 查看或设置主题（light / dark / toggle）
    Theme { value: Option<String> },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _log_guard = zenvocab::logging::init_tracing("info");

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("错误: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // 主题设置独立于词库，不需要打开数据库
    if let Command::Theme { value } = &cli.command {
        return handle_theme(value.as_deref());
    }

    let db_path = cli
        .db
        .or_else(|| std::env::var_os("ZENVOCAB_DB").map(PathBuf::from))
        .unwrap_or_else(default_db_path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = DatabaseManager::new(&db_path)?;
    let store: Arc<dyn WordStore> = Arc::new(WordRepository::new(db.connection()));

    match cli.command {
        Command::Stats => {
            let stats = store.count_stats()?;
            println!("已掌握 {} / {}", stats.learned, stats.total);
            if stats.total > 0 {
                let progress = stats.learned as f64 / stats.total as f64 * 100.0;
                println!("进度 {progress:.1}%，还有 {} 个单词待掌握", stats.unlearned());
            } else {
                println!("还没有单词，请先导入");
            }
        }
        Command::Import { file, text } => {
            let service = ImportService::new(store);
            let outcome = match (file, text) {
                (Some(path), _) => service.import_file(&path).await?,
                (None, Some(raw)) => service.import_text(&raw).await?,
                (None, None) => {
                    // 从标准输入读取
                    let mut raw = String::new();
                    io::stdin().lock().read_to_string(&mut raw)?;
                    service.import_text(&raw).await?
                }
            };
            match outcome {
                ImportOutcome::EmptyInput => println!("输入为空，没有可导入的单词"),
                ImportOutcome::AllDuplicates { candidates } => {
                    println!("{candidates} 个单词全部已存在，无需导入")
                }
                ImportOutcome::Imported { inserted, skipped } => {
                    println!("成功导入 {inserted} 个新单词（跳过已存在 {skipped} 个）")
                }
            }
        }
        Command::Page => {
            let queue = build_queue(store);
            let page = queue.load_page().await?;
            if page.words.is_empty() {
                println!("🎉 所有单词都已掌握");
            } else {
                println!("本批次 {} 个，总剩余 {} 个", page.words.len(), page.total_unlearned);
                for word in &page.words {
                    let marker = if word.ai_content.is_some() { "*" } else { " " };
                    println!("  [{:>4}]{marker} {}", word.id.unwrap_or_default(), word.word);
                }
            }
        }
        Command::Expand { id } => {
            let queue = build_queue(store);
            queue.load_page().await?;
            match queue.expand(id).await? {
                ExpandOutcome::Collapsed => {}
                ExpandOutcome::Expanded(Some(content)) => {
                    println!("例句: {}", content.example);
                    println!("翻译: {}", content.example_translation);
                    println!("助记: {}", content.mnemonic);
                }
                ExpandOutcome::Expanded(None) => {
                    println!("暂无内容，请确认 id 在当前批次中后重试");
                }
            }
        }
        Command::Learn { id } => {
            let queue = build_queue(store);
            queue.load_page().await?;
            queue.mark_learned(id).await?;
            println!("已标记为掌握");
        }
        Command::Forget { id } => {
            let queue = build_queue(store);
            queue.mark_unlearned(id).await?;
            println!("已恢复到学习列表");
        }
        Command::Learned => {
            let queue = build_queue(store);
            let words = queue.learned_words().await?;
            if words.is_empty() {
                println!("还没有已掌握的单词");
            } else {
                println!("已掌握 {} 个单词:", words.len());
                for word in &words {
                    println!("  [{:>4}] {}", word.id.unwrap_or_default(), word.word);
                }
            }
        }
        Command::Export { output } => {
            let service = BackupService::new(store);
            let json = service.export().await?;
            let path = output
                .unwrap_or_else(|| PathBuf::from(backup_filename(chrono::Utc::now().date_naive())));
            tokio::fs::write(&path, json).await?;
            println!("数据已导出到 {}", path.display());
        }
        Command::Restore { file } => {
            let service = BackupService::new(store);
            let json = tokio::fs::read_to_string(&file).await?;
            let report = service.restore(&json).await?;
            if report.imported == 0 {
                println!("所有单词已存在，无需导入（跳过 {} 个）", report.skipped);
            } else {
                println!(
                    "成功导入 {} 个单词（跳过已存在 {} 个）",
                    report.imported, report.skipped
                );
            }
        }
        Command::Clear { yes } => {
            if !yes && !confirm_clear()? {
                println!("已取消");
                return Ok(());
            }
            BackupService::new(store).clear_all().await?;
            println!("所有数据已清空");
        }
        Command::Theme { .. } => unreachable!("已在前面处理"),
    }

    Ok(())
}

fn build_queue(store: Arc<dyn WordStore>) -> ReviewQueue {
    ReviewQueue::new(
        store,
        Arc::new(AiGenerator::from_env()),
        QueueConfig::default(),
    )
}

fn handle_theme(value: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let store = PreferencesStore::new(PreferencesStore::default_path());
    match value {
        None => println!("当前主题: {}", store.load().theme),
        Some("toggle") => println!("已切换到 {}", store.toggle_theme()?),
        Some(raw) => {
            let theme: Theme = raw.parse()?;
            store.set_theme(theme)?;
            println!("已设置为 {theme}");
        }
    }
    Ok(())
}

/// 清空前的两次交互确认
fn confirm_clear() -> io::Result<bool> {
    let stdin = io::stdin();
    for prompt in [
        "警告：此操作将删除所有单词和学习进度，且无法恢复！建议先导出备份。输入 yes 继续: ",
        "再次确认：真的要删除所有数据吗？输入 yes 确认: ",
    ] {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut answer = String::new();
        stdin.lock().read_line(&mut answer)?;
        if !answer.trim().eq_ignore_ascii_case("yes") {
            return Ok(false);
        }
    }
    Ok(true)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("zenvocab")
        .join("zenvocab.db")
}
