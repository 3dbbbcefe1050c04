//! 端到端流程测试：导入 → 学习 → 备份 → 恢复
//!
//! 使用文件数据库，覆盖 WAL 模式下的真实读写路径。

use std::sync::Arc;
use std::time::Duration;

use zenvocab::{
    AiGenerator, BackupService, DatabaseManager, GeneratorConfig, ImportOutcome, ImportService,
    QueueConfig, ReviewQueue, WordRepository, WordStore,
};

fn open_store(path: &std::path::Path) -> Arc<dyn WordStore> {
    let db = DatabaseManager::new(path).unwrap();
    Arc::new(WordRepository::new(db.connection()))
}

fn build_queue(store: Arc<dyn WordStore>) -> ReviewQueue {
    // 无 API key：生成直接退化为默认内容，测试不触网
    let generator = Arc::new(AiGenerator::new(GeneratorConfig::default()));
    let config = QueueConfig {
        page_size: 5,
        low_water: 2,
        refill_delay: Duration::from_millis(5),
    };
    ReviewQueue::new(store, generator, config)
}

#[tokio::test]
async fn import_learn_backup_restore_flow() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir.path().join("zenvocab.db"));

    // 导入，含重复行与空行
    let importer = ImportService::new(Arc::clone(&store));
    let outcome = importer
        .import_text("abandon\nability\nabsorb\n\nabandon\nabstract\nachieve\nacquire\nadapt\n")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ImportOutcome::Imported {
            inserted: 7,
            skipped: 0
        }
    );

    // 第一批 5 个，总剩余 7 个
    let queue = build_queue(Arc::clone(&store));
    let page = queue.load_page().await.unwrap();
    assert_eq!(page.words.len(), 5);
    assert_eq!(page.total_unlearned, 7);

    // 展开生成内容并掌握若干单词
    let first_id = page.words[0].id.unwrap();
    queue.expand(first_id).await.unwrap();
    for word in page.words.iter().take(3) {
        queue.mark_learned(word.id.unwrap()).await.unwrap();
    }

    // 低水位触发延迟补页：剩余 4 个未学习单词全部进入页内
    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = queue.snapshot().unwrap();
    assert_eq!(snapshot.total_unlearned, 4);
    assert_eq!(snapshot.words.len(), 4);

    let stats = store.count_stats().unwrap();
    assert_eq!(stats.total, 7);
    assert_eq!(stats.learned, 3);

    // 导出后恢复到新的空库，字段完整保留
    let backup = BackupService::new(Arc::clone(&store));
    let json = backup.export().await.unwrap();

    let restored_store = open_store(&dir.path().join("restored.db"));
    let report = BackupService::new(Arc::clone(&restored_store))
        .restore(&json)
        .await
        .unwrap();
    assert_eq!(report.imported, 7);
    assert_eq!(report.skipped, 0);

    let original = store.list_all().unwrap();
    let restored = restored_store.list_all().unwrap();
    assert_eq!(original.len(), restored.len());
    for (a, b) in original.iter().zip(restored.iter()) {
        assert_eq!(a.word, b.word);
        assert_eq!(a.learned, b.learned);
        assert_eq!(a.ai_content, b.ai_content);
        assert_eq!(a.learned_at, b.learned_at);
    }

    // 生成内容也随备份一起迁移
    let migrated = restored
        .iter()
        .find(|w| w.ai_content.is_some())
        .expect("展开过的单词应携带生成内容");
    assert!(migrated.ai_content.as_ref().unwrap().example.contains(&migrated.word));

    // 重复恢复不产生任何新记录
    let again = BackupService::new(Arc::clone(&restored_store))
        .restore(&json)
        .await
        .unwrap();
    assert_eq!(again.imported, 0);
    assert_eq!(again.skipped, 7);

    // 清空后词库为空
    BackupService::new(Arc::clone(&restored_store))
        .clear_all()
        .await
        .unwrap();
    assert!(restored_store.list_all().unwrap().is_empty());
}
