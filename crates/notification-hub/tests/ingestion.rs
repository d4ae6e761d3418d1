//! 摄取链路集成测试
//!
//! 进程内总线 + 监督者 + 内存仓储，验证从发布消息到 feed 可见的完整流程。

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::wait_until;
use hub_shared::retry::RetryPolicy;
use notification_hub::ingest::{InMemoryEventBus, IngestionSupervisor};
use notification_hub::models::{NewNotification, NotificationKind, NotificationRecord};
use notification_hub::{NotificationError, Result};
use notification_hub::renderer::NotificationRenderer;
use notification_hub::repository::{InMemoryNotificationRepository, NotificationRepositoryTrait};

// ==================== 辅助函数 ====================

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: u32::MAX,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(50),
        multiplier: 2.0,
    }
}

/// 对指定接收者的写入返回数据被拒绝，模拟数据库的数据异常
struct RejectingRepository {
    inner: InMemoryNotificationRepository,
    rejected_recipient: &'static str,
}

#[async_trait]
impl NotificationRepositoryTrait for RejectingRepository {
    async fn insert_batch(&self, records: &[NewNotification]) -> Result<Vec<i64>> {
        if records
            .iter()
            .any(|r| r.recipient_id == self.rejected_recipient)
        {
            return Err(NotificationError::Rejected(
                "new row violates check constraint".to_string(),
            ));
        }
        self.inner.insert_batch(records).await
    }

    async fn find_by_recipient(&self, recipient_id: &str) -> Result<Vec<NotificationRecord>> {
        self.inner.find_by_recipient(recipient_id).await
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }
}

fn start(
    repo: Arc<dyn NotificationRepositoryTrait>,
) -> (Arc<InMemoryEventBus>, IngestionSupervisor) {
    let bus = Arc::new(InMemoryEventBus::new(Duration::from_millis(5)));
    let mut supervisor = IngestionSupervisor::new(bus.clone(), repo, fast_policy());
    supervisor.start();
    (bus, supervisor)
}

// ==================== 测试用例 ====================

#[tokio::test]
async fn test_malformed_message_does_not_stop_subscription() {
    let repo = Arc::new(InMemoryNotificationRepository::new());
    let (bus, supervisor) = start(repo.clone());

    bus.publish("project.join_request", "{not json").unwrap();
    bus.publish(
        "project.join_request",
        r#"{"project_id":5,"project_title":"Pier","from_name":"Ann","user_uuid":"owner"}"#,
    )
    .unwrap();

    wait_until(|| repo.len() == 1).await;
    // 给订阅留出处理余量，确认坏消息没有产生任何记录
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(repo.len(), 1);

    let records = repo.find_by_recipient("owner").await.unwrap();
    assert_eq!(records[0].kind, "responce");
    assert_eq!(supervisor.running(), 4);

    supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_control_character_recipient_does_not_block_queue() {
    let repo = Arc::new(InMemoryNotificationRepository::new());
    let (bus, supervisor) = start(repo.clone());

    bus.publish(
        "user.registred",
        r#"{"uuid":"u\u0000x","email":"a@b.com","role":"client"}"#,
    )
    .unwrap();
    bus.publish(
        "user.registred",
        r#"{"uuid":"u2","email":"c@d.com","role":"client"}"#,
    )
    .unwrap();

    wait_until(|| repo.len() == 1).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(repo.len(), 1);
    assert_eq!(repo.snapshot()[0].recipient_id, "u2");

    supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_store_rejected_message_is_acked_and_queue_moves_on() {
    let repo = Arc::new(RejectingRepository {
        inner: InMemoryNotificationRepository::new(),
        rejected_recipient: "blocked",
    });
    let (bus, supervisor) = start(repo.clone());

    bus.publish(
        "project.negotiation.created",
        r#"{"project_id":3,"project_title":"Quay","user_uuid":"blocked"}"#,
    )
    .unwrap();
    bus.publish(
        "project.negotiation.created",
        r#"{"project_id":4,"project_title":"Wharf","user_uuid":"u2"}"#,
    )
    .unwrap();

    wait_until(|| repo.inner.len() == 1).await;
    let stored = repo.find_by_recipient("u2").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(repo.find_by_recipient("blocked").await.unwrap().is_empty());

    supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_concurrent_kinds_for_same_recipient() {
    let repo = Arc::new(InMemoryNotificationRepository::new());
    let (bus, supervisor) = start(repo.clone());

    bus.publish(
        "user.registred",
        r#"{"uuid":"u1","email":"a@b.com","role":"client"}"#,
    )
    .unwrap();
    bus.publish(
        "project.negotiation.created",
        r#"{"project_id":8,"project_title":"Dock","user_uuid":"u1"}"#,
    )
    .unwrap();

    wait_until(|| repo.len() == 2).await;

    let records = repo.find_by_recipient("u1").await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].id < records[1].id);

    let feed = NotificationRenderer::render_feed(&records);
    assert_eq!(feed.len(), 2);
    let mut kinds: Vec<NotificationKind> = feed.iter().map(|n| n.target).collect();
    kinds.sort_by_key(|k| k.tag());
    assert_eq!(
        kinds,
        vec![NotificationKind::Registration, NotificationKind::NegotiationCreated]
    );

    supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_partial_fan_out_failure_is_rolled_back_and_redelivered() {
    let repo = Arc::new(InMemoryNotificationRepository::new());
    // 第二条记录写入失败，整批回滚
    repo.fail_next_batch_at(1);
    let (bus, supervisor) = start(repo.clone());

    bus.publish(
        "project.status_changed",
        r#"{"project_id":42,"project_title":"X","new_status":"done","uuid":["u1","u2","u3"]}"#,
    )
    .unwrap();

    // 重新投递后整批成功，不会出现半批记录
    wait_until(|| repo.len() == 3).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(repo.len(), 3);

    let recipients: Vec<String> = repo
        .snapshot()
        .into_iter()
        .map(|r| r.recipient_id)
        .collect();
    assert_eq!(recipients, vec!["u1", "u2", "u3"]);

    supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_store_outage_recovers_without_losing_message() {
    let repo = Arc::new(InMemoryNotificationRepository::new());
    repo.set_unavailable(true);
    let (bus, supervisor) = start(repo.clone());

    bus.publish(
        "user.registred",
        r#"{"uuid":"u7","email":"c@d.com","role":"freelancer"}"#,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(40)).await;
    repo.set_unavailable(false);
    assert!(repo.is_empty());

    wait_until(|| repo.len() == 1).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    // 消息只入库一次
    assert_eq!(repo.len(), 1);
    assert_eq!(repo.snapshot()[0].recipient_id, "u7");

    supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_status_change_with_single_recipient_is_discarded() {
    let repo = Arc::new(InMemoryNotificationRepository::new());
    let (bus, supervisor) = start(repo.clone());

    bus.publish(
        "project.status_changed",
        r#"{"project_id":1,"project_title":"Solo","new_status":"done","uuid":["u1"]}"#,
    )
    .unwrap();
    bus.publish(
        "project.status_changed",
        r#"{"project_id":2,"project_title":"Duo","new_status":"open","uuid":["u1","u2"]}"#,
    )
    .unwrap();

    wait_until(|| repo.len() == 2).await;
    let feed = NotificationRenderer::render_feed(&repo.snapshot());
    assert!(feed.iter().all(|n| n.target_data == 2));

    supervisor.shutdown(Duration::from_secs(1)).await;
}
