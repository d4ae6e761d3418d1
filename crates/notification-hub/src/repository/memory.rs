//! 内存通知仓储
//!
//! 用于测试和无数据库的本地运行，进程退出即丢失。
//! 支持注入故障，以便在不依赖真实数据库的情况下验证重新投递和原子性。

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::traits::{NotificationRepositoryTrait, ensure_non_empty};
use crate::error::{NotificationError, Result};
use crate::models::{NewNotification, NotificationRecord};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    records: Vec<NotificationRecord>,
    /// 下一次批量写入在该下标处失败（一次性）
    fail_at_index: Option<usize>,
}

/// 内存通知仓储
#[derive(Default)]
pub struct InMemoryNotificationRepository {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟后端整体不可用，所有操作返回持久化错误
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// 让下一次批量写入在第 index 条记录处失败
    pub fn fail_next_batch_at(&self, index: usize) {
        self.state.lock().fail_at_index = Some(index);
    }

    /// 已提交的记录总数
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 已提交记录的快照，按 ID 升序
    pub fn snapshot(&self) -> Vec<NotificationRecord> {
        self.state.lock().records.clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(NotificationError::Persistence(
                "内存存储已被标记为不可用".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationRepositoryTrait for InMemoryNotificationRepository {
    async fn insert_batch(&self, records: &[NewNotification]) -> Result<Vec<i64>> {
        ensure_non_empty(records)?;
        self.check_available()?;

        // 整批在同一把锁内完成，先暂存再一次性提交
        let mut state = self.state.lock();
        let fail_at = state.fail_at_index.take();

        let now = Utc::now();
        let mut staged = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if fail_at == Some(index) {
                return Err(NotificationError::Persistence(format!(
                    "模拟写入失败: 第 {} 条记录",
                    index + 1
                )));
            }
            staged.push(NotificationRecord {
                id: state.next_id + 1 + index as i64,
                recipient_id: record.recipient_id.clone(),
                kind: record.kind.tag().to_string(),
                raw_payload: record.raw_payload.clone(),
                read: false,
                created_at: now,
            });
        }

        state.next_id += staged.len() as i64;
        let ids = staged.iter().map(|r| r.id).collect();
        state.records.extend(staged);
        Ok(ids)
    }

    async fn find_by_recipient(&self, recipient_id: &str) -> Result<Vec<NotificationRecord>> {
        self.check_available()?;
        let state = self.state.lock();
        Ok(state
            .records
            .iter()
            .filter(|r| r.recipient_id == recipient_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<()> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;

    fn new_record(recipient: &str) -> NewNotification {
        NewNotification {
            recipient_id: recipient.to_string(),
            kind: NotificationKind::Registration,
            raw_payload: format!(r#"{{"uuid":"{recipient}","email":"x@y.z","role":"client"}}"#),
        }
    }

    #[tokio::test]
    async fn test_ids_increase_in_insertion_order() {
        let repo = InMemoryNotificationRepository::new();
        let first = repo.insert_batch(&[new_record("u1"), new_record("u2")]).await.unwrap();
        let second = repo.insert_batch(&[new_record("u1")]).await.unwrap();

        assert_eq!(first, vec![1, 2]);
        assert_eq!(second, vec![3]);

        let feed = repo.find_by_recipient("u1").await.unwrap();
        let ids: Vec<i64> = feed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let repo = InMemoryNotificationRepository::new();
        repo.set_unavailable(true);

        // 校验先于后端访问
        let err = repo.insert_batch(&[]).await.unwrap_err();
        assert!(matches!(err, NotificationError::Validation(_)));
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_nothing_visible() {
        let repo = InMemoryNotificationRepository::new();
        repo.fail_next_batch_at(1);

        let err = repo
            .insert_batch(&[new_record("u1"), new_record("u2")])
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(repo.is_empty());

        // 故障是一次性的，重试成功且 ID 不出现空洞
        let ids = repo.insert_batch(&[new_record("u1"), new_record("u2")]).await.unwrap();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let repo = InMemoryNotificationRepository::new();
        repo.set_unavailable(true);

        assert!(repo.health_check().await.is_err());
        assert!(matches!(
            repo.find_by_recipient("u1").await,
            Err(NotificationError::Persistence(_))
        ));

        repo.set_unavailable(false);
        tokio_test::assert_ok!(repo.health_check().await);
        assert!(repo.find_by_recipient("u1").await.unwrap().is_empty());
    }
}
