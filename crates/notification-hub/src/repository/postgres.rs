//! PostgreSQL 通知仓储

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::debug;

use super::traits::{NotificationRepositoryTrait, ensure_non_empty};
use crate::error::Result;
use crate::models::{NewNotification, NotificationRecord};

/// 编译期嵌入的迁移脚本，启动时执行
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// PostgreSQL 通知仓储
///
/// 一个事件扇出的多条记录在同一事务中逐行写入，失败时事务回滚，
/// 并发写入者之间不会看到彼此的半成品。
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepositoryTrait for PgNotificationRepository {
    async fn insert_batch(&self, records: &[NewNotification]) -> Result<Vec<i64>> {
        ensure_non_empty(records)?;

        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(records.len());

        for record in records {
            let id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO notifications (recipient_id, kind, raw_payload)
                VALUES ($1, $2, $3)
                RETURNING id
                "#,
            )
            .bind(&record.recipient_id)
            .bind(record.kind.tag())
            .bind(&record.raw_payload)
            .fetch_one(&mut *tx)
            .await?;
            ids.push(id);
        }

        // 提交前返回的错误会随 tx drop 自动回滚
        tx.commit().await?;

        debug!(count = ids.len(), ?ids, "通知记录批量写入完成");
        Ok(ids)
    }

    async fn find_by_recipient(&self, recipient_id: &str) -> Result<Vec<NotificationRecord>> {
        let records = sqlx::query_as::<_, NotificationRecord>(
            r#"
            SELECT id, recipient_id, kind, raw_payload, read, created_at
            FROM notifications
            WHERE recipient_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
