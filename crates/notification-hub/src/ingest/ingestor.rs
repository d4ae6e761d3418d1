//! 事件摄取
//!
//! 一个参数化的摄取器服务一个绑定：解码消息体、提取接收者、构造记录、原子写入。
//! 错误按消息隔离：
//! - 解码/校验失败：确认并丢弃，输出 error 日志和失败计数，订阅继续运行。
//! - 存储拒绝数据本身（数据异常、约束冲突）：同样确认并丢弃，避免阻塞后续消息。
//! - 存储暂时不可用：不确认，等待总线重新投递。

use std::sync::Arc;

use async_trait::async_trait;
use hub_shared::observability::metrics;
use tracing::{error, info, warn};

use super::bindings::Binding;
use super::bus::{BusMessage, Disposition, MessageHandler};
use crate::error::{NotificationError, Result};
use crate::models::{NewNotification, NotificationEvent, NotificationKind};
use crate::repository::NotificationRepositoryTrait;

/// 把消息体转换为待写入的记录，每个接收者一条
///
/// 所有记录共享同一份原始消息体，不做任何改写。
pub fn build_records(kind: NotificationKind, body: &[u8]) -> Result<Vec<NewNotification>> {
    let text = std::str::from_utf8(body)
        .map_err(|e| NotificationError::Decode(format!("消息体不是合法的 UTF-8: {e}")))?;
    let event = NotificationEvent::decode_str(kind, text)?;
    let recipients = event.recipients()?;
    let raw_payload = text.to_string();

    Ok(recipients
        .into_iter()
        .map(|recipient_id| NewNotification {
            recipient_id: recipient_id.to_string(),
            kind,
            raw_payload: raw_payload.clone(),
        })
        .collect())
}

/// 单个事件类别的摄取器
pub struct EventIngestor {
    binding: Binding,
    repository: Arc<dyn NotificationRepositoryTrait>,
}

impl EventIngestor {
    pub fn new(binding: Binding, repository: Arc<dyn NotificationRepositoryTrait>) -> Self {
        Self {
            binding,
            repository,
        }
    }

    /// 解码并写入一条消息，返回新记录的 ID
    pub async fn ingest(&self, body: &[u8]) -> Result<Vec<i64>> {
        let records = build_records(self.binding.kind, body)?;
        self.repository.insert_batch(&records).await
    }

    /// 处理一条消息并给出确认决定
    pub async fn process(&self, body: &[u8]) -> Disposition {
        let kind = self.binding.kind.tag();

        match self.ingest(body).await {
            Ok(ids) => {
                info!(
                    kind,
                    routing_key = self.binding.routing_key,
                    count = ids.len(),
                    ?ids,
                    "通知事件已入库"
                );
                metrics::record_ingested(kind, ids.len());
                Disposition::Ack
            }
            Err(e) if e.is_retryable() => {
                warn!(
                    kind,
                    routing_key = self.binding.routing_key,
                    error = %e,
                    "通知事件持久化失败，不确认，等待重新投递"
                );
                metrics::record_ingest_failure(kind, e.failure_reason());
                Disposition::Redeliver
            }
            Err(e) => {
                error!(
                    kind,
                    routing_key = self.binding.routing_key,
                    error = %e,
                    body_len = body.len(),
                    "通知事件无法处理，已确认并丢弃"
                );
                metrics::record_ingest_failure(kind, e.failure_reason());
                Disposition::Ack
            }
        }
    }
}

#[async_trait]
impl MessageHandler for EventIngestor {
    async fn handle(&self, message: BusMessage) -> Disposition {
        self.process(&message.body).await
    }
}
