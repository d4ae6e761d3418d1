//! 事件总线抽象
//!
//! 摄取逻辑只依赖 [`EventBus`]：为一个绑定建立订阅，把每条消息交给 [`MessageHandler`]，
//! 按返回的 [`Disposition`] 确认或重新投递。
//!
//! - [`KafkaEventBus`]：生产实现，路由键即 topic，队列名即消费组后缀。
//! - [`InMemoryEventBus`]：进程内实现，用于测试和本地调试。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hub_shared::config::{IngestionConfig, KafkaConfig};
use hub_shared::kafka::{KafkaConsumer, StopReason};
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, warn};

pub use hub_shared::kafka::Disposition;

use super::bindings::{BINDINGS, Binding};
use crate::error::{NotificationError, Result};

/// 总线投递的一条消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub routing_key: String,
    pub body: Vec<u8>,
}

/// 单条消息处理器
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: BusMessage) -> Disposition;
}

/// 事件总线
#[async_trait]
pub trait EventBus: Send + Sync {
    /// 为绑定建立订阅并持续消费
    ///
    /// 收到关闭信号后返回 `Ok(())`；订阅因传输故障终止时返回错误，由监督者决定是否重建。
    async fn consume(
        &self,
        binding: Binding,
        shutdown: watch::Receiver<bool>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Kafka
// ---------------------------------------------------------------------------

/// 基于 Kafka 的事件总线
pub struct KafkaEventBus {
    kafka: KafkaConfig,
    max_consecutive_errors: u32,
    redeliver_delay: Duration,
}

impl KafkaEventBus {
    pub fn new(kafka: KafkaConfig, ingestion: &IngestionConfig) -> Self {
        Self {
            kafka,
            max_consecutive_errors: ingestion.max_consecutive_errors,
            redeliver_delay: ingestion.redeliver_delay(),
        }
    }
}

#[async_trait]
impl EventBus for KafkaEventBus {
    async fn consume(
        &self,
        binding: Binding,
        shutdown: watch::Receiver<bool>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()> {
        let consumer = KafkaConsumer::new(&self.kafka, Some(binding.queue))?;
        consumer.subscribe(&[binding.routing_key])?;
        let group_id = consumer.group_id().to_string();

        let reason = consumer
            .start(
                shutdown,
                self.max_consecutive_errors,
                self.redeliver_delay,
                |msg| {
                    let handler = handler.clone();
                    async move {
                        handler
                            .handle(BusMessage {
                                routing_key: msg.topic,
                                body: msg.payload,
                            })
                            .await
                    }
                },
            )
            .await;

        match reason {
            StopReason::Shutdown => Ok(()),
            StopReason::TransportFailed(e) => {
                warn!(
                    group_id = %group_id,
                    routing_key = binding.routing_key,
                    error = %e,
                    "Kafka 订阅终止，等待监督者重建"
                );
                Err(e.into())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 进程内实现
// ---------------------------------------------------------------------------

/// 单个队列的接收端
///
/// pending 保存等待重新投递的消息，订阅重建后优先处理。
struct LocalQueue {
    receiver: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: Option<Vec<u8>>,
}

/// 进程内事件总线
///
/// 每个绑定一个无界队列，同一时刻只有一个订阅者。消息不落盘，进程退出即丢失。
pub struct InMemoryEventBus {
    senders: HashMap<&'static str, mpsc::UnboundedSender<Vec<u8>>>,
    queues: HashMap<&'static str, Arc<Mutex<LocalQueue>>>,
    redeliver_delay: Duration,
}

impl InMemoryEventBus {
    pub fn new(redeliver_delay: Duration) -> Self {
        let mut senders = HashMap::new();
        let mut queues = HashMap::new();
        for binding in BINDINGS {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(binding.routing_key, tx);
            queues.insert(
                binding.routing_key,
                Arc::new(Mutex::new(LocalQueue {
                    receiver: rx,
                    pending: None,
                })),
            );
        }
        Self {
            senders,
            queues,
            redeliver_delay,
        }
    }

    /// 按路由键发布一条消息
    pub fn publish(&self, routing_key: &str, body: impl Into<Vec<u8>>) -> Result<()> {
        let sender = self.senders.get(routing_key).ok_or_else(|| {
            NotificationError::Transport(format!("未绑定的路由键: {routing_key}"))
        })?;
        sender
            .send(body.into())
            .map_err(|_| NotificationError::Transport(format!("队列已关闭: {routing_key}")))
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn consume(
        &self,
        binding: Binding,
        mut shutdown: watch::Receiver<bool>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()> {
        let queue = self.queues.get(binding.routing_key).cloned().ok_or_else(|| {
            NotificationError::Transport(format!("未绑定的路由键: {}", binding.routing_key))
        })?;
        let mut queue = queue.lock().await;

        info!(routing_key = binding.routing_key, queue = binding.queue, "内存订阅已启动");

        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            let body = match queue.pending.take() {
                Some(body) => body,
                None => {
                    tokio::select! {
                        biased;

                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                return Ok(());
                            }
                            continue;
                        }

                        received = queue.receiver.recv() => match received {
                            Some(body) => body,
                            None => {
                                return Err(NotificationError::Transport(format!(
                                    "队列已关闭: {}",
                                    binding.routing_key
                                )));
                            }
                        },
                    }
                }
            };

            let message = BusMessage {
                routing_key: binding.routing_key.to_string(),
                body: body.clone(),
            };
            match handler.handle(message).await {
                Disposition::Ack => {}
                Disposition::Redeliver => {
                    debug!(routing_key = binding.routing_key, "消息未确认，等待重新投递");
                    queue.pending = Some(body);
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => {}
                        _ = tokio::time::sleep(self.redeliver_delay) => {}
                    }
                }
            }
        }
    }
}
