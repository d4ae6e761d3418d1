//! Kafka 基础设施封装
//!
//! 将 rdkafka 的底层 API 封装为业务友好的 Consumer 抽象，统一错误映射、
//! 手动确认语义和优雅关闭，避免各事件类别重复编写样板代码。
//!
//! 确认语义：自动提交关闭。处理函数返回 [`Disposition::Ack`] 时提交该消息的偏移量；
//! 返回 [`Disposition::Redeliver`] 时不提交，并把分区回退到该消息，使其被重新投递。

use std::future::Future;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::{Offset, TopicPartitionList};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::KafkaConfig;
use crate::error::HubError;

/// seek 操作的超时
const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// ConsumerMessage
// ---------------------------------------------------------------------------

/// 消费到的 Kafka 消息的统一表示
///
/// 将 rdkafka 的 `BorrowedMessage`（带生命周期约束）转换为拥有所有权的结构体，
/// 使消息可以安全地跨 await 点传递给异步处理函数。
#[derive(Debug, Clone)]
pub struct ConsumerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

impl ConsumerMessage {
    fn from_borrowed(msg: &BorrowedMessage<'_>) -> Self {
        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            payload: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Disposition / StopReason
// ---------------------------------------------------------------------------

/// 处理函数对单条消息的处置结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// 已处理完毕（成功，或是不可重试的坏消息），提交偏移量
    Ack,
    /// 暂时无法处理，保留偏移量等待重新投递
    Redeliver,
}

/// 消费循环退出原因
#[derive(Debug)]
pub enum StopReason {
    /// 收到关闭信号，正常退出
    Shutdown,
    /// 消息流结束或连续出错，需要由上层重建订阅
    TransportFailed(HubError),
}

// ---------------------------------------------------------------------------
// KafkaConsumer
// ---------------------------------------------------------------------------

/// 面向业务的 Kafka 消费者
///
/// 封装 `StreamConsumer`，提供基于 `watch` channel 的优雅关闭和手动确认。
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    group_id: String,
}

impl KafkaConsumer {
    /// 创建消费者
    ///
    /// `group_id_suffix` 对应一个持久队列：同一事件类别的多个实例共享该消费组，
    /// 不同事件类别之间互不影响。
    pub fn new(config: &KafkaConfig, group_id_suffix: Option<&str>) -> Result<Self, HubError> {
        let group_id = match group_id_suffix {
            Some(suffix) => format!("{}.{}", config.consumer_group, suffix),
            None => config.consumer_group.clone(),
        };

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &group_id)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.auto.commit", "false")
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .create()
            .map_err(|e| HubError::Kafka(format!("创建消费者失败: {e}")))?;

        info!(brokers = %config.brokers, group_id, "Kafka 消费者已初始化");
        Ok(Self { consumer, group_id })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// 订阅指定的 topic 列表
    pub fn subscribe(&self, topics: &[&str]) -> Result<(), HubError> {
        self.consumer
            .subscribe(topics)
            .map_err(|e| HubError::Kafka(format!("订阅 topic 失败: {e}")))?;

        info!(?topics, group_id = %self.group_id, "已订阅 Kafka topics");
        Ok(())
    }

    /// 启动消费循环
    ///
    /// 使用 `tokio::select!` 同时监听消息流和关闭信号：
    /// - 关闭信号只在两条消息之间被观察到，正在执行的 handler 总能完成持久化或回退。
    /// - 单条消息的接收错误只记录日志；连续错误达到 `max_consecutive_errors`
    ///   或消息流结束时返回 [`StopReason::TransportFailed`]。
    pub async fn start<F, Fut>(
        self,
        mut shutdown: watch::Receiver<bool>,
        max_consecutive_errors: u32,
        redeliver_delay: Duration,
        handler: F,
    ) -> StopReason
    where
        F: Fn(ConsumerMessage) -> Fut,
        Fut: Future<Output = Disposition>,
    {
        use futures::StreamExt;

        if *shutdown.borrow() {
            return StopReason::Shutdown;
        }

        let stream = self.consumer.stream();
        futures::pin_mut!(stream);

        info!(group_id = %self.group_id, "Kafka 消费循环已启动");

        let mut consecutive_errors: u32 = 0;

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    // 发送端被丢弃同样视为关闭
                    if changed.is_err() || *shutdown.borrow() {
                        info!(group_id = %self.group_id, "收到关闭信号，Kafka 消费循环退出");
                        return StopReason::Shutdown;
                    }
                }

                msg_result = stream.next() => {
                    let Some(msg_result) = msg_result else {
                        warn!(group_id = %self.group_id, "Kafka 消息流意外结束");
                        return StopReason::TransportFailed(HubError::Kafka("消息流已结束".to_string()));
                    };

                    let msg = match msg_result {
                        Ok(borrowed_msg) => ConsumerMessage::from_borrowed(&borrowed_msg),
                        Err(e) => {
                            consecutive_errors += 1;
                            error!(
                                error = %e,
                                consecutive_errors,
                                group_id = %self.group_id,
                                "接收 Kafka 消息出错"
                            );
                            if consecutive_errors >= max_consecutive_errors {
                                return StopReason::TransportFailed(HubError::Kafka(format!(
                                    "连续 {consecutive_errors} 次接收失败: {e}"
                                )));
                            }
                            continue;
                        }
                    };
                    consecutive_errors = 0;

                    debug!(
                        topic = %msg.topic,
                        partition = msg.partition,
                        offset = msg.offset,
                        "收到 Kafka 消息"
                    );

                    let (topic, partition, offset) = (msg.topic.clone(), msg.partition, msg.offset);
                    match handler(msg).await {
                        Disposition::Ack => {
                            if let Err(e) = self.commit(&topic, partition, offset) {
                                warn!(error = %e, topic, partition, offset, "提交偏移量失败");
                            }
                        }
                        Disposition::Redeliver => {
                            tokio::time::sleep(redeliver_delay).await;
                            if let Err(e) = self.rewind(&topic, partition, offset) {
                                return StopReason::TransportFailed(e);
                            }
                        }
                    }
                }
            }
        }
    }

    /// 提交下一条待消费的偏移量
    fn commit(&self, topic: &str, partition: i32, offset: i64) -> Result<(), HubError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(topic, partition, Offset::Offset(offset + 1))
            .map_err(|e| HubError::Kafka(format!("构造提交列表失败: {e}")))?;
        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| HubError::Kafka(format!("提交偏移量失败: {e}")))
    }

    /// 将分区回退到指定偏移量，使该消息被重新投递
    fn rewind(&self, topic: &str, partition: i32, offset: i64) -> Result<(), HubError> {
        self.consumer
            .seek(topic, partition, Offset::Offset(offset), SEEK_TIMEOUT)
            .map_err(|e| HubError::Kafka(format!("回退偏移量失败: {e}")))?;
        debug!(topic, partition, offset, "已回退偏移量，等待重新投递");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
