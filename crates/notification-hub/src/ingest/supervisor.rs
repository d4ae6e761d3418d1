//! 摄取监督者
//!
//! 每个绑定一个监督任务，各自持有一个订阅。订阅以子任务运行，
//! 监督任务等待其结束：收到关闭信号后的正常返回即退出；
//! 传输故障或 panic 则按指数退避重建该类别的订阅，不影响其他类别。

use std::sync::Arc;
use std::time::{Duration, Instant};

use hub_shared::observability::metrics;
use hub_shared::retry::RetryPolicy;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::bindings::{BINDINGS, Binding};
use super::bus::{EventBus, MessageHandler};
use super::ingestor::EventIngestor;
use crate::error::Result;
use crate::repository::NotificationRepositoryTrait;

/// 摄取监督者
pub struct IngestionSupervisor {
    bus: Arc<dyn EventBus>,
    repository: Arc<dyn NotificationRepositoryTrait>,
    policy: RetryPolicy,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl IngestionSupervisor {
    pub fn new(
        bus: Arc<dyn EventBus>,
        repository: Arc<dyn NotificationRepositoryTrait>,
        policy: RetryPolicy,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            bus,
            repository,
            policy,
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// 为全部绑定启动订阅
    pub fn start(&mut self) {
        self.start_bindings(&BINDINGS);
    }

    /// 为指定绑定启动订阅，已启动后重复调用会产生重复订阅
    pub fn start_bindings(&mut self, bindings: &[Binding]) {
        for binding in bindings {
            let ingestor = Arc::new(EventIngestor::new(*binding, self.repository.clone()));
            let handle = tokio::spawn(supervise(
                self.bus.clone(),
                *binding,
                ingestor,
                self.policy.clone(),
                self.shutdown_tx.subscribe(),
            ));
            self.handles.push(handle);
            info!(
                kind = binding.kind.tag(),
                routing_key = binding.routing_key,
                queue = binding.queue,
                "摄取订阅已启动"
            );
        }
    }

    /// 正在运行的监督任务数量
    pub fn running(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// 发出关闭信号并等待所有订阅收尾
    ///
    /// 订阅只在两条消息之间响应关闭，正在处理的消息会完成写入或回退。
    /// 超过 timeout 仍未结束的任务被强制中止。
    pub async fn shutdown(self, timeout: Duration) {
        info!("正在停止全部摄取订阅...");
        let _ = self.shutdown_tx.send(true);

        let abort_handles: Vec<_> = self.handles.iter().map(|h| h.abort_handle()).collect();
        let all = futures::future::join_all(self.handles);

        match tokio::time::timeout(timeout, all).await {
            Ok(_) => info!("全部摄取订阅已停止"),
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "摄取订阅未在超时内停止，强制中止");
                for handle in abort_handles {
                    handle.abort();
                }
            }
        }
    }
}

/// 持有订阅任务，监督任务被中止时一并中止订阅
struct SubscriptionTask(JoinHandle<Result<()>>);

impl Drop for SubscriptionTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// 单个绑定的监督循环
async fn supervise(
    bus: Arc<dyn EventBus>,
    binding: Binding,
    ingestor: Arc<EventIngestor>,
    policy: RetryPolicy,
    mut shutdown: watch::Receiver<bool>,
) {
    let kind = binding.kind.tag();
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let started = Instant::now();
        let mut subscription = SubscriptionTask(tokio::spawn({
            let bus = bus.clone();
            let handler: Arc<dyn MessageHandler> = ingestor.clone();
            let shutdown = shutdown.clone();
            async move { bus.consume(binding, shutdown, handler).await }
        }));

        match (&mut subscription.0).await {
            Ok(Ok(())) if *shutdown.borrow() => {
                info!(kind, "摄取订阅已正常退出");
                break;
            }
            Ok(Ok(())) => warn!(kind, "摄取订阅意外结束"),
            Ok(Err(e)) => error!(kind, error = %e, "摄取订阅传输故障"),
            Err(join_err) if join_err.is_panic() => error!(kind, "摄取订阅任务 panic"),
            Err(join_err) => error!(kind, error = %join_err, "摄取订阅任务被取消"),
        }

        if *shutdown.borrow() {
            break;
        }

        // 稳定运行超过退避上限后视为恢复，退避重新计数
        if started.elapsed() >= policy.max_delay {
            attempt = 0;
        }

        let delay = policy.delay_for_attempt(attempt);
        attempt = attempt.saturating_add(1);
        metrics::record_restart(kind);
        warn!(
            kind,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "将在退避后重建摄取订阅"
        );

        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
