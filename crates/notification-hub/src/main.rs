//! 通知中心服务
//!
//! 启动四个事件类别的摄取订阅，并提供通知 feed 的 REST API。

use std::sync::Arc;

use anyhow::Context;
use hub_shared::{
    config::AppConfig,
    database::Database,
    observability,
    retry::RetryPolicy,
};
use notification_hub::{
    auth::JwtVerifier,
    ingest::{IngestionSupervisor, KafkaEventBus},
    repository::{
        InMemoryNotificationRepository, MIGRATOR, NotificationRepositoryTrait,
        PgNotificationRepository,
    },
    routes,
    state::AppState,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "notification-hub";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME).context("加载配置失败")?;
    let _guard = observability::init(&config.observability, &config.service_name).await?;

    info!(
        environment = %config.environment,
        "Starting {} on {}",
        config.service_name,
        config.server_addr()
    );

    // 生产环境禁止使用默认密钥，开发环境仅告警
    if config.uses_default_secret_in_production() {
        anyhow::bail!("生产环境必须通过 HUB_JWT_SECRET 设置 JWT 密钥");
    }
    if config.auth.jwt_secret == hub_shared::config::DEFAULT_JWT_SECRET {
        warn!("Using default JWT secret - set HUB_JWT_SECRET for production");
    }

    // 存储：默认 PostgreSQL，调试时可切换为内存
    let (repository, database): (Arc<dyn NotificationRepositoryTrait>, Option<Database>) =
        if config.database.in_memory {
            warn!("使用内存存储，进程退出后通知记录将丢失");
            (Arc::new(InMemoryNotificationRepository::new()), None)
        } else {
            let db = Database::connect_with_retry(&config.database, &RetryPolicy::default())
                .await
                .context("连接数据库失败")?;
            db.run_migrations(&MIGRATOR).await?;
            (
                Arc::new(PgNotificationRepository::new(db.pool().clone())),
                Some(db),
            )
        };

    // 摄取：每个事件类别一个受监督的 Kafka 订阅
    let bus = Arc::new(KafkaEventBus::new(config.kafka.clone(), &config.ingestion));
    let mut supervisor = IngestionSupervisor::new(
        bus,
        repository.clone(),
        RetryPolicy::for_restarts(&config.ingestion),
    );
    supervisor.start();

    let verifier = Arc::new(JwtVerifier::new(&config.auth));
    let state = AppState::new(repository, verifier);
    let app = routes::build_app(state, &config.server);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：停止接收新连接，等待已有请求处理完毕（受请求超时约束）
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(e) = &served {
        error!(error = %e, "HTTP 服务异常退出");
    }

    supervisor
        .shutdown(config.ingestion.shutdown_timeout())
        .await;

    if let Some(db) = database {
        db.close().await;
    }

    info!("Server shutdown complete");
    served.map_err(Into::into)
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
