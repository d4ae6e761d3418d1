//! 共享库
//!
//! 通知中心各组件共用的配置、错误处理、数据库连接、Kafka 消费、重试和可观测性基础设施。

pub mod config;
pub mod database;
pub mod error;
pub mod kafka;
pub mod observability;
pub mod retry;
