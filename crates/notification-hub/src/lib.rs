//! 通知中心
//!
//! 订阅各业务服务在事件总线上发布的领域事件，将每个事件规范化为按接收者存储的通知记录，
//! 并通过带认证的 `GET /api` 接口返回渲染后的通知 feed。

pub mod auth;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod middleware;
pub mod models;
pub mod renderer;
pub mod repository;
pub mod routes;
pub mod state;

pub use error::{NotificationError, Result};
