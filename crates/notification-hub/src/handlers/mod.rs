//! HTTP 处理器

pub mod feed;
pub mod health;
