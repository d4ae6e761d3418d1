//! 仓储 Trait 定义
//!
//! 摄取与读取都只依赖该接口，PostgreSQL 与内存实现可以互换，也便于 mock 测试。

use async_trait::async_trait;

use crate::error::{NotificationError, Result};
use crate::models::{NewNotification, NotificationRecord};

/// 通知仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepositoryTrait: Send + Sync {
    /// 原子写入一批记录，按写入顺序返回递增的 ID
    ///
    /// 任一记录失败则整批不可见；空批次直接返回校验错误，不访问后端。
    async fn insert_batch(&self, records: &[NewNotification]) -> Result<Vec<i64>>;

    /// 查询接收者的全部记录，按 ID 升序
    async fn find_by_recipient(&self, recipient_id: &str) -> Result<Vec<NotificationRecord>>;

    /// 就绪探针使用的轻量后端往返
    async fn health_check(&self) -> Result<()>;
}

/// 空批次校验，两种实现共用
pub(crate) fn ensure_non_empty(records: &[NewNotification]) -> Result<()> {
    if records.is_empty() {
        return Err(NotificationError::Validation(
            "写入批次不能为空".to_string(),
        ));
    }
    Ok(())
}
