//! 数据访问层

mod memory;
mod postgres;
mod traits;

pub use memory::InMemoryNotificationRepository;
pub use postgres::{MIGRATOR, PgNotificationRepository};
pub use traits::NotificationRepositoryTrait;

#[cfg(test)]
pub use traits::MockNotificationRepositoryTrait;
