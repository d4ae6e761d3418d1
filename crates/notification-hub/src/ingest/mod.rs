//! 事件摄取
//!
//! 绑定表 → 每个绑定一个参数化摄取器 → 由监督者持有各自的订阅。

pub mod bindings;
pub mod bus;
pub mod ingestor;
pub mod supervisor;

pub use bindings::{BINDINGS, Binding, binding_for};
pub use bus::{BusMessage, Disposition, EventBus, InMemoryEventBus, KafkaEventBus, MessageHandler};
pub use ingestor::{EventIngestor, build_records};
pub use supervisor::IngestionSupervisor;
