//! 领域模型

mod events;
mod kind;
mod record;

pub use events::{
    MIN_STATUS_RECIPIENTS, NegotiationCreatedEvent, NotificationEvent, ProjectJoinRequestEvent,
    ProjectStatusChangedEvent, RegistrationEvent,
};
pub use kind::NotificationKind;
pub use record::{NewNotification, NotificationRecord, RenderedContent, RenderedNotification};
