//! 通知 feed

use axum::{Extension, Json, extract::State};
use tracing::info;

use crate::auth::Subject;
use crate::error::Result;
use crate::models::RenderedNotification;
use crate::renderer::NotificationRenderer;
use crate::state::AppState;

/// GET /api
///
/// 返回调用者的全部通知，按 ID 升序。无法渲染的记录被跳过，不影响整体响应。
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
) -> Result<Json<Vec<RenderedNotification>>> {
    let records = state.repository.find_by_recipient(subject.as_str()).await?;
    let feed = NotificationRenderer::render_feed(&records);

    info!(
        recipient_id = subject.as_str(),
        stored = records.len(),
        returned = feed.len(),
        "通知 feed 已生成"
    );

    Ok(Json(feed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockTokenVerifier;
    use crate::error::NotificationError;
    use crate::models::NotificationRecord;
    use crate::repository::MockNotificationRepositoryTrait;
    use std::sync::Arc;

    fn state(repo: MockNotificationRepositoryTrait) -> AppState {
        AppState::new(Arc::new(repo), Arc::new(MockTokenVerifier::new()))
    }

    #[tokio::test]
    async fn test_feed_renders_in_store_order() {
        let mut repo = MockNotificationRepositoryTrait::new();
        repo.expect_find_by_recipient()
            .withf(|recipient| recipient == "u1")
            .times(1)
            .returning(|_| {
                Ok(vec![
                    NotificationRecord {
                        id: 3,
                        recipient_id: "u1".to_string(),
                        kind: "negotiation".to_string(),
                        raw_payload: r#"{"project_id":8,"project_title":"Dam","user_uuid":"u1"}"#
                            .to_string(),
                        read: false,
                        created_at: chrono::Utc::now(),
                    },
                    NotificationRecord {
                        id: 5,
                        recipient_id: "u1".to_string(),
                        kind: "fill_user".to_string(),
                        raw_payload: r#"{"uuid":"u1","email":"a@b.com","role":"client"}"#
                            .to_string(),
                        read: true,
                        created_at: chrono::Utc::now(),
                    },
                ])
            });

        let Json(feed) = get_feed(State(state(repo)), Extension(Subject("u1".to_string())))
            .await
            .unwrap();

        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].notification_id, 3);
        assert_eq!(feed[0].target_data, 8);
        assert_eq!(feed[1].title, "Registration complete");
        assert!(feed[1].is_read);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut repo = MockNotificationRepositoryTrait::new();
        repo.expect_find_by_recipient()
            .returning(|_| Err(NotificationError::Persistence("pool timed out".into())));

        let result = get_feed(State(state(repo)), Extension(Subject("u1".to_string()))).await;
        assert!(matches!(result, Err(NotificationError::Persistence(_))));
    }
}
