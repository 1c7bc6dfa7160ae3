//! Welcome endpoint.

use super::MessageResponse;
use crate::{Core, EmailSender, ResultBackend};
use axum::{Json, Router, routing::get};

pub const ROOT_PATH: &str = "/";

/// Returns the welcome route.
pub fn root_routes<B: ResultBackend, E: EmailSender>() -> Router<Core<B, E>> {
    Router::new().route(ROOT_PATH, get(root))
}

/// Static welcome message, doubles as a health check.
#[utoipa::path(
    get,
    path = "/",
    responses((status = OK, body = MessageResponse))
)]
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Welcome to the MBTI API!"))
}

#[cfg(test)]
mod tests {
    use crate::{Core, CoreConfig, MemoryBackend};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn root_returns_welcome_message() {
        let core = Core::new(CoreConfig::default(), MemoryBackend::new(), ()).unwrap();
        let app = core.routes::<()>();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "Welcome to the MBTI API!");
    }
}
