//! Handlers for the visit/share counters.

use super::MessageResponse;
use crate::{
    Core, EmailSender, ResultBackend,
    error::CoreError,
    statistics::{Counter, Statistics, statistics_read, statistics_record},
};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use utoipa::OpenApi;

pub const STATISTICS_PATH: &str = "/result/statistics";
pub const VISIT_PATH: &str = "/result/visit";
pub const SHARE_PATH: &str = "/result/share";

#[derive(OpenApi)]
#[openapi(
    paths(statistics_get, visit_record, share_record),
    components(schemas(Statistics, MessageResponse, crate::error::ErrorResponse))
)]
pub(crate) struct StatisticsApi;

/// Returns routes for the statistics endpoints.
pub fn statistics_routes<B: ResultBackend, E: EmailSender>() -> Router<Core<B, E>> {
    Router::new()
        .route(STATISTICS_PATH, get(statistics_get::<B, E>))
        .route(VISIT_PATH, post(visit_record::<B, E>))
        .route(SHARE_PATH, post(share_record::<B, E>))
}

/// Read both counters. 404 until the first visit or share is recorded.
#[utoipa::path(
    get,
    path = "/statistics",
    responses(
        (status = OK, body = Statistics),
        (status = NOT_FOUND, body = crate::error::ErrorResponse),
        (status = INTERNAL_SERVER_ERROR, body = crate::error::ErrorResponse)
    )
)]
pub async fn statistics_get<B: ResultBackend, E: EmailSender>(
    State(core): State<Core<B, E>>,
) -> Result<Json<Statistics>, CoreError> {
    Ok(Json(statistics_read(&core).await?))
}

/// Count one visit.
#[utoipa::path(
    post,
    path = "/visit",
    responses(
        (status = OK, body = MessageResponse),
        (status = INTERNAL_SERVER_ERROR, body = crate::error::ErrorResponse)
    )
)]
pub async fn visit_record<B: ResultBackend, E: EmailSender>(
    State(core): State<Core<B, E>>,
) -> Result<Json<MessageResponse>, CoreError> {
    statistics_record(&core, Counter::Visitors).await?;
    Ok(Json(MessageResponse::new("Visit recorded successfully")))
}

/// Count one share.
#[utoipa::path(
    post,
    path = "/share",
    responses(
        (status = OK, body = MessageResponse),
        (status = INTERNAL_SERVER_ERROR, body = crate::error::ErrorResponse)
    )
)]
pub async fn share_record<B: ResultBackend, E: EmailSender>(
    State(core): State<Core<B, E>>,
) -> Result<Json<MessageResponse>, CoreError> {
    statistics_record(&core, Counter::Shares).await?;
    Ok(Json(MessageResponse::new("Share recorded successfully")))
}
