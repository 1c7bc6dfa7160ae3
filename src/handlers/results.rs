//! Handlers for result records.

use super::MessageResponse;
use crate::{
    Core, EmailSender, ResultBackend,
    error::CoreError,
    result::{
        PublicResult, ResultInput, result_create, result_delete, result_get_public,
        result_id_parse, result_list, result_update,
    },
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

pub const RESULT_PATH: &str = "/result";
pub const RESULT_ALL_PATH: &str = "/result/all";
pub const RESULT_CREATE_PATH: &str = "/result/create";
pub const RESULT_ID_PATH: &str = "/result/{id}";

#[derive(OpenApi)]
#[openapi(
    paths(result_all, result_create_post, result_get, result_update_put, result_delete_by_id),
    components(schemas(
        ResultInput,
        PublicResult,
        ResultCreateResponse,
        MessageResponse,
        crate::error::ErrorResponse
    ))
)]
pub(crate) struct ResultApi;

/// Returns routes for result endpoints.
pub fn result_routes<B: ResultBackend, E: EmailSender>() -> Router<Core<B, E>> {
    Router::new()
        .route(RESULT_ALL_PATH, get(result_all::<B, E>))
        .route(RESULT_CREATE_PATH, post(result_create_post::<B, E>))
        .route(
            RESULT_ID_PATH,
            get(result_get::<B, E>)
                .put(result_update_put::<B, E>)
                .delete(result_delete_by_id::<B, E>),
        )
}

/// Response for creating a result.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResultCreateResponse {
    /// ID of the new result.
    pub id: String,
    /// Success message.
    pub message: String,
}

/// List every result. Email fields are never included.
#[utoipa::path(
    get,
    path = "/all",
    responses(
        (status = OK, body = Vec<PublicResult>),
        (status = INTERNAL_SERVER_ERROR, body = crate::error::ErrorResponse)
    )
)]
pub async fn result_all<B: ResultBackend, E: EmailSender>(
    State(core): State<Core<B, E>>,
) -> Result<Json<Vec<PublicResult>>, CoreError> {
    Ok(Json(result_list(&core).await?))
}

/// Store a quiz submission.
#[utoipa::path(
    post,
    path = "/create",
    request_body = ResultInput,
    responses(
        (status = OK, body = ResultCreateResponse),
        (status = INTERNAL_SERVER_ERROR, body = crate::error::ErrorResponse)
    )
)]
pub async fn result_create_post<B: ResultBackend, E: EmailSender>(
    State(core): State<Core<B, E>>,
    Json(input): Json<ResultInput>,
) -> Result<Json<ResultCreateResponse>, CoreError> {
    let id = result_create(&core, &input).await?;
    Ok(Json(ResultCreateResponse {
        id: id.to_string(),
        message: "Result created successfully".to_string(),
    }))
}

/// Fetch one result. Email fields are never included.
#[utoipa::path(
    get,
    path = "/{id}",
    params(("id" = String, Path, description = "Result ID")),
    responses(
        (status = OK, body = PublicResult),
        (status = BAD_REQUEST, body = crate::error::ErrorResponse),
        (status = NOT_FOUND, body = crate::error::ErrorResponse)
    )
)]
pub async fn result_get<B: ResultBackend, E: EmailSender>(
    State(core): State<Core<B, E>>,
    Path(id): Path<String>,
) -> Result<Json<PublicResult>, CoreError> {
    let id = result_id_parse(&id)?;
    Ok(Json(result_get_public(&core, id).await?))
}

/// Replace the trait scores and acceptance flag of a result.
#[utoipa::path(
    put,
    path = "/{id}",
    params(("id" = String, Path, description = "Result ID")),
    request_body = ResultInput,
    responses(
        (status = OK, body = MessageResponse),
        (status = BAD_REQUEST, body = crate::error::ErrorResponse),
        (status = NOT_FOUND, body = crate::error::ErrorResponse)
    )
)]
pub async fn result_update_put<B: ResultBackend, E: EmailSender>(
    State(core): State<Core<B, E>>,
    Path(id): Path<String>,
    Json(input): Json<ResultInput>,
) -> Result<Json<MessageResponse>, CoreError> {
    let id = result_id_parse(&id)?;
    result_update(&core, id, &input).await?;
    Ok(Json(MessageResponse::new("Result updated successfully")))
}

/// Delete a result.
#[utoipa::path(
    delete,
    path = "/{id}",
    params(("id" = String, Path, description = "Result ID")),
    responses(
        (status = OK, body = MessageResponse),
        (status = BAD_REQUEST, body = crate::error::ErrorResponse),
        (status = NOT_FOUND, body = crate::error::ErrorResponse)
    )
)]
pub async fn result_delete_by_id<B: ResultBackend, E: EmailSender>(
    State(core): State<Core<B, E>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, CoreError> {
    let id = result_id_parse(&id)?;
    result_delete(&core, id).await?;
    Ok(Json(MessageResponse::new("Result deleted successfully")))
}
