//! Handlers for binding an email to a result.

use super::MessageResponse;
use crate::{
    Core, EmailSender, ResultBackend,
    error::CoreError,
    result::result_id_parse,
    verification_email::{verification_confirm, verification_request},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi, ToSchema};

pub const SEND_VERIFICATION_PATH: &str = "/result/{id}/send-verification";
pub const VERIFY_EMAIL_PATH: &str = "/result/{id}/verify-email";

#[derive(OpenApi)]
#[openapi(
    paths(send_verification, verify_email),
    components(schemas(
        VerificationSendQuery,
        VerifyEmailQuery,
        MessageResponse,
        crate::error::ErrorResponse
    ))
)]
pub(crate) struct VerificationApi;

/// Returns routes for the verification endpoints.
pub fn verification_routes<B: ResultBackend, E: EmailSender>() -> Router<Core<B, E>> {
    Router::new()
        .route(SEND_VERIFICATION_PATH, post(send_verification::<B, E>))
        .route(VERIFY_EMAIL_PATH, get(verify_email::<B, E>))
}

/// Query for requesting a verification email.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct VerificationSendQuery {
    /// Address to bind to the result.
    pub email: String,
}

/// Query carried by the link in the verification email.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct VerifyEmailQuery {
    /// Address being confirmed.
    pub email: String,
    /// Token from the verification email.
    pub token: String,
}

/// Issue a verification token and email the confirmation link.
///
/// Answers as soon as the token is stored; the email is delivered in the
/// background.
#[utoipa::path(
    post,
    path = "/{id}/send-verification",
    params(("id" = String, Path, description = "Result ID"), VerificationSendQuery),
    responses(
        (status = OK, body = MessageResponse),
        (status = BAD_REQUEST, body = crate::error::ErrorResponse),
        (status = NOT_FOUND, body = crate::error::ErrorResponse),
        (status = INTERNAL_SERVER_ERROR, body = crate::error::ErrorResponse)
    )
)]
pub async fn send_verification<B: ResultBackend, E: EmailSender>(
    State(core): State<Core<B, E>>,
    Path(id): Path<String>,
    Query(query): Query<VerificationSendQuery>,
) -> Result<Json<MessageResponse>, CoreError> {
    let id = result_id_parse(&id)?;
    verification_request(&core, id, &query.email).await?;
    Ok(Json(MessageResponse::new("Verification email sent")))
}

/// Confirm an email from the verification link.
#[utoipa::path(
    get,
    path = "/{id}/verify-email",
    params(("id" = String, Path, description = "Result ID"), VerifyEmailQuery),
    responses(
        (status = OK, body = MessageResponse),
        (status = BAD_REQUEST, body = crate::error::ErrorResponse),
        (status = NOT_FOUND, body = crate::error::ErrorResponse),
        (status = INTERNAL_SERVER_ERROR, body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_email<B: ResultBackend, E: EmailSender>(
    State(core): State<Core<B, E>>,
    Path(id): Path<String>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<MessageResponse>, CoreError> {
    let id = result_id_parse(&id)?;
    verification_confirm(&core, id, &query.email, &query.token).await?;
    Ok(Json(MessageResponse::new("Email verified successfully")))
}
