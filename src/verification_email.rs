//! Email verification workflow.
//!
//! A result moves `Unverified -> TokenIssued -> Verified`. Requesting
//! verification issues a fresh token (replacing any earlier one) and mails the
//! link in the background; confirming checks the token, binds the email, closes
//! the record and mails a confirmation synchronously.
//!
//! Neither step holds a lock between its read and its write. Two requests for
//! the same record race on the token (last write wins); two confirmations with
//! the same valid token may both bind and both send mail, converging on the
//! same end state.

use crate::{
    Core, EmailSender, ResultBackend,
    error::CoreError,
    result::{QuizResult, VerificationState, result_get},
    tokens::token_hash_sha256,
    verification::{confirmation_message, verification_message},
};
use uuid::Uuid;

/// Issue a verification token for `email` and queue the link email.
///
/// Returns once the token is stored; delivery happens in the background and
/// its failures are only logged.
pub async fn verification_request<B: ResultBackend, E: EmailSender>(
    core: &Core<B, E>,
    id: Uuid,
    email: &str,
) -> Result<(), CoreError> {
    let result = result_get(core, id).await?;
    if !result.accept_email {
        return Err(CoreError::AlreadyVerified);
    }

    let token = core.codec().encode(email)?;
    let stored = core
        .backend()
        .verification_token_set(id, &token_hash_sha256(&token))
        .await
        .map_err(CoreError::from_backend)?;
    if !stored {
        return Err(CoreError::RecordNotFound);
    }

    tracing::info!(result_id = %id, "verification token issued");

    core.outbox()
        .submit(verification_message(core.config(), id, email, &token));

    Ok(())
}

/// Bind `email` to a result if `token` is the one most recently issued for it.
///
/// Replaying the exact confirmation (same email and token) on a record it
/// already verified succeeds without changing anything or sending mail.
///
/// The email is persisted before the confirmation mail is sent. If sending
/// fails this returns [`CoreError::DeliveryFailure`] although the record is
/// already verified.
pub async fn verification_confirm<B: ResultBackend, E: EmailSender>(
    core: &Core<B, E>,
    id: Uuid,
    email: &str,
    token: &str,
) -> Result<(), CoreError> {
    let result = result_get(core, id).await?;
    let token_matches = token_matches(&result, token);

    match result.verification_state() {
        VerificationState::Verified
            if token_matches && result.email.as_deref() == Some(email) =>
        {
            tracing::debug!(result_id = %id, "verification replayed");
            return Ok(());
        }
        VerificationState::Verified | VerificationState::Closed => {
            return Err(CoreError::AlreadyVerified);
        }
        VerificationState::Unverified | VerificationState::TokenIssued => {}
    }

    if !token_matches {
        return Err(CoreError::InvalidToken);
    }

    if core.config().verification_email_strict {
        let issued_for = core
            .codec()
            .decode(token)
            .map_err(|_| CoreError::InvalidToken)?;
        if issued_for != email {
            tracing::warn!(result_id = %id, "token presented for a different email");
            return Err(CoreError::InvalidToken);
        }
    }

    let bound = core
        .backend()
        .email_bind(id, email)
        .await
        .map_err(CoreError::from_backend)?;
    if !bound {
        return Err(CoreError::RecordNotFound);
    }

    tracing::info!(result_id = %id, "email verified");

    let message = confirmation_message(core.config(), id, email);
    core.email_sender()
        .send(&message.to, &message.subject, &message.body)
        .await
        .map_err(|e| {
            tracing::warn!(result_id = %id, error = %e, "email bound but confirmation mail failed");
            CoreError::DeliveryFailure(e)
        })
}

fn token_matches(result: &QuizResult, token: &str) -> bool {
    result
        .email_verification_token
        .as_deref()
        .is_some_and(|stored| stored == token_hash_sha256(token))
}
