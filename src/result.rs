//! Quiz result records and their public projections.

use crate::{Core, EmailSender, ResultBackend, error::CoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Parse a path identifier into a result id.
///
/// Anything that is not a UUID is reported as [`CoreError::InvalidId`], which
/// callers can tell apart from a well-formed id that matches no record.
pub fn result_id_parse(raw: &str) -> Result<Uuid, CoreError> {
    Uuid::parse_str(raw.trim()).map_err(|_| CoreError::InvalidId)
}

/// Trait scores produced by one quiz submission.
///
/// Opaque to this crate beyond "every field is an integer".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TraitScores {
    pub extroversion: i64,
    pub introversion: i64,
    pub sensing: i64,
    pub intuition: i64,
    pub thinking: i64,
    pub feeling: i64,
    pub judging: i64,
    pub perceiving: i64,
    pub enneagram_1: i64,
    pub enneagram_2: i64,
    pub enneagram_3: i64,
    pub enneagram_4: i64,
    pub enneagram_5: i64,
    pub enneagram_6: i64,
    pub enneagram_7: i64,
    pub enneagram_8: i64,
    pub enneagram_9: i64,
    pub gut_center: i64,
    pub heart_center: i64,
    pub head_center: i64,
}

/// Caller-writable part of a result, used by create and update.
///
/// Email fields are deliberately absent: they can only be written by the
/// verification workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResultInput {
    /// Whether the user allows an email to be bound to this result.
    pub accept_email: bool,
    #[serde(flatten)]
    pub traits: TraitScores,
}

/// A stored quiz result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: Uuid,
    pub accept_email: bool,
    pub email: Option<String>,
    /// SHA-256 hex digest of the most recently issued verification token.
    pub email_verification_token: Option<String>,
    pub traits: TraitScores,
    pub created_at: DateTime<Utc>,
}

impl QuizResult {
    /// Build a fresh record from caller input. No email, no token.
    pub fn from_input(id: Uuid, input: &ResultInput) -> Self {
        Self {
            id,
            accept_email: input.accept_email,
            email: None,
            email_verification_token: None,
            traits: input.traits,
            created_at: Utc::now(),
        }
    }

    /// Overwrite the allowlisted fields from an update.
    ///
    /// `accept_email` can be cleared but never re-opened once the record
    /// refuses binding.
    pub fn apply_update(&mut self, input: &ResultInput) {
        self.traits = input.traits;
        self.accept_email = self.accept_email && input.accept_email;
    }

    /// Current position in the verification state machine.
    pub fn verification_state(&self) -> VerificationState {
        match (self.accept_email, &self.email, &self.email_verification_token) {
            (false, Some(_), _) => VerificationState::Verified,
            (false, None, _) => VerificationState::Closed,
            (true, _, Some(_)) => VerificationState::TokenIssued,
            (true, _, None) => VerificationState::Unverified,
        }
    }

    /// Projection safe for unauthenticated readers.
    pub fn to_public(&self) -> PublicResult {
        PublicResult {
            id: self.id,
            accept_email: self.accept_email,
            traits: self.traits,
            created_at: self.created_at,
        }
    }
}

/// Verification progress of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    /// Binding allowed, nothing issued yet.
    Unverified,
    /// A token has been issued and not yet consumed.
    TokenIssued,
    /// An email has been bound. Terminal.
    Verified,
    /// The submitter opted out of email binding. Terminal.
    Closed,
}

/// Result as returned by read endpoints. Never carries email fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicResult {
    /// Result ID.
    pub id: Uuid,
    /// Whether an email may still be bound.
    pub accept_email: bool,
    #[serde(flatten)]
    pub traits: TraitScores,
    /// When the result was created (RFC 3339).
    pub created_at: DateTime<Utc>,
}

/// Store a new result and return its id.
pub async fn result_create<B: ResultBackend, E: EmailSender>(
    core: &Core<B, E>,
    input: &ResultInput,
) -> Result<Uuid, CoreError> {
    let result = core
        .backend()
        .result_create(input)
        .await
        .map_err(CoreError::from_backend)?;

    tracing::info!(result_id = %result.id, "result created");
    Ok(result.id)
}

/// Fetch a full result, email fields included.
pub async fn result_get<B: ResultBackend, E: EmailSender>(
    core: &Core<B, E>,
    id: Uuid,
) -> Result<QuizResult, CoreError> {
    core.backend()
        .result_get(id)
        .await
        .map_err(CoreError::from_backend)?
        .ok_or(CoreError::RecordNotFound)
}

/// Fetch a result with its email fields stripped.
pub async fn result_get_public<B: ResultBackend, E: EmailSender>(
    core: &Core<B, E>,
    id: Uuid,
) -> Result<PublicResult, CoreError> {
    result_get(core, id).await.map(|r| r.to_public())
}

/// Every stored result, public view.
pub async fn result_list<B: ResultBackend, E: EmailSender>(
    core: &Core<B, E>,
) -> Result<Vec<PublicResult>, CoreError> {
    let results = core
        .backend()
        .result_list()
        .await
        .map_err(CoreError::from_backend)?;
    Ok(results.iter().map(QuizResult::to_public).collect())
}

/// Overwrite the trait scores and acceptance flag of a result.
pub async fn result_update<B: ResultBackend, E: EmailSender>(
    core: &Core<B, E>,
    id: Uuid,
    input: &ResultInput,
) -> Result<(), CoreError> {
    let updated = core
        .backend()
        .result_update(id, input)
        .await
        .map_err(CoreError::from_backend)?;
    if !updated {
        return Err(CoreError::RecordNotFound);
    }

    tracing::info!(result_id = %id, "result updated");
    Ok(())
}

/// Delete a result.
pub async fn result_delete<B: ResultBackend, E: EmailSender>(
    core: &Core<B, E>,
    id: Uuid,
) -> Result<(), CoreError> {
    let deleted = core
        .backend()
        .result_delete(id)
        .await
        .map_err(CoreError::from_backend)?;
    if !deleted {
        return Err(CoreError::RecordNotFound);
    }

    tracing::info!(result_id = %id, "result deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoreConfig, MemoryBackend};
    use serde_json::json;

    fn input(accept_email: bool) -> ResultInput {
        ResultInput {
            accept_email,
            traits: TraitScores::default(),
        }
    }

    #[test]
    fn result_id_parse_distinguishes_malformed_ids() {
        assert!(matches!(result_id_parse("not-an-id"), Err(CoreError::InvalidId)));
        assert!(matches!(result_id_parse(""), Err(CoreError::InvalidId)));

        let id = Uuid::new_v4();
        assert_eq!(result_id_parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn public_view_never_serializes_email_fields() {
        let mut result = QuizResult::from_input(Uuid::new_v4(), &input(false));
        result.email = Some("a@x.com".to_string());
        result.email_verification_token = Some("abc".to_string());

        let value = serde_json::to_value(result.to_public()).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("email"));
        assert!(!object.contains_key("email_verification_token"));
        assert_eq!(object["enneagram_9"], json!(0));
        assert_eq!(object["accept_email"], json!(false));
    }

    #[test]
    fn public_view_serializes_id_and_timestamp_as_strings() {
        let result = QuizResult::from_input(Uuid::new_v4(), &input(true));

        let value = serde_json::to_value(result.to_public()).unwrap();
        assert_eq!(value["id"], json!(result.id.to_string()));
        let created_at = value["created_at"].as_str().unwrap();
        let parsed = DateTime::parse_from_rfc3339(created_at).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), result.created_at);
    }

    #[test]
    fn input_ignores_email_fields_from_callers() {
        let body = json!({
            "accept_email": true,
            "email": "sneaky@x.com",
            "email_verification_token": "forged",
            "extroversion": 3, "introversion": 1, "sensing": 0, "intuition": 0,
            "thinking": 0, "feeling": 0, "judging": 0, "perceiving": 0,
            "enneagram_1": 0, "enneagram_2": 0, "enneagram_3": 0, "enneagram_4": 0,
            "enneagram_5": 0, "enneagram_6": 0, "enneagram_7": 0, "enneagram_8": 0,
            "enneagram_9": 0, "gut_center": 0, "heart_center": 0, "head_center": 0
        });

        let parsed: ResultInput = serde_json::from_value(body).unwrap();
        let result = QuizResult::from_input(Uuid::new_v4(), &parsed);
        assert_eq!(result.email, None);
        assert_eq!(result.email_verification_token, None);
        assert_eq!(result.traits.extroversion, 3);
    }

    #[test]
    fn input_requires_every_trait_field() {
        let body = json!({ "accept_email": true, "extroversion": 1 });
        assert!(serde_json::from_value::<ResultInput>(body).is_err());
    }

    #[test]
    fn update_cannot_reopen_binding() {
        let mut result = QuizResult::from_input(Uuid::new_v4(), &input(true));
        result.apply_update(&input(false));
        assert!(!result.accept_email);

        result.apply_update(&input(true));
        assert!(!result.accept_email);
    }

    #[test]
    fn verification_state_follows_fields() {
        let mut result = QuizResult::from_input(Uuid::new_v4(), &input(true));
        assert_eq!(result.verification_state(), VerificationState::Unverified);

        result.email_verification_token = Some("hash".to_string());
        assert_eq!(result.verification_state(), VerificationState::TokenIssued);

        result.email = Some("a@x.com".to_string());
        result.accept_email = false;
        assert_eq!(result.verification_state(), VerificationState::Verified);

        let closed = QuizResult::from_input(Uuid::new_v4(), &input(false));
        assert_eq!(closed.verification_state(), VerificationState::Closed);
    }

    #[tokio::test]
    async fn store_operations_report_missing_records() {
        let core = Core::new(CoreConfig::default(), MemoryBackend::new(), ()).unwrap();
        let missing = Uuid::new_v4();

        assert!(matches!(result_get(&core, missing).await, Err(CoreError::RecordNotFound)));
        assert!(matches!(
            result_update(&core, missing, &input(true)).await,
            Err(CoreError::RecordNotFound)
        ));
        assert!(matches!(result_delete(&core, missing).await, Err(CoreError::RecordNotFound)));
    }

    #[tokio::test]
    async fn created_results_are_listed_without_email_fields() {
        let core = Core::new(CoreConfig::default(), MemoryBackend::new(), ()).unwrap();
        let id = result_create(&core, &input(true)).await.unwrap();
        core.backend().email_bind(id, "a@x.com").await.unwrap();

        let public = result_get_public(&core, id).await.unwrap();
        assert_eq!(public.id, id);
        assert!(!public.accept_email);

        let listed = result_list(&core).await.unwrap();
        assert_eq!(listed.len(), 1);
        let value = serde_json::to_value(&listed).unwrap();
        assert!(value[0].get("email").is_none());

        result_delete(&core, id).await.unwrap();
        assert!(result_list(&core).await.unwrap().is_empty());
    }
}
