//! HTTP handlers.

pub mod results;
pub mod root;
pub mod statistics;
pub mod verification;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use results::{
    RESULT_ALL_PATH, RESULT_CREATE_PATH, RESULT_ID_PATH, RESULT_PATH, ResultCreateResponse,
    result_routes,
};
pub use root::{ROOT_PATH, root_routes};
pub use statistics::{SHARE_PATH, STATISTICS_PATH, VISIT_PATH, statistics_routes};
pub use verification::{
    SEND_VERIFICATION_PATH, VERIFY_EMAIL_PATH, VerificationSendQuery, VerifyEmailQuery,
    verification_routes,
};

/// Plain success body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// Success message.
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}
