//! # pasulol-core
//!
//! Backend for the Pasulol personality test: stores quiz results, counts
//! visits and shares, and lets a user bind an email address to a result once
//! they have proven they own it.
//!
//! ## Features
//!
//! - **Result store** over any [`ResultBackend`] (Redis and in-memory included)
//! - **Visit/share statistics** kept in one lazily created aggregate
//! - **Email verification** with encrypted, single-slot tokens
//! - **Background delivery** of verification links, synchronous confirmation mail
//! - **OpenAPI** document for every endpoint
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pasulol_core::{Core, CoreConfig, RedisBackend, SmtpEmailSender};
//!
//! let config = CoreConfig::from_env()?;
//! let backend = RedisBackend::connect(&config).await?;
//! let mailer = SmtpEmailSender::from_config(&config)?;
//! let core = Core::new(config, backend, mailer)?;
//!
//! let app = axum::Router::new().merge(core.routes::<()>());
//! ```
//!
//! ## Endpoints
//!
//! - `GET /` - Welcome message
//! - `GET /result/statistics` - Read counters
//! - `POST /result/visit` - Count a visit
//! - `POST /result/share` - Count a share
//! - `GET /result/all` - List results
//! - `POST /result/create` - Create a result
//! - `GET /result/{id}` - Fetch a result (email fields stripped)
//! - `PUT /result/{id}` - Update a result
//! - `DELETE /result/{id}` - Delete a result
//! - `POST /result/{id}/send-verification?email=` - Email a verification link
//! - `GET /result/{id}/verify-email?email=&token=` - Confirm an email

mod backend;
mod config;
mod email_sender;
mod error;
pub mod handlers;
pub mod mailer;
mod memory;
pub mod openapi;
mod redis_store;
pub mod result;
pub mod statistics;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tokens;
pub mod verification;
pub mod verification_email;

use axum::Router;
use std::sync::Arc;

pub use backend::ResultBackend;
pub use config::{CoreConfig, CoreConfigError};
pub use email_sender::{EmailSendError, EmailSender, SmtpEmailSender};
pub use error::{CoreError, ErrorResponse};
pub use handlers::MessageResponse;
pub use memory::MemoryBackend;
pub use redis_store::{RedisBackend, RedisBackendError};
pub use result::{PublicResult, QuizResult, ResultInput, TraitScores};
pub use statistics::{Counter, Statistics};

use mailer::Outbox;
use tokens::TokenCodec;

/// Result store, statistics and verification workflow. Cheap to clone.
///
/// # Type Parameters
///
/// - `B`: The backend implementing [`ResultBackend`]
/// - `E`: The email sender implementing [`EmailSender`] (defaults to the no-op `()`)
#[derive(Clone)]
pub struct Core<B: ResultBackend, E: EmailSender = ()> {
    config: Arc<CoreConfig>,
    backend: B,
    email_sender: E,
    codec: Arc<TokenCodec>,
    outbox: Outbox,
}

impl<B: ResultBackend, E: EmailSender> Core<B, E> {
    /// Create a service instance.
    ///
    /// Starts the background delivery task, so this must run inside a Tokio
    /// runtime.
    pub fn new(config: CoreConfig, backend: B, email_sender: E) -> Result<Self, CoreConfigError> {
        config.validate()?;
        let codec = TokenCodec::from_config(&config)
            .map_err(|e| CoreConfigError::Invalid(format!("encryption key: {e}")))?;
        let outbox = Outbox::spawn(email_sender.clone(), config.mail_queue_capacity);

        Ok(Self {
            config: Arc::new(config),
            backend,
            email_sender,
            codec: Arc::new(codec),
            outbox,
        })
    }

    /// Returns a router with every endpoint.
    pub fn routes<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        Router::new()
            .merge(handlers::root_routes::<B, E>())
            .merge(handlers::statistics_routes::<B, E>())
            .merge(handlers::result_routes::<B, E>())
            .merge(handlers::verification_routes::<B, E>())
            .with_state(self.clone())
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Returns a reference to the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns a reference to the email sender.
    pub fn email_sender(&self) -> &E {
        &self.email_sender
    }

    /// Returns a reference to the token codec.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub(crate) fn outbox(&self) -> &Outbox {
        &self.outbox
    }
}
