//! Backend trait abstraction for storage-agnostic result persistence.
//!
//! This module defines the storage contract for quiz results and the
//! statistics singleton. [`MemoryBackend`](crate::MemoryBackend) and
//! [`RedisBackend`](crate::RedisBackend) ship with the crate; any other
//! document store can be plugged in by implementing [`ResultBackend`].

use crate::{
    result::{QuizResult, ResultInput},
    statistics::{Counter, Statistics},
};
use std::future::Future;
use uuid::Uuid;

/// Backend storage trait for results and statistics.
///
/// Every mutating method must be atomic per document: two concurrent calls on
/// the same record may interleave, but each one is applied whole. No other
/// concurrency guarantee is assumed by callers.
///
/// Methods addressing a single record return `None`/`false` when no record
/// exists with that id, so callers can report "not found" precisely.
pub trait ResultBackend: Clone + Send + Sync + 'static {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store a new result and return it with its assigned id.
    ///
    /// The stored record starts with no email and no verification token.
    fn result_create(
        &self,
        input: &ResultInput,
    ) -> impl Future<Output = Result<QuizResult, Self::Error>> + Send;

    /// Fetch a result by id, including its email fields.
    fn result_get(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<QuizResult>, Self::Error>> + Send;

    /// Fetch every stored result.
    fn result_list(&self) -> impl Future<Output = Result<Vec<QuizResult>, Self::Error>> + Send;

    /// Overwrite the trait scores and acceptance flag of a result.
    ///
    /// Must leave `email` and `email_verification_token` untouched, and must
    /// never turn `accept_email` back on (see [`QuizResult::apply_update`]).
    fn result_update(
        &self,
        id: Uuid,
        input: &ResultInput,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Delete a result.
    fn result_delete(&self, id: Uuid) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Replace the verification token hash of a result (last write wins).
    fn verification_token_set(
        &self,
        id: Uuid,
        token_hash: &str,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Bind an email to a result and close it to further binding.
    ///
    /// Sets `email` and clears `accept_email` in one document update.
    fn email_bind(
        &self,
        id: Uuid,
        email: &str,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Read the statistics singleton, if any counter was ever incremented.
    fn statistics_get(&self)
    -> impl Future<Output = Result<Option<Statistics>, Self::Error>> + Send;

    /// Atomically increment one counter, creating the singleton on first use.
    ///
    /// A counter that exceeds the store's integer range wraps to zero instead
    /// of failing: `u64::MAX` for [`MemoryBackend`](crate::MemoryBackend),
    /// `i64::MAX` for [`RedisBackend`](crate::RedisBackend).
    fn statistics_increment(
        &self,
        counter: Counter,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
