//! In-process [`ResultBackend`] backed by a locked map.
//!
//! Each operation holds the lock for its whole read-modify-write, which gives
//! the single-document atomicity the backend contract asks for.

use crate::{
    ResultBackend,
    result::{QuizResult, ResultInput},
    statistics::{Counter, Statistics},
};
use std::{collections::HashMap, convert::Infallible, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
    results: HashMap<Uuid, QuizResult>,
    statistics: Option<Statistics>,
}

/// Memory backend. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultBackend for MemoryBackend {
    type Error = Infallible;

    async fn result_create(&self, input: &ResultInput) -> Result<QuizResult, Self::Error> {
        let result = QuizResult::from_input(Uuid::new_v4(), input);
        self.state
            .write()
            .await
            .results
            .insert(result.id, result.clone());
        Ok(result)
    }

    async fn result_get(&self, id: Uuid) -> Result<Option<QuizResult>, Self::Error> {
        Ok(self.state.read().await.results.get(&id).cloned())
    }

    async fn result_list(&self) -> Result<Vec<QuizResult>, Self::Error> {
        let state = self.state.read().await;
        let mut results: Vec<_> = state.results.values().cloned().collect();
        results.sort_by_key(|r| r.created_at);
        Ok(results)
    }

    async fn result_update(&self, id: Uuid, input: &ResultInput) -> Result<bool, Self::Error> {
        let mut state = self.state.write().await;
        match state.results.get_mut(&id) {
            Some(result) => {
                result.apply_update(input);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn result_delete(&self, id: Uuid) -> Result<bool, Self::Error> {
        Ok(self.state.write().await.results.remove(&id).is_some())
    }

    async fn verification_token_set(&self, id: Uuid, token_hash: &str) -> Result<bool, Self::Error> {
        let mut state = self.state.write().await;
        match state.results.get_mut(&id) {
            Some(result) => {
                result.email_verification_token = Some(token_hash.to_owned());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn email_bind(&self, id: Uuid, email: &str) -> Result<bool, Self::Error> {
        let mut state = self.state.write().await;
        match state.results.get_mut(&id) {
            Some(result) => {
                result.email = Some(email.to_owned());
                result.accept_email = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn statistics_get(&self) -> Result<Option<Statistics>, Self::Error> {
        Ok(self.state.read().await.statistics)
    }

    async fn statistics_increment(&self, counter: Counter) -> Result<(), Self::Error> {
        self.state
            .write()
            .await
            .statistics
            .get_or_insert_with(Statistics::default)
            .increment(counter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{result::TraitScores, testing::BackendContext};

    struct MemoryContext;

    impl BackendContext for MemoryContext {
        type Backend = MemoryBackend;

        async fn spawn() -> Option<MemoryBackend> {
            Some(MemoryBackend::new())
        }
    }

    crate::backend_suite!(MemoryContext);

    #[tokio::test]
    async fn clones_share_state() {
        let backend = MemoryBackend::new();
        let clone = backend.clone();
        let input = ResultInput {
            accept_email: true,
            traits: TraitScores::default(),
        };

        let created = clone.result_create(&input).await.unwrap();
        assert!(backend.result_get(created.id).await.unwrap().is_some());
    }
}
