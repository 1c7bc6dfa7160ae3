//! Contract tests for [`ResultBackend`] implementations.
//!
//! Every storage implementation must pass the same checks: ids resolve after
//! creation, updates never touch email fields or reopen binding, single-record
//! writes on a missing id create nothing, and counters appear on first use.
//!
//! # Usage
//!
//! Implement [`BackendContext`] for your store, then generate one test per
//! contract check:
//!
//! ```rust,ignore
//! use pasulol_core::testing::BackendContext;
//!
//! struct MyContext;
//!
//! impl BackendContext for MyContext {
//!     type Backend = MyBackend;
//!
//!     async fn spawn() -> Option<MyBackend> {
//!         Some(MyBackend::fresh().await)
//!     }
//! }
//!
//! pasulol_core::backend_suite!(MyContext);
//! ```
//!
//! [`ResultBackend`]: crate::ResultBackend

use crate::{
    ResultBackend,
    result::{ResultInput, TraitScores},
    statistics::Counter,
};
use std::{future::Future, time::Duration};
use uuid::Uuid;

/// Supplies the backend under test.
pub trait BackendContext: Sized + Send + Sync {
    /// The store being checked.
    type Backend: ResultBackend;

    /// Return an empty backend, or `None` when the store is unavailable and
    /// the check should be skipped.
    fn spawn() -> impl Future<Output = Option<Self::Backend>> + Send;
}

fn input(accept_email: bool, marker: i64) -> ResultInput {
    ResultInput {
        accept_email,
        traits: TraitScores {
            extroversion: marker,
            enneagram_5: marker * 2,
            head_center: marker * 3,
            ..TraitScores::default()
        },
    }
}

/// A created result resolves by id with every field intact.
pub async fn result_create_resolves_by_id<C: BackendContext>() {
    let Some(backend) = C::spawn().await else { return };

    let created = backend.result_create(&input(true, 4)).await.expect("create");
    assert_eq!(created.email, None);
    assert_eq!(created.email_verification_token, None);

    let fetched = backend
        .result_get(created.id)
        .await
        .expect("get")
        .expect("created result exists");
    assert_eq!(fetched, created);

    assert!(backend.result_get(Uuid::new_v4()).await.expect("get").is_none());
}

/// Updates replace scores but leave the email and token alone.
pub async fn result_update_preserves_email_fields<C: BackendContext>() {
    let Some(backend) = C::spawn().await else { return };
    let created = backend.result_create(&input(true, 1)).await.expect("create");
    assert!(backend.verification_token_set(created.id, "digest").await.expect("token"));

    assert!(backend.result_update(created.id, &input(true, 9)).await.expect("update"));

    let fetched = backend.result_get(created.id).await.expect("get").expect("exists");
    assert_eq!(fetched.traits, input(true, 9).traits);
    assert!(fetched.accept_email);
    assert_eq!(fetched.email_verification_token.as_deref(), Some("digest"));
    assert_eq!(fetched.email, None);
    assert_eq!(fetched.created_at, created.created_at);
}

/// `accept_email` can be cleared by an update but never set again.
pub async fn result_update_never_reopens_binding<C: BackendContext>() {
    let Some(backend) = C::spawn().await else { return };
    let created = backend.result_create(&input(true, 1)).await.expect("create");

    assert!(backend.result_update(created.id, &input(false, 2)).await.expect("update"));
    let fetched = backend.result_get(created.id).await.expect("get").expect("exists");
    assert!(!fetched.accept_email);

    assert!(backend.result_update(created.id, &input(true, 3)).await.expect("update"));
    let fetched = backend.result_get(created.id).await.expect("get").expect("exists");
    assert!(!fetched.accept_email);
    assert_eq!(fetched.traits, input(true, 3).traits);
}

/// Updating a missing id reports it and creates nothing.
pub async fn result_update_reports_missing<C: BackendContext>() {
    let Some(backend) = C::spawn().await else { return };
    let missing = Uuid::new_v4();

    assert!(!backend.result_update(missing, &input(true, 1)).await.expect("update"));
    assert!(backend.result_get(missing).await.expect("get").is_none());
}

/// Deleting removes the record from reads and from the listing.
pub async fn result_delete_removes_record<C: BackendContext>() {
    let Some(backend) = C::spawn().await else { return };
    let kept = backend.result_create(&input(true, 1)).await.expect("create");
    let removed = backend.result_create(&input(true, 2)).await.expect("create");

    assert!(backend.result_delete(removed.id).await.expect("delete"));
    assert!(!backend.result_delete(removed.id).await.expect("delete"));
    assert!(backend.result_get(removed.id).await.expect("get").is_none());

    let listed = backend.result_list().await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, kept.id);
}

/// Listing returns every result in creation order.
pub async fn result_list_orders_by_creation<C: BackendContext>() {
    let Some(backend) = C::spawn().await else { return };
    assert!(backend.result_list().await.expect("list").is_empty());

    let mut ids = Vec::new();
    for marker in 0..3 {
        ids.push(backend.result_create(&input(true, marker)).await.expect("create").id);
        // Distinct creation timestamps.
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let listed: Vec<_> = backend
        .result_list()
        .await
        .expect("list")
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(listed, ids);
}

/// The token slot holds only the latest hash, and a missing id stays missing.
pub async fn verification_token_set_overwrites<C: BackendContext>() {
    let Some(backend) = C::spawn().await else { return };
    let created = backend.result_create(&input(true, 1)).await.expect("create");

    assert!(backend.verification_token_set(created.id, "first").await.expect("token"));
    assert!(backend.verification_token_set(created.id, "second").await.expect("token"));
    let fetched = backend.result_get(created.id).await.expect("get").expect("exists");
    assert_eq!(fetched.email_verification_token.as_deref(), Some("second"));
    assert!(fetched.accept_email);

    let missing = Uuid::new_v4();
    assert!(!backend.verification_token_set(missing, "ghost").await.expect("token"));
    assert!(backend.result_get(missing).await.expect("get").is_none());
}

/// Binding sets the email and closes the record in one write.
pub async fn email_bind_closes_record<C: BackendContext>() {
    let Some(backend) = C::spawn().await else { return };
    let created = backend.result_create(&input(true, 1)).await.expect("create");
    backend.verification_token_set(created.id, "digest").await.expect("token");

    assert!(backend.email_bind(created.id, "a@x.com").await.expect("bind"));
    let fetched = backend.result_get(created.id).await.expect("get").expect("exists");
    assert_eq!(fetched.email.as_deref(), Some("a@x.com"));
    assert!(!fetched.accept_email);
    assert_eq!(fetched.email_verification_token.as_deref(), Some("digest"));

    let missing = Uuid::new_v4();
    assert!(!backend.email_bind(missing, "a@x.com").await.expect("bind"));
    assert!(backend.result_get(missing).await.expect("get").is_none());
}

/// The statistics record is absent until the first increment creates it.
pub async fn statistics_created_on_first_increment<C: BackendContext>() {
    let Some(backend) = C::spawn().await else { return };
    assert!(backend.statistics_get().await.expect("stats").is_none());

    backend.statistics_increment(Counter::Shares).await.expect("increment");
    let stats = backend.statistics_get().await.expect("stats").expect("created");
    assert_eq!(stats.cumulative_shares, 1);
    assert_eq!(stats.cumulative_visitors, 0);
}

/// Concurrent increments are all counted.
pub async fn statistics_concurrent_increments_are_counted<C: BackendContext>() {
    let Some(backend) = C::spawn().await else { return };

    let tasks: Vec<_> = (0..25)
        .map(|_| {
            let backend = backend.clone();
            tokio::spawn(async move { backend.statistics_increment(Counter::Visitors).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("join").expect("increment");
    }

    let stats = backend.statistics_get().await.expect("stats").expect("created");
    assert_eq!(stats.cumulative_visitors, 25);
    assert_eq!(stats.cumulative_shares, 0);
}

/// Generates one `#[tokio::test]` per backend contract check.
///
/// ```rust,ignore
/// pasulol_core::backend_suite!(MyContext);
/// ```
#[macro_export]
macro_rules! backend_suite {
    ($context:ty) => {
        #[tokio::test]
        async fn result_create_resolves_by_id() {
            $crate::testing::result_create_resolves_by_id::<$context>().await;
        }

        #[tokio::test]
        async fn result_update_preserves_email_fields() {
            $crate::testing::result_update_preserves_email_fields::<$context>().await;
        }

        #[tokio::test]
        async fn result_update_never_reopens_binding() {
            $crate::testing::result_update_never_reopens_binding::<$context>().await;
        }

        #[tokio::test]
        async fn result_update_reports_missing() {
            $crate::testing::result_update_reports_missing::<$context>().await;
        }

        #[tokio::test]
        async fn result_delete_removes_record() {
            $crate::testing::result_delete_removes_record::<$context>().await;
        }

        #[tokio::test]
        async fn result_list_orders_by_creation() {
            $crate::testing::result_list_orders_by_creation::<$context>().await;
        }

        #[tokio::test]
        async fn verification_token_set_overwrites() {
            $crate::testing::verification_token_set_overwrites::<$context>().await;
        }

        #[tokio::test]
        async fn email_bind_closes_record() {
            $crate::testing::email_bind_closes_record::<$context>().await;
        }

        #[tokio::test]
        async fn statistics_created_on_first_increment() {
            $crate::testing::statistics_created_on_first_increment::<$context>().await;
        }

        #[tokio::test]
        async fn statistics_concurrent_increments_are_counted() {
            $crate::testing::statistics_concurrent_increments_are_counted::<$context>().await;
        }
    };
}
