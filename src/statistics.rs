//! Visit/share counters kept in a single aggregate record.

use crate::{Core, EmailSender, ResultBackend, error::CoreError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One of the two monotonic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Visitors,
    Shares,
}

impl Counter {
    /// Field name of the counter in the statistics record.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visitors => "cumulative_visitors",
            Self::Shares => "cumulative_shares",
        }
    }
}

/// The statistics singleton.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Statistics {
    pub cumulative_visitors: u64,
    pub cumulative_shares: u64,
}

impl Statistics {
    /// Add one to a counter, wrapping on overflow.
    pub fn increment(&mut self, counter: Counter) {
        let slot = match counter {
            Counter::Visitors => &mut self.cumulative_visitors,
            Counter::Shares => &mut self.cumulative_shares,
        };
        *slot = slot.wrapping_add(1);
    }
}

/// Read both counters. Fails with [`CoreError::StatisticsNotFound`] before the
/// first increment.
pub async fn statistics_read<B: ResultBackend, E: EmailSender>(
    core: &Core<B, E>,
) -> Result<Statistics, CoreError> {
    core.backend()
        .statistics_get()
        .await
        .map_err(CoreError::from_backend)?
        .ok_or(CoreError::StatisticsNotFound)
}

/// Increment a counter.
pub async fn statistics_record<B: ResultBackend, E: EmailSender>(
    core: &Core<B, E>,
    counter: Counter,
) -> Result<(), CoreError> {
    core.backend()
        .statistics_increment(counter)
        .await
        .map_err(CoreError::from_backend)?;

    tracing::debug!(counter = counter.as_str(), "counter incremented");
    Ok(())
}
