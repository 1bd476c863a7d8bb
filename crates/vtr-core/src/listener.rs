use std::time::Duration;

use async_trait::async_trait;

use crate::{domain::CycleOutcome, Result};

/// Something the driver polls on its own interval.
///
/// `poll` runs exactly one cycle. Its `Err` is the soft-failure boundary: the
/// driver logs non-fatal errors and moves on, and stops only on
/// `Error::is_fatal`.
#[async_trait]
pub trait Listener: Send {
    fn name(&self) -> &'static str;

    /// Pause after each poll.
    fn interval(&self) -> Duration;

    async fn poll(&mut self) -> Result<CycleOutcome>;
}
