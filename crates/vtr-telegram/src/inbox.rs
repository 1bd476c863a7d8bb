//! Telegram-side listener.
//!
//! Runs behind the same soft-failure boundary as the wall relay but does no
//! work yet: every poll is idle. Enabled with `TELEGRAM_LISTENER_ENABLED`.

use std::time::Duration;

use async_trait::async_trait;

use vtr_core::{domain::CycleOutcome, listener::Listener, Result};

pub struct InboxListener {
    interval: Duration,
}

impl InboxListener {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl Listener for InboxListener {
    fn name(&self) -> &'static str {
        "telegram_listener"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self) -> Result<CycleOutcome> {
        Ok(CycleOutcome::Idle)
    }
}
