//! Runs listeners one after another, sleeping between polls.
//!
//! Soft failures are logged and swallowed; a fatal error stops the run and is
//! returned to the caller. Cancellation is only observed between cycles.

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    config::RunMode, domain::CycleOutcome, errors::Error, listener::Listener, store::JsonStore,
    Result,
};

/// Remembers the last soft failure so an identical one is not re-warned.
pub struct ErrorLog {
    store: Option<JsonStore>,
    last: Option<String>,
}

impl ErrorLog {
    /// Seed from the `last_api_error` record.
    pub fn load(store: JsonStore) -> Self {
        let last = store.load_last_error();
        Self {
            store: Some(store),
            last,
        }
    }

    /// In-memory only.
    pub fn detached() -> Self {
        Self {
            store: None,
            last: None,
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// Log a soft failure. Returns `true` when it repeats the previous one.
    pub fn report(&mut self, listener: &str, err: &Error) -> bool {
        let msg = format!("{listener}: {err}");
        if self.last.as_deref() == Some(msg.as_str()) {
            tracing::debug!("{msg} (repeated)");
            return true;
        }

        tracing::warn!("{msg}; the relay keeps running");
        self.persist(Some(&msg));
        self.last = Some(msg);
        false
    }

    /// Forget the last failure after a clean cycle of the listener that
    /// recorded it. Other listeners' successes leave it alone.
    pub fn clear(&mut self, listener: &str) {
        let owned = self
            .last
            .as_deref()
            .is_some_and(|last| last.starts_with(&format!("{listener}: ")));
        if owned {
            self.last = None;
            self.persist(None);
        }
    }

    fn persist(&self, msg: Option<&str>) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save_last_error(msg) {
            tracing::warn!("failed to record last error: {e}");
        }
    }
}

/// Poll `listeners` in order until `mode` says stop, a fatal error occurs, or
/// `shutdown` is cancelled.
///
/// Every poll is followed by that listener's interval, whatever it ended
/// with and in both modes, so a run-once process restarted right away still
/// waits between polls.
pub async fn run(
    listeners: &mut [Box<dyn Listener>],
    mode: RunMode,
    errors: &mut ErrorLog,
    shutdown: &CancellationToken,
) -> Result<()> {
    if listeners.is_empty() {
        return Err(Error::Config("no listeners enabled".to_string()));
    }

    loop {
        for listener in listeners.iter_mut() {
            if shutdown.is_cancelled() {
                tracing::info!("shutdown requested, stopping");
                return Ok(());
            }

            match listener.poll().await {
                Ok(outcome) => {
                    log_outcome(listener.name(), &outcome);
                    errors.clear(listener.name());
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    errors.report(listener.name(), &e);
                }
            }

            let interval = listener.interval();
            tracing::debug!("{} sleeps for {interval:?}", listener.name());
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("shutdown requested, stopping");
                    return Ok(());
                }
                _ = sleep(interval) => {}
            }
        }

        if mode == RunMode::Once {
            return Ok(());
        }
    }
}

fn log_outcome(listener: &str, outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Idle => tracing::debug!("{listener}: nothing new"),
        CycleOutcome::Skipped { post_id, topic } => {
            tracing::info!("{listener}: post {post_id} ({topic}) skipped")
        }
        CycleOutcome::Delivered { post_id, topic } => {
            tracing::info!("{listener}: post {post_id} ({topic}) relayed")
        }
    }
}
