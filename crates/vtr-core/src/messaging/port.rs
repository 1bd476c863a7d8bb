use async_trait::async_trait;

use crate::{
    domain::MessageRef,
    messaging::types::MessagingCapabilities,
    team::OutgoingMessage,
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the only implementation; routing and formatting happen before
/// a message reaches it.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Cheap authenticated call proving the bot can talk to the platform.
    async fn whoami(&self) -> Result<String>;

    async fn send(&self, msg: &OutgoingMessage) -> Result<MessageRef>;
}
