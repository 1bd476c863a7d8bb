//! Telegram adapter (teloxide).
//!
//! This crate implements the `vtr-core` MessagingPort over the Telegram Bot API.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

use tokio::time::sleep;

pub mod inbox;

pub use inbox::InboxListener;

use vtr_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    team::OutgoingMessage,
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_send_err(e: teloxide::RequestError) -> Error {
        Error::Delivery(format!("telegram error: {e}"))
    }

    fn map_check_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram getMe failed: {e}"))
    }

    /// Runs `op`, retrying once on flood control. Errors come back unmapped so
    /// each caller names them once.
    async fn with_retry<T, Fut>(
        &self,
        mut op: impl FnMut() -> Fut,
    ) -> std::result::Result<T, teloxide::RequestError>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::debug!("telegram asked to retry after {d:?}");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(other),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            supports_silent: true,
            max_message_len: 4096,
        }
    }

    async fn whoami(&self) -> Result<String> {
        let me = self
            .with_retry(|| self.bot.get_me())
            .await
            .map_err(Self::map_check_err)?;
        Ok(format!("@{}", me.username()))
    }

    async fn send(&self, msg: &OutgoingMessage) -> Result<MessageRef> {
        let sent = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(msg.chat_id), msg.html.clone())
                    .parse_mode(ParseMode::Html)
                    .disable_web_page_preview(true)
                    .disable_notification(msg.silent)
            })
            .await
            .map_err(Self::map_send_err)?;

        Ok(MessageRef {
            chat_id: msg.chat_id,
            message_id: MessageId(sent.id.0),
        })
    }
}
