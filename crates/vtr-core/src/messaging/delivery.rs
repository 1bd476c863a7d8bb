use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, ParsedPost},
    errors::Error,
    messaging::port::MessagingPort,
    ports::DownstreamClient,
    team::TeamConfig,
    Result,
};

/// Delivers parsed posts through a messenger, applying team routing.
pub struct ChatDelivery {
    messenger: Arc<dyn MessagingPort>,
    team_chat: ChatId,
    operator_chat: ChatId,
}

impl ChatDelivery {
    pub fn new(messenger: Arc<dyn MessagingPort>, team_chat: ChatId, operator_chat: ChatId) -> Self {
        Self {
            messenger,
            team_chat,
            operator_chat,
        }
    }
}

#[async_trait]
impl DownstreamClient for ChatDelivery {
    async fn verify_reachable(&self) -> Result<String> {
        self.messenger.whoami().await
    }

    async fn deliver(&self, post: &ParsedPost, team: &TeamConfig) -> Result<()> {
        let caps = self.messenger.capabilities();
        if !caps.supports_html {
            return Err(Error::Delivery(
                "messenger cannot render HTML posts".to_string(),
            ));
        }

        let mut msg = team.plan(post, self.team_chat, self.operator_chat);
        if msg.silent && !caps.supports_silent {
            msg.silent = false;
        }
        let len = msg.html.chars().count();
        if len > caps.max_message_len {
            tracing::warn!(
                "post {} is {len} chars, over the {} limit",
                post.post_id,
                caps.max_message_len
            );
        }

        let sent = self.messenger.send(&msg).await?;
        tracing::debug!(
            "post {} sent to chat {} as message {}",
            post.post_id,
            sent.chat_id.0,
            sent.message_id.0
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{MessageId, MessageRef, PostId, TopicTag};
    use crate::messaging::types::MessagingCapabilities;
    use crate::team::{OutgoingMessage, Route, RouteTarget};
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct FakeMessenger {
        pub sent: Mutex<Vec<OutgoingMessage>>,
        pub fail_with: Mutex<Option<String>>,
    }

    impl FakeMessenger {
        pub fn sent(&self) -> Vec<OutgoingMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_html: true,
                supports_silent: false,
                max_message_len: 4096,
            }
        }

        async fn whoami(&self) -> Result<String> {
            match self.fail_with.lock().unwrap().clone() {
                Some(e) => Err(Error::External(e)),
                None => Ok("@relay_bot".to_string()),
            }
        }

        async fn send(&self, msg: &OutgoingMessage) -> Result<MessageRef> {
            if let Some(e) = self.fail_with.lock().unwrap().clone() {
                return Err(Error::Delivery(e));
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(msg.clone());
            Ok(MessageRef {
                chat_id: msg.chat_id,
                message_id: MessageId(sent.len() as i32),
            })
        }
    }

    #[tokio::test]
    async fn delivers_to_routed_chat() {
        let messenger = Arc::new(FakeMessenger::default());
        let delivery = ChatDelivery::new(messenger.clone(), ChatId(-100), ChatId(5));

        let mut team = TeamConfig::default();
        team.routes.insert(
            "poll".to_string(),
            Route {
                target: RouteTarget::Operator,
                mentions: vec!["captain".to_string()],
                silent: true,
            },
        );
        let post = ParsedPost {
            post_id: PostId(3),
            topic: TopicTag::Poll,
            html: "vote".to_string(),
        };

        assert_eq!(delivery.verify_reachable().await.unwrap(), "@relay_bot");
        delivery.deliver(&post, &team).await.unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, ChatId(5));
        assert_eq!(sent[0].html, "@captain\nvote");
        // Fake messenger cannot send silently.
        assert!(!sent[0].silent);
    }

    #[tokio::test]
    async fn send_failure_propagates() {
        let messenger = Arc::new(FakeMessenger::default());
        *messenger.fail_with.lock().unwrap() = Some("chat not found".to_string());
        let delivery = ChatDelivery::new(messenger.clone(), ChatId(-100), ChatId(5));
        let post = ParsedPost {
            post_id: PostId(3),
            topic: TopicTag::Plain,
            html: "x".to_string(),
        };

        let err = delivery
            .deliver(&post, &TeamConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Delivery(_)));
        assert!(!err.is_fatal());
    }
}
