//! Team routing rules: which Telegram chat a post goes to, and who gets pinged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ChatId, ParsedPost};

/// Where a routed post ends up.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    /// `TELEGRAM_TEAM_CHAT`.
    #[default]
    Team,
    /// `TELEGRAM_USER`, the operator's private chat.
    Operator,
    Chat(i64),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    pub target: RouteTarget,
    /// Usernames (with or without the leading `@`) prepended to the message.
    pub mentions: Vec<String>,
    /// Deliver without a notification sound.
    pub silent: bool,
}

/// Routing rules keyed by topic (`TopicTag::key`).
///
/// Either loaded in full from `team_config.json` or the compiled-in default;
/// the two are never merged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    pub routes: BTreeMap<String, Route>,
    pub fallback: Route,
}

/// A fully resolved outbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: ChatId,
    pub html: String,
    pub silent: bool,
}

impl TeamConfig {
    pub fn route_for(&self, topic_key: &str) -> &Route {
        self.routes.get(topic_key).unwrap_or(&self.fallback)
    }

    pub fn plan(&self, post: &ParsedPost, team_chat: ChatId, operator_chat: ChatId) -> OutgoingMessage {
        let route = self.route_for(post.topic.key());
        let chat_id = match route.target {
            RouteTarget::Team => team_chat,
            RouteTarget::Operator => operator_chat,
            RouteTarget::Chat(id) => ChatId(id),
        };

        let mentions = route
            .mentions
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(|m| {
                if m.starts_with('@') {
                    m.to_string()
                } else {
                    format!("@{m}")
                }
            })
            .collect::<Vec<_>>();

        let html = if mentions.is_empty() {
            post.html.clone()
        } else {
            format!("{}\n{}", mentions.join(" "), post.html)
        };

        OutgoingMessage {
            chat_id,
            html,
            silent: route.silent,
        }
    }
}
