use std::fmt;

use serde::{Deserialize, Serialize};

/// Upstream wall post id (numeric, strictly increasing per wall).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PostId(pub i64);

impl PostId {
    /// Watermark value meaning "nothing relayed yet".
    pub const NONE: PostId = PostId(0);
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// One candidate item as returned by the upstream, before any interpretation.
#[derive(Clone, Debug)]
pub struct RawUpdate {
    pub id: PostId,
    pub raw: serde_json::Value,
}

/// Topic a post was classified into. `key()` is what team routing matches on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopicTag {
    Advertisement,
    Repost,
    Poll,
    Tagged(String),
    Plain,
}

impl TopicTag {
    pub fn key(&self) -> &str {
        match self {
            TopicTag::Advertisement => "ad",
            TopicTag::Repost => "repost",
            TopicTag::Poll => "poll",
            TopicTag::Tagged(tag) => tag,
            TopicTag::Plain => "post",
        }
    }
}

impl fmt::Display for TopicTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A post ready to be sent downstream.
///
/// Carries the upstream id so the watermark can be advanced without looking
/// at the raw payload again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedPost {
    pub post_id: PostId,
    pub topic: TopicTag,
    pub html: String,
}

/// What a single listener poll ended with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Idle,
    Skipped { post_id: PostId, topic: TopicTag },
    Delivered { post_id: PostId, topic: TopicTag },
}
