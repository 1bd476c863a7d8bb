//! Classification and formatting of VK wall posts into Telegram HTML.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::{
    domain::{ParsedPost, RawUpdate, TopicTag},
    formatting::{escape_html, truncate_chars},
};

/// Turns a raw upstream item into a topic.
pub trait Classifier: Send + Sync {
    fn classify(&self, update: &RawUpdate) -> TopicTag;
}

/// Turns a classified item into a message. `None` means the topic cannot be
/// represented downstream and the item is dropped.
pub trait Formatter: Send + Sync {
    fn format(&self, update: &RawUpdate, topic: &TopicTag) -> Option<ParsedPost>;
}

/// Typed view of the fields of a `wall.get` item we care about.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct WallPost {
    pub id: i64,
    pub date: i64,
    pub text: String,
    #[serde(deserialize_with = "vk_flag")]
    pub marked_as_ads: bool,
    #[serde(deserialize_with = "vk_flag")]
    pub is_pinned: bool,
    pub attachments: Vec<Attachment>,
    pub copy_history: Vec<WallPost>,
}

impl WallPost {
    pub fn from_raw(update: &RawUpdate) -> Self {
        match serde_json::from_value::<WallPost>(update.raw.clone()) {
            Ok(post) => post,
            Err(e) => {
                tracing::debug!("post {} has an unexpected shape: {e}", update.id);
                WallPost {
                    id: update.id.0,
                    ..Default::default()
                }
            }
        }
    }

    pub fn poll(&self) -> Option<&Poll> {
        self.attachments.iter().find_map(|a| a.poll.as_ref())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub poll: Option<Poll>,
    pub link: Option<Link>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Poll {
    pub question: String,
    pub answers: Vec<PollAnswer>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PollAnswer {
    pub text: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Link {
    pub url: String,
    pub title: String,
}

// VK sends flags as 0/1, occasionally as booleans.
fn vk_flag<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    })
}

fn hashtag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A tag starts the text or follows whitespace; `page#anchor` is not one.
    RE.get_or_init(|| Regex::new(r"(?:^|\s)#([\p{L}\p{N}_]+)").expect("valid regex"))
}

/// First hashtag of `text`, lower-cased, without the `#` and any `@club` suffix.
pub fn first_hashtag(text: &str) -> Option<String> {
    hashtag_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Default classifier + formatter for community wall posts.
#[derive(Clone, Debug)]
pub struct WallPostFormatter {
    team_name: String,
    group_id: i64,
    max_len: usize,
}

impl WallPostFormatter {
    pub fn new(team_name: impl Into<String>, group_id: i64, max_len: usize) -> Self {
        Self {
            team_name: team_name.into(),
            group_id,
            max_len,
        }
    }

    fn post_url(&self, post_id: i64) -> String {
        format!("https://vk.com/wall-{}_{}", self.group_id, post_id)
    }
}

impl Classifier for WallPostFormatter {
    fn classify(&self, update: &RawUpdate) -> TopicTag {
        let post = WallPost::from_raw(update);
        if post.marked_as_ads {
            return TopicTag::Advertisement;
        }
        if !post.copy_history.is_empty() {
            return TopicTag::Repost;
        }
        if post.poll().is_some() {
            return TopicTag::Poll;
        }
        match first_hashtag(&post.text) {
            Some(tag) => TopicTag::Tagged(tag),
            None => TopicTag::Plain,
        }
    }
}

impl Formatter for WallPostFormatter {
    fn format(&self, update: &RawUpdate, topic: &TopicTag) -> Option<ParsedPost> {
        if *topic == TopicTag::Advertisement {
            return None;
        }

        let post = WallPost::from_raw(update);
        let repost_text = post
            .copy_history
            .first()
            .map(|p| p.text.trim())
            .unwrap_or_default();
        if post.text.trim().is_empty()
            && repost_text.is_empty()
            && post.poll().is_none()
            && post.attachments.is_empty()
        {
            return None;
        }

        let mut header = format!(
            "<b>{} · #{}</b>",
            escape_html(&self.team_name),
            escape_html(topic.key())
        );
        if let Some(date) = DateTime::<Utc>::from_timestamp(post.date, 0).filter(|_| post.date > 0)
        {
            header.push_str(&format!("\n<i>{}</i>", date.format("%d.%m.%Y %H:%M UTC")));
        }

        let mut tail = Vec::new();
        if let Some(poll) = post.poll() {
            let mut lines = vec![format!("📊 <b>{}</b>", escape_html(&poll.question))];
            for answer in &poll.answers {
                lines.push(format!("• {}", escape_html(&answer.text)));
            }
            tail.push(lines.join("\n"));
        }
        for link in post.attachments.iter().filter_map(|a| a.link.as_ref()) {
            let title = if link.title.trim().is_empty() {
                &link.url
            } else {
                &link.title
            };
            tail.push(format!(
                "🔗 <a href=\"{}\">{}</a>",
                escape_html(&link.url),
                escape_html(title)
            ));
        }
        if let Some(summary) = attachment_summary(&post.attachments) {
            tail.push(format!("📎 {summary}"));
        }
        tail.push(format!(
            "<a href=\"{}\">Open in VK</a>",
            self.post_url(update.id.0)
        ));
        let tail = tail.join("\n\n");

        // Budget the free text so the whole message fits the chat limit.
        let overhead = header.chars().count() + tail.chars().count() + 32;
        let mut budget = self.max_len.saturating_sub(overhead);

        let mut sections = vec![header];
        let text = post.text.trim();
        if !text.is_empty() {
            let cut = truncate_chars(text, budget);
            budget = budget.saturating_sub(cut.chars().count());
            sections.push(escape_html(&cut));
        }
        if !repost_text.is_empty() && budget > 0 {
            let cut = truncate_chars(repost_text, budget);
            sections.push(format!("↪️ <i>{}</i>", escape_html(&cut)));
        }
        sections.push(tail);

        Some(ParsedPost {
            post_id: update.id,
            topic: topic.clone(),
            html: sections.join("\n\n"),
        })
    }
}

/// "2 photo, 1 video" for attachments that are not rendered inline.
fn attachment_summary(attachments: &[Attachment]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for a in attachments {
        if a.poll.is_some() || a.link.is_some() || a.kind.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(k, _)| *k == a.kind) {
            Some((_, n)) => *n += 1,
            None => counts.push((a.kind.as_str(), 1)),
        }
    }
    if counts.is_empty() {
        return None;
    }
    Some(
        counts
            .into_iter()
            .map(|(k, n)| format!("{n} {}", escape_html(k)))
            .collect::<Vec<_>>()
            .join(", "),
    )
}
