//! Hexagonal ports the relay depends on. Adapter crates implement them.

use async_trait::async_trait;

use crate::{
    domain::{ParsedPost, PostId, RawUpdate},
    team::TeamConfig,
    Result,
};

/// The monitored feed.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// The single newest item with an id strictly greater than `since`, if any.
    async fn fetch_newest(&self, since: PostId) -> Result<Option<RawUpdate>>;
}

/// The chat that receives relayed posts.
#[async_trait]
pub trait DownstreamClient: Send + Sync {
    /// One-off startup check. Returns a human-readable identity on success.
    async fn verify_reachable(&self) -> Result<String>;

    async fn deliver(&self, post: &ParsedPost, team: &TeamConfig) -> Result<()>;
}
