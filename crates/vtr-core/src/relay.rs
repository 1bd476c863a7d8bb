//! The wall relay: fetch → detect-new → classify → format → deliver → persist.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    domain::{CycleOutcome, PostId},
    listener::Listener,
    ports::{DownstreamClient, UpstreamClient},
    post::{Classifier, Formatter},
    store::JsonStore,
    team::TeamConfig,
    Result,
};

pub struct WallRelay {
    upstream: Arc<dyn UpstreamClient>,
    classifier: Arc<dyn Classifier>,
    formatter: Arc<dyn Formatter>,
    downstream: Arc<dyn DownstreamClient>,
    store: JsonStore,
    team: TeamConfig,
    watermark: PostId,
    interval: Duration,
}

impl WallRelay {
    /// Build a relay primed from durable state: the last relayed post id and
    /// the stored team config (or the compiled-in default when none exists).
    pub fn load(
        store: JsonStore,
        upstream: Arc<dyn UpstreamClient>,
        classifier: Arc<dyn Classifier>,
        formatter: Arc<dyn Formatter>,
        downstream: Arc<dyn DownstreamClient>,
        interval: Duration,
    ) -> Self {
        let watermark = store.load_watermark();
        let team = match store.load_team_config() {
            Some(team) => team,
            None => {
                tracing::info!("no stored team config, using the built-in one");
                TeamConfig::default()
            }
        };
        tracing::info!("last relayed post: {watermark}");

        Self {
            upstream,
            classifier,
            formatter,
            downstream,
            store,
            team,
            watermark,
            interval,
        }
    }

    pub fn watermark(&self) -> PostId {
        self.watermark
    }

    pub fn team(&self) -> &TeamConfig {
        &self.team
    }

    /// One cycle. The watermark moves only after the post was delivered.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        tracing::debug!("checking wall for posts after {}", self.watermark);
        let Some(update) = self.upstream.fetch_newest(self.watermark).await? else {
            return Ok(CycleOutcome::Idle);
        };
        if update.id <= self.watermark {
            tracing::debug!(
                "upstream returned post {} at or below watermark {}",
                update.id,
                self.watermark
            );
            return Ok(CycleOutcome::Idle);
        }

        tracing::info!("new post available: {}", update.id);
        let topic = self.classifier.classify(&update);
        let Some(post) = self.formatter.format(&update, &topic) else {
            tracing::info!("post {} with topic `{topic}` can't be relayed, dropping", update.id);
            return Ok(CycleOutcome::Skipped {
                post_id: update.id,
                topic,
            });
        };

        self.downstream.deliver(&post, &self.team).await?;

        self.watermark = post.post_id;
        self.store.save_watermark(post.post_id)?;
        Ok(CycleOutcome::Delivered {
            post_id: post.post_id,
            topic: post.topic,
        })
    }
}

#[async_trait]
impl Listener for WallRelay {
    fn name(&self) -> &'static str {
        "vk_listener"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self) -> Result<CycleOutcome> {
        self.run_cycle().await
    }
}
