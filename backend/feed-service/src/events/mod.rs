//! Real-time post events
//!
//! Fire-and-forget fan-out to whoever is subscribed right now. No
//! acknowledgment, persistence or replay; a subscriber that falls behind
//! skips what it missed.

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::models::PostView;

/// Topic carrying every post mutation.
pub const POSTS_TOPIC: &str = "posts";

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostAction {
    Created,
    Updated,
    Deleted,
}

/// Event published after a committed post write. `post` is absent for deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEvent {
    pub action: PostAction,
    pub post_id: Uuid,
    pub post: Option<PostView>,
}

impl FeedEvent {
    pub fn created(post: PostView) -> Self {
        Self {
            action: PostAction::Created,
            post_id: post.id,
            post: Some(post),
        }
    }

    pub fn updated(post: PostView) -> Self {
        Self {
            action: PostAction::Updated,
            post_id: post.id,
            post: Some(post),
        }
    }

    pub fn deleted(post_id: Uuid) -> Self {
        Self {
            action: PostAction::Deleted,
            post_id,
            post: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("topic {0} is closed")]
    Closed(String),
}

#[async_trait]
pub trait EventBroadcaster: Send + Sync {
    /// Deliver `event` to the current subscribers of `topic`, returning how
    /// many received it.
    async fn publish(&self, topic: &str, event: FeedEvent) -> Result<usize, BroadcastError>;

    /// Receive events published to `topic` from now on.
    fn subscribe(&self, topic: &str) -> broadcast::Receiver<FeedEvent>;
}

/// In-process hub: one broadcast channel per topic.
pub struct ChannelBroadcaster {
    topics: DashMap<String, broadcast::Sender<FeedEvent>>,
    capacity: usize,
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventBroadcaster for ChannelBroadcaster {
    async fn publish(&self, topic: &str, event: FeedEvent) -> Result<usize, BroadcastError> {
        let Some(sender) = self.topics.get(topic) else {
            return Ok(0);
        };

        // send only fails when nobody is listening
        Ok(sender.send(event).unwrap_or(0))
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<FeedEvent> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }
}

/// Turn a receiver into a stream that skips lagged events and ends when the
/// topic closes.
pub fn event_stream(rx: broadcast::Receiver<FeedEvent>) -> impl Stream<Item = FeedEvent> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((event, rx)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}
