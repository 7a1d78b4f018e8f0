//! GraphQL Subscriptions (WebSocket support)

use async_graphql::{Context, Enum, SimpleObject, Subscription, ID};
use futures_util::stream::{Stream, StreamExt};
use std::sync::Arc;

use super::content::PostObject;
use crate::events::{event_stream, EventBroadcaster, FeedEvent, PostAction, POSTS_TOPIC};

#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
#[graphql(name = "PostAction")]
pub enum PostActionObject {
    Created,
    Updated,
    Deleted,
}

impl From<PostAction> for PostActionObject {
    fn from(action: PostAction) -> Self {
        match action {
            PostAction::Created => PostActionObject::Created,
            PostAction::Updated => PostActionObject::Updated,
            PostAction::Deleted => PostActionObject::Deleted,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(name = "FeedEvent")]
pub struct FeedEventObject {
    pub action: PostActionObject,
    pub post_id: ID,
    pub post: Option<PostObject>,
}

impl From<FeedEvent> for FeedEventObject {
    fn from(event: FeedEvent) -> Self {
        FeedEventObject {
            action: event.action.into(),
            post_id: ID(event.post_id.to_string()),
            post: event.post.map(PostObject::from),
        }
    }
}

#[derive(Default)]
pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Post created/updated/deleted events from the moment of subscribing
    async fn post_events(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<impl Stream<Item = FeedEventObject>> {
        let events = ctx.data::<Arc<dyn EventBroadcaster>>()?;
        let rx = events.subscribe(POSTS_TOPIC);
        Ok(event_stream(rx).map(FeedEventObject::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChannelBroadcaster;
    use async_graphql::{EmptyMutation, Object, Schema};
    use uuid::Uuid;

    struct Q;

    #[Object]
    impl Q {
        async fn ok(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_post_events_stream() {
        let hub = Arc::new(ChannelBroadcaster::default());
        let events: Arc<dyn EventBroadcaster> = hub.clone();
        let schema = Schema::build(Q, EmptyMutation, SubscriptionRoot)
            .data(events)
            .finish();

        let mut stream = schema.execute_stream("subscription { postEvents { action postId } }");

        // wait until the resolver has subscribed
        let post_id = Uuid::new_v4();
        let publisher = {
            let hub = hub.clone();
            tokio::spawn(async move {
                while hub.subscriber_count(POSTS_TOPIC) == 0 {
                    tokio::task::yield_now().await;
                }
                hub.publish(POSTS_TOPIC, FeedEvent::deleted(post_id)).await.unwrap();
            })
        };

        let response = stream.next().await.unwrap();
        publisher.await.unwrap();

        assert!(response.errors.is_empty());
        let data = response.data.into_json().unwrap();
        assert_eq!(data["postEvents"]["action"], "DELETED");
        assert_eq!(data["postEvents"]["postId"], post_id.to_string());
    }
}
