use async_trait::async_trait;

use crate::{ActivityEntry, CommentNode, DiscussionId, Error, LikeRequest, NewReply};

/// The remote comment store a thread engine talks to
#[async_trait]
pub trait Store {
    /// Root comments of a discussion in display order, each with its replies
    async fn fetch_comments(&self, discussion: &DiscussionId) -> Result<Vec<CommentNode>, Error>;

    /// The store owns the authoritative like count and applies the delta
    async fn record_like(&self, req: LikeRequest) -> Result<(), Error>;

    async fn submit_reply(&self, reply: NewReply) -> Result<CommentNode, Error>;

    async fn log_activity(&self, entry: ActivityEntry) -> Result<(), Error>;
}

#[async_trait]
impl<S: Store + Send + Sync + ?Sized> Store for std::sync::Arc<S> {
    async fn fetch_comments(&self, discussion: &DiscussionId) -> Result<Vec<CommentNode>, Error> {
        (**self).fetch_comments(discussion).await
    }

    async fn record_like(&self, req: LikeRequest) -> Result<(), Error> {
        (**self).record_like(req).await
    }

    async fn submit_reply(&self, reply: NewReply) -> Result<CommentNode, Error> {
        (**self).submit_reply(reply).await
    }

    async fn log_activity(&self, entry: ActivityEntry) -> Result<(), Error> {
        (**self).log_activity(entry).await
    }
}
