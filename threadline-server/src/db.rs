use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use threadline_api::{
    ActivityEntry, CommentId, CommentNode, CommentRecord, DiscussionId, LikeRequest, NewReply,
    RawTimestamp, SessionId, Uuid,
};
use threadline_client::Forest;
use tokio::sync::RwLock;

use crate::Error;

/// Comments kept the way a document store keeps them: flat rows pointing to
/// their parent, assembled into threads on read
#[derive(Clone, Debug, Default)]
pub struct Db(Arc<RwLock<Tables>>);

#[derive(Debug, Default)]
struct Tables {
    // in insertion order
    comments: Vec<CommentRecord>,
    index: HashMap<(DiscussionId, CommentId), usize>,
    likes: HashSet<(CommentId, SessionId)>,
    activity: Vec<ActivityEntry>,
}

impl Tables {
    fn find(&self, discussion: &DiscussionId, id: &CommentId) -> Option<usize> {
        self.index.get(&(discussion.clone(), id.clone())).copied()
    }

    fn insert(&mut self, c: CommentRecord) -> bool {
        let key = (c.discussion_id.clone(), c.id.clone());
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.comments.len());
        self.comments.push(c);
        true
    }
}

impl Db {
    pub fn new(seed: Vec<CommentRecord>) -> Db {
        let mut tables = Tables::default();
        for c in seed {
            let id = c.id.clone();
            if !tables.insert(c) {
                tracing::warn!(comment=?id, "duplicate comment in seed, skipping");
            }
        }
        tracing::info!(comments = tables.comments.len(), "comment table ready");
        Db(Arc::new(RwLock::new(tables)))
    }

    pub async fn fetch_comments(&self, discussion: &DiscussionId) -> Vec<CommentNode> {
        let rows = self
            .0
            .read()
            .await
            .comments
            .iter()
            .filter(|c| &c.discussion_id == discussion)
            .cloned()
            .collect::<Vec<_>>();
        let forest = Forest::from_records(discussion, rows);
        forest
            .roots()
            .iter()
            .filter_map(|r| forest.subtree(r))
            .collect()
    }

    pub async fn record_like(&self, req: &LikeRequest) -> Result<(), Error> {
        let mut tables = self.0.write().await;
        let idx = tables
            .find(&req.discussion_id, &req.comment_id)
            .ok_or_else(|| Error::comment_not_found(req.comment_id.clone()))?;
        let key = (req.comment_id.clone(), req.session_id);
        let changed = match req.now_liked {
            true => tables.likes.insert(key),
            false => tables.likes.remove(&key),
        };
        if !changed {
            tracing::debug!(?req, "like already recorded for this session");
            return Ok(());
        }
        let comment = &mut tables.comments[idx];
        comment.like_count = match req.now_liked {
            true => comment.like_count.saturating_add(1),
            false => comment.like_count.saturating_sub(1),
        };
        Ok(())
    }

    pub async fn submit_reply(&self, reply: NewReply) -> Result<CommentNode, Error> {
        let mut tables = self.0.write().await;
        if let Some(p) = &reply.parent_id {
            if tables.find(&reply.discussion_id, p).is_none() {
                return Err(Error::comment_not_found(p.clone()));
            }
        }
        let record = CommentRecord {
            id: CommentId(Uuid::new_v4().to_string()),
            discussion_id: reply.discussion_id,
            parent_id: reply.parent_id,
            author_display_name: reply.author_display_name,
            author_contact_handle: reply.author_contact_handle,
            body: reply.body,
            like_count: 0,
            created_at: RawTimestamp::from(chrono::Utc::now()),
        };
        tables.insert(record.clone());
        Ok(CommentNode::from(record))
    }

    pub async fn log_activity(&self, entry: ActivityEntry) {
        self.0.write().await.activity.push(entry);
    }

    pub async fn fetch_activity(&self, discussion: &DiscussionId) -> Vec<ActivityEntry> {
        self.0
            .read()
            .await
            .activity
            .iter()
            .filter(|e| &e.discussion_id == discussion)
            .cloned()
            .collect()
    }
}
