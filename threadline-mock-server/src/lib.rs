use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use threadline_api::{
    ActivityEntry, CommentId, CommentNode, DiscussionId, Error, LikeRequest, NewReply,
    RawTimestamp, SessionId, Store, Uuid,
};

/// In-memory comment store, shared between clones
#[derive(Clone, Default)]
pub struct MockStore(Arc<Mutex<MockDb>>);

#[derive(Default)]
struct MockDb {
    discussions: HashMap<DiscussionId, Vec<CommentNode>>,
    likers: HashMap<CommentId, HashSet<SessionId>>,
    activity: Vec<ActivityEntry>,

    // number of upcoming calls that fail with `Error::Unavailable`
    failing_fetches: usize,
    failing_likes: usize,
    failing_activity: usize,
}

fn find_in<'a>(nodes: &'a mut [CommentNode], id: &CommentId) -> Option<&'a mut CommentNode> {
    for n in nodes {
        if &n.id == id {
            return Some(n);
        }
        if let Some(r) = find_in(&mut n.replies, id) {
            return Some(r);
        }
    }
    None
}

fn injected_failure(counter: &mut usize, what: &str) -> Result<(), Error> {
    if *counter == 0 {
        return Ok(());
    }
    *counter -= 1;
    Err(Error::Unavailable(format!("injected {what} failure")))
}

impl MockStore {
    pub fn new() -> MockStore {
        MockStore::default()
    }

    /// Adds a root comment with its replies at the end of its discussion
    pub fn insert_thread(&self, root: CommentNode) {
        self.0
            .lock()
            .discussions
            .entry(root.discussion_id.clone())
            .or_default()
            .push(root);
    }

    pub fn like_count(&self, discussion: &DiscussionId, id: &CommentId) -> Option<u64> {
        let mut db = self.0.lock();
        let roots = db.discussions.get_mut(discussion)?;
        find_in(roots, id).map(|c| c.like_count)
    }

    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.0.lock().activity.clone()
    }

    pub fn fail_next_fetches(&self, n: usize) {
        self.0.lock().failing_fetches = n;
    }

    pub fn fail_next_likes(&self, n: usize) {
        self.0.lock().failing_likes = n;
    }

    pub fn fail_next_activity(&self, n: usize) {
        self.0.lock().failing_activity = n;
    }
}

#[async_trait]
impl Store for MockStore {
    async fn fetch_comments(&self, discussion: &DiscussionId) -> Result<Vec<CommentNode>, Error> {
        let mut db = self.0.lock();
        injected_failure(&mut db.failing_fetches, "fetch")?;
        Ok(db.discussions.get(discussion).cloned().unwrap_or_default())
    }

    async fn record_like(&self, req: LikeRequest) -> Result<(), Error> {
        let mut db = self.0.lock();
        injected_failure(&mut db.failing_likes, "like")?;
        req.validate()?;
        let db = &mut *db;
        let comment = db
            .discussions
            .get_mut(&req.discussion_id)
            .and_then(|roots| find_in(roots, &req.comment_id))
            .ok_or_else(|| Error::CommentNotFound(req.comment_id.clone()))?;
        let likers = db.likers.entry(req.comment_id.clone()).or_default();
        // a session counts at most once
        match req.now_liked {
            true if likers.insert(req.session_id) => comment.like_count += 1,
            false if likers.remove(&req.session_id) => {
                comment.like_count = comment.like_count.saturating_sub(1)
            }
            _ => tracing::debug!(?req, "like request does not change anything"),
        }
        Ok(())
    }

    async fn submit_reply(&self, reply: NewReply) -> Result<CommentNode, Error> {
        reply.validate()?;
        let mut db = self.0.lock();
        let comment = CommentNode {
            id: CommentId(Uuid::new_v4().to_string()),
            discussion_id: reply.discussion_id.clone(),
            parent_id: reply.parent_id.clone(),
            author_display_name: reply.author_display_name,
            author_contact_handle: reply.author_contact_handle,
            body: reply.body,
            like_count: 0,
            created_at: RawTimestamp::from(chrono::Utc::now()),
            replies: Vec::new(),
        };
        let roots = db.discussions.entry(reply.discussion_id).or_default();
        match &reply.parent_id {
            None => roots.push(comment.clone()),
            Some(p) => find_in(roots, p)
                .ok_or_else(|| Error::CommentNotFound(p.clone()))?
                .replies
                .push(comment.clone()),
        }
        Ok(comment)
    }

    async fn log_activity(&self, entry: ActivityEntry) -> Result<(), Error> {
        let mut db = self.0.lock();
        injected_failure(&mut db.failing_activity, "activity")?;
        entry.validate()?;
        db.activity.push(entry);
        Ok(())
    }
}
