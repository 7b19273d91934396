use std::collections::HashSet;

use chrono::Utc;
use futures::channel::mpsc;

use crate::{
    api::{
        ActivityEntry, CommentAnchor, CommentId, CommentNode, DiscussionId, Error,
        LikeNotification, LikeRequest, NewReply, SessionId, Store,
    },
    page::{page_of_root, page_roots},
    paginate, EngineConfig, ExpandState, Forest, LikeDelta, LikeState, Located, Page,
};

const LOAD_FAILED_MESSAGE: &str = "Failed to load comments.";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A more recent load was started after this one
    #[error("superseded by a more recent load")]
    Stale,

    #[error("{}", LOAD_FAILED_MESSAGE)]
    Fetch(#[source] Error),
}

/// Identifies one fetch of a discussion; only the latest one gets applied
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadTicket {
    token: u64,
    discussion: DiscussionId,
    page: usize,
}

impl LoadTicket {
    pub fn discussion(&self) -> &DiscussionId {
        &self.discussion
    }

    pub fn page(&self) -> usize {
        self.page
    }
}

/// A like toggle whose optimistic part is applied and whose store call is
/// still running
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingLike {
    request: LikeRequest,
    was_liked: bool,
    /// Like count of the comment before and after the optimistic patch
    patch: Option<(u64, u64)>,
    attribution: Option<Attribution>,
}

impl PendingLike {
    pub fn request(&self) -> &LikeRequest {
        &self.request
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct Attribution {
    author_display_name: String,
    body: String,
    parent_id: Option<CommentId>,
}

#[derive(Debug, Eq, PartialEq)]
pub enum LikeOutcome {
    /// Another toggle of the same comment is still running, or nothing is loaded
    Ignored,
    Liked { activity_logged: bool },
    Unliked,
    RolledBack(Error),
}

/// Comment threads of one discussion, as a reader sees them
pub struct Engine<S> {
    store: S,
    config: EngineConfig,
    session: SessionId,

    discussion: Option<DiscussionId>,
    forest: Forest,
    page: usize,
    load_error: Option<&'static str>,
    last_load: u64,

    likes: LikeState,
    likes_in_flight: HashSet<CommentId>,
    expanded: ExpandState,
    like_listeners: Vec<mpsc::UnboundedSender<LikeNotification>>,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S, config: EngineConfig) -> Engine<S> {
        Engine {
            store,
            config: config.sanitized(),
            session: SessionId::new(),
            discussion: None,
            forest: Forest::new(),
            page: 1,
            load_error: None,
            last_load: 0,
            likes: LikeState::new(),
            likes_in_flight: HashSet::new(),
            expanded: ExpandState::default(),
            like_listeners: Vec::new(),
        }
    }

    pub fn with_session(mut self, session: SessionId) -> Engine<S> {
        self.session = session;
        self
    }

    pub fn with_like_state(mut self, likes: LikeState) -> Engine<S> {
        self.likes = likes;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn discussion(&self) -> Option<&DiscussionId> {
        self.discussion.as_ref()
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn like_state(&self) -> &LikeState {
        &self.likes
    }

    /// Message to show instead of the list after a failed load
    pub fn load_error(&self) -> Option<&'static str> {
        self.load_error
    }

    // Loading

    pub fn begin_load(&mut self, discussion: DiscussionId, page: usize) -> LoadTicket {
        self.last_load += 1;
        LoadTicket {
            token: self.last_load,
            discussion,
            page,
        }
    }

    /// Applies the store's answer to `ticket`, unless a later load was begun since
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        res: Result<Vec<CommentNode>, Error>,
    ) -> Result<Page, LoadError> {
        if ticket.token != self.last_load {
            tracing::debug!(
                discussion=?ticket.discussion,
                token = ticket.token,
                latest = self.last_load,
                "dropping stale comment load"
            );
            return Err(LoadError::Stale);
        }
        if self.discussion.as_ref() != Some(&ticket.discussion) {
            self.expanded.clear();
        }
        self.page = ticket.page;
        match res {
            Ok(roots) => {
                self.forest = Forest::from_nodes(&ticket.discussion, roots);
                self.discussion = Some(ticket.discussion);
                self.load_error = None;
                tracing::debug!(
                    discussion=?self.discussion,
                    roots = self.forest.roots().len(),
                    comments = self.forest.len(),
                    "loaded comments"
                );
                Ok(self.current_page())
            }
            Err(err) => {
                tracing::warn!(discussion=?ticket.discussion, ?err, "failed loading comments");
                self.discussion = Some(ticket.discussion);
                self.forest = Forest::new();
                self.load_error = Some(LOAD_FAILED_MESSAGE);
                Err(LoadError::Fetch(err))
            }
        }
    }

    /// Fetches `discussion` and shows its page `page`
    pub async fn load_page(
        &mut self,
        discussion: DiscussionId,
        page: usize,
    ) -> Result<Page, LoadError> {
        let ticket = self.begin_load(discussion, page);
        let res = self.store.fetch_comments(&ticket.discussion).await;
        self.finish_load(ticket, res)
    }

    /// Fetches the current discussion again and goes back to the first page
    pub async fn refresh(&mut self) -> Result<Page, LoadError> {
        match self.discussion.clone() {
            Some(d) => self.load_page(d, 1).await,
            None => Err(LoadError::Fetch(Error::Unknown(String::from(
                "no discussion loaded",
            )))),
        }
    }

    // Paging

    pub fn current_page(&self) -> Page {
        paginate(&self.forest, self.page, self.config.page_size)
    }

    /// Switches page without fetching; the page number is not clamped
    pub fn show_page(&mut self, page: usize) -> Page {
        self.page = page;
        self.current_page()
    }

    pub fn total_comment_count(&self) -> usize {
        self.forest.total_comment_count()
    }

    // Expanding

    pub fn is_expanded(&self, id: &CommentId) -> bool {
        self.expanded.is_expanded(id)
    }

    pub fn toggle_expanded(&mut self, id: &CommentId) -> bool {
        self.expanded.toggle(id)
    }

    /// Ids displayed on the current page, in display order: roots, and the
    /// replies of expanded comments
    pub fn rendered_ids(&self) -> Vec<&CommentId> {
        page_roots(self.forest.roots(), self.page, self.config.page_size)
            .iter()
            .flat_map(|r| self.forest.walk(r, |id| self.expanded.is_expanded(id)))
            .collect()
    }

    /// Makes `id` visible by expanding its ancestors and moving to the page
    /// of its thread, returning that page
    pub fn reveal(&mut self, id: &CommentId) -> Option<usize> {
        let root = self.forest.root_of(id)?.clone();
        for a in self.forest.ancestors(id) {
            self.expanded.expand(a);
        }
        let page = page_of_root(self.forest.roots(), &root, self.config.page_size)?;
        self.page = page;
        Some(page)
    }

    /// Prepares the display of a deep-linked comment, to be followed by a
    /// `HighlightController` run once the page is rendered
    pub fn locate_for_highlight(&mut self, anchor: &CommentAnchor) -> Option<usize> {
        let res = self.reveal(anchor.comment_id());
        if res.is_none() {
            tracing::debug!(comment=?anchor.comment_id(), "deep-linked comment not in discussion");
        }
        res
    }

    // Locating

    pub fn locate(&self, id: &CommentId) -> Located<'_> {
        self.forest.locate(id)
    }

    // Liking

    pub fn is_liked(&self, id: &CommentId) -> bool {
        self.likes.contains(id)
    }

    pub fn subscribe_likes(&mut self) -> mpsc::UnboundedReceiver<LikeNotification> {
        let (sender, receiver) = mpsc::unbounded();
        self.like_listeners.push(sender);
        receiver
    }

    /// Applies a like toggle locally, returning what to send to the store
    ///
    /// Returns `None` while a toggle of the same comment is in flight.
    pub fn begin_like(&mut self, id: &CommentId) -> Option<PendingLike> {
        let discussion = match &self.discussion {
            Some(d) => d.clone(),
            None => {
                tracing::warn!(comment=?id, "like toggled before any discussion was loaded");
                return None;
            }
        };
        if !self.likes_in_flight.insert(id.clone()) {
            tracing::debug!(comment=?id, "like toggle already in flight, ignoring");
            return None;
        }

        let was_liked = self.likes.contains(id);
        self.likes.set(id, !was_liked);
        let delta = match was_liked {
            true => LikeDelta::Decrement,
            false => LikeDelta::Increment,
        };
        let patch = self.forest.patch_like_count(id, delta);
        if patch.is_none() {
            tracing::debug!(comment=?id, "liked comment is not in the loaded forest");
        }

        let located = self.forest.locate(id);
        let attribution = located.node().map(|n| Attribution {
            author_display_name: n.comment.author_display_name.clone(),
            body: n.comment.body.clone(),
            parent_id: located.parent_id().cloned(),
        });
        let discussion = located
            .node()
            .map(|n| n.comment.discussion_id.clone())
            .unwrap_or(discussion);

        Some(PendingLike {
            request: LikeRequest {
                comment_id: id.clone(),
                discussion_id: discussion,
                session_id: self.session,
                now_liked: !was_liked,
            },
            was_liked,
            patch,
            attribution,
        })
    }

    /// Settles a like toggle once the store answered
    pub async fn finish_like(
        &mut self,
        pending: PendingLike,
        res: Result<(), Error>,
    ) -> LikeOutcome {
        let PendingLike {
            request,
            was_liked,
            patch,
            attribution,
        } = pending;
        self.likes_in_flight.remove(&request.comment_id);

        if let Err(err) = res {
            tracing::info!(comment=?request.comment_id, ?err, "recording like failed, reverting");
            self.likes.set(&request.comment_id, was_liked);
            if self.config.rollback_like_count {
                if let Some((before, after)) = patch {
                    // the forest may have been reloaded meanwhile, leave fresh counts alone
                    let current = self
                        .forest
                        .get(&request.comment_id)
                        .map(|n| n.comment.like_count);
                    if current == Some(after) {
                        self.forest.set_like_count(&request.comment_id, before);
                    }
                }
            }
            return LikeOutcome::RolledBack(err);
        }

        if was_liked {
            return LikeOutcome::Unliked;
        }

        let mut activity_logged = false;
        if let Some(a) = attribution {
            let entry = ActivityEntry {
                author_display_name: a.author_display_name,
                comment_id: request.comment_id.clone(),
                discussion_id: request.discussion_id.clone(),
                body: a.body,
                is_reply: a.parent_id.is_some(),
                parent_id: a.parent_id,
                session_id: request.session_id,
                date: Utc::now(),
            };
            match self.store.log_activity(entry).await {
                Ok(()) => activity_logged = true,
                Err(err) => {
                    tracing::warn!(comment=?request.comment_id, ?err, "failed logging like activity")
                }
            }
        }

        let notification = LikeNotification {
            like_count: self
                .forest
                .get(&request.comment_id)
                .map(|n| n.comment.like_count),
            comment_id: request.comment_id,
            discussion_id: request.discussion_id,
        };
        self.like_listeners
            .retain(|l| l.unbounded_send(notification.clone()).is_ok());

        LikeOutcome::Liked { activity_logged }
    }

    /// Likes `id` if this session does not like it yet, unlikes it otherwise
    pub async fn toggle_like(&mut self, id: &CommentId) -> LikeOutcome {
        let pending = match self.begin_like(id) {
            Some(p) => p,
            None => return LikeOutcome::Ignored,
        };
        let res = self.store.record_like(pending.request().clone()).await;
        self.finish_like(pending, res).await
    }

    // Replying

    /// Submits a comment or reply, then refreshes the thread from the store
    pub async fn submit_reply(&mut self, reply: NewReply) -> Result<CommentNode, Error> {
        reply.validate()?;
        let created = self.store.submit_reply(reply).await?;
        tracing::debug!(comment=?created.id, "reply submitted, refreshing comments");
        if let Err(err) = self.refresh().await {
            tracing::warn!(?err, "failed refreshing comments after reply");
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use futures::{executor::block_on, StreamExt};
    use threadline_mock_server::MockStore;

    use super::*;
    use crate::forest::tests::{blog, node};

    fn id(s: &str) -> CommentId {
        CommentId::new(s)
    }

    fn like_count(e: &Engine<MockStore>, c: &str) -> u64 {
        e.forest().get(&id(c)).unwrap().comment.like_count
    }

    // c1 (3 likes) with a reply c2 (0 likes)
    fn scenario() -> Engine<MockStore> {
        let store = MockStore::new();
        store.insert_thread(node("c1", None, 3, vec![node("c2", Some("c1"), 0, vec![])]));
        let mut e = Engine::new(store, EngineConfig::default());
        block_on(e.load_page(blog(), 1)).unwrap();
        e
    }

    #[test]
    fn like_then_unlike_a_reply() {
        let mut e = scenario();
        assert_eq!(
            block_on(e.toggle_like(&id("c2"))),
            LikeOutcome::Liked {
                activity_logged: true
            }
        );
        assert_eq!(like_count(&e, "c2"), 1);
        assert_eq!(like_count(&e, "c1"), 3);
        assert!(e.is_liked(&id("c2")));

        assert_eq!(block_on(e.toggle_like(&id("c2"))), LikeOutcome::Unliked);
        assert_eq!(like_count(&e, "c2"), 0);
        assert_eq!(like_count(&e, "c1"), 3);
        assert!(!e.is_liked(&id("c2")));
    }

    #[test]
    fn unlike_at_zero_stays_zero() {
        let mut e = scenario();
        e = e.with_like_state({
            let mut s = LikeState::new();
            s.set(&id("c2"), true);
            s
        });
        assert_eq!(block_on(e.toggle_like(&id("c2"))), LikeOutcome::Unliked);
        assert_eq!(like_count(&e, "c2"), 0);
    }

    #[test]
    fn failed_like_is_rolled_back() {
        let mut e = scenario();
        e.store().fail_next_likes(1);
        let res = block_on(e.toggle_like(&id("c1")));
        assert!(matches!(res, LikeOutcome::RolledBack(Error::Unavailable(_))));
        assert!(!e.is_liked(&id("c1")));
        assert_eq!(like_count(&e, "c1"), 3);
        assert!(e.store().activity().is_empty());
    }

    #[test]
    fn failed_like_keeps_count_without_count_rollback() {
        let store = MockStore::new();
        store.insert_thread(node("c1", None, 3, vec![]));
        let mut e = Engine::new(
            store,
            EngineConfig {
                rollback_like_count: false,
                ..EngineConfig::default()
            },
        );
        block_on(e.load_page(blog(), 1)).unwrap();
        e.store().fail_next_likes(1);
        block_on(e.toggle_like(&id("c1")));
        assert!(!e.is_liked(&id("c1")));
        assert_eq!(like_count(&e, "c1"), 4);
    }

    #[test]
    fn optimistic_state_is_visible_before_the_store_answers() {
        let mut e = scenario();
        let pending = e.begin_like(&id("c2")).unwrap();
        assert!(e.is_liked(&id("c2")));
        assert_eq!(like_count(&e, "c2"), 1);
        assert_eq!(pending.request().now_liked, true);
        assert_eq!(pending.request().discussion_id, blog());

        // second toggle while the first is in flight is ignored
        assert_eq!(e.begin_like(&id("c2")), None);
        assert_eq!(block_on(e.toggle_like(&id("c2"))), LikeOutcome::Ignored);

        let res = block_on(e.store().record_like(pending.request().clone()));
        block_on(e.finish_like(pending, res));
        assert!(e.begin_like(&id("c2")).is_some());
    }

    #[test]
    fn activity_names_the_immediate_parent() {
        let store = MockStore::new();
        store.insert_thread(node(
            "root",
            None,
            0,
            vec![node(
                "a",
                Some("root"),
                0,
                vec![node("b", Some("a"), 0, vec![])],
            )],
        ));
        let mut e = Engine::new(store, EngineConfig::default());
        block_on(e.load_page(blog(), 1)).unwrap();
        block_on(e.toggle_like(&id("b")));

        let activity = e.store().activity();
        assert_eq!(activity.len(), 1);
        let entry = &activity[0];
        assert_eq!(entry.author_display_name, "author of b");
        assert_eq!(entry.comment_id, id("b"));
        assert_eq!(entry.discussion_id, blog());
        assert_eq!(entry.body, "body of b");
        assert!(entry.is_reply);
        assert_eq!(entry.parent_id, Some(id("a")));
        assert_eq!(entry.session_id, e.session());
    }

    #[test]
    fn unlikes_are_not_logged_nor_notified() {
        let mut e = scenario();
        let mut notifications = e.subscribe_likes();
        block_on(e.toggle_like(&id("c1")));
        block_on(e.toggle_like(&id("c1")));
        assert_eq!(e.store().activity().len(), 1);
        drop(e);
        let received = block_on(notifications.collect::<Vec<_>>());
        assert_eq!(
            received,
            vec![LikeNotification {
                comment_id: id("c1"),
                discussion_id: blog(),
                like_count: Some(4),
            }]
        );
    }

    #[test]
    fn activity_failure_does_not_revert_like() {
        let mut e = scenario();
        e.store().fail_next_activity(1);
        assert_eq!(
            block_on(e.toggle_like(&id("c1"))),
            LikeOutcome::Liked {
                activity_logged: false
            }
        );
        assert!(e.is_liked(&id("c1")));
        assert_eq!(like_count(&e, "c1"), 4);
    }

    #[test]
    fn liking_unknown_comment_still_reaches_store() {
        let mut e = scenario();
        let res = block_on(e.toggle_like(&id("ghost")));
        assert!(matches!(res, LikeOutcome::RolledBack(Error::CommentNotFound(_))));
        assert!(!e.is_liked(&id("ghost")));
    }

    #[test]
    fn like_before_load_is_ignored() {
        let mut e = Engine::new(MockStore::new(), EngineConfig::default());
        assert_eq!(block_on(e.toggle_like(&id("c1"))), LikeOutcome::Ignored);
        assert!(!e.is_liked(&id("c1")));
    }

    #[test]
    fn loads_third_page() {
        let store = MockStore::new();
        for i in 0..25 {
            store.insert_thread(node(&format!("r{i}"), None, 0, vec![]));
        }
        let mut e = Engine::new(store, EngineConfig::default());
        let page = block_on(e.load_page(blog(), 3)).unwrap();
        assert_eq!(page.comments.len(), 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_comment_count, 25);
        assert_eq!(e.show_page(1).comments.len(), 10);
    }

    #[test]
    fn stale_loads_are_dropped() {
        let mut e = scenario();
        let old = e.begin_load(DiscussionId::new("blog-2"), 1);
        let new = e.begin_load(blog(), 1);
        let old_res = block_on(e.store().fetch_comments(old.discussion()));
        assert!(matches!(e.finish_load(old, old_res), Err(LoadError::Stale)));
        let new_res = block_on(e.store().fetch_comments(new.discussion()));
        assert_eq!(e.finish_load(new, new_res).unwrap().total_comment_count, 2);
        assert_eq!(e.discussion(), Some(&blog()));
    }

    #[test]
    fn failed_load_replaces_list_with_message() {
        let mut e = scenario();
        e.store().fail_next_fetches(1);
        let err = block_on(e.load_page(blog(), 1)).unwrap_err();
        assert_eq!(err.to_string(), "Failed to load comments.");
        assert_eq!(e.load_error(), Some("Failed to load comments."));
        assert_eq!(e.total_comment_count(), 0);
        assert!(e.current_page().comments.is_empty());

        block_on(e.load_page(blog(), 1)).unwrap();
        assert_eq!(e.load_error(), None);
        assert_eq!(e.total_comment_count(), 2);
    }

    #[test]
    fn switching_discussion_resets_expansion() {
        let mut e = scenario();
        assert!(e.toggle_expanded(&id("c1")));
        block_on(e.load_page(blog(), 1)).unwrap();
        assert!(e.is_expanded(&id("c1")));
        block_on(e.load_page(DiscussionId::new("blog-2"), 1)).unwrap();
        assert!(!e.is_expanded(&id("c1")));
        assert_eq!(e.total_comment_count(), 0);
    }

    #[test]
    fn loaded_page_is_the_requested_one() {
        let mut e = scenario();
        block_on(e.load_page(blog(), 2)).unwrap();
        assert_eq!(e.current_page().page, 2);
        block_on(e.load_page(DiscussionId::new("blog-2"), 1)).unwrap();
        assert_eq!(e.current_page().page, 1);

        block_on(e.load_page(blog(), 3)).unwrap();
        e.store().fail_next_fetches(1);
        assert!(block_on(e.load_page(DiscussionId::new("blog-3"), 1)).is_err());
        assert_eq!(e.current_page().page, 1);
        assert_eq!(e.discussion(), Some(&DiscussionId::new("blog-3")));
    }

    #[test]
    fn rendered_ids_follow_expansion() {
        let mut e = scenario();
        assert_eq!(e.rendered_ids(), vec![&id("c1")]);
        e.toggle_expanded(&id("c1"));
        assert_eq!(e.rendered_ids(), vec![&id("c1"), &id("c2")]);
    }

    #[test]
    fn reveal_expands_ancestors_and_picks_page() {
        let store = MockStore::new();
        for i in 0..12 {
            store.insert_thread(node(&format!("r{i}"), None, 0, vec![]));
        }
        store.insert_thread(node(
            "deep",
            None,
            0,
            vec![node("d1", Some("deep"), 0, vec![node("d2", Some("d1"), 0, vec![])])],
        ));
        let mut e = Engine::new(store, EngineConfig::default());
        block_on(e.load_page(blog(), 1)).unwrap();

        let anchor = CommentAnchor::from_fragment("#comment-d2").unwrap();
        assert_eq!(e.locate_for_highlight(&anchor), Some(2));
        assert_eq!(e.current_page().page, 2);
        assert!(e.rendered_ids().contains(&&id("d2")));
        assert_eq!(e.reveal(&id("ghost")), None);
    }

    #[test]
    fn reply_refreshes_to_first_page() {
        let mut e = scenario();
        e.show_page(2);
        let created = block_on(e.submit_reply(NewReply {
            discussion_id: blog(),
            parent_id: Some(id("c2")),
            author_display_name: String::from("Carol"),
            author_contact_handle: String::from("carol@example.org"),
            body: String::from("me too"),
        }))
        .unwrap();
        assert_eq!(e.current_page().page, 1);
        assert_eq!(e.total_comment_count(), 3);
        assert_eq!(e.locate(&created.id).parent_id(), Some(&id("c2")));
    }

    #[test]
    fn blank_reply_is_rejected_locally() {
        let mut e = scenario();
        let res = block_on(e.submit_reply(NewReply {
            discussion_id: blog(),
            parent_id: None,
            author_display_name: String::from("Carol"),
            author_contact_handle: String::from("carol@example.org"),
            body: String::from(" "),
        }));
        assert_eq!(res, Err(Error::EmptyBody));
        assert_eq!(e.total_comment_count(), 2);
    }
}
