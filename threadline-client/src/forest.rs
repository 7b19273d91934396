use std::collections::{HashMap, HashSet};

use crate::api::{CommentId, CommentNode, CommentRecord, DiscussionId};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    /// The comment itself; its `parent_id` is the immediate parent in this forest
    pub comment: CommentRecord,

    /// Replies, in insertion order
    pub children: Vec<CommentId>,
}

impl Node {
    pub fn id(&self) -> &CommentId {
        &self.comment.id
    }

    pub fn parent(&self) -> Option<&CommentId> {
        self.comment.parent_id.as_ref()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LikeDelta {
    Increment,
    Decrement,
}

impl LikeDelta {
    pub fn apply(self, count: u64) -> u64 {
        match self {
            LikeDelta::Increment => count.saturating_add(1),
            LikeDelta::Decrement => count.saturating_sub(1),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Located<'a> {
    Root(&'a Node),
    Reply {
        node: &'a Node,
        /// The comment `node` directly replies to, which is not necessarily a root
        parent_id: &'a CommentId,
    },
    NotFound,
}

impl<'a> Located<'a> {
    pub fn node(&self) -> Option<&'a Node> {
        match *self {
            Located::Root(node) | Located::Reply { node, .. } => Some(node),
            Located::NotFound => None,
        }
    }

    pub fn parent_id(&self) -> Option<&'a CommentId> {
        match *self {
            Located::Reply { parent_id, .. } => Some(parent_id),
            _ => None,
        }
    }
}

/// All the comments of one discussion, stored flat and linked by id
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Forest {
    nodes: HashMap<CommentId, Node>,
    roots: Vec<CommentId>,
}

impl Forest {
    pub fn new() -> Forest {
        Forest::default()
    }

    /// Builds the forest from the nested form the store returns
    ///
    /// The comment a reply is nested in is taken as its parent. Comments whose
    /// id was already seen, or that belong to another discussion, are dropped
    /// along with their replies.
    pub fn from_nodes(discussion: &DiscussionId, roots: Vec<CommentNode>) -> Forest {
        let mut res = Forest::new();
        let mut stack = roots
            .into_iter()
            .rev()
            .map(|c| (c, None))
            .collect::<Vec<(CommentNode, Option<CommentId>)>>();
        while let Some((c, parent)) = stack.pop() {
            if res.nodes.contains_key(&c.id) {
                tracing::warn!(comment=?c.id, "duplicate comment id, dropping it and its replies");
                continue;
            }
            if &c.discussion_id != discussion {
                tracing::warn!(
                    comment=?c.id,
                    found=?c.discussion_id,
                    expected=?discussion,
                    "comment from another discussion, dropping it and its replies"
                );
                continue;
            }
            let (mut comment, replies) = c.into_parts();
            if comment.parent_id != parent {
                tracing::warn!(
                    comment=?comment.id,
                    declared=?comment.parent_id,
                    nested_in=?parent,
                    "comment is not nested under its declared parent"
                );
                comment.parent_id = parent.clone();
            }
            let id = comment.id.clone();
            match parent.as_ref().and_then(|p| res.nodes.get_mut(p)) {
                Some(p) => p.children.push(id.clone()),
                None => res.roots.push(id.clone()),
            }
            res.nodes.insert(
                id.clone(),
                Node {
                    comment,
                    children: Vec::new(),
                },
            );
            stack.extend(replies.into_iter().rev().map(|r| (r, Some(id.clone()))));
        }
        res
    }

    /// Builds the forest from flat records, in store order
    ///
    /// Records of another discussion are dropped. A record whose parent is
    /// unknown, or whose parent chain loops back to it, is added as a root.
    pub fn from_records(discussion: &DiscussionId, records: Vec<CommentRecord>) -> Forest {
        let mut res = Forest::new();
        let mut order = Vec::with_capacity(records.len());
        for r in records {
            if &r.discussion_id != discussion {
                tracing::warn!(comment=?r.id, found=?r.discussion_id, "comment from another discussion, dropping it");
                continue;
            }
            if res.nodes.contains_key(&r.id) {
                tracing::warn!(comment=?r.id, "duplicate comment id, dropping it");
                continue;
            }
            order.push(r.id.clone());
            res.nodes.insert(
                r.id.clone(),
                Node {
                    comment: r,
                    children: Vec::new(),
                },
            );
        }
        for id in order {
            let attach_to = match res.nodes[&id].comment.parent_id.clone() {
                None => None,
                Some(p) if !res.nodes.contains_key(&p) => {
                    tracing::warn!(comment=?id, parent=?p, "parent comment not found, adding as root");
                    None
                }
                Some(p) if res.declared_chain_reaches(&p, &id) => {
                    tracing::warn!(comment=?id, parent=?p, "comment is its own ancestor, adding as root");
                    None
                }
                Some(p) => Some(p),
            };
            match attach_to {
                Some(p) => {
                    if let Some(p) = res.nodes.get_mut(&p) {
                        p.children.push(id);
                    }
                }
                None => {
                    if let Some(n) = res.nodes.get_mut(&id) {
                        n.comment.parent_id = None;
                    }
                    res.roots.push(id);
                }
            }
        }
        res
    }

    // Follows declared parents from `from`, at most once per node
    fn declared_chain_reaches(&self, from: &CommentId, target: &CommentId) -> bool {
        let mut cur = Some(from);
        for _ in 0..=self.nodes.len() {
            match cur {
                None => return false,
                Some(id) if id == target => return true,
                Some(id) => cur = self.nodes.get(id).and_then(|n| n.parent()),
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[CommentId] {
        &self.roots
    }

    pub fn get(&self, id: &CommentId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &CommentId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn locate(&self, id: &CommentId) -> Located<'_> {
        match self.nodes.get(id) {
            None => Located::NotFound,
            Some(node) => match node.parent() {
                None => Located::Root(node),
                Some(parent_id) => Located::Reply { node, parent_id },
            },
        }
    }

    /// Parent chain of `id`, closest first
    pub fn ancestors(&self, id: &CommentId) -> Vec<&CommentId> {
        let mut res = Vec::new();
        let mut cur = self.nodes.get(id).and_then(|n| n.parent());
        while let Some(p) = cur {
            if res.len() >= self.nodes.len() {
                tracing::error!(comment=?id, "parent chain longer than the forest");
                break;
            }
            res.push(p);
            cur = self.nodes.get(p).and_then(|n| n.parent());
        }
        res
    }

    /// The root comment whose thread holds `id`
    pub fn root_of<'a>(&'a self, id: &CommentId) -> Option<&'a CommentId> {
        let node = self.nodes.get(id)?;
        Some(self.ancestors(id).last().copied().unwrap_or(node.id()))
    }

    /// Pre-order walk from `start`, only looking into the replies of nodes
    /// for which `descend` returns true
    pub fn walk<'a, F>(&'a self, start: &CommentId, mut descend: F) -> Vec<&'a CommentId>
    where
        F: FnMut(&CommentId) -> bool,
    {
        let mut res = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = match self.nodes.get(start) {
            Some(n) => vec![n.id()],
            None => return res,
        };
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                tracing::error!(comment=?id, "comment reached twice while walking the forest");
                continue;
            }
            let node = match self.nodes.get(id) {
                Some(n) => n,
                None => continue,
            };
            res.push(id);
            if descend(id) {
                stack.extend(node.children.iter().rev());
            }
        }
        res
    }

    /// Number of replies under `id`, at any depth
    pub fn count_descendants(&self, id: &CommentId) -> usize {
        self.walk(id, |_| true).len().saturating_sub(1)
    }

    /// Every root plus every reply under it, at any depth
    pub fn total_comment_count(&self) -> usize {
        self.roots
            .iter()
            .map(|r| 1 + self.count_descendants(r))
            .sum()
    }

    /// Rebuilds the nested form of the thread rooted at `id`
    pub fn subtree(&self, id: &CommentId) -> Option<CommentNode> {
        let order = self.walk(id, |_| true);
        let mut built: HashMap<&CommentId, CommentNode> = HashMap::with_capacity(order.len());
        // children come after their parent in pre-order, so build from the end
        for cid in order.iter().rev() {
            let node = &self.nodes[*cid];
            let mut c = CommentNode::from(node.comment.clone());
            c.replies = node
                .children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(*cid, c);
        }
        built.remove(id)
    }

    /// Applies a like delta wherever `id` sits, returning the count before and after
    pub fn patch_like_count(&mut self, id: &CommentId, delta: LikeDelta) -> Option<(u64, u64)> {
        let node = self.nodes.get_mut(id)?;
        let before = node.comment.like_count;
        node.comment.like_count = delta.apply(before);
        Some((before, node.comment.like_count))
    }

    pub fn set_like_count(&mut self, id: &CommentId, count: u64) -> bool {
        match self.nodes.get_mut(id) {
            Some(n) => {
                n.comment.like_count = count;
                true
            }
            None => false,
        }
    }
}
