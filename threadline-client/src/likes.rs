use std::collections::HashSet;

use crate::api::CommentId;

/// Comments the current session likes
///
/// Only drives the toggle direction and the icon; the store stays
/// authoritative for like counts. Serializable so a host can keep it across
/// reloads.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LikeState {
    liked: HashSet<CommentId>,
}

impl LikeState {
    pub fn new() -> LikeState {
        LikeState::default()
    }

    pub fn contains(&self, id: &CommentId) -> bool {
        self.liked.contains(id)
    }

    pub fn set(&mut self, id: &CommentId, liked: bool) {
        if liked {
            self.liked.insert(id.clone());
        } else {
            self.liked.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.liked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.liked.is_empty()
    }
}
