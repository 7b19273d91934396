use std::collections::HashSet;

use crate::api::CommentId;

/// Comments whose replies are currently shown
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExpandState {
    expanded: HashSet<CommentId>,
}

impl ExpandState {
    pub fn is_expanded(&self, id: &CommentId) -> bool {
        self.expanded.contains(id)
    }

    pub fn expand(&mut self, id: &CommentId) {
        self.expanded.insert(id.clone());
    }

    /// Returns whether the replies are now shown
    pub fn toggle(&mut self, id: &CommentId) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.clone());
            true
        }
    }

    pub fn clear(&mut self) {
        self.expanded.clear();
    }
}
