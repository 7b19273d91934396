use std::fmt;

use crate::CommentId;

pub const ANCHOR_PREFIX: &str = "comment-";

/// The `comment-<id>` fragment a page is opened with to point at one comment
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CommentAnchor(pub CommentId);

impl CommentAnchor {
    /// Accepts the fragment with or without its leading `#`
    pub fn from_fragment(fragment: &str) -> Option<CommentAnchor> {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let id = fragment.strip_prefix(ANCHOR_PREFIX)?;
        if id.is_empty() || id.contains(char::is_whitespace) {
            return None;
        }
        Some(CommentAnchor(CommentId::new(id)))
    }

    pub fn comment_id(&self) -> &CommentId {
        &self.0
    }
}

impl fmt::Display for CommentAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ANCHOR_PREFIX, self.0)
    }
}
