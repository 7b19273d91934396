use crate::{CommentId, DiscussionId, Error, SessionId, Time};

/// Request to record that a session now likes (or no longer likes) a comment
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub comment_id: CommentId,
    pub discussion_id: DiscussionId,
    pub session_id: SessionId,
    pub now_liked: bool,
}

impl LikeRequest {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.comment_id.0)?;
        crate::validate_string(&self.discussion_id.0)
    }
}

/// Activity-log entry written after a like landed in the store
///
/// Attribution is about the liked comment: `author_display_name` is the name
/// of the person whose comment got liked, and `parent_id` is the comment it
/// directly replies to, if any.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub author_display_name: String,
    pub comment_id: CommentId,
    pub discussion_id: DiscussionId,
    pub body: String,
    pub is_reply: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
    pub session_id: SessionId,
    pub date: Time,
}

impl ActivityEntry {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.author_display_name)?;
        crate::validate_string(&self.comment_id.0)?;
        crate::validate_string(&self.discussion_id.0)?;
        crate::validate_string(&self.body)?;
        if let Some(p) = &self.parent_id {
            crate::validate_string(&p.0)?;
        }
        Ok(())
    }
}

/// Sent to in-process listeners once a like has been recorded
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeNotification {
    pub comment_id: CommentId,
    pub discussion_id: DiscussionId,
    pub like_count: Option<u64>,
}
