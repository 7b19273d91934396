use std::fmt;

use crate::{Error, RawTimestamp, Timestamp};

/// Contact handle reserved for comments written by the site's administrators
pub const OFFICIAL_HANDLE: &str = "admin@threadline";

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn new(id: impl Into<String>) -> CommentId {
        CommentId(id.into())
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct DiscussionId(pub String);

impl DiscussionId {
    pub fn new(id: impl Into<String>) -> DiscussionId {
        DiscussionId(id.into())
    }
}

impl fmt::Display for DiscussionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A comment as the store returns it, with its whole reply subtree
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub id: CommentId,
    pub discussion_id: DiscussionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,

    pub author_display_name: String,
    #[serde(default)]
    pub author_contact_handle: String,

    pub body: String,

    #[serde(default, deserialize_with = "non_negative")]
    pub like_count: u64,

    #[serde(default)]
    pub created_at: RawTimestamp,

    /// Replies in insertion order
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn created_at(&self) -> Timestamp {
        self.created_at.normalize()
    }

    /// Splits off the replies, leaving the flat comment
    pub fn into_parts(self) -> (CommentRecord, Vec<CommentNode>) {
        (
            CommentRecord {
                id: self.id,
                discussion_id: self.discussion_id,
                parent_id: self.parent_id,
                author_display_name: self.author_display_name,
                author_contact_handle: self.author_contact_handle,
                body: self.body,
                like_count: self.like_count,
                created_at: self.created_at,
            },
            self.replies,
        )
    }
}

/// A comment as a document store keeps it: flat, pointing to its parent
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: CommentId,
    pub discussion_id: DiscussionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,

    pub author_display_name: String,
    #[serde(default)]
    pub author_contact_handle: String,

    pub body: String,

    #[serde(default, deserialize_with = "non_negative")]
    pub like_count: u64,

    #[serde(default)]
    pub created_at: RawTimestamp,
}

impl CommentRecord {
    pub fn is_official(&self) -> bool {
        self.author_contact_handle == OFFICIAL_HANDLE
    }
}

impl From<CommentRecord> for CommentNode {
    fn from(r: CommentRecord) -> CommentNode {
        CommentNode {
            id: r.id,
            discussion_id: r.discussion_id,
            parent_id: r.parent_id,
            author_display_name: r.author_display_name,
            author_contact_handle: r.author_contact_handle,
            body: r.body,
            like_count: r.like_count,
            created_at: r.created_at,
            replies: Vec::new(),
        }
    }
}

/// A comment submitted by a reader, either at the top level or as a reply
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReply {
    pub discussion_id: DiscussionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
    pub author_display_name: String,
    pub author_contact_handle: String,
    pub body: String,
}

impl NewReply {
    // See comments on other `validate` functions throughout threadline-api
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.discussion_id.0)?;
        if let Some(p) = &self.parent_id {
            crate::validate_string(&p.0)?;
        }
        crate::validate_string(&self.author_display_name)?;
        crate::validate_string(&self.author_contact_handle)?;
        crate::validate_body(&self.body)
    }
}

// Stores occasionally hand out negative counters after concurrent decrements,
// and JS-backed ones send every number as a float
fn non_negative<'de, D>(d: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let n = match <Option<serde_json::Number> as serde::Deserialize>::deserialize(d)? {
        Some(n) => n,
        None => return Ok(0),
    };
    if let Some(v) = n.as_u64() {
        return Ok(v);
    }
    if n.is_i64() {
        return Ok(0);
    }
    match n.as_f64() {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v.round().min(u64::MAX as f64) as u64),
        _ => Ok(0),
    }
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    Ok(<Option<Vec<T>> as serde::Deserialize>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_comment_parses_without_replies_field() {
        let c: CommentNode = serde_json::from_value(json!({
            "id": "c1",
            "discussionId": "blog-1",
            "authorDisplayName": "Ann",
            "authorContactHandle": "ann@example.org",
            "body": "first!",
            "likeCount": 3,
            "createdAt": 1_600_000_000_000i64,
        }))
        .unwrap();
        assert_eq!(c.id, CommentId::new("c1"));
        assert_eq!(c.parent_id, None);
        assert_eq!(c.like_count, 3);
        assert!(c.replies.is_empty());
        assert!(c.created_at().is_valid());
    }

    #[test]
    fn negative_like_count_is_clamped() {
        let c: CommentRecord = serde_json::from_value(json!({
            "id": "c1",
            "discussionId": "blog-1",
            "authorDisplayName": "Ann",
            "body": "hi",
            "likeCount": -2,
            "createdAt": "2023-01-01",
        }))
        .unwrap();
        assert_eq!(c.like_count, 0);
        assert_eq!(c.author_contact_handle, "");
    }

    #[test]
    fn null_replies_and_float_counts_are_accepted() {
        let c: CommentNode = serde_json::from_value(json!({
            "id": "c1",
            "discussionId": "blog-1",
            "authorDisplayName": "Ann",
            "body": "hi",
            "likeCount": 3.0,
            "replies": null,
        }))
        .unwrap();
        assert_eq!(c.like_count, 3);
        assert!(c.replies.is_empty());

        let c: CommentNode = serde_json::from_value(json!({
            "id": "c1",
            "discussionId": "blog-1",
            "authorDisplayName": "Ann",
            "body": "hi",
            "likeCount": null,
            "replies": [{
                "id": "c2",
                "discussionId": "blog-1",
                "parentId": "c1",
                "authorDisplayName": "Bob",
                "body": "hello",
                "likeCount": -1.5,
                "replies": null,
            }],
        }))
        .unwrap();
        assert_eq!(c.like_count, 0);
        assert_eq!(c.replies[0].like_count, 0);
        assert!(c.replies[0].replies.is_empty());
    }

    #[test]
    fn official_handle_is_recognized() {
        let mut c = CommentRecord {
            id: CommentId::new("c1"),
            discussion_id: DiscussionId::new("blog-1"),
            parent_id: None,
            author_display_name: String::from("Staff"),
            author_contact_handle: String::from(OFFICIAL_HANDLE),
            body: String::from("welcome"),
            like_count: 0,
            created_at: RawTimestamp::Millis(0),
        };
        assert!(c.is_official());
        c.author_contact_handle = String::from("someone@example.org");
        assert!(!c.is_official());
    }

    #[test]
    fn new_reply_validation() {
        let mut r = NewReply {
            discussion_id: DiscussionId::new("blog-1"),
            parent_id: Some(CommentId::new("c1")),
            author_display_name: String::from("Bob"),
            author_contact_handle: String::from("bob@example.org"),
            body: String::from("agreed"),
        };
        assert_eq!(r.validate(), Ok(()));
        r.body = String::from("  ");
        assert_eq!(r.validate(), Err(Error::EmptyBody));
        r.body = String::from("ok");
        r.author_display_name = String::from("B\0b");
        assert!(matches!(r.validate(), Err(Error::NullByteInString(_))));
    }
}
