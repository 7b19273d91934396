use anyhow::{anyhow, Context};
use serde_json::json;

use crate::{CommentId, DiscussionId};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Store temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Comment not found {0}")]
    CommentNotFound(CommentId),

    #[error("Discussion not found {0}")]
    DiscussionNotFound(DiscussionId),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Comment body is empty")]
    EmptyBody,
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::CommentNotFound(_) => StatusCode::NOT_FOUND,
            Error::DiscussionNotFound(_) => StatusCode::NOT_FOUND,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::EmptyBody => StatusCode::BAD_REQUEST,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::Unavailable(msg) => json!({
                "message": msg,
                "type": "unavailable",
            }),
            Error::CommentNotFound(id) => json!({
                "message": "comment not found",
                "type": "comment-not-found",
                "id": id,
            }),
            Error::DiscussionNotFound(id) => json!({
                "message": "discussion not found",
                "type": "discussion-not-found",
                "id": id,
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::EmptyBody => json!({
                "message": "comment body is empty",
                "type": "empty-body",
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let field = |name| str_field(&data, name);
        Ok(
            match field("type").ok_or_else(|| anyhow!("error type is not a string"))? {
                "unknown" => Error::Unknown(String::from(field("message").unwrap_or(""))),
                "unavailable" => Error::Unavailable(String::from(field("message").unwrap_or(""))),
                "comment-not-found" => Error::CommentNotFound(CommentId::new(
                    field("id")
                        .ok_or_else(|| anyhow!("error is a comment-not-found without an id"))?,
                )),
                "discussion-not-found" => Error::DiscussionNotFound(DiscussionId::new(
                    field("id")
                        .ok_or_else(|| anyhow!("error is a discussion-not-found without an id"))?,
                )),
                "null-byte" => Error::NullByteInString(String::from(field("string").ok_or_else(
                    || anyhow!("error is a null-byte-in-string without a string"),
                )?)),
                "empty-body" => Error::EmptyBody,
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

fn str_field<'a>(data: &'a serde_json::Value, name: &str) -> Option<&'a str> {
    data.get(name).and_then(|v| v.as_str())
}
