use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod activity;
pub use activity::{ActivityEntry, LikeNotification, LikeRequest};

mod anchor;
pub use anchor::{CommentAnchor, ANCHOR_PREFIX};

mod comment;
pub use comment::{CommentId, CommentNode, CommentRecord, DiscussionId, NewReply, OFFICIAL_HANDLE};

mod error;
pub use error::Error;

mod session;
pub use session::SessionId;

mod store;
pub use store::Store;

mod time;
pub use time::{RawTimestamp, Timestamp, INVALID_DATE};

// The functions below are used to validate input from the user.
// Each `validate` function returns `Ok(())` if the input is fine to land in a
// store, and an error otherwise.
// Stores must reject invalid input before persisting it.

pub fn validate_string(s: &str) -> Result<(), Error> {
    match s.contains('\0') {
        true => Err(Error::NullByteInString(String::from(s))),
        false => Ok(()),
    }
}

pub fn validate_body(s: &str) -> Result<(), Error> {
    validate_string(s)?;
    match s.trim().is_empty() {
        true => Err(Error::EmptyBody),
        false => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_with_null_bytes_are_rejected() {
        assert_eq!(validate_string("hello"), Ok(()));
        assert_eq!(
            validate_string("hel\0lo"),
            Err(Error::NullByteInString(String::from("hel\0lo")))
        );
    }

    #[test]
    fn blank_bodies_are_rejected() {
        assert_eq!(validate_body("nice post"), Ok(()));
        assert_eq!(validate_body("   \n\t"), Err(Error::EmptyBody));
        assert_eq!(validate_body(""), Err(Error::EmptyBody));
    }
}
