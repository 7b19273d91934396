use axum::{
    extract::{Path, State},
    Json,
};
use threadline_api::{ActivityEntry, CommentNode, DiscussionId, LikeRequest, NewReply};

use crate::{db::Db, Error};

pub async fn fetch_comments(
    State(db): State<Db>,
    Path(discussion): Path<DiscussionId>,
) -> Result<Json<Vec<CommentNode>>, Error> {
    threadline_api::validate_string(&discussion.0)?;
    Ok(Json(db.fetch_comments(&discussion).await))
}

pub async fn record_like(
    State(db): State<Db>,
    Json(req): Json<LikeRequest>,
) -> Result<(), Error> {
    req.validate()?;
    db.record_like(&req).await
}

pub async fn submit_reply(
    State(db): State<Db>,
    Json(reply): Json<NewReply>,
) -> Result<Json<CommentNode>, Error> {
    reply.validate()?;
    let created = db.submit_reply(reply).await?;
    tracing::debug!(comment=?created.id, discussion=?created.discussion_id, "stored new comment");
    Ok(Json(created))
}

pub async fn log_activity(
    State(db): State<Db>,
    Json(entry): Json<ActivityEntry>,
) -> Result<(), Error> {
    entry.validate()?;
    db.log_activity(entry).await;
    Ok(())
}

pub async fn fetch_activity(
    State(db): State<Db>,
    Path(discussion): Path<DiscussionId>,
) -> Result<Json<Vec<ActivityEntry>>, Error> {
    threadline_api::validate_string(&discussion.0)?;
    Ok(Json(db.fetch_activity(&discussion).await))
}
