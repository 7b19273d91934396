use threadline_api::{CommentId, Error as ApiError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn comment_not_found(id: CommentId) -> Error {
        Error::Api(ApiError::CommentNotFound(id))
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let Error::Api(err) = self;
        if err.status_code().is_server_error() {
            tracing::warn!(?err, "returning server error to client");
        } else {
            tracing::debug!("rejecting request: {err}");
        }
        (err.status_code(), err.contents()).into_response()
    }
}
