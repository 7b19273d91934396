use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use threadline_api::CommentRecord;

mod db;
mod error;
mod fuzz;
mod handlers;

pub use db::Db;
pub use error::Error;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Address to listen on
    #[structopt(
        short,
        long,
        env = "THREADLINE_LISTEN",
        default_value = "127.0.0.1:3000"
    )]
    listen: SocketAddr,

    /// JSON file holding a list of comments to start with, as generated by
    /// `generate-test-data`
    #[structopt(long, parse(from_os_str))]
    seed: Option<PathBuf>,
}

async fn read_seed(path: &Path) -> anyhow::Result<Vec<CommentRecord>> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading seed file {path:?}"))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing seed file {path:?}"))
}

pub fn app(db: Db) -> Router {
    Router::new()
        .route(
            "/api/discussions/:id/comments",
            get(handlers::fetch_comments),
        )
        .route(
            "/api/discussions/:id/activity",
            get(handlers::fetch_activity),
        )
        .route("/api/like", post(handlers::record_like))
        .route("/api/reply", post(handlers::submit_reply))
        .route("/api/activity", post(handlers::log_activity))
        .with_state(db)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let seed = match &opt.seed {
        Some(path) => read_seed(path).await?,
        None => Vec::new(),
    };

    let app = app(Db::new(seed));

    tracing::info!("listening on {}", opt.listen);
    axum::Server::bind(&opt.listen)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}
