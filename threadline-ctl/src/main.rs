use std::path::PathBuf;

use anyhow::Context;
use threadline_client::{
    api::{CommentAnchor, CommentId, DiscussionId, NewReply, SessionId, Store, Uuid},
    Engine, EngineConfig, HighlightConfig, HighlightController, LikeOutcome,
};

mod store;
mod view;

use store::HttpStore;

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long)]
    host: String,

    /// JSON engine configuration, defaults are used for missing fields
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Session to act as, a fresh one is used if unset
    #[structopt(long, env = "THREADLINE_SESSION")]
    session: Option<Uuid>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Print one page of a discussion
    Show {
        discussion: String,

        #[structopt(short, long, default_value = "1")]
        page: usize,

        /// Show all replies instead of only root comments
        #[structopt(long)]
        expand: bool,

        /// Fragment pointing at one comment, like `#comment-<id>`
        #[structopt(long)]
        fragment: Option<String>,
    },

    /// Like a comment, or unlike it if `--unlike` is passed
    Like {
        discussion: String,
        comment: String,

        #[structopt(long)]
        unlike: bool,
    },

    /// Post a comment, or a reply with `--parent`
    Reply {
        discussion: String,

        #[structopt(long)]
        parent: Option<String>,

        #[structopt(long)]
        name: String,

        #[structopt(long, default_value = "")]
        handle: String,

        body: String,
    },

    /// Print the activity log of a discussion
    Activity { discussion: String },
}

fn read_config(path: Option<PathBuf>) -> anyhow::Result<EngineConfig> {
    let path = match path {
        Some(p) => p,
        None => return Ok(EngineConfig::default()),
    };
    let data =
        std::fs::read(&path).with_context(|| format!("reading config file {path:?}"))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing config file {path:?}"))
}

/// Prints one page, then highlights `anchor` if any
///
/// A failed load is printed inline like an empty page would be, and still
/// makes the command fail.
async fn show<S: Store>(
    engine: &mut Engine<S>,
    discussion: DiscussionId,
    page: usize,
    expand: bool,
    anchor: Option<&CommentAnchor>,
    highlight_config: HighlightConfig,
) -> anyhow::Result<()> {
    let loaded = engine.load_page(discussion.clone(), page).await;
    if expand {
        let all = engine.forest().roots().to_vec();
        for root in all {
            let ids = engine
                .forest()
                .walk(&root, |_| true)
                .into_iter()
                .cloned()
                .collect::<Vec<_>>();
            for id in ids {
                if !engine.is_expanded(&id) {
                    engine.toggle_expanded(&id);
                }
            }
        }
    }
    if let Some(anchor) = anchor {
        engine.locate_for_highlight(anchor);
    }
    let view = view::render(engine);
    let mut highlighter = HighlightController::new(view, view::TokioTimer, highlight_config);
    let outcome = highlighter.run(anchor.map(|a| a.comment_id())).await;
    tracing::debug!(?outcome, "deep link handled");
    loaded.with_context(|| format!("loading comments of {discussion}"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let config = read_config(opt.config)?;
    let highlight_config = config.highlight.clone();
    let session = opt.session.map(SessionId).unwrap_or_default();
    let mut engine = Engine::new(HttpStore::new(opt.host), config).with_session(session);

    match opt.cmd {
        Command::Show {
            discussion,
            page,
            expand,
            fragment,
        } => {
            let anchor = fragment
                .as_deref()
                .map(|f| {
                    CommentAnchor::from_fragment(f)
                        .with_context(|| format!("{f:?} is not a comment fragment"))
                })
                .transpose()?;
            show(
                &mut engine,
                DiscussionId(discussion),
                page,
                expand,
                anchor.as_ref(),
                highlight_config,
            )
            .await?;
        }
        Command::Like {
            discussion,
            comment,
            unlike,
        } => {
            let id = CommentId(comment);
            engine
                .load_page(DiscussionId(discussion), 1)
                .await
                .context("loading comments")?;
            // the session is not known to like anything yet: mirror the requested direction
            if unlike {
                let mut likes = engine.like_state().clone();
                likes.set(&id, true);
                engine = engine.with_like_state(likes);
            }
            match engine.toggle_like(&id).await {
                LikeOutcome::RolledBack(err) => {
                    return Err(err).with_context(|| format!("recording like on {id}"))
                }
                outcome => {
                    let count = engine.forest().get(&id).map(|n| n.comment.like_count);
                    println!("{outcome:?}, like count now {count:?}");
                }
            }
        }
        Command::Reply {
            discussion,
            parent,
            name,
            handle,
            body,
        } => {
            let discussion = DiscussionId(discussion);
            let _ = engine.load_page(discussion.clone(), 1).await;
            let created = engine
                .submit_reply(NewReply {
                    discussion_id: discussion,
                    parent_id: parent.map(CommentId),
                    author_display_name: name,
                    author_contact_handle: handle,
                    body,
                })
                .await
                .context("submitting reply")?;
            println!("created comment-{}", created.id);
        }
        Command::Activity { discussion } => {
            let entries = engine
                .store()
                .fetch_activity(&DiscussionId(discussion))
                .await
                .context("fetching activity log")?;
            for e in entries {
                println!(
                    "{}  {} liked {} by {}{}",
                    e.date,
                    e.session_id,
                    e.comment_id,
                    e.author_display_name,
                    match &e.parent_id {
                        Some(p) => format!(" (reply to {p})"),
                        None => String::new(),
                    }
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use threadline_client::api::{CommentNode, RawTimestamp};
    use threadline_mock_server::MockStore;

    use super::*;

    fn engine() -> Engine<MockStore> {
        let store = MockStore::new();
        store.insert_thread(CommentNode {
            id: CommentId::new("c1"),
            discussion_id: DiscussionId::new("blog-1"),
            parent_id: None,
            author_display_name: String::from("Ann"),
            author_contact_handle: String::from("ann@example.org"),
            body: String::from("first"),
            like_count: 0,
            created_at: RawTimestamp::Millis(0),
            replies: Vec::new(),
        });
        Engine::new(store, EngineConfig::default())
    }

    #[tokio::test]
    async fn show_succeeds_on_loaded_page() {
        let mut e = engine();
        let anchor = CommentAnchor::from_fragment("#comment-c1");
        show(
            &mut e,
            DiscussionId::new("blog-1"),
            1,
            true,
            anchor.as_ref(),
            HighlightConfig {
                retry_interval_ms: 1,
                max_attempts: 1,
                highlight_duration_ms: 1,
            },
        )
        .await
        .unwrap();
        assert_eq!(e.total_comment_count(), 1);
    }

    #[tokio::test]
    async fn show_fails_when_comments_do_not_load() {
        let mut e = engine();
        e.store().fail_next_fetches(1);
        let res = show(
            &mut e,
            DiscussionId::new("blog-1"),
            1,
            false,
            None,
            HighlightConfig::default(),
        )
        .await;
        assert!(res.is_err());
        assert!(e.load_error().is_some());
    }
}
