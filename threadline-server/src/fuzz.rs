#![cfg(test)]

use std::{cmp, collections::HashMap, fmt::Debug, ops::RangeTo, panic::AssertUnwindSafe};

use axum::http::{self, request};
use bolero::generator::TypeGenerator;
use threadline_api::{
    ActivityEntry, CommentId, CommentNode, DiscussionId, Error as ApiError, LikeRequest, NewReply,
    SessionId, Store,
};
use threadline_mock_server::MockStore;
use tower::ServiceExt;

use crate::*;

macro_rules! do_tokio_test {
    ( $name:ident, $gen:expr, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_generator($gen)
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

async fn call<Req, Resp>(
    app: &Router,
    req: request::Request<axum::body::Body>,
    req_body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    let resp = app.clone().oneshot(req).await.expect("running request");
    let status = resp.status();
    let body = hyper::body::to_bytes(resp.into_body())
        .await
        .expect("recovering resp bytes");
    if status == http::StatusCode::OK {
        if std::any::TypeId::of::<Resp>() == std::any::TypeId::of::<()>() {
            // the server returns an empty string in this situation, which does not parse properly with serde_json
            return Ok(serde_json::from_slice(b"null").unwrap());
        }
        return Ok(serde_json::from_slice(&body).unwrap_or_else(|err| {
            panic!("failed parsing resp body: {err}\nbody: {body:?}\nrequest: {req_body:?}")
        }));
    }
    Err(ApiError::parse(&body)
        .unwrap_or_else(|err| panic!("parsing error response body {err}, body is {body:?}")))
}

async fn get_on_app<Resp>(app: &Router, uri: &str) -> Result<Resp, ApiError>
where
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    let req = request::Builder::new()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .expect("building request");
    call(app, req, &uri).await
}

async fn post_on_app<Req, Resp>(app: &Router, uri: &str, body: &Req) -> Result<Resp, ApiError>
where
    Req: Debug + serde::Serialize,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    let req = request::Builder::new()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("serializing request body to json"),
        ))
        .expect("building request");
    call(app, req, body).await
}

fn compare<T>(name: &str, app_res: Result<T, ApiError>, mock_res: Result<T, ApiError>)
where
    T: Debug + PartialEq,
{
    assert_eq!(
        app_res, mock_res,
        "app and mock did not return the same result for {name}"
    );
}

fn resize_int(fuzz_id: usize, RangeTo { end }: RangeTo<usize>) -> Option<usize> {
    if end == 0 {
        return None;
    }
    let bucket_size = cmp::max(1, usize::MAX / end); // in case we rounded to 0
    let id = fuzz_id / bucket_size;
    Some(cmp::min(id, end - 1)) // in case id was actually over end - 1 due to rounding
}

fn discussion(second: bool) -> DiscussionId {
    match second {
        false => DiscussionId::new("blog-1"),
        true => DiscussionId::new("blog-2"),
    }
}

/// Thread shape with store-generated ids replaced by creation order
#[derive(Debug, PartialEq)]
struct Shape {
    comment: Option<usize>,
    author: String,
    body: String,
    like_count: u64,
    replies: Vec<Shape>,
}

fn shape(nodes: &[CommentNode], ids: &HashMap<CommentId, usize>) -> Vec<Shape> {
    nodes
        .iter()
        .map(|n| Shape {
            comment: ids.get(&n.id).copied(),
            author: n.author_display_name.clone(),
            body: n.body.clone(),
            like_count: n.like_count,
            replies: shape(&n.replies, ids),
        })
        .collect()
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    Fetch {
        second_discussion: bool,
    },
    Reply {
        second_discussion: bool,
        parent: Option<usize>,
        #[generator(bolero::generator::gen_with::<String>().len(0..20usize))]
        author: String,
        #[generator(bolero::generator::gen_with::<String>().len(0..40usize))]
        body: String,
    },
    Like {
        comment: usize,
        second_session: bool,
        now_liked: bool,
    },
    LogActivity {
        comment: usize,
        second_session: bool,
    },
}

struct Known {
    discussion: DiscussionId,
    app: CommentId,
    mock: CommentId,
}

struct ComparativeFuzzer {
    app: Router,
    mock: MockStore,
    sessions: [SessionId; 2],
    comments: Vec<Known>,
}

impl ComparativeFuzzer {
    fn new() -> ComparativeFuzzer {
        ComparativeFuzzer {
            app: app(Db::default()),
            mock: MockStore::new(),
            sessions: [SessionId::new(), SessionId::new()],
            comments: Vec::new(),
        }
    }

    fn ids(&self, pick: impl Fn(&Known) -> &CommentId) -> HashMap<CommentId, usize> {
        self.comments
            .iter()
            .enumerate()
            .map(|(i, k)| (pick(k).clone(), i))
            .collect()
    }

    // a comment both sides know about, or an id neither does
    fn pick_comment(&self, comment: usize) -> (DiscussionId, CommentId, CommentId) {
        match resize_int(comment, ..self.comments.len()) {
            Some(i) => {
                let k = &self.comments[i];
                (k.discussion.clone(), k.app.clone(), k.mock.clone())
            }
            None => (discussion(false), CommentId::new("ghost"), CommentId::new("ghost")),
        }
    }

    async fn execute_fuzz_op(&mut self, op: FuzzOp) {
        match op {
            FuzzOp::Fetch { second_discussion } => {
                let d = discussion(second_discussion);
                let app_res: Result<Vec<CommentNode>, _> =
                    get_on_app(&self.app, &format!("/api/discussions/{d}/comments")).await;
                let mock_res = self.mock.fetch_comments(&d).await;
                let (app_ids, mock_ids) = (self.ids(|k| &k.app), self.ids(|k| &k.mock));
                compare(
                    "Fetch",
                    app_res.map(|n| shape(&n, &app_ids)),
                    mock_res.map(|n| shape(&n, &mock_ids)),
                );
            }
            FuzzOp::Reply {
                second_discussion,
                parent,
                author,
                body,
            } => {
                let d = discussion(second_discussion);
                let (app_parent, mock_parent) = match parent {
                    None => (None, None),
                    Some(p) => {
                        let (_, app, mock) = self.pick_comment(p);
                        (Some(app), Some(mock))
                    }
                };
                let reply = |parent_id| NewReply {
                    discussion_id: d.clone(),
                    parent_id,
                    author_display_name: author.clone(),
                    author_contact_handle: String::from("fuzz@example.org"),
                    body: body.clone(),
                };
                let app_res: Result<CommentNode, _> =
                    post_on_app(&self.app, "/api/reply", &reply(app_parent)).await;
                let mock_res = self.mock.submit_reply(reply(mock_parent)).await;
                if let (Ok(app), Ok(mock)) = (&app_res, &mock_res) {
                    self.comments.push(Known {
                        discussion: d.clone(),
                        app: app.id.clone(),
                        mock: mock.id.clone(),
                    });
                }
                compare("Reply", app_res.map(|_| ()), mock_res.map(|_| ()));
            }
            FuzzOp::Like {
                comment,
                second_session,
                now_liked,
            } => {
                let (d, app_id, mock_id) = self.pick_comment(comment);
                let like = |comment_id| LikeRequest {
                    comment_id,
                    discussion_id: d.clone(),
                    session_id: self.sessions[second_session as usize],
                    now_liked,
                };
                compare(
                    "Like",
                    post_on_app(&self.app, "/api/like", &like(app_id)).await,
                    self.mock.record_like(like(mock_id)).await,
                );
            }
            FuzzOp::LogActivity {
                comment,
                second_session,
            } => {
                let (d, app_id, mock_id) = self.pick_comment(comment);
                let entry = |comment_id| ActivityEntry {
                    author_display_name: String::from("someone"),
                    comment_id,
                    discussion_id: d.clone(),
                    body: String::from("liked body"),
                    is_reply: false,
                    parent_id: None,
                    session_id: self.sessions[second_session as usize],
                    date: chrono::Utc::now(),
                };
                compare(
                    "LogActivity",
                    post_on_app(&self.app, "/api/activity", &entry(app_id)).await,
                    self.mock.log_activity(entry(mock_id)).await,
                );
                let app_activity: Vec<ActivityEntry> =
                    get_on_app(&self.app, &format!("/api/discussions/{d}/activity"))
                        .await
                        .expect("fetching activity");
                let mock_activity = self
                    .mock
                    .activity()
                    .into_iter()
                    .filter(|e| e.discussion_id == d)
                    .count();
                assert_eq!(app_activity.len(), mock_activity);
            }
        }
    }
}

do_tokio_test!(
    compare_with_mock,
    bolero::generator::gen_with::<Vec<FuzzOp>>().len(1..100usize),
    |test: Vec<FuzzOp>| async move {
        let mut fuzzer = ComparativeFuzzer::new();
        for op in test {
            fuzzer.execute_fuzz_op(op).await;
        }
    }
);

fn seed_comment(id: &str, parent: Option<&str>) -> threadline_api::CommentRecord {
    threadline_api::CommentRecord {
        id: CommentId::new(id),
        discussion_id: discussion(false),
        parent_id: parent.map(CommentId::new),
        author_display_name: format!("author of {id}"),
        author_contact_handle: String::new(),
        body: format!("body of {id}"),
        like_count: 2,
        created_at: threadline_api::RawTimestamp::Text(String::from("2023-01-01 10:00:00")),
    }
}

#[tokio::test]
async fn seeded_threads_are_nested() {
    let app = app(Db::new(vec![
        seed_comment("root", None),
        seed_comment("a", Some("root")),
        seed_comment("b", Some("a")),
        seed_comment("orphan", Some("gone")),
    ]));
    let roots: Vec<CommentNode> = get_on_app(&app, "/api/discussions/blog-1/comments")
        .await
        .unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0].replies[0].replies[0].id, CommentId::new("b"));
    assert_eq!(roots[0].replies[0].replies[0].parent_id, Some(CommentId::new("a")));
    assert_eq!(roots[1].id, CommentId::new("orphan"));
    assert_eq!(roots[1].parent_id, None);
    assert!(roots[0].created_at().is_valid());
}

#[tokio::test]
async fn likes_are_idempotent_per_session() {
    let app = app(Db::new(vec![seed_comment("root", None)]));
    let like = LikeRequest {
        comment_id: CommentId::new("root"),
        discussion_id: discussion(false),
        session_id: SessionId::stub(),
        now_liked: true,
    };
    for _ in 0..2 {
        let () = post_on_app(&app, "/api/like", &like).await.unwrap();
    }
    let roots: Vec<CommentNode> = get_on_app(&app, "/api/discussions/blog-1/comments")
        .await
        .unwrap();
    assert_eq!(roots[0].like_count, 3);

    let unlike = LikeRequest {
        now_liked: false,
        ..like
    };
    for _ in 0..2 {
        let () = post_on_app(&app, "/api/like", &unlike).await.unwrap();
    }
    let roots: Vec<CommentNode> = get_on_app(&app, "/api/discussions/blog-1/comments")
        .await
        .unwrap();
    assert_eq!(roots[0].like_count, 2);
}

#[tokio::test]
async fn errors_reach_the_client() {
    let app = app(Db::default());
    let res: Result<(), _> = post_on_app(
        &app,
        "/api/like",
        &LikeRequest {
            comment_id: CommentId::new("nope"),
            discussion_id: discussion(false),
            session_id: SessionId::stub(),
            now_liked: true,
        },
    )
    .await;
    assert_eq!(res, Err(ApiError::CommentNotFound(CommentId::new("nope"))));

    let res: Result<CommentNode, _> = post_on_app(
        &app,
        "/api/reply",
        &NewReply {
            discussion_id: discussion(false),
            parent_id: None,
            author_display_name: String::from("Ann"),
            author_contact_handle: String::new(),
            body: String::from("   "),
        },
    )
    .await;
    assert_eq!(res, Err(ApiError::EmptyBody));
}

#[tokio::test]
async fn seed_file_is_read() {
    let dir = tempfile::tempdir().expect("creating tempdir");
    let path = dir.path().join("seed.json");
    std::fs::write(
        &path,
        serde_json::to_vec(&vec![seed_comment("root", None)]).unwrap(),
    )
    .unwrap();
    let seed = read_seed(&path).await.unwrap();
    assert_eq!(seed, vec![seed_comment("root", None)]);
    assert!(read_seed(&dir.path().join("missing.json")).await.is_err());
}
