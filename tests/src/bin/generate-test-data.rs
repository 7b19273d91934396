use chrono::{Duration, Utc};
use rand::{seq::SliceRandom, Rng};
use threadline_api::{CommentId, CommentRecord, DiscussionId, RawTimestamp, OFFICIAL_HANDLE};

const NUM_DISCUSSIONS: usize = 3;
const NUM_AUTHORS: usize = 8;

const NUM_COMMENTS: usize = 400;
// Chance for a comment to reply to an earlier comment of its discussion
const REPLY_PROBABILITY: f64 = 0.6;
const OFFICIAL_PROBABILITY: f64 = 0.05;
const MAX_LIKES: u64 = 40;
const MAX_BODY_WORDS: usize = 60;

// Stores in the wild hand out dates in many shapes, generate all of them
fn gen_timestamp(rng: &mut impl Rng) -> RawTimestamp {
    let date = Utc::now() - Duration::minutes(rng.gen_range(0..60 * 24 * 365));
    match rng.gen_range(0..10) {
        0..=3 => RawTimestamp::from(date),
        4..=5 => RawTimestamp::Millis(date.timestamp_millis()),
        6..=7 => RawTimestamp::Text(date.to_rfc3339()),
        8 => RawTimestamp::Text(date.format("%Y-%m-%d %H:%M:%S").to_string()),
        _ => RawTimestamp::Text(String::from("not a date")),
    }
}

fn main() {
    let mut rng = rand::thread_rng();

    let discussions = (0..NUM_DISCUSSIONS)
        .map(|i| DiscussionId(format!("blog-{}", i + 1)))
        .collect::<Vec<_>>();
    let authors = (0..NUM_AUTHORS)
        .map(|i| (lipsum::lipsum_words(2), format!("reader{i}@example.org")))
        .collect::<Vec<_>>();

    let mut comments: Vec<CommentRecord> = Vec::with_capacity(NUM_COMMENTS);
    for _ in 0..NUM_COMMENTS {
        let discussion = discussions.choose(&mut rng).unwrap().clone();
        let parent_id = match rng.gen_bool(REPLY_PROBABILITY) {
            false => None,
            true => comments
                .iter()
                .filter(|c| c.discussion_id == discussion)
                .collect::<Vec<_>>()
                .choose(&mut rng)
                .map(|c| c.id.clone()),
        };
        let (author_display_name, author_contact_handle) =
            match rng.gen_bool(OFFICIAL_PROBABILITY) {
                true => (String::from("The Editors"), String::from(OFFICIAL_HANDLE)),
                false => authors.choose(&mut rng).unwrap().clone(),
            };
        comments.push(CommentRecord {
            id: CommentId(uuid::Uuid::new_v4().to_string()),
            discussion_id: discussion,
            parent_id,
            author_display_name,
            author_contact_handle,
            body: lipsum::lipsum_words(rng.gen_range(1..MAX_BODY_WORDS)),
            like_count: rng.gen_range(0..MAX_LIKES),
            created_at: gen_timestamp(&mut rng),
        });
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&comments).expect("serializing comments")
    );
}
