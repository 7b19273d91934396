use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use threadline_client::{
    api::{CommentId, Store},
    Engine, RenderedView, Timer,
};

pub struct TokioTimer;

#[async_trait(?Send)]
impl Timer for TokioTimer {
    async fn sleep(&self, d: Duration) {
        tokio::time::sleep(d).await
    }
}

/// Lines printed for the current page, by comment
pub struct TerminalView {
    lines: HashMap<CommentId, String>,
}

impl RenderedView for TerminalView {
    fn is_rendered(&mut self, id: &CommentId) -> bool {
        self.lines.contains_key(id)
    }

    fn scroll_to(&mut self, id: &CommentId) {
        println!();
        println!("--- comment-{id} ---");
    }

    fn highlight(&mut self, id: &CommentId) {
        if let Some(line) = self.lines.get(id) {
            // reverse video
            println!("\x1b[7m{line}\x1b[0m");
        }
    }

    fn clear_highlight(&mut self, id: &CommentId) {
        tracing::debug!(comment=?id, "highlight faded");
    }
}

/// Prints the current page of `engine` and returns what got printed
pub fn render<S: Store>(engine: &Engine<S>) -> TerminalView {
    let mut lines = HashMap::new();
    if let Some(msg) = engine.load_error() {
        println!("{msg}");
        return TerminalView { lines };
    }
    let page = engine.current_page();
    println!(
        "{} comments, page {}/{}",
        page.total_comment_count, page.page, page.total_pages
    );
    let forest = engine.forest();
    for id in engine.rendered_ids() {
        let node = match forest.get(id) {
            Some(n) => n,
            None => continue,
        };
        let c = &node.comment;
        let indent = "    ".repeat(forest.ancestors(id).len());
        let official = match c.is_official() {
            true => " [official]",
            false => "",
        };
        let liked = match engine.is_liked(id) {
            true => "*",
            false => " ",
        };
        let mut line = format!(
            "{indent}{liked}{} likes  {}{official}  {}  ({id})",
            c.like_count,
            c.author_display_name,
            c.created_at.normalize(),
        );
        for body_line in c.body.lines() {
            line.push_str(&format!("\n{indent}    {body_line}"));
        }
        let hidden = forest.count_descendants(id);
        if hidden > 0 && !engine.is_expanded(id) {
            line.push_str(&format!("\n{indent}    [{hidden} replies]"));
        }
        println!("{line}");
        lines.insert(id.clone(), line);
    }
    TerminalView { lines }
}
