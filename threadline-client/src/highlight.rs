use std::time::Duration;

use async_trait::async_trait;

use crate::{api::CommentId, HighlightConfig};

/// What the host currently displays
pub trait RenderedView {
    fn is_rendered(&mut self, id: &CommentId) -> bool;
    fn scroll_to(&mut self, id: &CommentId);
    fn highlight(&mut self, id: &CommentId);
    fn clear_highlight(&mut self, id: &CommentId);
}

#[async_trait(?Send)]
pub trait Timer {
    async fn sleep(&self, d: Duration);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HighlightOutcome {
    NoTarget,
    Highlighted { attempts: usize },
    GaveUp { attempts: usize },
}

/// Draws attention to a deep-linked comment once it shows up on screen
pub struct HighlightController<V, T> {
    view: V,
    timer: T,
    config: HighlightConfig,
}

impl<V: RenderedView, T: Timer> HighlightController<V, T> {
    pub fn new(view: V, timer: T, config: HighlightConfig) -> HighlightController<V, T> {
        HighlightController {
            view,
            timer,
            config,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_parts(self) -> (V, T) {
        (self.view, self.timer)
    }

    /// Looks for `target` right away, then again every retry interval until
    /// the attempt ceiling, and gives up silently after that
    pub async fn run(&mut self, target: Option<&CommentId>) -> HighlightOutcome {
        let target = match target {
            None => return HighlightOutcome::NoTarget,
            Some(t) => t,
        };
        let max_attempts = self.config.max_attempts;
        for attempt in 1..=max_attempts {
            if self.view.is_rendered(target) {
                tracing::debug!(comment=?target, attempt, "highlighting deep-linked comment");
                self.view.scroll_to(target);
                self.view.highlight(target);
                self.timer.sleep(self.config.highlight_duration()).await;
                self.view.clear_highlight(target);
                return HighlightOutcome::Highlighted { attempts: attempt };
            }
            if attempt < max_attempts {
                self.timer.sleep(self.config.retry_interval()).await;
            }
        }
        tracing::debug!(comment=?target, max_attempts, "deep-linked comment never rendered, giving up");
        HighlightOutcome::GaveUp {
            attempts: max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeView {
        // comment appears after this many lookups
        appears_after: Option<usize>,
        queries: usize,
        calls: Vec<&'static str>,
    }

    impl RenderedView for FakeView {
        fn is_rendered(&mut self, _id: &CommentId) -> bool {
            self.queries += 1;
            matches!(self.appears_after, Some(n) if self.queries > n)
        }

        fn scroll_to(&mut self, _id: &CommentId) {
            self.calls.push("scroll");
        }

        fn highlight(&mut self, _id: &CommentId) {
            self.calls.push("highlight");
        }

        fn clear_highlight(&mut self, _id: &CommentId) {
            self.calls.push("clear");
        }
    }

    #[derive(Default)]
    struct RecordingTimer(Mutex<Vec<Duration>>);

    #[async_trait(?Send)]
    impl Timer for RecordingTimer {
        async fn sleep(&self, d: Duration) {
            self.0.lock().push(d);
        }
    }

    fn controller(view: FakeView) -> HighlightController<FakeView, RecordingTimer> {
        HighlightController::new(view, RecordingTimer::default(), HighlightConfig::default())
    }

    #[test]
    fn no_target_is_a_noop() {
        let mut c = controller(FakeView::default());
        assert_eq!(block_on(c.run(None)), HighlightOutcome::NoTarget);
        let (view, timer) = c.into_parts();
        assert_eq!(view.queries, 0);
        assert!(timer.0.lock().is_empty());
    }

    #[test]
    fn highlights_immediately_when_rendered() {
        let mut c = controller(FakeView {
            appears_after: Some(0),
            ..FakeView::default()
        });
        let id = CommentId::new("c1");
        assert_eq!(
            block_on(c.run(Some(&id))),
            HighlightOutcome::Highlighted { attempts: 1 }
        );
        let (view, timer) = c.into_parts();
        assert_eq!(view.calls, vec!["scroll", "highlight", "clear"]);
        assert_eq!(*timer.0.lock(), vec![Duration::from_secs(3)]);
    }

    #[test]
    fn retries_until_rendered() {
        let mut c = controller(FakeView {
            appears_after: Some(3),
            ..FakeView::default()
        });
        let id = CommentId::new("c1");
        assert_eq!(
            block_on(c.run(Some(&id))),
            HighlightOutcome::Highlighted { attempts: 4 }
        );
        let (_, timer) = c.into_parts();
        let sleeps = timer.0.lock().clone();
        assert_eq!(
            sleeps,
            vec![
                Duration::from_millis(200),
                Duration::from_millis(200),
                Duration::from_millis(200),
                Duration::from_secs(3),
            ]
        );
    }

    #[test]
    fn stops_after_attempt_ceiling() {
        let mut c = controller(FakeView::default());
        let id = CommentId::new("c1");
        assert_eq!(
            block_on(c.run(Some(&id))),
            HighlightOutcome::GaveUp { attempts: 10 }
        );
        assert_eq!(c.view().queries, 10);
        assert!(c.view().calls.is_empty());
        let (_, timer) = c.into_parts();
        // no wait after the last lookup: about 2 seconds in total
        assert_eq!(timer.0.lock().len(), 9);
    }
}
