use std::time::Duration;

// Number of root comments shown per page
const DEFAULT_PAGE_SIZE: usize = 10;
// Deep-link lookups happen every RETRY_INTERVAL, at most MAX_ATTEMPTS times
const DEFAULT_RETRY_INTERVAL_MS: u64 = 200;
const DEFAULT_MAX_ATTEMPTS: usize = 10;
// The highlight of a deep-linked comment fades after HIGHLIGHT_DURATION
const DEFAULT_HIGHLIGHT_DURATION_MS: u64 = 3000;

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub page_size: usize,

    /// If true, a failed like also reverts the optimistic like count change,
    /// not only the liked marker
    pub rollback_like_count: bool,

    pub highlight: HighlightConfig,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            page_size: DEFAULT_PAGE_SIZE,
            rollback_like_count: true,
            highlight: HighlightConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Replaces nonsensical values with the defaults, logging each replacement
    pub fn sanitized(mut self) -> EngineConfig {
        if self.page_size == 0 {
            tracing::warn!("page size of 0 requested, using {DEFAULT_PAGE_SIZE}");
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        if self.highlight.max_attempts == 0 {
            tracing::warn!("0 deep-link attempts requested, using {DEFAULT_MAX_ATTEMPTS}");
            self.highlight.max_attempts = DEFAULT_MAX_ATTEMPTS;
        }
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub retry_interval_ms: u64,
    pub max_attempts: usize,
    pub highlight_duration_ms: u64,
}

impl Default for HighlightConfig {
    fn default() -> HighlightConfig {
        HighlightConfig {
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            highlight_duration_ms: DEFAULT_HIGHLIGHT_DURATION_MS,
        }
    }
}

impl HighlightConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_duration_ms)
    }
}
