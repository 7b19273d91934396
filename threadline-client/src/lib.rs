mod config;
pub use config::{EngineConfig, HighlightConfig};

mod engine;
pub use engine::{Engine, LikeOutcome, LoadError, LoadTicket, PendingLike};

mod expand;
pub use expand::ExpandState;

mod forest;
pub use forest::{Forest, LikeDelta, Located, Node};

mod highlight;
pub use highlight::{HighlightController, HighlightOutcome, RenderedView, Timer};

mod likes;
pub use likes::LikeState;

mod page;
pub use page::{paginate, total_pages, Page};

pub mod api {
    pub use threadline_api::*;
}
