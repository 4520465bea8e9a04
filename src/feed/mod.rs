pub mod interaction;
pub mod pending;
pub mod post;
pub mod scroll;
pub mod source;
pub mod state;

pub use interaction::{can_delete, InteractionController, PendingToggle, ToggleOutcome};
pub use post::{InteractionKind, InteractionOverride, Post};
pub use scroll::{ScrollController, ScrollMetrics, SCROLL_THRESHOLD};
pub use source::{FeedDataSource, FetchOutcome};
pub use state::{FeedState, LoadPhase, CHUNK_SIZE};
