pub mod limiter;
pub mod pipeline;
pub mod pool;
pub mod process;
pub mod reindex;
pub mod stats;

pub use limiter::RateLimiter;
pub use pipeline::IndexingPipeline;
pub use pool::BatchOutcome;
pub use process::{Outcome, ProcessorConfig, UserProcessor};
pub use reindex::ReindexPoller;
pub use stats::{IndexingStats, PhaseCounters, StatsHandle};
