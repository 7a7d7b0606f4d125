pub mod names;
pub mod router;
pub mod sink;
pub mod stats;

pub use router::{DispatcherConfig, SearchDispatcher};
pub use sink::ResultSink;
pub use stats::{DispatcherStats, JobState, StatsSnapshot};
