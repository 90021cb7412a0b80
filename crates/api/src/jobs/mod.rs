//! Background job scheduler and job implementations.

mod pool_metrics;
mod prune_feeds;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use prune_feeds::PruneFeedsJob;
pub use scheduler::{Job, JobScheduler};
