//! Tower middleware layers for the dispatch pipeline.
//!
//! - `LoadShedLayer`: rejects requests when concurrency limit is reached
//! - `MetricsLayer`: records dispatch timing and outcome via tracing spans
//! - `build_dispatch_pipeline`: composes the layers around a `Handler`

pub mod load_shed;
pub mod metrics;
pub mod pipeline;

pub use load_shed::{LoadShedLayer, LoadShedService};
pub use metrics::{MetricsLayer, MetricsService};
pub use pipeline::build_dispatch_pipeline;
