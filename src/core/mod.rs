//! DR计算核心引擎
//!
//! 块级统计 → 音轨级归约 → 两级调度 → 结果汇总

pub mod aggregate;
pub mod block_metrics;
pub mod reducer;
pub mod scheduler;

pub use aggregate::{FileResult, LogGroup, Summary, TrackEntry, make_log_groups, summarize};
pub use block_metrics::{BlockMetrics, SampleBlock};
pub use reducer::{TopTwoPeaks, TrackAccumulator, TrackDr, linear_to_db};
pub use scheduler::{PoolPlan, WorkerPool, reduce_block_stream};
