//! Album DR Meter
//!
//! 按DR14标准算法批量测量音乐合集的动态范围：
//! 每条音轨解码为PCM后切成3秒块，统计逐块Peak/RMS，
//! 取最响20%块与第二大峰值推导DR值，并按(声道数, 采样率)
//! 分组汇总为日志报告。
//!
//! ## 核心特性
//! - 3秒块 + 最响20%统计 + 第二大Peak（剔除瞬态尖峰）
//! - 两级有界工作池：跨文件并行 + 单音轨块流并行
//! - 顺序无关的累积合并，内层并行不需要锁
//! - ffmpeg子进程解码，有界通道背压，内存恒定

pub mod audio;
pub mod core;
pub mod error;
pub mod tools;

// 重新导出核心类型
pub use audio::{AudioSource, PcmBlockSource, TrackInfo, read_audio_info, write_dr_tags};
pub use core::{
    BlockMetrics, FileResult, LogGroup, PoolPlan, SampleBlock, Summary, TrackAccumulator,
    TrackDr, TrackEntry, WorkerPool,
};
pub use error::{DrError, DrResult, ErrorCategory};
pub use tools::{AnalysisReport, MeterOptions, analyze_dr};
