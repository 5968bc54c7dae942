//! 分析流程编排
//!
//! 目录 → 两级工作池 → 逐音轨归约 → 按提交顺序汇总。
//! 每条音轨的累积状态由处理它的工作单元独占；
//! 汇总只在所有单元完成后进行（单一同步屏障）。

use crate::audio::catalog::{AudioSource, TrackInfo};
use crate::audio::pcm_source::PcmBlockSource;
use crate::core::aggregate::{
    FileResult, LogGroup, Summary, TrackEntry, make_log_groups, summarize,
};
use crate::core::scheduler::{PoolPlan, WorkerPool, reduce_block_stream};
use crate::error::DrResult;
use crate::tools::constants::measurement::MEASURE_SAMPLE_RATE;
use crate::tools::utils::extract_filename_lossy;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use std::collections::BTreeSet;

/// 测量选项
#[derive(Debug, Clone, Copy)]
pub struct MeterOptions {
    /// 保留精度（不舍入）
    pub keep_precision: bool,

    /// 不重采样到统一测量采样率
    pub no_resample: bool,

    /// 显示详细处理信息
    pub verbose: bool,
}

/// 完整分析结果
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// 日志分组（提交顺序）
    pub groups: Vec<LogGroup>,

    /// 全集汇总统计
    pub summary: Summary,
}

/// 分析输入集内所有音轨的DR
///
/// 外层池跨文件并行（允许乱序完成），内层池在单音轨的块流上并行；
/// 两级宽度启动时从主机并行度一次确定。每条音轨终结后立即调用
/// `track_cb` 用于实时进度显示。任何致命错误（解码失败等）
/// 中止整次运行，不产生部分报告。
pub fn analyze_dr<F>(
    sources: &[AudioSource],
    options: &MeterOptions,
    track_cb: &F,
) -> DrResult<AnalysisReport>
where
    F: Fn(&TrackInfo, Option<f64>) + Send + Sync,
{
    let plan = PoolPlan::for_workload(sources.len());
    if options.verbose {
        println!(
            "⚙️  并行规划 / Parallel plan: outer={}, inner={}",
            plan.outer_width, plan.inner_width
        );
    }

    let outer_pool = WorkerPool::with_width(plan.outer_width, "dr-file")?;
    let inner_pool = WorkerPool::with_width(plan.inner_width, "dr-block")?;

    let process_source = |(submission_index, source): (usize, &AudioSource)| {
        process_single_source(submission_index, source, &inner_pool, options, track_cb)
    };

    // 外层调度：结果携带提交序号，完成顺序不作保证
    let results: Vec<FileResult> = match &outer_pool {
        WorkerPool::Serial => sources
            .iter()
            .enumerate()
            .map(process_source)
            .collect::<DrResult<Vec<_>>>()?,
        WorkerPool::Threads(pool) => pool.install(|| {
            sources
                .par_iter()
                .enumerate()
                .map(process_source)
                .collect::<DrResult<Vec<_>>>()
        })?,
    };

    // 屏障之后：恢复提交顺序再做相邻分组
    let groups = make_log_groups(results);
    let summary = summarize(&groups, options.keep_precision)?;

    Ok(AnalysisReport { groups, summary })
}

/// 处理单个文件：逐音轨解码、归约、终结
fn process_single_source<F>(
    submission_index: usize,
    source: &AudioSource,
    inner_pool: &WorkerPool,
    options: &MeterOptions,
    track_cb: &F,
) -> DrResult<FileResult>
where
    F: Fn(&TrackInfo, Option<f64>) + Send + Sync,
{
    let measure_rate = if options.no_resample {
        source.sample_rate
    } else {
        MEASURE_SAMPLE_RATE
    };

    let mut performers = BTreeSet::new();
    let mut albums = BTreeSet::new();
    let mut tracks = Vec::with_capacity(source.tracks.len());

    for track in &source.tracks {
        let stream = PcmBlockSource::open(
            &source.file_path,
            source.channels,
            measure_rate,
            !options.no_resample,
        )?;

        let accumulator =
            reduce_block_stream(inner_pool, source.channels as usize, stream.blocks())?;

        if options.verbose && accumulator.skipped_blocks() > 0 {
            println!(
                "⚠️  {} 跳过 {} 个零长度块 / skipped {} empty block(s)",
                extract_filename_lossy(&source.file_path),
                accumulator.skipped_blocks(),
                accumulator.skipped_blocks()
            );
        }

        let result = accumulator.finalize(options.keep_precision);
        track_cb(track, result.dr);

        performers.insert(track.tags.performer.clone());
        albums.insert(track.tags.album.clone());

        let duration_secs =
            (result.sample_count as f64 / measure_rate as f64).round() as u64;
        tracks.push(TrackEntry {
            dr: result.dr,
            peak_db: result.peak_db,
            rms_db: result.rms_db,
            duration_secs,
            name: format!("{:02}-{}", track.global_index, track.tags.title),
            file_path: source.file_path.clone(),
        });
    }

    Ok(FileResult {
        submission_index,
        channels: source.channels,
        sample_rate: source.sample_rate,
        performers,
        albums,
        tracks,
    })
}
