//! 两级有界工作池调度
//!
//! 启动时根据检测到的主机并行度一次性确定两级池宽，之后不再调整：
//!
//! - 外层：跨文件/音轨源并行，宽度 = clamp(1, 文件数, P)
//! - 内层：单音轨块流的统计并行，宽度 = max(1, P / 外层宽度)
//!
//! 宽度为1的级别严格退化为串行按序执行。内层并行时只更新顺序无关的
//! 累积器（RMS记录、Top-2峰值、帧计数），从不依赖块到达顺序。

use crate::core::block_metrics::{BlockMetrics, SampleBlock};
use crate::core::reducer::TrackAccumulator;
use crate::error::{DrError, DrResult};
use crate::tools::constants::parallel_limits::MAX_PARALLEL_DEGREE;
use rayon::iter::{ParallelBridge, ParallelIterator};

/// 检测主机并行度（受最大并发度上限约束）
fn detected_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_PARALLEL_DEGREE)
}

/// 两级池宽规划
///
/// 一次计算、整次运行不变。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolPlan {
    /// 外层宽度（跨文件）
    pub outer_width: usize,

    /// 内层宽度（单音轨块流）
    pub inner_width: usize,
}

impl PoolPlan {
    /// 根据音轨源数量规划两级池宽
    pub fn for_workload(track_sources: usize) -> Self {
        Self::with_parallelism(detected_parallelism(), track_sources)
    }

    /// 显式并行度版本（便于测试）
    pub fn with_parallelism(parallelism: usize, track_sources: usize) -> Self {
        let parallelism = parallelism.max(1);
        let outer_width = parallelism.min(track_sources).max(1);
        let inner_width = (parallelism / outer_width).max(1);
        Self {
            outer_width,
            inner_width,
        }
    }
}

/// 有界工作池
///
/// 宽度1 => `Serial`：严格串行按序执行（不是优化，是顺序保证）；
/// 宽度>1 => 固定大小的rayon线程池。
pub enum WorkerPool {
    /// 串行执行
    Serial,

    /// 固定大小线程池
    Threads(rayon::ThreadPool),
}

impl WorkerPool {
    /// 按指定宽度创建工作池
    pub fn with_width(width: usize, name_prefix: &str) -> DrResult<Self> {
        if width <= 1 {
            return Ok(WorkerPool::Serial);
        }
        let prefix = name_prefix.to_string();
        rayon::ThreadPoolBuilder::new()
            .num_threads(width)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()
            .map(WorkerPool::Threads)
            .map_err(|e| DrError::ResourceError(format!("线程池创建失败: {e}")))
    }

    /// 池宽
    pub fn width(&self) -> usize {
        match self {
            WorkerPool::Serial => 1,
            WorkerPool::Threads(pool) => pool.current_num_threads(),
        }
    }
}

/// 将一条音轨的块流归约为累积器
///
/// 串行路径按到达顺序处理；并行路径通过 `par_bridge` 乱序分发块统计，
/// 用 `try_fold`/`try_reduce` 做"各自累积、最终合并"的归约树——
/// 两条路径产出的结果一致（累积器顺序无关）。
///
/// 零长度块（`EmptyBlock`）被跳过并计数；来自块源的解码错误
/// 立即向上传播，终止该音轨乃至整次运行。
pub fn reduce_block_stream<I>(
    pool: &WorkerPool,
    channel_count: usize,
    blocks: I,
) -> DrResult<TrackAccumulator>
where
    I: Iterator<Item = DrResult<SampleBlock>> + Send,
{
    match pool {
        WorkerPool::Serial => {
            let mut accumulator = TrackAccumulator::new(channel_count);
            for block in blocks {
                match BlockMetrics::compute(&block?) {
                    Ok(metrics) => accumulator.absorb(metrics),
                    Err(DrError::EmptyBlock) => accumulator.note_skipped(),
                    Err(e) => return Err(e),
                }
            }
            Ok(accumulator)
        }
        WorkerPool::Threads(pool) => pool.install(|| {
            blocks
                .par_bridge()
                .map(|block| match BlockMetrics::compute(&block?) {
                    Ok(metrics) => Ok(Some(metrics)),
                    Err(DrError::EmptyBlock) => Ok(None),
                    Err(e) => Err(e),
                })
                .try_fold(
                    || TrackAccumulator::new(channel_count),
                    |mut accumulator, metrics: DrResult<Option<BlockMetrics>>| {
                        match metrics? {
                            Some(metrics) => accumulator.absorb(metrics),
                            None => accumulator.note_skipped(),
                        }
                        Ok(accumulator)
                    },
                )
                .try_reduce(
                    || TrackAccumulator::new(channel_count),
                    |left, right| Ok(left.merge(right)),
                )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_plan_saturated_by_files() {
        // 文件数 >= 并行度：外层吃满，内层退化为1
        let plan = PoolPlan::with_parallelism(8, 12);
        assert_eq!(plan.outer_width, 8);
        assert_eq!(plan.inner_width, 1);
    }

    #[test]
    fn test_pool_plan_few_files() {
        // 2个文件、8核：外层2、内层4
        let plan = PoolPlan::with_parallelism(8, 2);
        assert_eq!(plan.outer_width, 2);
        assert_eq!(plan.inner_width, 4);
    }

    #[test]
    fn test_pool_plan_single_core() {
        let plan = PoolPlan::with_parallelism(1, 5);
        assert_eq!(plan.outer_width, 1);
        assert_eq!(plan.inner_width, 1);
    }

    #[test]
    fn test_pool_plan_zero_sources() {
        // 空输入在调度前就会被拒绝，但规划本身不得除零
        let plan = PoolPlan::with_parallelism(4, 0);
        assert_eq!(plan.outer_width, 1);
        assert_eq!(plan.inner_width, 4);
    }

    #[test]
    fn test_serial_pool_width() {
        let pool = WorkerPool::with_width(1, "test").unwrap();
        assert!(matches!(pool, WorkerPool::Serial));
        assert_eq!(pool.width(), 1);
    }

    #[test]
    fn test_thread_pool_width() {
        let pool = WorkerPool::with_width(3, "test").unwrap();
        assert_eq!(pool.width(), 3);
    }

    fn synthetic_blocks(count: usize) -> Vec<DrResult<SampleBlock>> {
        (1..=count)
            .map(|i| {
                let value = i as f32 * 0.08;
                Ok(SampleBlock::new(vec![value; 882], 2))
            })
            .collect()
    }

    #[test]
    fn test_reduction_is_width_invariant() {
        // 同一块流在内层宽度1和4下必须得到一致的DR/Peak/RMS
        let serial_pool = WorkerPool::with_width(1, "w1").unwrap();
        let parallel_pool = WorkerPool::with_width(4, "w4").unwrap();

        let serial = reduce_block_stream(&serial_pool, 2, synthetic_blocks(10).into_iter())
            .unwrap()
            .finalize(true);
        let parallel = reduce_block_stream(&parallel_pool, 2, synthetic_blocks(10).into_iter())
            .unwrap()
            .finalize(true);

        assert!((serial.dr.unwrap() - parallel.dr.unwrap()).abs() < 1e-12);
        assert!((serial.peak_db - parallel.peak_db).abs() < 1e-12);
        assert!((serial.rms_db - parallel.rms_db).abs() < 1e-12);
        assert_eq!(serial.sample_count, parallel.sample_count);
    }

    #[test]
    fn test_empty_blocks_are_skipped() {
        let mut blocks = synthetic_blocks(4);
        blocks.insert(2, Ok(SampleBlock::new(Vec::new(), 2)));

        let pool = WorkerPool::with_width(1, "skip").unwrap();
        let accumulator = reduce_block_stream(&pool, 2, blocks.into_iter()).unwrap();

        assert_eq!(accumulator.blocks(), 4);
        assert_eq!(accumulator.skipped_blocks(), 1);
    }

    #[test]
    fn test_decode_failure_aborts_reduction() {
        let mut blocks = synthetic_blocks(3);
        blocks.push(Err(DrError::DecodeFailure("broken pipe".into())));

        let pool = WorkerPool::with_width(1, "fail").unwrap();
        let result = reduce_block_stream(&pool, 2, blocks.into_iter());
        assert!(matches!(result, Err(DrError::DecodeFailure(_))));

        let pool = WorkerPool::with_width(4, "fail-par").unwrap();
        let mut blocks = synthetic_blocks(3);
        blocks.push(Err(DrError::DecodeFailure("broken pipe".into())));
        let result = reduce_block_stream(&pool, 2, blocks.into_iter());
        assert!(matches!(result, Err(DrError::DecodeFailure(_))));
    }
}
