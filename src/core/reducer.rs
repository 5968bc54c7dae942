//! 音轨级DR归约
//!
//! 消费一条音轨的全部块统计，维护逐声道累积状态，
//! 流结束时推导音轨DR值、上报Peak/RMS和总样本数。
//!
//! ## 顺序无关性
//!
//! 所有累积操作都是可交换、可结合的合并（完整RMS记录 + 固定大小的
//! Top-2峰值结构 + 帧计数），因此块可以乱序吸收、两个部分累积器可以
//! 直接合并——这是块级内层并行的前提，最终只需一次合并、无需锁。

use crate::core::block_metrics::BlockMetrics;
use crate::tools::constants::measurement::{DB_FLOOR_AMPLITUDE, LOUD_BLOCK_FRACTION};

/// 线性幅度→dB，带幅度下限
///
/// 零幅度换算为约-200dB的哨兵值而不是-inf。
#[inline]
pub fn linear_to_db(value: f64) -> f64 {
    20.0 * value.max(DB_FLOOR_AMPLITUDE).log10()
}

/// 固定大小的Top-2峰值结构
///
/// O(1)更新；上报"第二大Peak"以剔除单个瞬态尖峰对测量的影响。
/// `record`/`merge` 均可交换可结合，支持乱序并行累积。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TopTwoPeaks {
    highest: f64,
    second: f64,
}

impl TopTwoPeaks {
    /// 记录一个块峰值
    #[inline]
    pub fn record(&mut self, peak: f64) {
        if peak > self.highest {
            self.second = self.highest;
            self.highest = peak;
        } else if peak > self.second {
            self.second = peak;
        }
    }

    /// 合并另一个Top-2结构（可交换）
    pub fn merge(&mut self, other: &TopTwoPeaks) {
        self.record(other.highest);
        if other.second > 0.0 {
            self.record(other.second);
        }
    }

    /// 最大峰值
    #[inline]
    pub fn highest(&self) -> f64 {
        self.highest
    }

    /// 第二大峰值；只见过一个块时回退到最大峰值
    #[inline]
    pub fn second_or_highest(&self) -> f64 {
        if self.second > 0.0 { self.second } else { self.highest }
    }
}

/// 单声道的累积状态
///
/// RMS记录不截断：最响20%的选择要到终结时才基于完整分布决定。
#[derive(Debug, Clone, Default)]
pub struct ChannelAccumulator {
    /// 已见各块的RMS值（无序记录，终结时排序）
    rms_blocks: Vec<f64>,

    /// 已见块峰值的Top-2
    peaks: TopTwoPeaks,
}

impl ChannelAccumulator {
    fn absorb(&mut self, rms: f64, peak: f64) {
        self.rms_blocks.push(rms);
        self.peaks.record(peak);
    }

    fn merge(&mut self, mut other: ChannelAccumulator) {
        self.rms_blocks.append(&mut other.rms_blocks);
        self.peaks.merge(&other.peaks);
    }

    /// 终结：返回(该声道DR, peak_db, rms_db)
    fn finalize(&mut self) -> (f64, f64, f64) {
        let n = self.rms_blocks.len();
        debug_assert!(n > 0);

        // 按RMS降序取前 ceil(N * 0.2) 块（至少1块）
        self.rms_blocks
            .sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let take = ((n as f64 * LOUD_BLOCK_FRACTION).ceil() as usize).clamp(1, n);
        let loudest = &self.rms_blocks[..take];

        // RMS-of-RMS：在功率域重新平均，而不是幅度域
        let power_mean = loudest.iter().map(|r| r * r).sum::<f64>() / take as f64;
        let rms_db = linear_to_db(power_mean.sqrt());
        let peak_db = linear_to_db(self.peaks.second_or_highest());

        (peak_db - rms_db, peak_db, rms_db)
    }
}

/// 音轨DR结果
///
/// 归约终结时创建一次，此后不可变。
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDr {
    /// DR值；块数不足以得到有意义的值时为None（上报为"N/A"而非错误）
    pub dr: Option<f64>,

    /// 上报Peak（dB，各声道第二大峰值换算后的均值）
    pub peak_db: f64,

    /// 上报RMS（dB，各声道最响20%块RMS换算后的均值）
    pub rms_db: f64,

    /// 音轨总样本数（每声道帧数）
    pub sample_count: u64,
}

/// 音轨级累积器
///
/// 每条音轨独占一个实例（或多个部分实例，最终合并），
/// 不同音轨之间绝不共享累积状态。
#[derive(Debug, Clone)]
pub struct TrackAccumulator {
    channels: Vec<ChannelAccumulator>,

    /// 已吸收的块数
    blocks: usize,

    /// 被跳过的零长度块数
    skipped_blocks: usize,

    /// 累计帧数
    frames: u64,
}

impl TrackAccumulator {
    /// 创建指定声道数的空累积器
    pub fn new(channel_count: usize) -> Self {
        Self {
            channels: vec![ChannelAccumulator::default(); channel_count],
            blocks: 0,
            skipped_blocks: 0,
            frames: 0,
        }
    }

    /// 吸收一个块的统计结果（顺序无关）
    pub fn absorb(&mut self, metrics: BlockMetrics) {
        debug_assert_eq!(metrics.peak.len(), self.channels.len());
        for (channel, accumulator) in self.channels.iter_mut().enumerate() {
            accumulator.absorb(metrics.rms[channel], metrics.peak[channel]);
        }
        self.blocks += 1;
        self.frames += metrics.frames as u64;
    }

    /// 记录一个被跳过的零长度块
    pub fn note_skipped(&mut self) {
        self.skipped_blocks += 1;
    }

    /// 合并另一个部分累积器（可交换，用于并行归约树）
    pub fn merge(mut self, other: TrackAccumulator) -> Self {
        debug_assert_eq!(self.channels.len(), other.channels.len());
        for (mine, theirs) in self.channels.iter_mut().zip(other.channels) {
            mine.merge(theirs);
        }
        self.blocks += other.blocks;
        self.skipped_blocks += other.skipped_blocks;
        self.frames += other.frames;
        self
    }

    /// 已吸收的块数
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// 被跳过的零长度块数
    pub fn skipped_blocks(&self) -> usize {
        self.skipped_blocks
    }

    /// 终结归约，产出音轨DR结果
    ///
    /// 音轨DR = 各声道DR的算术平均，默认四舍五入到整数；
    /// `keep_precision` 时保留未舍入值。没有任何块时DR为None，
    /// Peak/RMS按dB下限上报。
    pub fn finalize(mut self, keep_precision: bool) -> TrackDr {
        if self.blocks == 0 {
            let floor_db = linear_to_db(0.0);
            return TrackDr {
                dr: None,
                peak_db: floor_db,
                rms_db: floor_db,
                sample_count: self.frames,
            };
        }

        let channel_count = self.channels.len() as f64;
        let mut dr_sum = 0.0;
        let mut peak_db_sum = 0.0;
        let mut rms_db_sum = 0.0;

        for channel in &mut self.channels {
            let (dr, peak_db, rms_db) = channel.finalize();
            dr_sum += dr;
            peak_db_sum += peak_db;
            rms_db_sum += rms_db;
        }

        let mut dr = dr_sum / channel_count;
        if !keep_precision {
            dr = dr.round();
        }

        TrackDr {
            dr: Some(dr),
            peak_db: peak_db_sum / channel_count,
            rms_db: rms_db_sum / channel_count,
            sample_count: self.frames,
        }
    }
}
