//! 块级统计计算
//!
//! 对单个3秒样本块计算逐声道的Peak和RMS，纯函数、无共享状态。

use crate::error::{DrError, DrResult};

/// 一个固定时长的多声道样本块
///
/// 交错f32样本（`[L0, R0, L1, R1, ...]`），在已知采样率下
/// 代表约3秒音频；音轨末尾允许不足3秒的尾块。
/// 产生一次、消费一次，统计后即丢弃（内存有界）。
#[derive(Debug, Clone)]
pub struct SampleBlock {
    /// 交错样本数据
    pub samples: Vec<f32>,

    /// 声道数量
    pub channels: usize,
}

impl SampleBlock {
    /// 从交错样本创建块
    ///
    /// 尾部不足一帧的残余样本被截断（解码器按帧输出时不会出现）。
    pub fn new(mut samples: Vec<f32>, channels: usize) -> Self {
        debug_assert!(channels > 0);
        let whole = samples.len() - samples.len() % channels;
        samples.truncate(whole);
        Self { samples, channels }
    }

    /// 块内每声道的样本数（帧数）
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }
}

/// 单个块的逐声道统计结果
///
/// `peak[c]` = 声道c内样本绝对值的最大值；
/// `rms[c]` = 声道c内样本的均方根。瞬态数据，仅存在于归约过程中。
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMetrics {
    /// 逐声道Peak值（线性幅度）
    pub peak: Vec<f64>,

    /// 逐声道RMS值（线性幅度）
    pub rms: Vec<f64>,

    /// 块内每声道的样本数
    pub frames: usize,
}

impl BlockMetrics {
    /// 计算一个样本块的逐声道Peak/RMS
    ///
    /// # 错误
    ///
    /// 零长度块返回 `DrError::EmptyBlock`——调用方跳过该块，
    /// 而不是把它当作静音计入统计。
    pub fn compute(block: &SampleBlock) -> DrResult<Self> {
        let frames = block.frames();
        if frames == 0 {
            return Err(DrError::EmptyBlock);
        }

        let channels = block.channels;
        let mut peak = vec![0.0f64; channels];
        let mut sum_squares = vec![0.0f64; channels];

        for frame in block.samples.chunks_exact(channels) {
            for (channel, &sample) in frame.iter().enumerate() {
                let value = sample as f64;
                let magnitude = value.abs();
                if magnitude > peak[channel] {
                    peak[channel] = magnitude;
                }
                sum_squares[channel] += value * value;
            }
        }

        let rms = sum_squares
            .iter()
            .map(|&sum| (sum / frames as f64).sqrt())
            .collect();

        Ok(Self { peak, rms, frames })
    }
}
