//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// DR测量算法常量
pub mod measurement {
    /// 样本块时长（秒）- DR14标准
    ///
    /// 固定3秒块与官方DR meter保持一致，
    /// 确保测量结果的可比性
    pub const BLOCK_DURATION_SECONDS: f64 = 3.0;

    /// 统一测量采样率（Hz）
    ///
    /// 官方meter在测量前将所有音频重采样到44.1kHz；
    /// 使用 --no-resample 时保留源采样率（同时禁用日志）
    pub const MEASURE_SAMPLE_RATE: u32 = 44_100;

    /// 参与统计的"最响块"比例
    ///
    /// 按RMS降序取前20%的块（向上取整，至少1块）
    pub const LOUD_BLOCK_FRACTION: f64 = 0.2;

    /// dB换算的幅度下限
    ///
    /// log10(0)未定义；零幅度按该下限换算为约-200dB的哨兵值，
    /// 而不是产生-inf或报错
    pub const DB_FLOOR_AMPLITUDE: f64 = 1e-10;
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    ///
    /// 任何并行处理至少需要1个线程/工作单元；
    /// 宽度为1时严格退化为串行按序执行
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    ///
    /// 限制最大并发度为16，避免过度并发导致的：
    /// - 上下文切换开销
    /// - 内存占用过高
    /// - 系统资源竞争
    pub const MAX_PARALLEL_DEGREE: usize = 16;

    /// 解码线程→统计线程的有界通道容量（以块计）
    ///
    /// 背压机制：通道满时解码线程阻塞，
    /// 无论音轨多长内存都保持有界
    pub const BLOCK_CHANNEL_CAPACITY: usize = 8;
}
