//! 统一错误处理框架
//!
//! 区分"可恢复条件"（以数据形式吸收，如空块、无法测量的音轨）
//! 和"致命条件"（向上传播并取消整次运行）。

use std::fmt;
use std::io;

/// DR测量相关的统一错误类型
#[derive(Debug)]
pub enum DrError {
    /// 输入路径中没有任何可分析的音轨 - 致命，调度前中止
    EmptyInput(String),

    /// 命令行参数或输入验证错误
    InvalidInput(String),

    /// 文件I/O错误
    IoError(io::Error),

    /// 格式探测/标签读写错误（ffprobe、标签容器）
    FormatError(String),

    /// 外部解码器失败 - 致命，取消整次运行（不产生部分报告）
    DecodeFailure(String),

    /// 零长度样本块 - 可恢复，跳过该块而不是当作静音
    EmptyBlock,

    /// 所有音轨都未能得到DR值，汇总统计无意义 - 致命
    NoMeasurableTracks,

    /// 资源访问错误（线程池创建等）
    ResourceError(String),
}

impl fmt::Display for DrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrError::EmptyInput(path) => write!(f, "输入中没有可分析的音轨: {path}"),
            DrError::InvalidInput(msg) => write!(f, "输入验证失败: {msg}"),
            DrError::IoError(err) => write!(f, "文件I/O错误: {err}"),
            DrError::FormatError(msg) => write!(f, "音频格式错误: {msg}"),
            DrError::DecodeFailure(msg) => write!(f, "音频解码失败: {msg}"),
            DrError::EmptyBlock => write!(f, "零长度样本块"),
            DrError::NoMeasurableTracks => {
                write!(f, "没有任何音轨得到有效DR值，无法计算汇总统计")
            }
            DrError::ResourceError(msg) => write!(f, "资源访问错误: {msg}"),
        }
    }
}

impl std::error::Error for DrError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DrError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DrError {
    fn from(err: io::Error) -> Self {
        DrError::IoError(err)
    }
}

/// DR测量操作的标准Result类型
pub type DrResult<T> = Result<T, DrError>;

// ==================== 错误转换Helper函数 ====================
// 消除重复的 .map_err(|e| DrError::XXX(format!(...))) 模式

/// 创建格式错误的helper函数
#[inline]
pub fn format_error<E: fmt::Display>(context: &str, err: E) -> DrError {
    DrError::FormatError(format!("{context}: {err}"))
}

/// 创建解码错误的helper函数
#[inline]
pub fn decoding_error<E: fmt::Display>(context: &str, err: E) -> DrError {
    DrError::DecodeFailure(format!("{context}: {err}"))
}

// ==================== 错误分类系统 ====================
// 用于退出码映射和错误提示

/// 错误类别枚举
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ErrorCategory {
    /// 输入相关错误（空输入、参数错误）
    Input,
    /// 格式相关错误（探测失败、标签损坏等）
    Format,
    /// 解码相关错误（外部解码器失败）
    Decoding,
    /// 统计相关错误（无可测量音轨）
    Analysis,
    /// I/O相关错误（文件不存在、权限不足等）
    Io,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从DrError提取错误类别
    pub fn from_dr_error(e: &DrError) -> Self {
        match e {
            DrError::EmptyInput(_) | DrError::InvalidInput(_) => Self::Input,
            DrError::FormatError(_) => Self::Format,
            DrError::DecodeFailure(_) => Self::Decoding,
            DrError::NoMeasurableTracks | DrError::EmptyBlock => Self::Analysis,
            DrError::IoError(_) => Self::Io,
            DrError::ResourceError(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Input => "输入错误",
            Self::Format => "格式错误",
            Self::Decoding => "解码错误",
            Self::Analysis => "统计错误",
            Self::Io => "I/O错误",
            Self::Other => "其他错误",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_mapping() {
        assert_eq!(
            ErrorCategory::from_dr_error(&DrError::EmptyInput("x".into())),
            ErrorCategory::Input
        );
        assert_eq!(
            ErrorCategory::from_dr_error(&DrError::DecodeFailure("x".into())),
            ErrorCategory::Decoding
        );
        assert_eq!(
            ErrorCategory::from_dr_error(&DrError::NoMeasurableTracks),
            ErrorCategory::Analysis
        );
    }

    #[test]
    fn test_io_error_source() {
        let err: DrError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
