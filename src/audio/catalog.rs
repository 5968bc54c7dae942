//! 音轨目录
//!
//! 给定输入路径（文件或目录），产出有序的音轨描述序列：
//! 全局序号、声道数、采样率、标签集、源文件路径。
//! 流信息通过ffprobe探测，标签通过lofty读取（带备选回退）。

use crate::error::{DrError, DrResult, format_error};
use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::tag::ItemKey;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

/// 支持的音频格式扩展名
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "wav", "flac", "mp3", "m4a", "aac", "ogg", "opus", "aiff", "wv", "ape",
];

/// 音轨标签集
///
/// 读取时已做备选回退（表演者：artist → albumartist → composer；
/// 标题：title → 文件名），之后不可变。
#[derive(Debug, Clone)]
pub struct TagSet {
    /// 表演者
    pub performer: String,

    /// 专辑
    pub album: String,

    /// 标题
    pub title: String,
}

/// 一条可解码的音轨
///
/// 目录读取时创建一次，此后不可变。
#[derive(Debug, Clone)]
pub struct TrackInfo {
    /// 全局序号（跨整个输入集，1起，用于显示顺序）
    pub global_index: usize,

    /// 声道数
    pub channels: u16,

    /// 源采样率（Hz）
    pub sample_rate: u32,

    /// 标签集
    pub tags: TagSet,

    /// 源文件路径
    pub file_path: PathBuf,
}

/// 一个输入文件及其音轨
///
/// 本目录实现每文件产出一条音轨；结构上保留"文件内多音轨"的形状，
/// 以便调度器按文件分配外层工作单元。
#[derive(Debug, Clone)]
pub struct AudioSource {
    /// 文件路径
    pub file_path: PathBuf,

    /// 声道数
    pub channels: u16,

    /// 源采样率（Hz）
    pub sample_rate: u32,

    /// 文件内的音轨（有序）
    pub tracks: Vec<TrackInfo>,
}

/// 读取输入路径下的全部音轨信息
///
/// 目录按文件名排序后不递归深度优先扫描；单文件输入直接探测。
///
/// # 错误
///
/// 输入中没有任何可分析的音轨时返回 `DrError::EmptyInput`。
pub fn read_audio_info(input_path: &Path) -> DrResult<Vec<AudioSource>> {
    let files = collect_audio_files(input_path)?;
    if files.is_empty() {
        return Err(DrError::EmptyInput(input_path.display().to_string()));
    }

    let mut sources = Vec::with_capacity(files.len());
    let mut global_index = 0usize;

    for file_path in files {
        let (sample_rate, channels) = probe_stream_info(&file_path)?;
        global_index += 1;

        let track = TrackInfo {
            global_index,
            channels,
            sample_rate,
            tags: read_tags(&file_path),
            file_path: file_path.clone(),
        };

        sources.push(AudioSource {
            file_path,
            channels,
            sample_rate,
            tracks: vec![track],
        });
    }

    Ok(sources)
}

/// 收集输入路径下的音频文件（目录按文件名排序）
fn collect_audio_files(input_path: &Path) -> DrResult<Vec<PathBuf>> {
    if !input_path.exists() {
        return Err(DrError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("路径不存在: {}", input_path.display()),
        )));
    }

    if input_path.is_file() {
        return Ok(vec![input_path.to_path_buf()]);
    }

    let mut audio_files = Vec::new();
    for entry in WalkDir::new(input_path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if entry.file_type().is_file() && is_supported_extension(path) {
            audio_files.push(path.to_path_buf());
        }
    }

    Ok(audio_files)
}

/// 检查扩展名是否为支持的音频格式
fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// 使用ffprobe探测第一条音频流的采样率和声道数
fn probe_stream_info(path: &Path) -> DrResult<(u32, u16)> {
    let ffprobe = if cfg!(target_os = "windows") {
        "ffprobe.exe"
    } else {
        "ffprobe"
    };

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=sample_rate,channels",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .map_err(|e| format_error("无法运行ffprobe / Failed to run ffprobe", e))?;

    if !output.status.success() {
        return Err(DrError::FormatError(format!(
            "ffprobe失败 / ffprobe failed ({}): {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();

    // ffprobe按流属性顺序输出：sample_rate, channels
    let sample_rate = lines
        .next()
        .and_then(|l| l.trim().parse::<u32>().ok())
        .ok_or_else(|| {
            DrError::FormatError(format!("无效的采样率 / Invalid sample rate: {}", path.display()))
        })?;

    let channels = lines
        .next()
        .and_then(|l| l.trim().parse::<u16>().ok())
        .ok_or_else(|| {
            DrError::FormatError(format!("无效的声道数 / Invalid channel count: {}", path.display()))
        })?;

    if sample_rate == 0 || channels == 0 {
        return Err(DrError::FormatError(format!(
            "流参数为零 / Zero stream parameters: {}",
            path.display()
        )));
    }

    Ok((sample_rate, channels))
}

/// 读取音轨标签（带备选回退；读取失败时回退到文件名）
fn read_tags(path: &Path) -> TagSet {
    let fallback_title = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("audio")
        .to_string();

    let tagged_file = match lofty::read_from_path(path) {
        Ok(f) => f,
        Err(_) => {
            return TagSet {
                performer: "Unknown".to_string(),
                album: "Unknown".to_string(),
                title: fallback_title,
            };
        }
    };

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    match tag {
        Some(tag) => {
            // 表演者备选链：artist → albumartist → composer
            let performer = tag
                .artist()
                .map(|s| s.to_string())
                .or_else(|| tag.get_string(&ItemKey::AlbumArtist).map(str::to_string))
                .or_else(|| tag.get_string(&ItemKey::Composer).map(str::to_string))
                .unwrap_or_else(|| "Unknown".to_string());

            let album = tag
                .album()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "Unknown".to_string());

            let title = tag
                .title()
                .map(|s| s.to_string())
                .unwrap_or(fallback_title);

            TagSet {
                performer,
                album,
                title,
            }
        }
        None => TagSet {
            performer: "Unknown".to_string(),
            album: "Unknown".to_string(),
            title: fallback_title,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_extension(Path::new("album/01 - intro.flac")));
        assert!(is_supported_extension(Path::new("X.FLAC")));
        assert!(is_supported_extension(Path::new("song.Mp3")));
        assert!(!is_supported_extension(Path::new("cover.jpg")));
        assert!(!is_supported_extension(Path::new("no_extension")));
    }

    #[test]
    fn test_missing_path_is_io_error() {
        let result = collect_audio_files(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(DrError::IoError(_))));
    }
}
