//! PCM块源
//!
//! 通过ffmpeg子进程把一条音轨解码为f32le PCM，切成固定3秒的样本块，
//! 经有界通道惰性交付给归约端。序列有限、不可重启；
//! 解码失败与流结束是两个明确区分的条件。

use crate::core::block_metrics::SampleBlock;
use crate::error::{DrError, DrResult, decoding_error};
use crate::tools::constants::measurement::BLOCK_DURATION_SECONDS;
use crate::tools::constants::parallel_limits::BLOCK_CHANNEL_CAPACITY;
use crossbeam_channel::{Receiver, bounded};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;

/// FFmpeg安装指南（跨平台）
const FFMPEG_INSTALL_GUIDE: &str = r#"
FFmpeg is required for decoding / 解码需要安装FFmpeg

Installation / 安装方法:
  macOS:   brew install ffmpeg
  Windows: winget install Gyan.FFmpeg
  Linux:   sudo apt install ffmpeg (Ubuntu/Debian)
           sudo dnf install ffmpeg (Fedora/RHEL)

Official site / 官方网站: https://ffmpeg.org/download.html
"#;

/// 一条音轨的惰性块流
///
/// 专用读取线程从ffmpeg管道取数据并切块，经容量受限的通道交付；
/// 通道满时读取线程阻塞（背压），无论音轨多长内存都保持有界。
pub struct PcmBlockSource {
    receiver: Receiver<DrResult<SampleBlock>>,
}

impl PcmBlockSource {
    /// 打开一条音轨的PCM块流
    ///
    /// * `channels` - 探测到的声道数（ffmpeg输出不改变声道布局）
    /// * `measure_rate` - 测量采样率；决定块大小
    /// * `resample` - 是否让ffmpeg重采样到 `measure_rate`
    pub fn open(
        path: &Path,
        channels: u16,
        measure_rate: u32,
        resample: bool,
    ) -> DrResult<Self> {
        // 构建ffmpeg命令参数（官方meter在测量前重采样到44.1kHz）
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            path.display().to_string(),
            "-map".to_string(),
            "0:a:0".to_string(),
            "-c:a".to_string(),
            "pcm_f32le".to_string(),
        ];

        if resample {
            args.extend(["-ar".to_string(), measure_rate.to_string()]);
        }

        args.extend(["-f".to_string(), "f32le".to_string(), "-".to_string()]);

        let ffmpeg = if cfg!(target_os = "windows") {
            "ffmpeg.exe"
        } else {
            "ffmpeg"
        };

        let child = Command::new(ffmpeg)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| {
                DrError::DecodeFailure(format!(
                    "无法启动ffmpeg / Failed to spawn ffmpeg: {e}\n{FFMPEG_INSTALL_GUIDE}"
                ))
            })?;

        let frames_per_block = (BLOCK_DURATION_SECONDS * measure_rate as f64) as usize;
        let (sender, receiver) = bounded(BLOCK_CHANNEL_CAPACITY);
        let path_label = path.display().to_string();

        thread::spawn(move || {
            stream_blocks(child, channels as usize, frames_per_block, path_label, sender)
        });

        Ok(Self { receiver })
    }

    /// 取出块迭代器（消费源；序列不可重启）
    pub fn blocks(self) -> impl Iterator<Item = DrResult<SampleBlock>> + Send {
        self.receiver.into_iter()
    }
}

/// 读取线程主体：管道 → 3秒块 → 有界通道
fn stream_blocks(
    mut child: Child,
    channels: usize,
    frames_per_block: usize,
    path_label: String,
    sender: crossbeam_channel::Sender<DrResult<SampleBlock>>,
) {
    let bytes_per_block = frames_per_block * channels * 4;
    let mut stdout = match child.stdout.take() {
        Some(out) => out,
        None => {
            let _ = sender.send(Err(DrError::DecodeFailure(format!(
                "ffmpeg标准输出不可用 / ffmpeg stdout unavailable: {path_label}"
            ))));
            return;
        }
    };

    let mut buffer = vec![0u8; bytes_per_block];
    loop {
        // 尽量填满一个块；EOF时允许尾部不足3秒
        let mut filled = 0usize;
        let eof = loop {
            match stdout.read(&mut buffer[filled..]) {
                Ok(0) => break true,
                Ok(n) => {
                    filled += n;
                    if filled == bytes_per_block {
                        break false;
                    }
                }
                Err(e) => {
                    let _ = sender.send(Err(decoding_error(
                        &format!("ffmpeg读取失败 / Failed to read from ffmpeg ({path_label})"),
                        e,
                    )));
                    let _ = child.kill();
                    let _ = child.wait();
                    return;
                }
            }
        };

        if filled > 0 {
            let samples = convert_f32le(&buffer[..filled]);
            let block = SampleBlock::new(samples, channels);
            if sender.send(Ok(block)).is_err() {
                // 消费端已放弃（致命错误中止运行）：终止子进程
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
        }

        if eof {
            break;
        }
    }

    // EOF后检查退出状态：非零退出是解码失败，不是正常流结束
    finish_child(child, &path_label, &sender);
}

/// 等待子进程退出并把失败状态转成解码错误
fn finish_child(
    mut child: Child,
    path_label: &str,
    sender: &crossbeam_channel::Sender<DrResult<SampleBlock>>,
) {
    let mut stderr_text = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut stderr_text);
    }

    match child.wait() {
        Ok(status) if status.success() => {}
        Ok(status) => {
            let _ = sender.send(Err(DrError::DecodeFailure(format!(
                "ffmpeg异常退出 / ffmpeg exited abnormally ({path_label}, {status}): {}",
                stderr_text.trim()
            ))));
        }
        Err(e) => {
            let _ = sender.send(Err(DrError::DecodeFailure(format!(
                "等待ffmpeg退出失败 / Failed to wait for ffmpeg ({path_label}): {e}"
            ))));
        }
    }
}

/// f32le字节转f32样本（小端序）
fn convert_f32le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
