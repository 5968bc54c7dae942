//! Album DR Meter - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成DR分析任务。

use album_dr_meter::{
    audio,
    error::{DrError, ErrorCategory},
    tools::{self, MeterOptions},
};
use std::fs::OpenOptions;
use std::io::Write;
use std::process;
use std::time::Instant;

/// 错误退出码定义
mod exit_codes {
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 输入/格式错误
    pub const FORMAT_ERROR: i32 = 2;
    /// 解码失败
    pub const DECODING_ERROR: i32 = 3;
    /// 统计错误
    pub const ANALYSIS_ERROR: i32 = 4;
    /// 资源/并发错误
    pub const RESOURCE_ERROR: i32 = 5;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &DrError) -> &'static str {
    match error {
        DrError::EmptyInput(_) => {
            "输入路径下没有支持的音频文件，检查路径和扩展名 / No supported audio files under the input path, check the path and extensions"
        }
        DrError::InvalidInput(_) => {
            "检查命令行参数是否正确，使用 --help 查看完整用法 / Check command-line arguments, use --help for full usage"
        }
        DrError::NoMeasurableTracks => {
            "所有音轨都太短，无法得到有意义的DR值 / Every track is too short to produce a meaningful DR value"
        }
        _ => match ErrorCategory::from_dr_error(error) {
            ErrorCategory::Io => {
                "检查文件路径是否正确，文件是否存在且可读 / Check if the path is correct and the file is readable"
            }
            ErrorCategory::Format => {
                "确保已安装ffprobe且输入为有效音频 / Ensure ffprobe is installed and the input is valid audio"
            }
            ErrorCategory::Decoding => {
                "文件可能损坏，或ffmpeg不支持该编码 / The file may be corrupted, or ffmpeg does not support this encoding"
            }
            _ => "请检查输入文件和参数设置 / Please check input files and parameter settings",
        },
    }
}

/// 错误处理和建议
fn handle_error(error: DrError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    let exit_code = match ErrorCategory::from_dr_error(&error) {
        ErrorCategory::Input | ErrorCategory::Format => exit_codes::FORMAT_ERROR,
        ErrorCategory::Decoding => exit_codes::DECODING_ERROR,
        ErrorCategory::Analysis => exit_codes::ANALYSIS_ERROR,
        ErrorCategory::Other => exit_codes::RESOURCE_ERROR,
        ErrorCategory::Io => exit_codes::GENERAL_ERROR,
    };

    process::exit(exit_code);
}

/// 应用程序主逻辑（便于测试和复用）
fn run() -> Result<(), DrError> {
    // 1. 解析命令行参数
    let config = tools::parse_args();
    tools::show_startup_info(&config);

    // 2. 日志目标检查先于任何分析工作（拒绝覆盖已有日志）
    let log_path = tools::get_log_path(&config.input_path);
    if config.should_write_log() && log_path.exists() {
        return Err(DrError::InvalidInput(format!(
            "日志文件已存在 / the log file already exists: {}",
            log_path.display()
        )));
    }

    // 3. 读取音轨目录
    let sources = audio::read_audio_info(&config.input_path)?;
    let track_count: usize = sources.iter().map(|s| s.tracks.len()).sum();
    println!(
        "🎵 找到 {} 个文件、{} 条音轨 / Found {} file(s), {} track(s)\n",
        sources.len(),
        track_count,
        sources.len(),
        track_count
    );

    let options = MeterOptions {
        keep_precision: config.keep_precision,
        no_resample: config.no_resample,
        verbose: config.verbose,
    };

    // 4. 分析（音轨终结后立即回显进度）
    let keep_precision = config.keep_precision;
    let track_cb = move |track: &audio::TrackInfo, dr: Option<f64>| {
        println!(
            "{:02} - {}: {}",
            track.global_index,
            track.tags.title,
            tools::format_dr_label(dr, keep_precision)
        );
    };

    let time_start = Instant::now();
    let report = tools::analyze_dr(&sources, &options, &track_cb)?;
    println!(
        "\nOfficial DR = {}, Median DR = {}",
        report.summary.mean_label(),
        report.summary.median_label()
    );
    println!(
        "⏱️  全部音轨分析完成 / Analyzed all tracks in {:.2} seconds",
        time_start.elapsed().as_secs_f64()
    );

    // 5. 日志输出：写文件，或在禁用日志时打印到标准输出。
    //    保留精度模式完全跳过日志——日志版式假定整数DR值。
    if config.should_write_log() {
        println!("📝 写入日志 / Writing log: {}", log_path.display());
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&log_path)
            .map_err(DrError::IoError)?;
        tools::write_log(&mut file, &report.groups, &report.summary)?;
        file.flush().map_err(DrError::IoError)?;
        println!("…done");
    } else if !config.keep_precision {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        tools::write_log(&mut lock, &report.groups, &report.summary)?;
    }

    // 6. 可选输出：JSON报告、DR标签
    if config.json_report {
        let json_path = tools::get_json_path(&config.input_path);
        println!("📄 写入JSON报告 / Writing JSON report: {}", json_path.display());
        tools::write_json_report(&json_path, &report.groups, &report.summary)?;
    }

    if config.write_tags {
        audio::write_dr_tags(&report.groups)?;
    }

    tools::show_completion_info(&config);
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        handle_error(error);
    }
}
