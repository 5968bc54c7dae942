//! 命令行接口模块
//!
//! 负责命令行参数解析、配置管理和程序信息展示。

use clap::{Arg, Command};
use std::path::PathBuf;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 应用程序配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 输入文件或目录路径
    pub input_path: PathBuf,

    /// 不写日志文件（默认分析后在输入旁写dr.txt）
    pub no_log: bool,

    /// 保留精度：不舍入任何值（同时禁用日志——日志格式假定整数DR）
    pub keep_precision: bool,

    /// 把计算得到的DR值写入音频文件标签
    pub write_tags: bool,

    /// 不重采样到44.1kHz（不同于"标准"meter；同时禁用日志）
    pub no_resample: bool,

    /// 额外输出机器可读的JSON报告
    pub json_report: bool,

    /// 是否显示详细信息
    pub verbose: bool,
}

impl AppConfig {
    /// 是否写日志文件
    ///
    /// keep-precision和no-resample都会使日志偏离标准格式，因此禁用。
    #[inline]
    pub fn should_write_log(&self) -> bool {
        !self.no_log && !self.keep_precision && !self.no_resample
    }
}

/// 解析命令行参数并创建配置
pub fn parse_args() -> AppConfig {
    let matches = Command::new("album-dr-meter")
        .version(VERSION)
        .about(DESCRIPTION)
        .arg(
            Arg::new("INPUT")
                .help("音频文件或目录路径 / Input file or directory")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("no-log")
                .long("no-log")
                .help("不写日志文件(dr.txt)，默认分析后写日志 / Do not write the dr.txt log")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("keep-precision")
                .long("keep-precision")
                .help("不舍入任何值，同时禁用日志 / Do not round values, also disables the log")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tag")
                .long("tag")
                .help("把计算得到的DR值写入文件标签 / Tag audio files with the computed DR value")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-resample")
                .long("no-resample")
                .help("不重采样到44.1kHz，同时禁用日志 / Do not resample to 44.1 kHz, also disables the log")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("额外输出机器可读的JSON报告(dr.json) / Also write a machine-readable dr.json report")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("显示详细处理信息 / Show verbose processing info")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    AppConfig {
        input_path: PathBuf::from(matches.get_one::<String>("INPUT").expect("required arg")),
        no_log: matches.get_flag("no-log"),
        keep_precision: matches.get_flag("keep-precision"),
        write_tags: matches.get_flag("tag"),
        no_resample: matches.get_flag("no-resample"),
        json_report: matches.get_flag("json"),
        verbose: matches.get_flag("verbose"),
    }
}

/// 显示程序启动信息
pub fn show_startup_info(config: &AppConfig) {
    println!("🎚️  Album DR Meter v{VERSION}");
    if config.verbose {
        println!("📝 {DESCRIPTION}");
        println!("📂 输入 / Input: {}", config.input_path.display());
    }
    println!();
}

/// 显示程序完成信息
pub fn show_completion_info(config: &AppConfig) {
    if config.verbose {
        println!("✅ 所有任务处理完成 / All tasks completed!");
    }
}

/// 格式化单条DR值用于显示："DR12"、"DR11.63"或"N/A"
pub fn format_dr_label(dr: Option<f64>, keep_precision: bool) -> String {
    match dr {
        Some(value) if keep_precision => format!("DR{value:.2}"),
        Some(value) => format!("DR{}", value as i64),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(no_log: bool, keep_precision: bool, no_resample: bool) -> AppConfig {
        AppConfig {
            input_path: PathBuf::from("album"),
            no_log,
            keep_precision,
            write_tags: false,
            no_resample,
            json_report: false,
            verbose: false,
        }
    }

    #[test]
    fn test_log_enabled_by_default() {
        assert!(config(false, false, false).should_write_log());
    }

    #[test]
    fn test_precision_and_resample_disable_log() {
        assert!(!config(true, false, false).should_write_log());
        assert!(!config(false, true, false).should_write_log());
        assert!(!config(false, false, true).should_write_log());
    }

    #[test]
    fn test_format_dr_label() {
        assert_eq!(format_dr_label(Some(12.0), false), "DR12");
        assert_eq!(format_dr_label(Some(11.63), true), "DR11.63");
        assert_eq!(format_dr_label(None, false), "N/A");
    }
}
