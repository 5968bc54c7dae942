//! 工具模块集合
//!
//! CLI、常量、流程编排、日志/JSON输出等，支持main.rs的流程控制。

pub mod cli;
pub mod constants;
pub mod json_writer;
pub mod log_writer;
pub mod processor;
pub mod utils;

// 重新导出主要的公共接口
pub use cli::{AppConfig, format_dr_label, parse_args, show_completion_info, show_startup_info};
pub use json_writer::{get_json_path, write_json_report};
pub use log_writer::{format_time, get_log_path, write_log};
pub use processor::{AnalysisReport, MeterOptions, analyze_dr};
