//! JSON报告输出
//!
//! 机器可读的分组+汇总报告（dr.json），与日志文件并列生成。

use crate::core::aggregate::{LogGroup, Summary};
use crate::error::{DrError, DrResult};
use crate::tools::utils::get_parent_dir;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// JSON报告文件名
const JSON_FILE_NAME: &str = "dr.json";

/// 完整JSON报告结构
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generator: String,
    groups: &'a [LogGroup],
    summary: &'a Summary,
}

/// 计算JSON报告路径：目录输入放在目录内，文件输入放在其父目录
pub fn get_json_path(input_path: &Path) -> PathBuf {
    if input_path.is_dir() {
        input_path.join(JSON_FILE_NAME)
    } else {
        get_parent_dir(input_path).join(JSON_FILE_NAME)
    }
}

/// 写出JSON报告文件
pub fn write_json_report(
    path: &Path,
    groups: &[LogGroup],
    summary: &Summary,
) -> DrResult<()> {
    let report = JsonReport {
        generator: format!("album-dr-meter v{}", env!("CARGO_PKG_VERSION")),
        groups,
        summary,
    };

    let text = serde_json::to_string_pretty(&report)
        .map_err(|e| DrError::FormatError(format!("JSON序列化失败: {e}")))?;
    std::fs::write(path, text).map_err(DrError::IoError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_report_serializes() {
        let groups = vec![LogGroup {
            performers: BTreeSet::from(["Artist".to_string()]),
            albums: BTreeSet::from(["Album".to_string()]),
            channels: 2,
            sample_rate: 44_100,
            tracks: Vec::new(),
        }];
        let summary = Summary {
            mean_dr: 11.0,
            median_dr: 11.0,
            rounded: true,
        };

        let report = JsonReport {
            generator: "album-dr-meter test".to_string(),
            groups: &groups,
            summary: &summary,
        };
        let text = serde_json::to_string(&report).unwrap();

        assert!(text.contains("\"sample_rate\":44100"));
        assert!(text.contains("\"mean_dr\":11.0"));
    }
}
