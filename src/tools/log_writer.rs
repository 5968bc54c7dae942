//! 日志文件输出
//!
//! 按官方DR日志的固定纯文本版式写出分组结果（dr.txt）。
//! 该版式假定整数DR值——保留精度模式下日志被整体跳过。

use crate::core::aggregate::{LogGroup, Summary};
use crate::tools::utils::get_parent_dir;
use chrono::Local;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 日志文件名
const LOG_FILE_NAME: &str = "dr.txt";

/// 计算日志文件路径：目录输入放在目录内，文件输入放在其父目录
pub fn get_log_path(input_path: &Path) -> PathBuf {
    if input_path.is_dir() {
        input_path.join(LOG_FILE_NAME)
    } else {
        get_parent_dir(input_path).join(LOG_FILE_NAME)
    }
}

/// 秒数格式化为 `h:mm:ss` 或 `m:ss`
pub fn format_time(total_seconds: u64) -> String {
    let (minutes, seconds) = (total_seconds / 60, total_seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// 写出完整日志
pub fn write_log(
    out: &mut dyn Write,
    groups: &[LogGroup],
    summary: &Summary,
) -> io::Result<()> {
    let rule = "-".repeat(80);
    let heavy_rule = "=".repeat(80);

    write!(
        out,
        "generated by album-dr-meter v{VERSION}\nlog date: {}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;

    for group in groups {
        write!(
            out,
            "{rule}\nAnalyzed: {}\n{rule}\n\nDR         Peak         RMS     Duration Track\n{rule}\n",
            group.title()
        )?;

        for track in &group.tracks {
            let dr_column = match track.dr {
                Some(dr) => format!("DR{:<4}", dr.round() as i64),
                None => "N/A   ".to_string(),
            };
            write!(
                out,
                "{dr_column}{:9.2} dB{:9.2} dB{:>10} {}\n",
                track.peak_db,
                track.rms_db,
                format_time(track.duration_secs),
                track.name
            )?;
        }

        write!(
            out,
            "{rule}\n\nNumber of tracks:  {}\nOfficial DR value: DR{}\n\n\
             Samplerate:        {} Hz\nChannels:          {}\n{heavy_rule}\n\n",
            group.tracks.len(),
            summary.mean_label(),
            group.sample_rate,
            group.channels
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::TrackEntry;
    use std::collections::BTreeSet;

    fn sample_group() -> LogGroup {
        LogGroup {
            performers: BTreeSet::from(["Artist".to_string()]),
            albums: BTreeSet::from(["Album".to_string()]),
            channels: 2,
            sample_rate: 44_100,
            tracks: vec![
                TrackEntry {
                    dr: Some(12.0),
                    peak_db: -0.5,
                    rms_db: -13.25,
                    duration_secs: 185,
                    name: "01-Intro".to_string(),
                    file_path: PathBuf::from("01-Intro.flac"),
                },
                TrackEntry {
                    dr: None,
                    peak_db: -200.0,
                    rms_db: -200.0,
                    duration_secs: 1,
                    name: "02-Blip".to_string(),
                    file_path: PathBuf::from("02-Blip.flac"),
                },
            ],
        }
    }

    fn render(groups: &[LogGroup], summary: &Summary) -> String {
        let mut buffer = Vec::new();
        write_log(&mut buffer, groups, summary).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(59), "0:59");
        assert_eq!(format_time(185), "3:05");
        assert_eq!(format_time(3_725), "1:02:05");
    }

    #[test]
    fn test_get_log_path_for_file_input() {
        assert_eq!(
            get_log_path(Path::new("/music/album/01.flac")),
            PathBuf::from("/music/album/dr.txt")
        );
    }

    #[test]
    fn test_log_layout() {
        let summary = Summary {
            mean_dr: 12.0,
            median_dr: 12.0,
            rounded: true,
        };
        let text = render(&[sample_group()], &summary);

        assert!(text.starts_with("generated by album-dr-meter v"));
        assert!(text.contains("log date: "));
        assert!(text.contains("Analyzed: Artist — Album"));
        assert!(text.contains("DR         Peak         RMS     Duration Track"));
        // DR列固定6字符宽，dB列9.2格式
        assert!(text.contains("DR12      -0.50 dB   -13.25 dB      3:05 01-Intro"));
        assert!(text.contains("N/A   "));
        assert!(text.contains("Number of tracks:  2"));
        assert!(text.contains("Official DR value: DR12"));
        assert!(text.contains("Samplerate:        44100 Hz"));
        assert!(text.contains("Channels:          2"));
        assert!(text.contains(&"=".repeat(80)));
    }
}
