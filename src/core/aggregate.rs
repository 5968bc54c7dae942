//! 结果汇总
//!
//! 收集按提交顺序排好的逐文件结果，把相邻且(声道数, 采样率)相同的
//! 文件合并为日志分组，并计算全集的平均DR/中位DR。
//!
//! 外层池允许乱序完成，因此汇总前必须先按提交序号排序——
//! 相邻合并只有在同键文件连续出现时才正确。

use crate::error::{DrError, DrResult};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// 日志中的单条音轨记录
#[derive(Debug, Clone, Serialize)]
pub struct TrackEntry {
    /// DR值；None上报为"N/A"
    pub dr: Option<f64>,

    /// 上报Peak（dB）
    pub peak_db: f64,

    /// 上报RMS（dB）
    pub rms_db: f64,

    /// 音轨时长（秒，按实际测量采样率换算）
    pub duration_secs: u64,

    /// 显示名："{全局序号:02}-{标题}"
    pub name: String,

    /// 源文件路径
    pub file_path: PathBuf,
}

/// 单个文件的完整测量结果
///
/// `submission_index` 记录文件在输入目录中的提交顺序，
/// 汇总前据此排序以恢复确定性的交付顺序。
#[derive(Debug, Clone)]
pub struct FileResult {
    /// 提交序号（扫描顺序）
    pub submission_index: usize,

    /// 声道数
    pub channels: u16,

    /// 源采样率（Hz）
    pub sample_rate: u32,

    /// 该文件观察到的表演者集合
    pub performers: BTreeSet<String>,

    /// 该文件观察到的专辑集合
    pub albums: BTreeSet<String>,

    /// 文件内各音轨的测量记录
    pub tracks: Vec<TrackEntry>,
}

/// 日志分组：相邻且(声道数, 采样率)相同的文件集合
///
/// 不变量：组内所有音轨的声道数和采样率一致；
/// 组成员关系只由这对键决定，与任何标签无关。
#[derive(Debug, Clone, Serialize)]
pub struct LogGroup {
    /// 组内观察到的表演者并集
    pub performers: BTreeSet<String>,

    /// 组内观察到的专辑并集
    pub albums: BTreeSet<String>,

    /// 声道数
    pub channels: u16,

    /// 采样率（Hz）
    pub sample_rate: u32,

    /// 组内音轨记录（保持提交顺序）
    pub tracks: Vec<TrackEntry>,
}

impl LogGroup {
    /// 组标题："表演者, … — 专辑, …"
    pub fn title(&self) -> String {
        let performers: Vec<&str> = self.performers.iter().map(String::as_str).collect();
        let albums: Vec<&str> = self.albums.iter().map(String::as_str).collect();
        format!("{} — {}", performers.join(", "), albums.join(", "))
    }
}

/// 全集汇总统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// 平均DR（除非保留精度模式，否则已四舍五入到整数）
    pub mean_dr: f64,

    /// 中位DR（从不舍入）
    pub median_dr: f64,

    /// mean_dr是否为舍入后的整数值
    pub rounded: bool,
}

impl Summary {
    /// 平均DR的显示形式（舍入模式下为整数文本）
    pub fn mean_label(&self) -> String {
        if self.rounded {
            format!("{}", self.mean_dr as i64)
        } else {
            format!("{:.2}", self.mean_dr)
        }
    }

    /// 中位DR的显示形式
    pub fn median_label(&self) -> String {
        if self.median_dr.fract() == 0.0 {
            format!("{}", self.median_dr as i64)
        } else {
            format!("{:.1}", self.median_dr)
        }
    }
}

/// 把逐文件结果合并为日志分组
///
/// 先按提交序号排序（外层池可能乱序交付），再做相邻合并。
pub fn make_log_groups(mut results: Vec<FileResult>) -> Vec<LogGroup> {
    results.sort_by_key(|r| r.submission_index);

    let mut groups: Vec<LogGroup> = Vec::new();
    for file in results {
        match groups.last_mut() {
            Some(group)
                if group.channels == file.channels && group.sample_rate == file.sample_rate =>
            {
                group.performers.extend(file.performers);
                group.albums.extend(file.albums);
                group.tracks.extend(file.tracks);
            }
            _ => groups.push(LogGroup {
                performers: file.performers,
                albums: file.albums,
                channels: file.channels,
                sample_rate: file.sample_rate,
                tracks: file.tracks,
            }),
        }
    }
    groups
}

/// 计算全集的平均DR和中位DR
///
/// 只统计得到有效DR的音轨；全部无效时返回 `NoMeasurableTracks`
/// （致命），而不是产出误导性的数字占位。
pub fn summarize(groups: &[LogGroup], keep_precision: bool) -> DrResult<Summary> {
    let mut values: Vec<f64> = groups
        .iter()
        .flat_map(|g| g.tracks.iter().filter_map(|t| t.dr))
        .collect();

    if values.is_empty() {
        return Err(DrError::NoMeasurableTracks);
    }

    let mut mean = values.iter().sum::<f64>() / values.len() as f64;
    if !keep_precision {
        mean = mean.round();
    }

    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };

    Ok(Summary {
        mean_dr: mean,
        median_dr: median,
        rounded: !keep_precision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dr: Option<f64>, name: &str) -> TrackEntry {
        TrackEntry {
            dr,
            peak_db: -0.5,
            rms_db: -12.5,
            duration_secs: 185,
            name: name.to_string(),
            file_path: PathBuf::from(format!("{name}.flac")),
        }
    }

    fn file(
        index: usize,
        channels: u16,
        sample_rate: u32,
        performer: &str,
        album: &str,
        dr: f64,
    ) -> FileResult {
        FileResult {
            submission_index: index,
            channels,
            sample_rate,
            performers: BTreeSet::from([performer.to_string()]),
            albums: BTreeSet::from([album.to_string()]),
            tracks: vec![entry(Some(dr), &format!("{index:02}-track"))],
        }
    }

    #[test]
    fn test_adjacent_same_key_files_merge() {
        let groups = make_log_groups(vec![
            file(1, 2, 44_100, "Artist A", "Album X", 10.0),
            file(2, 2, 44_100, "Artist B", "Album X", 12.0),
        ]);

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.tracks.len(), 2);
        // 表演者/专辑为两者的并集
        assert!(group.performers.contains("Artist A"));
        assert!(group.performers.contains("Artist B"));
        assert_eq!(group.albums.len(), 1);
    }

    #[test]
    fn test_differing_sample_rate_never_merges() {
        let groups = make_log_groups(vec![
            file(1, 2, 44_100, "Artist", "Album", 10.0),
            file(2, 2, 96_000, "Artist", "Album", 12.0),
        ]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_out_of_order_delivery_is_reordered() {
        // 乱序交付的同键文件仍必须落入同一组
        let groups = make_log_groups(vec![
            file(3, 2, 44_100, "Artist", "Album", 9.0),
            file(1, 2, 44_100, "Artist", "Album", 10.0),
            file(2, 2, 44_100, "Artist", "Album", 11.0),
        ]);

        assert_eq!(groups.len(), 1);
        let names: Vec<&str> = groups[0].tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["01-track", "02-track", "03-track"]);
    }

    #[test]
    fn test_mean_median_even_count() {
        // [8, 10, 12, 14] => 平均 11，中位 11
        let groups = make_log_groups(
            [8.0, 10.0, 12.0, 14.0]
                .iter()
                .enumerate()
                .map(|(i, &dr)| file(i + 1, 2, 44_100, "A", "X", dr))
                .collect(),
        );
        let summary = summarize(&groups, false).unwrap();

        assert_eq!(summary.mean_dr, 11.0);
        assert_eq!(summary.median_dr, 11.0);
        assert_eq!(summary.mean_label(), "11");
    }

    #[test]
    fn test_mean_median_odd_count() {
        // [8, 10, 12] => 平均 10，中位 10
        let groups = make_log_groups(
            [8.0, 10.0, 12.0]
                .iter()
                .enumerate()
                .map(|(i, &dr)| file(i + 1, 2, 44_100, "A", "X", dr))
                .collect(),
        );
        let summary = summarize(&groups, false).unwrap();

        assert_eq!(summary.mean_dr, 10.0);
        assert_eq!(summary.median_dr, 10.0);
    }

    #[test]
    fn test_absent_dr_excluded_from_summary() {
        let mut f = file(1, 2, 44_100, "A", "X", 10.0);
        f.tracks.push(entry(None, "02-too-short"));
        let groups = make_log_groups(vec![f, file(2, 2, 44_100, "A", "X", 12.0)]);
        let summary = summarize(&groups, false).unwrap();

        assert_eq!(summary.mean_dr, 11.0);
    }

    #[test]
    fn test_no_measurable_tracks_is_fatal() {
        let mut f = file(1, 2, 44_100, "A", "X", 10.0);
        f.tracks[0].dr = None;
        let groups = make_log_groups(vec![f]);

        assert!(matches!(
            summarize(&groups, false),
            Err(DrError::NoMeasurableTracks)
        ));
    }

    #[test]
    fn test_group_title() {
        let groups = make_log_groups(vec![
            file(1, 2, 44_100, "Artist A", "Album X", 10.0),
            file(2, 2, 44_100, "Artist B", "Album Y", 12.0),
        ]);
        assert_eq!(groups[0].title(), "Artist A, Artist B — Album X, Album Y");
    }
}
