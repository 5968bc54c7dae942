//! DR标签写入
//!
//! 把测得的整数DR值写入各音轨的"DR"元数据项。
//! 只处理得到有效DR的音轨；N/A音轨跳过。

use crate::core::aggregate::LogGroup;
use crate::error::{DrResult, format_error};
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::tag::{ItemKey, ItemValue, Tag, TagItem};

/// 为所有分组内的音轨写入DR标签
pub fn write_dr_tags(groups: &[LogGroup]) -> DrResult<()> {
    for group in groups {
        println!("🏷️  写入标签 / Writing tags: {}", group.title());
        for track in &group.tracks {
            let Some(dr) = track.dr else {
                continue;
            };
            write_track_tag(&track.file_path, dr)?;
        }
    }
    println!("✅ DR标签写入完成 / DR tags written!");
    Ok(())
}

/// 写入单个文件的DR标签项
fn write_track_tag(path: &std::path::Path, dr: f64) -> DrResult<()> {
    let tagged_file = lofty::read_from_path(path)
        .map_err(|e| format_error("标签读取失败 / Failed to read tags", e))?;

    let mut tag = tagged_file
        .primary_tag()
        .cloned()
        .unwrap_or_else(|| Tag::new(tagged_file.primary_tag_type()));

    let dr_text = format!("{}", dr.round() as i64);
    tag.insert(TagItem::new(
        ItemKey::Unknown("DR".to_string()),
        ItemValue::Text(dr_text),
    ));

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| format_error("标签写入失败 / Failed to write tags", e))
}
