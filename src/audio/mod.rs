//! 外部协作者边界
//!
//! 音轨目录（ffprobe + lofty）、PCM块源（ffmpeg子进程）、DR标签写入。
//! 这些是薄I/O包装，算法内容都在core模块。

pub mod catalog;
pub mod pcm_source;
pub mod tag_writer;

pub use catalog::{AudioSource, TagSet, TrackInfo, read_audio_info};
pub use pcm_source::PcmBlockSource;
pub use tag_writer::write_dr_tags;
