//! External media tool adapters.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - FFprobe duration probing
//! - yt-dlp acquisition of video plus captions
//! - Sub-range clip extraction

pub mod clip;
pub mod command;
pub mod download;
pub mod error;
pub mod probe;
pub mod progress;

pub use clip::extract_clip;
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use download::{download_with_captions, DownloadOptions, DownloadedSource};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
