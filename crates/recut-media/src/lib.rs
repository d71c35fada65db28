//! FFmpeg CLI wrapper for the recut editing service.
//!
//! This crate owns everything that touches media bytes:
//! - probing technical facts (`probe`)
//! - fetching sources by URL with a per-media cache, plus chunked
//!   upload assembly (`fetch`)
//! - sampling frames for captioning (`frames`)
//! - extracting audio for transcription (`audio`)
//! - rendering a validated EDL into per-aspect-ratio MP4s (`render`)

pub mod audio;
pub mod captions;
pub mod command;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod frames;
pub mod fs_utils;
pub mod probe;
pub mod render;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fetch::BlobFetcher;
pub use probe::{probe_media, MediaInfo};
pub use render::{RenderOptions, Renderer};
