//! Video frame extraction built on OpenCV.
//!
//! Opens a video source (a local path or a URL the backend understands),
//! samples the decoded stream down to a requested frame rate, and hands the
//! frames back as images: in memory ([`process_video`]), as encoded files
//! on disk ([`extract_frames`]), or as a packed lz4 archive.

pub mod core;
pub mod decoder;
pub mod error;
pub mod logging;
pub mod ui;

pub use crate::core::archive::{load_archive, write_archive, FrameArchive};
pub use crate::core::extractor::{
    extract_frames, probe, process_video, ExtractOptions, ExtractSummary, OutputFormat,
};
pub use crate::core::sampler::FrameSampler;
pub use crate::decoder::{Frame, OutputGeometry, ScaleMode, VideoDecoder, VideoMeta};
pub use crate::error::{GrabError, Result};
