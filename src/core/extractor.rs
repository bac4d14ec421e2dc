use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io::BufWriter;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::core::archive;
use crate::core::sampler::FrameSampler;
use crate::decoder::{Frame, OutputGeometry, ScaleMode, VideoDecoder, VideoMeta};
use crate::error::{GrabError, Result};

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
    /// Packed lz4 frame archive (single `frames.bin`).
    Bin,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Bin => "bin",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExtractOptions {
    /// Output frame rate; 0 means the native rate of the source.
    pub frame_rate: u32,
    /// Stop after this many sampled frames.
    pub limit: Option<u64>,
    /// Output size; `None` keeps the native resolution.
    pub size: Option<(u32, u32)>,
    pub scale_mode: ScaleMode,
    pub format: OutputFormat,
    pub jpeg_quality: u8,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            frame_rate: 0,
            limit: None,
            size: None,
            scale_mode: ScaleMode::Fit,
            format: OutputFormat::Png,
            jpeg_quality: 90,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ExtractSummary {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub native_fps: f64,
    pub requested_fps: u32,
    pub frames_decoded: u64,
    pub frames_written: u64,
    pub elapsed_seconds: f64,
}

#[derive(Serialize)]
struct Manifest<'a> {
    #[serde(flatten)]
    summary: &'a ExtractSummary,
    format: OutputFormat,
    created_at: String,
}

/// Decodes `source` and returns its frames as in-memory images, sampled
/// down to `frame_rate` frames per second (0 = every decoded frame).
///
/// Frames come back at native resolution, ordered by decode position. A
/// source that yields nothing returns an empty vec; an unopenable source
/// is an error.
pub fn process_video(source: &str, frame_rate: u32) -> Result<Vec<RgbImage>> {
    let mut decoder = VideoDecoder::open(source, None)?;
    let mut sampler = FrameSampler::new(decoder.meta().fps, frame_rate);

    let mut images = Vec::new();
    while let Some(frame) = decoder.next_sampled(&mut sampler, images.len() as u64)? {
        images.push(frame.into_image()?);
    }
    Ok(images)
}

/// Opens `source` just long enough to report its stream properties.
pub fn probe(source: &str) -> Result<VideoMeta> {
    Ok(VideoDecoder::open(source, None)?.meta().clone())
}

/// Extracts sampled frames from `source` into `output_dir`.
///
/// Decode runs on a producer thread behind a bounded channel; the consumer
/// encodes in parallel batches. Flipping `stop` (the Ctrl-C flag) ends the
/// run cleanly, keeping whatever was already written.
pub fn extract_frames(
    source: &str,
    output_dir: &Path,
    opts: &ExtractOptions,
    stop: Arc<AtomicBool>,
) -> Result<ExtractSummary> {
    let geometry = opts.size.map(|(width, height)| OutputGeometry {
        width,
        height,
        mode: opts.scale_mode,
    });

    let decoder = VideoDecoder::open(source, geometry)?;
    let meta = decoder.meta().clone();
    let out_width = decoder.output_width();
    let out_height = decoder.output_height();
    let sampler = FrameSampler::new(meta.fps, opts.frame_rate);

    fs::create_dir_all(output_dir)?;

    info!(
        source,
        fps = meta.fps,
        requested = opts.frame_rate,
        "Extracting {}x{} frames to {}",
        out_width,
        out_height,
        output_dir.display()
    );

    let start = Instant::now();

    // Bounded so decode cannot run away from encoding.
    let capacity = num_cpus::get().max(1) * 8;
    let (sender, receiver) = crossbeam_channel::bounded(capacity);
    let decode_handle = decoder.spawn_decoding_thread(sender, sampler, opts.limit, stop.clone());

    let frames_written = match opts.format {
        OutputFormat::Bin => {
            // The archive body is one compressed block, so all sampled
            // frames are buffered before packing.
            let mut frames: Vec<Frame> = Vec::new();
            for frame in receiver.iter() {
                frames.push(frame);
            }
            if frames.is_empty() {
                0
            } else {
                archive::write_archive(&output_dir.join("frames.bin"), &frames)?;
                frames.len() as u64
            }
        }
        _ => {
            encode_stream(&receiver, output_dir, opts, &stop)?
        }
    };

    // Disconnect the channel first: a producer blocked on a full channel
    // only exits once its send fails.
    drop(receiver);
    let stats = decode_handle.join().unwrap_or_default();

    if frames_written == 0 {
        return Err(GrabError::NoFrames { source_path: source.to_string() });
    }

    let summary = ExtractSummary {
        source: source.to_string(),
        width: out_width,
        height: out_height,
        native_fps: meta.fps,
        requested_fps: opts.frame_rate,
        frames_decoded: stats.decoded,
        frames_written,
        elapsed_seconds: start.elapsed().as_secs_f64(),
    };

    if opts.format != OutputFormat::Bin {
        write_manifest(output_dir, &summary, opts.format)?;
    }

    info!(
        "Done: {} frames written in {:.2}s ({} decoded)",
        summary.frames_written, summary.elapsed_seconds, summary.frames_decoded
    );

    Ok(summary)
}

/// Consumer half of the pipeline: drain the channel in batches and encode
/// each batch in parallel.
fn encode_stream(
    receiver: &crossbeam_channel::Receiver<Frame>,
    output_dir: &Path,
    opts: &ExtractOptions,
    stop: &AtomicBool,
) -> Result<u64> {
    let batch_size = num_cpus::get().max(1) * 2;
    let mut batch = Vec::with_capacity(batch_size);
    let mut written: u64 = 0;

    while let Ok(frame) = receiver.recv() {
        batch.push(frame);
        while batch.len() < batch_size {
            match receiver.try_recv() {
                Ok(frame) => batch.push(frame),
                Err(_) => break,
            }
        }

        let work = std::mem::take(&mut batch);
        let count = work.len() as u64;
        work.into_par_iter()
            .try_for_each(|frame| encode_frame(frame, output_dir, opts))?;
        written += count;

        debug!(written, "Encoded batch");

        if stop.load(Ordering::SeqCst) {
            break;
        }
    }

    Ok(written)
}

fn encode_frame(frame: Frame, output_dir: &Path, opts: &ExtractOptions) -> Result<()> {
    let name = format!("frame_{:06}.{}", frame.index, opts.format.extension());
    let path = output_dir.join(name);

    match opts.format {
        OutputFormat::Png => {
            frame.into_image()?.save_with_format(&path, image::ImageFormat::Png)?;
        }
        OutputFormat::Jpeg => {
            let file = fs::File::create(&path)?;
            let mut writer = BufWriter::new(file);
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, opts.jpeg_quality);
            encoder.encode(&frame.buffer, frame.width, frame.height, image::ColorType::Rgb8)?;
        }
        OutputFormat::Bin => unreachable!("bin output is packed, not per-frame"),
    }
    Ok(())
}

fn write_manifest(output_dir: &Path, summary: &ExtractSummary, format: OutputFormat) -> Result<()> {
    let manifest = Manifest {
        summary,
        format,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(output_dir.join("manifest.json"), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = ExtractOptions::default();
        assert_eq!(opts.frame_rate, 0);
        assert_eq!(opts.format, OutputFormat::Png);
        assert_eq!(opts.jpeg_quality, 90);
        assert!(opts.size.is_none());
    }

    #[test]
    fn test_manifest_serialization() {
        let summary = ExtractSummary {
            source: "clip.mp4".to_string(),
            width: 640,
            height: 360,
            native_fps: 29.97,
            requested_fps: 10,
            frames_decoded: 300,
            frames_written: 100,
            elapsed_seconds: 1.5,
        };
        let manifest = Manifest {
            summary: &summary,
            format: OutputFormat::Png,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_string(&manifest).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["source"], "clip.mp4");
        assert_eq!(value["frames_written"], 100);
        assert_eq!(value["format"], "png");
    }

    #[test]
    fn test_frame_names_sort_with_sequence() {
        let a = format!("frame_{:06}.png", 9u64);
        let b = format!("frame_{:06}.png", 10u64);
        assert!(a < b);
    }
}
