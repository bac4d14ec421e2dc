use crossbeam_channel::Sender;
use opencv::{core, imgproc, prelude::*, videoio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

use super::frame::{Frame, VideoMeta};
use super::geometry::{scaled_size, OutputGeometry, ScaleMode};
use crate::core::sampler::FrameSampler;
use crate::error::{GrabError, Result};

/// Reported when the backend cannot tell us the stream rate.
pub const DEFAULT_FPS: f64 = 30.0;

/// What a finished decode thread has to say for itself.
#[derive(Copy, Clone, Debug, Default)]
pub struct DecodeStats {
    /// Frames pulled from the backend, kept or not.
    pub decoded: u64,
    /// Sampled frames handed to the consumer.
    pub sent: u64,
}

pub struct VideoDecoder {
    capture: videoio::VideoCapture,
    meta: VideoMeta,
    geometry: Option<OutputGeometry>,
    decoded: u64,
}

impl VideoDecoder {
    /// Opens a video source (local path or URL) and probes its properties.
    ///
    /// CAP_ANY lets OpenCV choose the backend: AVFoundation on macOS,
    /// Media Foundation on Windows, V4L2/GStreamer/FFmpeg on Linux.
    pub fn open(source: &str, geometry: Option<OutputGeometry>) -> Result<Self> {
        let mut capture = videoio::VideoCapture::from_file(source, videoio::CAP_ANY)?;

        // Hardware acceleration hint; not every backend honors it.
        let _ = capture.set(
            videoio::CAP_PROP_HW_ACCELERATION,
            videoio::VIDEO_ACCELERATION_ANY as f64,
        );

        if !capture.is_opened()? {
            return Err(GrabError::Open { source_path: source.to_string() });
        }

        let reported_fps = capture.get(videoio::CAP_PROP_FPS)?;
        let fps = if reported_fps.is_finite() && reported_fps > 0.0 {
            reported_fps
        } else {
            warn!(source, reported_fps, "Backend reported no usable FPS, assuming {}", DEFAULT_FPS);
            DEFAULT_FPS
        };

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        // Negative or zero for live streams and some containers.
        let frame_count = capture.get(videoio::CAP_PROP_FRAME_COUNT)?.max(0.0) as u64;
        let duration_seconds = if frame_count > 0 { frame_count as f64 / fps } else { 0.0 };

        let meta = VideoMeta {
            source: source.to_string(),
            width,
            height,
            fps,
            frame_count,
            duration_seconds,
        };

        debug!(source, width, height, fps, frame_count, "Opened video source");

        Ok(Self { capture, meta, geometry, decoded: 0 })
    }

    pub fn meta(&self) -> &VideoMeta {
        &self.meta
    }

    /// Width of frames this decoder emits (after any resize).
    pub fn output_width(&self) -> u32 {
        self.geometry.map_or(self.meta.width, |g| g.width)
    }

    /// Height of frames this decoder emits (after any resize).
    pub fn output_height(&self) -> u32 {
        self.geometry.map_or(self.meta.height, |g| g.height)
    }

    /// Decodes the next frame into `buffer` as RGB24.
    ///
    /// Returns `Ok(None)` at end of stream, otherwise the presentation
    /// timestamp of the decoded frame.
    fn read_frame_into(&mut self, buffer: &mut Vec<u8>) -> Result<Option<f64>> {
        let start_total = std::time::Instant::now();
        let mut frame = Mat::default();

        if !self.capture.read(&mut frame)? {
            return Ok(None); // EOF
        }
        if frame.empty() {
            return Ok(None);
        }
        let timestamp_ms = self.capture.get(videoio::CAP_PROP_POS_MSEC)?;

        // Resize + letterbox/crop onto a fixed-size canvas when an output
        // geometry was requested; otherwise the frame passes through at
        // native resolution.
        let sized = match self.geometry {
            Some(geom) => self.apply_geometry(&frame, geom)?,
            None => frame,
        };

        // BGR (OpenCV native) -> RGB on the final canvas
        let mut rgb = Mat::default();
        imgproc::cvt_color(
            &sized,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
        )?;

        if !rgb.is_continuous() {
            return Err(GrabError::NonContiguousFrame);
        }

        let data = rgb.data_bytes()?;
        buffer.clear();
        buffer.extend_from_slice(data);

        let total = start_total.elapsed();
        if total.as_millis() > 10 {
            debug!(
                frame = self.decoded,
                micros = total.as_micros() as u64,
                "Slow frame decode"
            );
        }

        self.decoded += 1;
        Ok(Some(timestamp_ms))
    }

    fn apply_geometry(&self, frame: &Mat, geom: OutputGeometry) -> Result<Mat> {
        let orig = (frame.cols() as u32, frame.rows() as u32);
        let (new_w, new_h) = scaled_size(orig, (geom.width, geom.height), geom.mode);

        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            core::Size::new(new_w as i32, new_h as i32),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        if geom.mode == ScaleMode::Stretch {
            return Ok(resized);
        }

        let target_w = geom.width as i32;
        let target_h = geom.height as i32;
        let mut canvas = Mat::zeros(target_h, target_w, frame.typ())?.to_mat()?;

        if resized.cols() > target_w || resized.rows() > target_h {
            // Fill: crop the center of the resized frame to the canvas
            let crop_x = ((resized.cols() - target_w) / 2).max(0);
            let crop_y = ((resized.rows() - target_h) / 2).max(0);
            let crop_rect = core::Rect::new(crop_x, crop_y, target_w, target_h);
            let cropped = Mat::roi(&resized, crop_rect)?;
            cropped.copy_to(&mut canvas)?;
        } else {
            // Fit: center the resized frame, leaving black borders
            let x_off = ((target_w - resized.cols()) / 2).max(0);
            let y_off = ((target_h - resized.rows()) / 2).max(0);
            let roi = core::Rect::new(x_off, y_off, resized.cols(), resized.rows());
            let mut canvas_roi = Mat::roi_mut(&mut canvas, roi)?;
            resized.copy_to(&mut canvas_roi)?;
        }

        Ok(canvas)
    }

    /// Synchronously decodes up to the next frame the sampler keeps.
    ///
    /// Rejected frames are decoded and discarded; the returned frame carries
    /// `out_index` as its position in the output sequence.
    pub fn next_sampled(&mut self, sampler: &mut FrameSampler, out_index: u64) -> Result<Option<Frame>> {
        let mut buffer = Vec::new();
        loop {
            match self.read_frame_into(&mut buffer)? {
                Some(timestamp_ms) => {
                    if sampler.keep(self.decoded - 1) {
                        let frame = Frame::new(
                            std::mem::take(&mut buffer),
                            self.output_width(),
                            self.output_height(),
                            out_index,
                            timestamp_ms,
                        );
                        return Ok(Some(frame));
                    }
                }
                None => return Ok(None),
            }
        }
    }

    /// Runs the decoder as a producer thread, sending sampled frames until
    /// EOF, a decode error, `limit`, or `stop` flips.
    ///
    /// A send failure means the receiver hung up, which is a normal
    /// shutdown, not an error.
    pub fn spawn_decoding_thread(
        mut self,
        sender: Sender<Frame>,
        mut sampler: FrameSampler,
        limit: Option<u64>,
        stop: Arc<AtomicBool>,
    ) -> JoinHandle<DecodeStats> {
        std::thread::spawn(move || {
            let mut sent: u64 = 0;
            loop {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                if let Some(max) = limit {
                    if sent >= max {
                        break;
                    }
                }
                match self.next_sampled(&mut sampler, sent) {
                    Ok(Some(frame)) => {
                        if sender.send(frame).is_err() {
                            break; // Receiver dropped
                        }
                        sent += 1;
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Decoding error after {} frames: {}", sent, e);
                        break;
                    }
                }
            }
            DecodeStats { decoded: self.decoded, sent }
        })
    }
}
