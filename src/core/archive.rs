use std::fs;
use std::path::Path;
use tracing::debug;

use crate::decoder::Frame;
use crate::error::{GrabError, Result};

/// Packed frame archive.
///
/// Layout: `Width(u16 LE) | Height(u16 LE) | FrameCount(u32 LE)` followed by
/// an lz4 block-compressed body of `FrameCount` concatenated raw RGB24
/// frames. The header is uncompressed so a reader can size its buffers
/// before decompressing.
const HEADER_LEN: usize = 8;

pub struct FrameArchive {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<Vec<u8>>,
}

impl FrameArchive {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

pub fn write_archive(path: &Path, frames: &[Frame]) -> Result<()> {
    let first = frames.first().ok_or_else(|| GrabError::Archive {
        message: "refusing to write an empty archive".to_string(),
    })?;

    let (width, height) = (first.width, first.height);
    if width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(GrabError::Archive {
            message: format!("frame size {}x{} exceeds archive header range", width, height),
        });
    }

    let frame_size = first.byte_len();
    let mut body = Vec::with_capacity(frame_size * frames.len());
    for frame in frames {
        if frame.width != width || frame.height != height || frame.buffer.len() != frame_size {
            return Err(GrabError::Archive {
                message: format!(
                    "mixed frame sizes: expected {}x{}, frame {} is {}x{}",
                    width, height, frame.index, frame.width, frame.height
                ),
            });
        }
        body.extend_from_slice(&frame.buffer);
    }

    let compressed = lz4::block::compress(&body, None, false)?;
    debug!(
        frames = frames.len(),
        raw = body.len(),
        compressed = compressed.len(),
        "Packing frame archive"
    );

    let mut data = Vec::with_capacity(HEADER_LEN + compressed.len());
    data.extend_from_slice(&(width as u16).to_le_bytes());
    data.extend_from_slice(&(height as u16).to_le_bytes());
    data.extend_from_slice(&(frames.len() as u32).to_le_bytes());
    data.extend_from_slice(&compressed);

    fs::write(path, data)?;
    Ok(())
}

pub fn load_archive(path: &Path) -> Result<FrameArchive> {
    let data = fs::read(path)?;
    if data.len() < HEADER_LEN {
        return Err(GrabError::Archive {
            message: format!("{} is too short to hold an archive header", path.display()),
        });
    }

    let width = u16::from_le_bytes([data[0], data[1]]) as u32;
    let height = u16::from_le_bytes([data[2], data[3]]) as u32;
    let frame_count = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;

    let frame_size = width as usize * height as usize * 3;
    let total_size = frame_size * frame_count;
    if frame_size == 0 && frame_count > 0 {
        return Err(GrabError::Archive {
            message: "archive header declares zero-sized frames".to_string(),
        });
    }

    let decompressed = lz4::block::decompress(&data[HEADER_LEN..], Some(total_size as i32))?;
    if decompressed.len() < total_size {
        return Err(GrabError::Archive {
            message: format!(
                "decompressed length {} shorter than expected {}",
                decompressed.len(),
                total_size
            ),
        });
    }

    let mut frames = Vec::with_capacity(frame_count);
    for i in 0..frame_count {
        let start = i * frame_size;
        frames.push(decompressed[start..start + frame_size].to_vec());
    }

    debug!(frames = frames.len(), width, height, "Loaded frame archive");
    Ok(FrameArchive { width, height, frames })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame(index: u64, fill: u8) -> Frame {
        Frame::new(vec![fill; 6 * 4 * 3], 6, 4, index, index as f64 * 33.3)
    }

    #[test]
    fn test_archive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.bin");

        let frames = vec![test_frame(0, 0), test_frame(1, 128), test_frame(2, 255)];
        write_archive(&path, &frames).unwrap();

        let loaded = load_archive(&path).unwrap();
        assert_eq!(loaded.width, 6);
        assert_eq!(loaded.height, 4);
        assert_eq!(loaded.frame_count(), 3);
        assert_eq!(loaded.frames[1], frames[1].buffer);
    }

    #[test]
    fn test_empty_archive_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.bin");
        assert!(write_archive(&path, &[]).is_err());
    }

    #[test]
    fn test_mixed_sizes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.bin");
        let frames = vec![test_frame(0, 0), Frame::new(vec![0; 3 * 3 * 3], 3, 3, 1, 0.0)];
        assert!(write_archive(&path, &frames).is_err());
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.bin");
        fs::write(&path, [1, 0, 1, 0]).unwrap();
        assert!(matches!(load_archive(&path), Err(GrabError::Archive { .. })));
    }
}
