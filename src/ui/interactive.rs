use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Select};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::core::extractor::{self, ExtractOptions, OutputFormat};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm"];

/// Menu-driven extraction: pick a video from `library_dir`, a format and a
/// rate, then run the extractor.
pub fn run_interactive(library_dir: &Path, stop: Arc<AtomicBool>) -> Result<()> {
    // 1. Scan for video files
    let mut videos: Vec<PathBuf> = fs::read_dir(library_dir)
        .with_context(|| format!("Cannot read video directory {}", library_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .collect();

    videos.sort();

    if videos.is_empty() {
        println!("❌ No video files in {}", library_dir.display());
        return Ok(());
    }

    // 2. Select video
    let video_names: Vec<String> = videos
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select a video")
        .default(0)
        .items(&video_names)
        .interact()?;

    let selected_video = &videos[selection];

    // 3. Output format
    let formats = vec![
        "PNG (lossless)",
        "JPEG (smaller files)",
        "Packed archive (single .bin)",
    ];
    let format_selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Output format")
        .default(0)
        .items(&formats)
        .interact()?;

    let format = match format_selection {
        1 => OutputFormat::Jpeg,
        2 => OutputFormat::Bin,
        _ => OutputFormat::Png,
    };

    // 4. Frame rate
    let rates = vec!["Native rate", "30 fps", "15 fps", "10 fps", "5 fps", "1 fps"];
    let rate_values: [u32; 6] = [0, 30, 15, 10, 5, 1];
    let rate_selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Frame rate")
        .default(0)
        .items(&rates)
        .interact()?;

    let frame_rate = rate_values[rate_selection];

    let stem = selected_video.file_stem().unwrap().to_string_lossy().to_string();
    let output_dir = Path::new("frames").join(&stem);

    println!(
        "\n🎞  Extracting {} -> {}",
        video_names[selection],
        output_dir.display()
    );

    let opts = ExtractOptions { frame_rate, format, ..Default::default() };
    let summary = extractor::extract_frames(
        &selected_video.to_string_lossy(),
        &output_dir,
        &opts,
        stop,
    )?;

    println!(
        "✅ {} frames written ({}x{}, {:.2}s)",
        summary.frames_written, summary.width, summary.height, summary.elapsed_seconds
    );

    Ok(())
}
