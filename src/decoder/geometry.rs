use serde::Serialize;

/// How a decoded frame is mapped onto a requested output size.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Keep aspect ratio, letterbox into the target (black borders).
    Fit,
    /// Keep aspect ratio, cover the target, crop the overflow (center crop).
    Fill,
    /// Ignore aspect ratio, resize to exactly the target.
    Stretch,
}

/// Requested output geometry for decoded frames.
#[derive(Copy, Clone, Debug)]
pub struct OutputGeometry {
    pub width: u32,
    pub height: u32,
    pub mode: ScaleMode,
}

/// Size the source should be resized to before letterboxing/cropping.
///
/// For `Fit` the result fits inside the target; for `Fill` it covers the
/// target; for `Stretch` it is the target.
pub fn scaled_size(orig: (u32, u32), target: (u32, u32), mode: ScaleMode) -> (u32, u32) {
    let (ow, oh) = orig;
    let (tw, th) = target;

    if mode == ScaleMode::Stretch {
        return (tw.max(1), th.max(1));
    }

    let scale_w = tw as f64 / ow as f64;
    let scale_h = th as f64 / oh as f64;
    let scale = match mode {
        ScaleMode::Fill => scale_w.max(scale_h),
        _ => scale_w.min(scale_h),
    };

    let new_w = ((ow as f64 * scale).round() as u32).max(1);
    let new_h = ((oh as f64 * scale).round() as u32).max(1);
    (new_w, new_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_letterboxes_wide_source() {
        // 1920x1080 into a square box: width-bound, bars top and bottom
        let (w, h) = scaled_size((1920, 1080), (100, 100), ScaleMode::Fit);
        assert_eq!(w, 100);
        assert!(h < 100);
    }

    #[test]
    fn test_fill_covers_target() {
        let (w, h) = scaled_size((1920, 1080), (100, 100), ScaleMode::Fill);
        assert!(w >= 100 && h >= 100);
        assert_eq!(h, 100); // height is the binding edge, width overflows
    }

    #[test]
    fn test_stretch_is_exact() {
        assert_eq!(scaled_size((640, 480), (100, 50), ScaleMode::Stretch), (100, 50));
    }

    #[test]
    fn test_degenerate_target_stays_positive() {
        let (w, h) = scaled_size((4000, 10), (2, 2), ScaleMode::Fit);
        assert!(w >= 1 && h >= 1);
    }
}
