//! Image quality passes run on a finished capture.
//!
//! `auto_contrast` stretches each colour channel after clipping a small
//! percentage of the darkest and brightest pixels. `detect_blank` flags
//! captures that are almost entirely black or white. Neither decides whether
//! a capture is kept.

use image::imageops;
use image::RgbaImage;

/// Share of pure black or pure white pixels above which a capture counts as blank.
pub const BLANK_THRESHOLD: f64 = 0.95;

pub const DEFAULT_CONTRAST_CUTOFF: f32 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum QualityError {
    #[error("Cannot enhance an empty image")]
    EmptyImage,

    #[error("Contrast cutoff must be within [0, 50) percent, got {0}")]
    InvalidCutoff(f32),
}

/// Autocontrast with `cutoff` percent clipped from both ends of every RGB histogram.
/// Alpha is left alone.
pub fn auto_contrast(image: &RgbaImage, cutoff: f32) -> Result<RgbaImage, QualityError> {
    if !cutoff.is_finite() || !(0.0..50.0).contains(&cutoff) {
        return Err(QualityError::InvalidCutoff(cutoff));
    }
    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
        return Err(QualityError::EmptyImage);
    }

    let mut histograms = [[0u64; 256]; 3];
    for px in image.pixels() {
        for (c, hist) in histograms.iter_mut().enumerate() {
            hist[px[c] as usize] += 1;
        }
    }

    let cut = (total as f64 * cutoff as f64 / 100.0).floor() as u64;
    let luts: Vec<[u8; 256]> = histograms.iter().map(|h| channel_lut(h, cut)).collect();

    let mut out = image.clone();
    for px in out.pixels_mut() {
        for (c, lut) in luts.iter().enumerate() {
            px[c] = lut[px[c] as usize];
        }
    }
    Ok(out)
}

fn channel_lut(hist: &[u64; 256], cut: u64) -> [u8; 256] {
    let mut h = *hist;

    let mut remaining = cut;
    for bin in h.iter_mut() {
        if remaining == 0 {
            break;
        }
        let taken = remaining.min(*bin);
        *bin -= taken;
        remaining -= taken;
    }
    let mut remaining = cut;
    for bin in h.iter_mut().rev() {
        if remaining == 0 {
            break;
        }
        let taken = remaining.min(*bin);
        *bin -= taken;
        remaining -= taken;
    }

    let mut lut = [0u8; 256];
    let lo = h.iter().position(|&n| n > 0);
    let hi = h.iter().rposition(|&n| n > 0);
    match (lo, hi) {
        (Some(lo), Some(hi)) if hi > lo => {
            let scale = 255.0 / (hi - lo) as f64;
            let offset = -(lo as f64) * scale;
            for (i, v) in lut.iter_mut().enumerate() {
                *v = (i as f64 * scale + offset).clamp(0.0, 255.0) as u8;
            }
        }
        _ => {
            for (i, v) in lut.iter_mut().enumerate() {
                *v = i as u8;
            }
        }
    }
    lut
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlankVerdict {
    pub black_ratio: f64,
    pub white_ratio: f64,
    pub blank: bool,
}

/// Luminance histogram check. An image with no pixels is reported as not blank.
pub fn detect_blank(image: &RgbaImage) -> BlankVerdict {
    let luma = imageops::grayscale(image);
    let total = luma.width() as u64 * luma.height() as u64;
    if total == 0 {
        return BlankVerdict { black_ratio: 0.0, white_ratio: 0.0, blank: false };
    }

    let mut histogram = [0u64; 256];
    for px in luma.pixels() {
        histogram[px[0] as usize] += 1;
    }
    let black_ratio = histogram[0] as f64 / total as f64;
    let white_ratio = histogram[255] as f64 / total as f64;

    BlankVerdict {
        black_ratio,
        white_ratio,
        blank: black_ratio > BLANK_THRESHOLD || white_ratio > BLANK_THRESHOLD,
    }
}
