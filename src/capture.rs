//! Screen grabbing, persistence and capture finalization.
//!
//! `XcapGrabber` talks to the OS. Everything else works on an `RgbaImage`
//! so it can run against an in-memory screen.

use chrono::{DateTime, Local};
use image::{ImageBuffer, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use xcap::Monitor;

use crate::geometry::Rectangle;
use crate::outcome::CaptureOutcome;
use crate::quality;
use crate::session::SessionContext;

/// Name the OCR step reads; overwritten on every accepted capture.
pub const CURRENT_CAPTURE: &str = "capture.png";

pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to enumerate monitors: {0}")]
    MonitorEnumeration(String),

    #[error("No monitor found")]
    NoMonitor,

    #[error("Screen capture failed: {0}")]
    Grab(String),

    #[error("Captured frame could not be converted")]
    Conversion,

    #[error(
        "Region ({},{})-({},{}) lies outside the {}x{} screen",
        .region.min_x, .region.min_y, .region.max_x, .region.max_y, .screen.0, .screen.1
    )]
    EmptyRegion { region: Rectangle, screen: (u32, u32) },

    #[error("Could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not encode {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Source of full-screen rasters, used once for the overlay snapshot and again
/// for the final grab.
pub trait ScreenGrabber {
    fn grab(&self) -> Result<RgbaImage, CaptureError>;
}

/// Primary monitor, or the first one xcap reports when none claims to be primary.
pub struct XcapGrabber;

impl ScreenGrabber for XcapGrabber {
    fn grab(&self) -> Result<RgbaImage, CaptureError> {
        let monitors = Monitor::all().map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;
        let monitor = pick_primary(monitors, |m| m.is_primary().unwrap_or(false))
            .ok_or(CaptureError::NoMonitor)?;
        let img = monitor
            .capture_image()
            .map_err(|e| CaptureError::Grab(e.to_string()))?;
        // xcap ships its own image version; go through raw bytes
        let (w, h) = (img.width(), img.height());
        ImageBuffer::from_raw(w, h, img.into_raw()).ok_or(CaptureError::Conversion)
    }
}

/// First item `is_primary` accepts, else the first item.
pub fn pick_primary<M>(monitors: Vec<M>, is_primary: impl Fn(&M) -> bool) -> Option<M> {
    let idx = monitors.iter().position(|m| is_primary(m)).unwrap_or(0);
    monitors.into_iter().nth(idx)
}

/// Cuts `region` out of a full-screen raster, dropping whatever lies off-screen.
pub fn crop_region(screen: &RgbaImage, region: Rectangle) -> Result<RgbaImage, CaptureError> {
    let (w, h) = screen.dimensions();
    let visible = region
        .clip_to(w, h)
        .ok_or(CaptureError::EmptyRegion { region, screen: (w, h) })?;
    Ok(image::imageops::crop_imm(
        screen,
        visible.min_x as u32,
        visible.min_y as u32,
        visible.width(),
        visible.height(),
    )
    .to_image())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedCapture {
    pub current: PathBuf,
    pub archive: PathBuf,
    /// The captures directory did not exist before this save.
    pub created_dir: bool,
}

/// 截图保存目录
#[derive(Debug, Clone)]
pub struct CaptureStore {
    dir: PathBuf,
}

impl CaptureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CaptureStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_CAPTURE)
    }

    pub fn archive_path(&self, at: DateTime<Local>) -> PathBuf {
        self.dir.join(format!("capture_{}.png", at.format("%Y%m%d_%H%M%S")))
    }

    pub fn persist(&self, image: &RgbaImage) -> Result<SavedCapture, CaptureError> {
        self.persist_at(image, Local::now())
    }

    /// Writes the timestamped archive copy, then replaces the fixed-name file with it.
    pub fn persist_at(&self, image: &RgbaImage, at: DateTime<Local>) -> Result<SavedCapture, CaptureError> {
        let created_dir = !self.dir.exists();
        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir).map_err(|source| CaptureError::Io {
                path: self.dir.clone(),
                source,
            })?;
        }

        let archive = self.archive_path(at);
        image.save(&archive).map_err(|source| CaptureError::Encode {
            path: archive.clone(),
            source,
        })?;

        let current = self.current_path();
        fs::copy(&archive, &current).map_err(|source| CaptureError::Io {
            path: current.clone(),
            source,
        })?;

        Ok(SavedCapture { current, archive, created_dir })
    }
}

/// Grabs the finalized region from the live screen, enhances it and saves it.
pub struct CaptureFinalizer<'a, G: ScreenGrabber + ?Sized> {
    grabber: &'a G,
    store: &'a CaptureStore,
    settle: Duration,
    contrast_cutoff: f32,
}

impl<'a, G: ScreenGrabber + ?Sized> CaptureFinalizer<'a, G> {
    pub fn new(grabber: &'a G, store: &'a CaptureStore) -> Self {
        CaptureFinalizer {
            grabber,
            store,
            settle: DEFAULT_SETTLE,
            contrast_cutoff: quality::DEFAULT_CONTRAST_CUTOFF,
        }
    }

    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn contrast_cutoff(mut self, cutoff: f32) -> Self {
        self.contrast_cutoff = cutoff;
        self
    }

    /// Always yields a terminal outcome: I/O and grab errors become `Failed`.
    pub fn finalize(&self, region: Rectangle, ctx: &SessionContext) -> CaptureOutcome {
        match self.try_finalize(region, ctx) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("[session {}] Error capturing screenshot: {}", ctx.id(), e);
                CaptureOutcome::failed(e)
            }
        }
    }

    fn try_finalize(&self, region: Rectangle, ctx: &SessionContext) -> Result<CaptureOutcome, CaptureError> {
        // the overlay is gone by now; let the compositor catch up
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }

        let screen = self.grabber.grab()?;
        let cropped = crop_region(&screen, region)?;
        if cropped.dimensions() != region.size() {
            log::warn!(
                "[session {}] Region {:?} clipped to {}x{} for a {}x{} grab",
                ctx.id(),
                region,
                cropped.width(),
                cropped.height(),
                screen.width(),
                screen.height()
            );
        }

        let image = match quality::auto_contrast(&cropped, self.contrast_cutoff) {
            Ok(enhanced) => enhanced,
            Err(e) => {
                log::warn!("[session {}] Could not enhance image: {}", ctx.id(), e);
                cropped
            }
        };

        let saved = self.store.persist(&image)?;
        if saved.created_dir {
            log::info!("[session {}] Created captures directory: {}", ctx.id(), self.store.dir().display());
        }
        log::info!("[session {}] Image saved to: {}", ctx.id(), saved.archive.display());
        log::info!("[session {}] OCR copy saved to: {}", ctx.id(), saved.current.display());
        let size = image.dimensions();
        log::info!("[session {}] Image size: {}x{}", ctx.id(), size.0, size.1);

        let verdict = quality::detect_blank(&image);
        log::debug!(
            "[session {}] Black pixel ratio: {:.2}, White pixel ratio: {:.2}",
            ctx.id(),
            verdict.black_ratio,
            verdict.white_ratio
        );
        if verdict.blank {
            log::warn!(
                "[session {}] Captured image appears to be blank (black {:.2}, white {:.2})",
                ctx.id(),
                verdict.black_ratio,
                verdict.white_ratio
            );
        }

        Ok(CaptureOutcome::Accepted {
            path: saved.current,
            archive_path: saved.archive,
            size,
            blank: verdict.blank,
        })
    }
}
