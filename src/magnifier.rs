// src/magnifier.rs
// Where the zoomed preview goes and which snapshot pixels it shows.

use crate::geometry::{Point, Rectangle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagnifierConfig {
    /// Side of the on-screen square, px.
    pub size: u32,
    /// Gap between the pointer and the square.
    pub offset: u32,
    pub zoom: u32,
}

impl Default for MagnifierConfig {
    fn default() -> Self {
        MagnifierConfig { size: 120, offset: 20, zoom: 2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagnifierLayout {
    /// Where the preview is painted; always inside the screen.
    pub target: Rectangle,
    /// Snapshot pixels stretched into `target`.
    pub source: Rectangle,
}

impl MagnifierLayout {
    /// Up-right of the pointer by default, flipped left / below near the
    /// right / top edges, then clamped so the square never leaves the screen.
    pub fn compute(
        cfg: &MagnifierConfig,
        cursor: Point,
        screen_width: u32,
        screen_height: u32,
    ) -> Option<MagnifierLayout> {
        if screen_width == 0 || screen_height == 0 || cfg.size == 0 {
            return None;
        }
        let size = cfg.size.min(screen_width).min(screen_height) as i32;
        let offset = cfg.offset as i32;
        let (w, h) = (screen_width as i32, screen_height as i32);

        let mut x = cursor.x + offset;
        let mut y = cursor.y - size - offset;
        if x + size > w {
            x = cursor.x - size - offset;
        }
        if y < 0 {
            y = cursor.y + offset;
        }
        let x = x.clamp(0, w - size);
        let y = y.clamp(0, h - size);
        let target = Rectangle::from_origin_size(x, y, size as u32, size as u32);

        let grab = (size / cfg.zoom.max(1) as i32).max(1);
        let gx = (cursor.x - grab / 2).clamp(0, w - grab);
        let gy = (cursor.y - grab / 2).clamp(0, h - grab);
        let source = Rectangle::from_origin_size(gx, gy, grab as u32, grab as u32);

        Some(MagnifierLayout { target, source })
    }

    /// Center of the crosshair drawn over the preview.
    pub fn crosshair(&self) -> Point {
        self.target.center()
    }
}
