// src/geometry.rs
// Screen-pixel geometry shared by the selection, magnifier and capture code.

/// 屏幕坐标点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// 矩形选区结构体
///
/// Always normalized: `min_x <= max_x` and `min_y <= max_y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Rectangle {
    /// Builds the rectangle spanned by two corners given in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Rectangle {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    pub fn from_origin_size(x: i32, y: i32, width: u32, height: u32) -> Self {
        Rectangle {
            min_x: x,
            min_y: y,
            max_x: x + width as i32,
            max_y: y + height as i32,
        }
    }

    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y) as u32
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2,
            (self.min_y + self.max_y) / 2,
        )
    }

    /// Half-open containment: the max edges are outside.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x < self.max_x && p.y >= self.min_y && p.y < self.max_y
    }

    /// Intersection with `[0, width] x [0, height]`, or `None` when nothing is left.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Rectangle> {
        let r = Rectangle {
            min_x: self.min_x.clamp(0, width as i32),
            min_y: self.min_y.clamp(0, height as i32),
            max_x: self.max_x.clamp(0, width as i32),
            max_y: self.max_y.clamp(0, height as i32),
        };
        if r.is_empty() { None } else { Some(r) }
    }
}
