use serde::{Deserialize, Serialize};

/// Pixel rectangle inside a bin or atlas bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "h")]
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the two rectangles share interior pixels
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn contains(&self, other: &Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// Length of the overlap of two spans, zero when they are disjoint
    pub(crate) fn span_overlap(a_start: u32, a_end: u32, b_start: u32, b_end: u32) -> u32 {
        if a_end < b_start || b_end < a_start {
            return 0;
        }
        a_end.min(b_end).saturating_sub(a_start.max(b_start))
    }

    /// Smallest gap between two non-intersecting rectangles along either axis.
    /// Returns `None` when they intersect.
    pub fn gap(&self, other: &Rect) -> Option<u32> {
        if self.intersects(other) {
            return None;
        }
        let dx = if self.right() <= other.x {
            other.x - self.right()
        } else if other.right() <= self.x {
            self.x - other.right()
        } else {
            0
        };
        let dy = if self.bottom() <= other.y {
            other.y - self.bottom()
        } else if other.bottom() <= self.y {
            self.y - other.bottom()
        } else {
            0
        };
        Some(dx.max(dy))
    }
}
