#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! Coordinates are unsigned cells with the origin at the top-left of the
//! rendering surface. Drop-region hit testing uses the inclusive
//! [`Rect::contains_inclusive`].

/// A pointer or anchor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Column.
    pub x: u16,
    /// Row.
    pub y: u16,
}

impl Position {
    /// Create a new position.
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Signed offset `(dx, dy)` from `self` to `other`.
    #[inline]
    #[must_use]
    pub const fn delta_to(self, other: Position) -> (i32, i32) {
        (
            other.x as i32 - self.x as i32,
            other.y as i32 - self.y as i32,
        )
    }

    /// Manhattan distance between two positions.
    #[inline]
    #[must_use]
    pub const fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) as u32 + self.y.abs_diff(other.y) as u32
    }
}

/// A rectangle for layout bounds and hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: u16,
    /// Top edge (inclusive).
    pub y: u16,
    /// Width in cells.
    pub width: u16,
    /// Height in cells.
    pub height: u16,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }

    /// Check if a position lies inside or on the boundary of the rectangle.
    ///
    /// Both the far edges `x + width` and `y + height` count as inside, so
    /// two regions sharing an edge both match a pointer on that edge; the
    /// caller's scan order decides which one wins.
    #[inline]
    #[must_use]
    pub const fn contains_inclusive(&self, pos: Position) -> bool {
        pos.x >= self.x && pos.x <= self.right() && pos.y >= self.y && pos.y <= self.bottom()
    }

    /// Split into a top and a bottom half.
    ///
    /// The top half gets `height / 2` rows and the bottom half the rest, so
    /// the halves always tile the original rectangle.
    #[must_use]
    pub const fn split_vertical_halves(&self) -> (Rect, Rect) {
        let top_height = self.height / 2;
        let top = Rect::new(self.x, self.y, self.width, top_height);
        let bottom = Rect::new(
            self.x,
            self.y.saturating_add(top_height),
            self.width,
            self.height - top_height,
        );
        (top, bottom)
    }

    /// Translate by a signed offset, clamping at the coordinate limits.
    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        let clamp = |base: u16, delta: i32| -> u16 {
            (i32::from(base) + delta).clamp(0, i32::from(u16::MAX)) as u16
        };
        Rect::new(
            clamp(self.x, dx),
            clamp(self.y, dy),
            self.width,
            self.height,
        )
    }
}
