/// A half-open vertical interval `[top, top + height)`.
///
/// Coordinates are signed pixels so segments can be expressed relative to another one (e.g. the
/// viewport relative to the runway) without clamping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerticalSegment {
    top: i64,
    height: u32,
}

impl VerticalSegment {
    pub const fn new(top: i64, height: u32) -> Self {
        Self { top, height }
    }

    pub const fn top(&self) -> i64 {
        self.top
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    pub const fn bottom(&self) -> i64 {
        self.top + self.height as i64
    }

    pub const fn translate_by(&self, dy: i64) -> Self {
        Self::new(self.top + dy, self.height)
    }

    /// `top <= y < bottom`. A zero-height segment contains nothing.
    pub const fn contains(&self, y: i64) -> bool {
        self.top <= y && y < self.bottom()
    }

    /// Not symmetric at the edges: a segment that starts exactly at `other.bottom()` overlaps
    /// `other`, one that ends exactly at `other.top()` does not.
    pub const fn overlaps_with(&self, other: &Self) -> bool {
        self.contains(other.top) || self.contains(other.bottom()) || other.contains(self.top)
    }
}
