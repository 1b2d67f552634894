//! Min/max cache over a window of a sample array.

/// Extrema of an array over `[window_start, window_end)`.
///
/// An empty or not yet computed window holds `lower = +inf, upper = -inf`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub window_start: usize,
    pub window_end: usize,
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub const fn empty() -> Self {
        Self {
            window_start: 0,
            window_end: 0,
            lower: f64::INFINITY,
            upper: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.lower <= self.upper)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// `upper - lower`, or 0 for an empty window.
    pub fn span(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.upper - self.lower
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

/// Bounds plus the two flags that decide when they must be recomputed and
/// when a consumer should redraw.
///
/// `dirty` means the cached extrema cannot be trusted and must be rebuilt
/// from the array (set after bulk edits). `changed` means the extrema moved
/// since a consumer last called [`acknowledge`](Self::acknowledge). The two
/// are independent: a single new sample widens the bounds in O(1) and sets
/// `changed` without forcing a rescan.
#[derive(Debug, Clone)]
pub struct BoundsCache {
    bounds: Bounds,
    dirty: bool,
    changed: bool,
}

impl Default for BoundsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundsCache {
    pub fn new() -> Self {
        Self {
            bounds: Bounds::empty(),
            dirty: true,
            changed: true,
        }
    }

    /// Forget the extrema; the next read triggers a full recompute.
    pub fn clear(&mut self) {
        self.bounds = Bounds::empty();
        self.dirty = true;
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn window(&self) -> (usize, usize) {
        (self.bounds.window_start, self.bounds.window_end)
    }

    pub fn set_window(&mut self, start: usize, end: usize) {
        self.bounds.window_start = start;
        self.bounds.window_end = end;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// Consumer acknowledgment: the current extrema have been observed.
    pub fn acknowledge(&mut self) {
        self.changed = false;
    }

    /// Rescan the declared window of `data` and replace both bounds.
    ///
    /// The window end is clamped to the array length. Returns whether
    /// either bound moved.
    pub fn full_recompute(&mut self, data: &[f64]) -> bool {
        let end = self.bounds.window_end.min(data.len());
        let start = self.bounds.window_start.min(end);

        let mut lower = f64::INFINITY;
        let mut upper = f64::NEG_INFINITY;
        for &value in &data[start..end] {
            if value < lower {
                lower = value;
            }
            if value > upper {
                upper = value;
            }
        }

        self.dirty = false;
        let moved = lower.to_bits() != self.bounds.lower.to_bits()
            || upper.to_bits() != self.bounds.upper.to_bits();
        if moved {
            self.bounds.lower = lower;
            self.bounds.upper = upper;
            self.changed = true;
        }
        moved
    }

    /// Widen the bounds to include `value`. Never narrows: a single write
    /// cannot prove an old extremum left the array.
    pub fn observe(&mut self, value: f64) -> bool {
        let mut moved = false;
        if value < self.bounds.lower {
            self.bounds.lower = value;
            moved = true;
        }
        if value > self.bounds.upper {
            self.bounds.upper = value;
            moved = true;
        }
        if moved {
            self.changed = true;
        }
        moved
    }
}
