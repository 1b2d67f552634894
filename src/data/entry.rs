//! One recorded variable: its sample array, bounds cache and the destructive
//! array primitives the buffer drives.

use parking_lot::Mutex;

use crate::data::bounds::{Bounds, BoundsCache};
use crate::error::{BufferError, Result};
use crate::variable::{same_variable, VariableRef};

struct EntryState {
    data: Vec<f64>,
    bounds: BoundsCache,
    custom_bounds: Bounds,
    use_custom_bounds: bool,
    inverted: bool,
}

/// Sample history of one variable.
///
/// The array and its bounds sit behind a short-held mutex so a presentation
/// thread holding an `Arc<BufferEntry>` sees the simulation thread's writes.
/// Destructive primitives (`enlarge`, `pack`, `crop`, `cut`, `thin`) are
/// `pub(crate)`: only the buffer may call them, because every entry must be
/// rearranged identically to keep the shared length.
pub struct BufferEntry {
    variable: VariableRef,
    state: Mutex<EntryState>,
}

impl std::fmt::Debug for BufferEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferEntry")
            .field("variable", &self.variable.full_name())
            .field("len", &self.len())
            .finish()
    }
}

/// Length kept by `crop(start, end)` on an array of `len` samples.
///
/// The slice runs circularly from `start` to `end` inclusive. When `end`
/// sits just before `start` the formula `(end - start + 1) mod len` gives 0,
/// which means the whole array is kept; an inclusive range is never empty.
pub fn crop_len(start: usize, end: usize, len: usize) -> usize {
    match (end + 1 + len - start) % len {
        0 => len,
        n => n,
    }
}

/// Validate crop arguments, returning the resulting length.
pub fn check_crop(start: usize, end: usize, len: usize) -> Result<usize> {
    if len == 0 || start >= len || end > len {
        return Err(BufferError::InvalidRange { start, end, len });
    }
    Ok(crop_len(start, end, len))
}

/// Validate cut arguments, returning the resulting length. Removing every
/// sample is rejected: a buffer always holds at least one.
pub fn check_cut(start: usize, end: usize, len: usize) -> Result<usize> {
    if start > end || end >= len || end - start + 1 >= len {
        return Err(BufferError::InvalidRange { start, end, len });
    }
    Ok(len - (end - start + 1))
}

/// Validate a thinning stride, returning the resulting length.
///
/// Only a zero stride is rejected. A stride longer than the array yields 0,
/// which callers treat as "nothing to thin".
pub fn check_thin(stride: usize, len: usize) -> Result<usize> {
    if stride == 0 {
        return Err(BufferError::InvalidStride { stride });
    }
    Ok(len / stride)
}

impl BufferEntry {
    pub fn new(variable: VariableRef, capacity: usize) -> Self {
        Self {
            variable,
            state: Mutex::new(EntryState {
                data: vec![0.0; capacity],
                bounds: BoundsCache::new(),
                custom_bounds: Bounds::empty(),
                use_custom_bounds: false,
                inverted: false,
            }),
        }
    }

    pub fn variable(&self) -> &VariableRef {
        &self.variable
    }

    pub fn is_variable(&self, variable: &VariableRef) -> bool {
        same_variable(&self.variable, variable)
    }

    pub fn name(&self) -> &str {
        self.variable.name()
    }

    pub fn full_name(&self) -> &str {
        self.variable.full_name()
    }

    pub fn len(&self) -> usize {
        self.state.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Sample access ───────────────────────────────────────────────────

    /// Pull the variable's current value into `data[index]`.
    pub fn set_from_variable(&self, index: usize) -> bool {
        let value = self.variable.value_as_f64();
        self.set_data(value, index)
    }

    /// Push `data[index]` into the variable.
    pub fn set_to_variable(&self, index: usize) {
        let value = self.state.lock().data[index];
        self.variable.set_from_f64(value);
    }

    /// Store `value` at `index`.
    ///
    /// A bit-identical value is ignored so repeated steady samples do not
    /// touch the bounds. A write outside the cached bounds window only
    /// marks the cache dirty. Returns whether the array changed.
    pub fn set_data(&self, value: f64, index: usize) -> bool {
        let mut state = self.state.lock();
        if state.data[index].to_bits() == value.to_bits() {
            return false;
        }
        state.data[index] = value;
        let (start, end) = state.bounds.window();
        if (start..end).contains(&index) {
            state.bounds.observe(value);
        } else {
            state.bounds.mark_dirty();
        }
        true
    }

    pub fn value_at(&self, index: usize) -> f64 {
        self.state.lock().data[index]
    }

    /// Copy of the full array.
    pub fn data(&self) -> Vec<f64> {
        self.state.lock().data.clone()
    }

    /// Copy of `data[start..end]`.
    pub fn window_copy(&self, start: usize, end: usize) -> Vec<f64> {
        self.state.lock().data[start..end].to_vec()
    }

    /// Copy of `length` samples read circularly from `start`.
    pub fn windowed_data(&self, start: usize, length: usize) -> Vec<f64> {
        let state = self.state.lock();
        let len = state.data.len();
        (0..length).map(|i| state.data[(start + i) % len]).collect()
    }

    /// Arithmetic mean over the whole array.
    pub fn average(&self) -> f64 {
        let state = self.state.lock();
        state.data.iter().sum::<f64>() / state.data.len() as f64
    }

    /// Fill the whole array with the variable's current value.
    pub fn copy_value_through(&self) {
        let value = self.variable.value_as_f64();
        let mut state = self.state.lock();
        state.data.fill(value);
        state.bounds.clear();
    }

    /// Replace the array with `capacity` zeros.
    pub fn clear(&self, capacity: usize) {
        let mut state = self.state.lock();
        state.data = vec![0.0; capacity];
        state.bounds.clear();
    }

    // ── Bounds ──────────────────────────────────────────────────────────

    /// Extrema over the whole array, rescanned first if a bulk edit left
    /// the cache dirty or a narrower window was cached.
    pub fn bounds(&self) -> Bounds {
        let mut state = self.state.lock();
        let state = &mut *state;
        if state.bounds.is_dirty() || state.bounds.window() != (0, state.data.len()) {
            state.bounds.set_window(0, state.data.len());
            state.bounds.full_recompute(&state.data);
        }
        state.bounds.bounds()
    }

    /// Extrema over `data[start..end]`, rescanned when the window differs
    /// from the cached one or the cache is dirty.
    pub fn window_bounds(&self, start: usize, end: usize) -> Bounds {
        let mut state = self.state.lock();
        let state = &mut *state;
        if state.bounds.is_dirty() || state.bounds.window() != (start, end) {
            state.bounds.set_window(start, end);
            state.bounds.full_recompute(&state.data);
        }
        state.bounds.bounds()
    }

    /// Force a rescan on the next bounds read.
    pub fn invalidate_bounds(&self) {
        self.state.lock().bounds.mark_dirty();
    }

    pub fn have_bounds_changed(&self) -> bool {
        self.state.lock().bounds.has_changed()
    }

    pub fn reset_bounds_changed(&self) {
        self.state.lock().bounds.acknowledge();
    }

    pub fn set_custom_bounds(&self, lower: f64, upper: f64) {
        let mut state = self.state.lock();
        let len = state.data.len();
        state.custom_bounds = Bounds {
            window_start: 0,
            window_end: len,
            lower,
            upper,
        };
    }

    pub fn custom_bounds(&self) -> Bounds {
        let mut state = self.state.lock();
        let len = state.data.len();
        state.custom_bounds.window_end = len;
        state.custom_bounds
    }

    pub fn use_custom_bounds(&self, use_custom: bool) {
        self.state.lock().use_custom_bounds = use_custom;
    }

    pub fn is_using_custom_bounds(&self) -> bool {
        self.state.lock().use_custom_bounds
    }

    /// Custom bounds when enabled, otherwise the computed ones.
    pub fn display_bounds(&self) -> Bounds {
        if self.is_using_custom_bounds() {
            self.custom_bounds()
        } else {
            self.bounds()
        }
    }

    pub fn set_inverted(&self, inverted: bool) {
        self.state.lock().inverted = inverted;
    }

    pub fn is_inverted(&self) -> bool {
        self.state.lock().inverted
    }

    // ── Comparison / copies ─────────────────────────────────────────────

    /// Compare `length` samples read circularly from `start` here against
    /// `length` samples read circularly from `other_start` in `other`.
    ///
    /// Samples match when they are bit-identical (so NaN matches NaN) or
    /// differ by at most `epsilon`. A length longer than either array, or a
    /// start outside it, compares unequal.
    pub fn data_equals(
        &self,
        other: &BufferEntry,
        start: usize,
        other_start: usize,
        length: usize,
        epsilon: f64,
    ) -> bool {
        if length == 0 {
            return true;
        }
        let (len, other_len) = (self.len(), other.len());
        if length > len || length > other_len || start >= len || other_start >= other_len {
            return false;
        }
        // separate copies: `other` may be this very entry
        let ours = self.windowed_data(start, length);
        let theirs = other.windowed_data(other_start, length);
        ours.iter()
            .zip(&theirs)
            .all(|(x, y)| x.to_bits() == y.to_bits() || (x - y).abs() <= epsilon)
    }

    /// Independent copy bound to the same variable.
    pub fn snapshot(&self) -> BufferEntry {
        let state = self.state.lock();
        BufferEntry {
            variable: self.variable.clone(),
            state: Mutex::new(EntryState {
                data: state.data.clone(),
                bounds: state.bounds.clone(),
                custom_bounds: state.custom_bounds,
                use_custom_bounds: state.use_custom_bounds,
                inverted: state.inverted,
            }),
        }
    }

    // ── Destructive primitives ──────────────────────────────────────────

    /// Grow to `new_len`, filling the tail with the last stored sample.
    pub(crate) fn enlarge(&self, new_len: usize) -> usize {
        let mut state = self.state.lock();
        let old_len = state.data.len();
        if new_len <= old_len {
            return old_len;
        }
        let tail = state.data.last().copied().unwrap_or(0.0);
        state.data.resize(new_len, tail);
        state.bounds.mark_dirty();
        new_len
    }

    /// Rotate so that `start` becomes index 0. `start == 0` is a no-op.
    pub(crate) fn pack(&self, start: usize) -> Result<usize> {
        let mut state = self.state.lock();
        let len = state.data.len();
        if start >= len {
            return Err(BufferError::InvalidRange { start, end: start, len });
        }
        if start > 0 {
            state.data.rotate_left(start);
            state.bounds.mark_dirty();
        }
        Ok(len)
    }

    /// Keep the circular slice `start..=end`.
    pub(crate) fn crop(&self, start: usize, end: usize) -> Result<usize> {
        let mut state = self.state.lock();
        let old_len = state.data.len();
        let new_len = check_crop(start, end, old_len)?;
        let cropped: Vec<f64> = (0..new_len)
            .map(|i| state.data[(i + start) % old_len])
            .collect();
        state.data = cropped;
        state.bounds.mark_dirty();
        Ok(new_len)
    }

    /// Remove `start..=end` and close the gap.
    pub(crate) fn cut(&self, start: usize, end: usize) -> Result<usize> {
        let mut state = self.state.lock();
        let new_len = check_cut(start, end, state.data.len())?;
        state.data.drain(start..=end);
        state.bounds.mark_dirty();
        Ok(new_len)
    }

    /// Keep every `stride`-th sample starting at index 0.
    pub(crate) fn thin(&self, stride: usize) -> Result<usize> {
        let mut state = self.state.lock();
        let new_len = check_thin(stride, state.data.len())?;
        if new_len == 0 {
            return Ok(state.data.len());
        }
        let thinned: Vec<f64> = state.data.iter().step_by(stride).take(new_len).copied().collect();
        state.data = thinned;
        state.bounds.mark_dirty();
        Ok(new_len)
    }

    /// Insert `samples` before `index`. Used to splice a cut slice back in.
    pub(crate) fn insert_slice(&self, index: usize, samples: &[f64]) -> usize {
        let mut state = self.state.lock();
        let at = index.min(state.data.len());
        state.data.splice(at..at, samples.iter().copied());
        state.bounds.mark_dirty();
        state.data.len()
    }
}
