//! Buffer data model: bounds cache, key points, per-variable entries and the
//! buffer controller that keeps them consistent.

pub mod bounds;
pub mod buffer;
pub mod entry;
pub mod key_points;
pub mod processor;

/// Whether `index` lies in the circular window between `in_point` and
/// `out_point`, both ends included.
///
/// With `in_point <= out_point` the window is `[in_point, out_point]`;
/// otherwise it wraps: `[0, out_point] ∪ [in_point, capacity)`.
pub fn is_in_window(index: usize, in_point: usize, out_point: usize) -> bool {
    if in_point <= out_point {
        index >= in_point && index <= out_point
    } else {
        index <= out_point || index >= in_point
    }
}
