//! Whole-run post-processing over the active window.

use crate::data::buffer::DataBuffer;
use crate::error::{BufferError, Result};

/// A function applied to every index of the active window.
///
/// The buffer loads every variable from the current index, calls
/// [`process`](Self::process), then writes the variables back into the same
/// index before stepping. A processor can therefore both read recorded
/// values and rewrite them (for example to fill in a derived variable).
pub trait BufferProcessor {
    /// `true` to walk from in-point to out-point, `false` for the reverse.
    fn go_forward(&self) -> bool {
        true
    }

    /// Called once before the walk starts. `buffer` can be used to look up
    /// the entries or variables the processor needs.
    fn initialize(&mut self, _buffer: &DataBuffer) {}

    /// `start` and `end` are the first and last index of the walk (in/out
    /// point going forward, out/in point going backward).
    fn process(&mut self, start: usize, end: usize, current: usize);
}

impl DataBuffer {
    /// Call `f` once per active index from in-point to out-point.
    ///
    /// Afterwards the cursor rests at the in-point. Fails with
    /// [`BufferError::CursorLocked`] while the cursor is locked, since the
    /// walk could not move.
    pub fn apply_forward<F>(&mut self, f: F) -> Result<()>
    where
        F: FnMut(usize),
    {
        self.walk(true, f)
    }

    /// Same as [`apply_forward`](Self::apply_forward) from out-point to
    /// in-point; the cursor ends at the out-point.
    pub fn apply_backward<F>(&mut self, f: F) -> Result<()>
    where
        F: FnMut(usize),
    {
        self.walk(false, f)
    }

    pub fn apply_processor(&mut self, processor: &mut dyn BufferProcessor) -> Result<()> {
        if self.is_cursor_locked() {
            return Err(BufferError::CursorLocked);
        }
        processor.initialize(self);
        let forward = processor.go_forward();
        let (start, end) = self.walk_ends(forward);
        self.walk(forward, |current| processor.process(start, end, current))
    }

    fn walk_ends(&self, forward: bool) -> (usize, usize) {
        if forward {
            (self.in_point(), self.out_point())
        } else {
            (self.out_point(), self.in_point())
        }
    }

    fn walk<F>(&mut self, forward: bool, mut f: F) -> Result<()>
    where
        F: FnMut(usize),
    {
        if self.is_cursor_locked() {
            return Err(BufferError::CursorLocked);
        }
        let (start, end) = self.walk_ends(forward);
        let step = if forward { 1 } else { -1 };

        self.set_cursor(start);
        loop {
            let current = self.cursor();
            f(current);
            self.write_at_cursor();
            if current == end {
                break;
            }
            self.tick(step);
        }
        // one more step rolls over to where the walk began
        self.tick(step);
        Ok(())
    }
}
