//! The buffer controller: one cursor, one in/out window and one key point
//! set shared by every recorded variable.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};

use crate::config::BufferConfig;
use crate::data::entry::{check_crop, check_cut, check_thin, BufferEntry};
use crate::data::is_in_window;
use crate::data::key_points::KeyPoints;
use crate::error::{BufferError, Result};
use crate::events::{
    BufferEvent, EditMeta, EditOp, EventController, EventKind, KeyPointsChange, ListenerId, Listeners,
};
use crate::variable::{ends_with_segments, short_name, VariableRef};

/// History buffer over a set of variables.
///
/// All entries share one length, `capacity`. The cursor is both the write
/// position while recording and the read position while scrubbing; the
/// in/out points delimit the active window (see [`is_in_window`]).
///
/// Mutating methods take `&mut self`: a single owner drives recording,
/// scrubbing and edits. Entries are handed out as `Arc<BufferEntry>` so other
/// threads can read values and bounds while recording continues.
pub struct DataBuffer {
    entries: Vec<Arc<BufferEntry>>,
    // lowercase short name -> entries in insertion order
    by_name: HashMap<String, Vec<Arc<BufferEntry>>>,
    capacity: usize,
    max_capacity: usize,
    wrap_on_full: bool,
    cursor: usize,
    in_point: usize,
    out_point: usize,
    cursor_locked: bool,
    time_variable_name: String,
    key_points: KeyPoints,
    cursor_listeners: Listeners<usize>,
    events: EventController,
}

impl std::fmt::Debug for DataBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataBuffer")
            .field("entries", &self.entries.len())
            .field("capacity", &self.capacity)
            .field("max_capacity", &self.max_capacity)
            .field("wrap_on_full", &self.wrap_on_full)
            .field("cursor", &self.cursor)
            .field("in_point", &self.in_point)
            .field("out_point", &self.out_point)
            .field("cursor_locked", &self.cursor_locked)
            .field("key_points", &self.key_points)
            .finish()
    }
}

impl DataBuffer {
    /// Buffer of `capacity` samples (at least one) that grows up to the
    /// default maximum.
    pub fn new(capacity: usize) -> Self {
        Self::build(&BufferConfig::with_capacity(capacity.max(1)))
    }

    pub fn with_config(config: &BufferConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &BufferConfig) -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            capacity: config.initial_capacity,
            max_capacity: config.max_capacity,
            wrap_on_full: config.wrap_on_full,
            cursor: 0,
            in_point: 0,
            out_point: 0,
            cursor_locked: false,
            time_variable_name: config.time_variable_name.clone(),
            key_points: KeyPoints::new(),
            cursor_listeners: Listeners::default(),
            events: EventController::new(),
        }
    }

    /// Current settings as a config document.
    pub fn config(&self) -> BufferConfig {
        BufferConfig {
            initial_capacity: self.capacity,
            max_capacity: self.max_capacity,
            wrap_on_full: self.wrap_on_full,
            time_variable_name: self.time_variable_name.clone(),
        }
    }

    // ── Entries ─────────────────────────────────────────────────────────

    /// Register an existing entry. Its array must already have `capacity`
    /// samples and its variable must not be registered yet.
    pub fn add_entry(&mut self, entry: BufferEntry) -> Result<Arc<BufferEntry>> {
        if entry.len() != self.capacity {
            return Err(BufferError::CapacityMismatch {
                expected: self.capacity,
                actual: entry.len(),
            });
        }
        let key = entry.name().to_lowercase();
        let duplicate = self
            .by_name
            .get(&key)
            .is_some_and(|list| list.iter().any(|e| e.full_name() == entry.full_name()));
        if duplicate {
            return Err(BufferError::DuplicateVariable {
                full_name: entry.full_name().to_string(),
            });
        }

        let entry = Arc::new(entry);
        self.entries.push(Arc::clone(&entry));
        self.by_name.entry(key).or_default().push(Arc::clone(&entry));
        Ok(entry)
    }

    /// Create a zero-filled entry for `variable`.
    pub fn add_variable(&mut self, variable: VariableRef) -> Result<Arc<BufferEntry>> {
        self.add_entry(BufferEntry::new(variable, self.capacity))
    }

    pub fn add_variables<I>(&mut self, variables: I) -> Result<()>
    where
        I: IntoIterator<Item = VariableRef>,
    {
        for variable in variables {
            self.add_variable(variable)?;
        }
        Ok(())
    }

    /// Drop the entry bound to `variable`.
    pub fn remove_entry(&mut self, variable: &VariableRef) -> Option<Arc<BufferEntry>> {
        let pos = self.entries.iter().position(|e| e.is_variable(variable))?;
        let entry = self.entries.remove(pos);
        let key = entry.name().to_lowercase();
        if let Some(list) = self.by_name.get_mut(&key) {
            list.retain(|e| !Arc::ptr_eq(e, &entry));
            if list.is_empty() {
                self.by_name.remove(&key);
            }
        }
        Some(entry)
    }

    pub fn remove_all_entries(&mut self) {
        self.entries.clear();
        self.by_name.clear();
    }

    pub fn entries(&self) -> &[Arc<BufferEntry>] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn variables(&self) -> Vec<VariableRef> {
        self.entries.iter().map(|e| Arc::clone(e.variable())).collect()
    }

    /// Entry bound to this exact variable handle.
    pub fn entry_for(&self, variable: &VariableRef) -> Option<Arc<BufferEntry>> {
        self.entries.iter().find(|e| e.is_variable(variable)).cloned()
    }

    /// Every entry whose full name ends with `name` on a `.` boundary,
    /// ignoring case, in insertion order.
    pub fn find_entries(&self, name: &str) -> Vec<Arc<BufferEntry>> {
        let key = short_name(name).to_lowercase();
        self.by_name
            .get(&key)
            .map(|list| {
                list.iter()
                    .filter(|e| ends_with_segments(e.full_name(), name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// "The" entry for `name`; with several matches the first registered
    /// one wins.
    pub fn find_entry(&self, name: &str) -> Option<Arc<BufferEntry>> {
        let mut matches = self.find_entries(name);
        if matches.len() > 1 {
            warn!(
                "{} entries match {:?}, using {}",
                matches.len(),
                name,
                matches[0].full_name()
            );
        }
        if matches.is_empty() {
            None
        } else {
            Some(matches.swap_remove(0))
        }
    }

    pub fn has_unique_entry(&self, name: &str) -> bool {
        self.find_entries(name).len() == 1
    }

    /// Entries named exactly `name` whose namespace ends with
    /// `namespace_ending`.
    pub fn find_entries_in(&self, namespace_ending: &str, name: &str) -> Result<Vec<Arc<BufferEntry>>> {
        if name.contains('.') {
            return Err(BufferError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(self
            .by_name
            .get(&name.to_lowercase())
            .map(|list| {
                list.iter()
                    .filter(|e| ends_with_segments(e.variable().namespace(), namespace_ending))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Unique entry named `name` under `namespace_ending`. More than one
    /// match is an error rather than a guess.
    pub fn find_entry_in(&self, namespace_ending: &str, name: &str) -> Result<Option<Arc<BufferEntry>>> {
        let mut matches = self.find_entries_in(namespace_ending, name)?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => Err(BufferError::AmbiguousName {
                name: format!("{namespace_ending}.{name}"),
                matches: n,
            }),
        }
    }

    /// Variables whose short name starts with `prefix`.
    pub fn variables_starting_with(&self, prefix: &str, case_sensitive: bool) -> Vec<VariableRef> {
        self.variables_where(|name| {
            if case_sensitive {
                name.starts_with(prefix)
            } else {
                name.to_lowercase().starts_with(&prefix.to_lowercase())
            }
        })
    }

    /// Variables whose short name contains `needle`.
    pub fn variables_containing(&self, needle: &str, case_sensitive: bool) -> Vec<VariableRef> {
        self.variables_where(|name| {
            if case_sensitive {
                name.contains(needle)
            } else {
                name.to_lowercase().contains(&needle.to_lowercase())
            }
        })
    }

    fn variables_where<F>(&self, mut pred: F) -> Vec<VariableRef>
    where
        F: FnMut(&str) -> bool,
    {
        self.entries
            .iter()
            .filter(|e| pred(e.name()))
            .map(|e| Arc::clone(e.variable()))
            .collect()
    }

    // ── Settings and state ──────────────────────────────────────────────

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Lowering the maximum below the current capacity stops further
    /// growth; it never shrinks the buffer.
    pub fn set_max_capacity(&mut self, max_capacity: usize) {
        self.max_capacity = max_capacity;
    }

    pub fn wrap_on_full(&self) -> bool {
        self.wrap_on_full
    }

    pub fn set_wrap_on_full(&mut self, wrap: bool) {
        self.wrap_on_full = wrap;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn in_point(&self) -> usize {
        self.in_point
    }

    pub fn out_point(&self) -> usize {
        self.out_point
    }

    pub fn is_in_window(&self, index: usize) -> bool {
        is_in_window(index, self.in_point, self.out_point)
    }

    /// Number of samples in the active window.
    pub fn in_out_length(&self) -> usize {
        if self.in_point <= self.out_point {
            self.out_point - self.in_point + 1
        } else {
            self.capacity - self.in_point + self.out_point + 1
        }
    }

    /// While locked, scrubbing calls are ignored. Recording still advances.
    pub fn lock_cursor(&mut self, locked: bool) {
        self.cursor_locked = locked;
    }

    pub fn is_cursor_locked(&self) -> bool {
        self.cursor_locked
    }

    pub fn events(&self) -> &EventController {
        &self.events
    }

    pub fn add_cursor_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&usize) + Send + 'static,
    {
        self.cursor_listeners.add(listener)
    }

    pub fn remove_cursor_listener(&mut self, id: ListenerId) -> bool {
        self.cursor_listeners.remove(id)
    }

    // ── Recording ───────────────────────────────────────────────────────

    /// Pull every variable into `data[cursor]` without moving.
    pub fn write_at_cursor(&self) {
        for entry in &self.entries {
            entry.set_from_variable(self.cursor);
        }
    }

    /// Record one simulation step.
    ///
    /// Advances the cursor (growing or wrapping at the end), makes it the
    /// out-point, evicts the oldest sample from the window when the write
    /// catches up with the in-point, drops any key point at the new index
    /// and finally pulls every variable into that slot. Call
    /// [`write_at_cursor`](Self::write_at_cursor) once beforehand to capture
    /// the initial state at index 0.
    pub fn record_step(&mut self) {
        let mut kinds = EventKind::RECORDED | EventKind::CURSOR_MOVED;
        let mut edit = None;

        let mut next = self.cursor + 1;
        if next >= self.capacity {
            if self.wrap_on_full || self.capacity >= self.max_capacity {
                next = 0;
                kinds |= EventKind::WRAPPED;
                debug!("buffer full at {} samples, wrapping", self.capacity);
            } else {
                let old = self.capacity;
                let grown = (old * 3 / 2).min(self.max_capacity).max(old + 1);
                self.enlarge_entries(grown);
                kinds |= EventKind::GREW;
                edit = Some(EditMeta {
                    op: EditOp::Grow,
                    old_capacity: old,
                    new_capacity: grown,
                });
                debug!("buffer grew from {} to {} samples", old, grown);
            }
        }

        self.cursor = next;
        self.out_point = next;
        if self.out_point == self.in_point {
            self.in_point = (self.in_point + 1) % self.capacity;
        }
        if self.key_points.remove(next) {
            self.publish_key_points(KeyPointsChange {
                enabled: self.key_points.is_enabled(),
                removed: vec![next],
                ..KeyPointsChange::default()
            });
        }

        self.write_at_cursor();

        let cursor = self.cursor;
        self.cursor_listeners.notify(&cursor);
        let mut event = self.event(kinds);
        event.edit = edit;
        self.events.emit(event);
    }

    // ── Scrubbing ───────────────────────────────────────────────────────

    /// Move the cursor to `index` and push the stored values into the
    /// variables. An index past the end wraps to 0. Returns `false` without
    /// doing anything while the cursor is locked.
    pub fn set_cursor(&mut self, index: usize) -> bool {
        if self.cursor_locked {
            return false;
        }
        let index = if index >= self.capacity { 0 } else { index };
        self.move_cursor(index);
        true
    }

    /// Step `n` samples (negative steps backward).
    ///
    /// Leaving the active window clamps to the in-point going forward and
    /// to the out-point going backward; the return value reports that
    /// roll-over. A wrapped window is followed across the end of the array.
    pub fn tick(&mut self, n: isize) -> bool {
        if self.cursor_locked {
            return false;
        }
        let capacity = self.capacity as isize;
        let candidate = self.cursor as isize + n;
        let landed = if (0..capacity).contains(&candidate) {
            Some(candidate as usize)
        } else if self.in_point > self.out_point {
            Some(candidate.rem_euclid(capacity) as usize)
        } else {
            None
        };

        let (target, rolled_over) = match landed {
            Some(index) if self.is_in_window(index) => (index, false),
            _ if n >= 0 => (self.in_point, true),
            _ => (self.out_point, true),
        };
        self.move_cursor(target);
        rolled_over
    }

    /// Store the variables at the cursor, then step forward and load.
    pub fn update_and_tick(&mut self) -> bool {
        self.write_at_cursor();
        self.tick(1)
    }

    pub fn update_and_tick_backwards(&mut self) -> bool {
        self.write_at_cursor();
        self.tick(-1)
    }

    pub fn goto_in_point(&mut self) -> bool {
        self.set_cursor(self.in_point)
    }

    pub fn goto_out_point(&mut self) -> bool {
        self.set_cursor(self.out_point)
    }

    pub fn at_in_point(&self) -> bool {
        self.cursor == self.in_point
    }

    pub fn at_out_point(&self) -> bool {
        self.cursor == self.out_point
    }

    fn move_cursor(&mut self, index: usize) {
        self.cursor = index;
        for entry in &self.entries {
            entry.set_to_variable(index);
        }
        let cursor = self.cursor;
        self.cursor_listeners.notify(&cursor);
        self.events.emit(self.event(EventKind::CURSOR_MOVED));
    }

    // ── Window ──────────────────────────────────────────────────────────

    pub fn set_in_point(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.in_point = index;
        self.window_changed();
        Ok(())
    }

    pub fn set_out_point(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.out_point = index;
        self.window_changed();
        Ok(())
    }

    pub fn set_in_point_at_cursor(&mut self) {
        self.in_point = self.cursor;
        self.window_changed();
    }

    pub fn set_out_point_at_cursor(&mut self) {
        self.out_point = self.cursor;
        self.window_changed();
    }

    /// Make the whole array the active window.
    pub fn set_in_out_full(&mut self) {
        self.in_point = 0;
        self.out_point = self.capacity - 1;
        self.events.emit(self.event(EventKind::WINDOW_CHANGED));
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.capacity {
            return Err(BufferError::InvalidRange {
                start: index,
                end: index,
                len: self.capacity,
            });
        }
        Ok(())
    }

    fn window_changed(&mut self) {
        self.events.emit(self.event(EventKind::WINDOW_CHANGED));
        self.prune_key_points();
    }

    // ── Key points ──────────────────────────────────────────────────────

    pub fn key_points(&self) -> &[usize] {
        self.key_points.points()
    }

    pub fn key_points_enabled(&self) -> bool {
        self.key_points.is_enabled()
    }

    pub fn toggle_key_point_mode(&mut self) -> bool {
        let change = self.key_points.toggle_enabled();
        self.publish_key_points(change);
        self.key_points.is_enabled()
    }

    pub fn set_key_point_mode(&mut self, enabled: bool) {
        if let Some(change) = self.key_points.set_enabled(enabled) {
            self.publish_key_points(change);
        }
    }

    /// Mark or unmark the cursor position.
    pub fn toggle_key_point(&mut self) -> KeyPointsChange {
        let change = self.key_points.toggle(self.cursor);
        self.publish_key_points(change.clone());
        change
    }

    pub fn add_key_point(&mut self) -> bool {
        let index = self.cursor;
        let added = self.key_points.add(index);
        if added {
            self.publish_key_points(KeyPointsChange {
                enabled: self.key_points.is_enabled(),
                added: vec![index],
                ..KeyPointsChange::default()
            });
        }
        added
    }

    pub fn remove_key_point(&mut self) -> bool {
        let index = self.cursor;
        let removed = self.key_points.remove(index);
        if removed {
            self.publish_key_points(KeyPointsChange {
                enabled: self.key_points.is_enabled(),
                removed: vec![index],
                ..KeyPointsChange::default()
            });
        }
        removed
    }

    /// Nearest key point after the cursor (wrapping), or the cursor itself.
    pub fn next_key_point(&self) -> usize {
        self.key_points.next_after(self.cursor)
    }

    pub fn previous_key_point(&self) -> usize {
        self.key_points.previous_before(self.cursor)
    }

    pub fn goto_next_key_point(&mut self) -> bool {
        self.set_cursor(self.next_key_point())
    }

    pub fn goto_previous_key_point(&mut self) -> bool {
        self.set_cursor(self.previous_key_point())
    }

    pub fn add_key_point_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&KeyPointsChange) + Send + 'static,
    {
        self.key_points.add_listener(listener)
    }

    pub fn remove_key_point_listener(&mut self, id: ListenerId) -> bool {
        self.key_points.remove_listener(id)
    }

    fn prune_key_points(&mut self) {
        let removed = self.key_points.prune_to_window(self.in_point, self.out_point);
        if !removed.is_empty() {
            self.publish_key_points(KeyPointsChange {
                enabled: self.key_points.is_enabled(),
                removed,
                ..KeyPointsChange::default()
            });
        }
    }

    fn reindex_key_points<F>(&mut self, map: F)
    where
        F: FnMut(usize) -> Option<usize>,
    {
        let change = self.key_points.remap(map);
        self.publish_key_points(change);
        self.prune_key_points();
    }

    fn publish_key_points(&self, change: KeyPointsChange) {
        let kinds = change.kinds();
        if kinds.is_empty() {
            return;
        }
        let mut event = self.event(kinds);
        event.key_points = Some(change);
        self.events.emit(event);
    }

    // ── Destructive edits ───────────────────────────────────────────────

    /// Rotate every entry so `start` becomes index 0. `pack(0)` is a no-op.
    pub fn pack(&mut self, start: usize) -> Result<usize> {
        let len = self.capacity;
        if start >= len {
            warn!("pack({}) rejected for buffer of {} samples", start, len);
            return Err(BufferError::InvalidRange {
                start,
                end: start,
                len,
            });
        }
        if start == 0 {
            return Ok(len);
        }

        for entry in &self.entries {
            entry.pack(start)?;
        }
        let shift = |i: usize| (i + len - start) % len;
        self.cursor = shift(self.cursor);
        self.out_point = shift(self.out_point);
        self.in_point = 0;
        self.reindex_key_points(|p| Some(shift(p)));
        self.finish_edit(EditOp::Pack { start }, len);
        Ok(len)
    }

    pub fn pack_to_in_point(&mut self) -> Result<usize> {
        self.pack(self.in_point)
    }

    /// Keep the circular slice `start..=end`. Returns the new capacity.
    pub fn crop(&mut self, start: usize, end: usize) -> Result<usize> {
        let old = self.capacity;
        let new_len = check_crop(start, end, old).inspect_err(|e| warn!("crop rejected: {e}"))?;

        for entry in &self.entries {
            entry.crop(start, end)?;
        }
        self.capacity = new_len;

        let shift = |i: usize| (i + old - start) % old;
        let cursor = shift(self.cursor);
        self.cursor = if cursor < new_len { cursor } else { 0 };
        self.in_point = 0;
        self.out_point = new_len - 1;
        self.reindex_key_points(|p| Some(shift(p)).filter(|&q| q < new_len));
        self.finish_edit(EditOp::Crop { start, end }, old);
        Ok(new_len)
    }

    /// Crop to the active window; a single-sample window keeps the sample
    /// after it as well.
    pub fn crop_to_window(&mut self) -> Result<usize> {
        if self.in_point != self.out_point {
            self.crop(self.in_point, self.out_point)
        } else {
            self.crop(self.in_point, self.in_point + 1)
        }
    }

    /// Remove `start..=end` and close the gap. The window ends just before
    /// the removed slice and the cursor moves to the out-point.
    pub fn cut(&mut self, start: usize, end: usize) -> Result<usize> {
        let old = self.capacity;
        let new_len = check_cut(start, end, old).inspect_err(|e| warn!("cut rejected: {e}"))?;

        for entry in &self.entries {
            entry.cut(start, end)?;
        }
        self.capacity = new_len;

        let removed = end - start + 1;
        self.in_point = 0;
        self.out_point = if start == 0 { new_len - 1 } else { start - 1 };
        self.cursor = self.out_point;
        self.reindex_key_points(|p| {
            if p < start {
                Some(p)
            } else if p > end {
                Some(p - removed)
            } else {
                None
            }
        });
        self.finish_edit(EditOp::Cut { start, end }, old);
        Ok(new_len)
    }

    /// Cut the active window. Only a non-wrapped window can be cut.
    pub fn cut_window(&mut self) -> Result<usize> {
        if self.in_point > self.out_point {
            warn!(
                "cannot cut wrapped window [{}, {}]",
                self.in_point, self.out_point
            );
            return Err(BufferError::InvalidRange {
                start: self.in_point,
                end: self.out_point,
                len: self.capacity,
            });
        }
        self.cut(self.in_point, self.out_point)
    }

    /// Keep every `stride`-th sample of the history that starts at the
    /// in-point.
    ///
    /// The buffer is packed to the in-point first. A buffer of at most two
    /// strides, including one shorter than the stride, is left at that
    /// point without thinning. Only a zero stride is an error.
    pub fn thin(&mut self, stride: usize) -> Result<usize> {
        check_thin(stride, self.capacity).inspect_err(|e| warn!("thin rejected: {e}"))?;
        self.pack_to_in_point()?;

        let old = self.capacity;
        if old <= 2 * stride {
            return Ok(old);
        }

        let new_len = check_thin(stride, old)?;
        for entry in &self.entries {
            entry.thin(stride)?;
        }
        self.capacity = new_len;
        self.in_point = 0;
        self.out_point = new_len - 1;
        self.cursor = 0;
        self.reindex_key_points(|p| (p % stride == 0).then_some(p / stride).filter(|&q| q < new_len));
        self.finish_edit(EditOp::Thin { stride }, old);
        Ok(new_len)
    }

    /// Change the capacity.
    ///
    /// Shrinking crops `new_capacity` samples starting at the in-point.
    /// Growing packs to the in-point and replicates the last sample into
    /// the new tail.
    pub fn resize(&mut self, new_capacity: usize) -> Result<usize> {
        let old = self.capacity;
        if new_capacity == 0 {
            warn!("resize to zero samples rejected");
            return Err(BufferError::InvalidRange {
                start: 0,
                end: 0,
                len: old,
            });
        }
        if new_capacity < old {
            let end = (self.in_point + new_capacity - 1) % old;
            self.crop(self.in_point, end)?;
        } else if new_capacity > old {
            self.pack_to_in_point()?;
            self.enlarge_entries(new_capacity);
            self.finish_edit(
                EditOp::Resize {
                    capacity: new_capacity,
                },
                old,
            );
        }
        Ok(self.capacity)
    }

    /// Splice `samples` back into every entry before `index`.
    ///
    /// `samples` is keyed by the entry's position in [`entries`](Self::entries)
    /// and every slice must have the same length. The window becomes the
    /// whole buffer.
    pub fn insert_slices(&mut self, index: usize, samples: &[Vec<f64>]) -> Result<usize> {
        let old = self.capacity;
        let width = samples.first().map_or(0, Vec::len);
        if samples.len() != self.entries.len() || samples.iter().any(|s| s.len() != width) || index > old {
            return Err(BufferError::InvalidRange {
                start: index,
                end: index + width,
                len: old,
            });
        }
        if width == 0 {
            return Ok(old);
        }

        for (entry, slice) in self.entries.iter().zip(samples) {
            entry.insert_slice(index, slice);
        }
        self.capacity = old + width;
        if self.cursor >= index {
            self.cursor += width;
        }
        self.in_point = 0;
        self.out_point = self.capacity - 1;
        self.reindex_key_points(|p| Some(if p >= index { p + width } else { p }));
        self.finish_edit(
            EditOp::Resize {
                capacity: self.capacity,
            },
            old,
        );
        Ok(self.capacity)
    }

    /// Fill every entry with its variable's current value.
    pub fn copy_values_through(&self) {
        for entry in &self.entries {
            entry.copy_value_through();
        }
    }

    /// Reallocate every entry as `capacity` zeros and reset cursor, window
    /// and key points.
    pub fn clear(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(BufferError::InvalidRange {
                start: 0,
                end: 0,
                len: 0,
            });
        }
        let old = self.capacity;
        for entry in &self.entries {
            entry.clear(capacity);
        }
        self.capacity = capacity;
        self.cursor = 0;
        self.in_point = 0;
        self.out_point = 0;
        self.key_points.clear();
        debug!("buffer cleared ({} -> {} samples)", old, capacity);

        let cursor = self.cursor;
        self.cursor_listeners.notify(&cursor);
        let mut event = self.event(EventKind::DATA_CLEARED | EventKind::CURSOR_MOVED);
        event.edit = Some(EditMeta {
            op: EditOp::Clear,
            old_capacity: old,
            new_capacity: capacity,
        });
        self.events.emit(event);
        Ok(())
    }

    /// Clear at the current capacity and seed index 0 with the current
    /// variable values.
    pub fn reset(&mut self) {
        let capacity = self.capacity;
        if self.clear(capacity).is_ok() {
            self.write_at_cursor();
        }
    }

    fn enlarge_entries(&mut self, new_capacity: usize) {
        for entry in &self.entries {
            entry.enlarge(new_capacity);
        }
        self.capacity = new_capacity;
    }

    /// Bring the cursor back into the window, reload the variables and
    /// announce the edit. Runs even while the cursor is locked: the old
    /// position no longer refers to the same sample.
    fn finish_edit(&mut self, op: EditOp, old_capacity: usize) {
        if self.cursor >= self.capacity || !self.is_in_window(self.cursor) {
            self.cursor = self.in_point;
        }
        for entry in &self.entries {
            entry.set_to_variable(self.cursor);
        }
        debug!(
            "{:?}: {} -> {} samples, window [{}, {}], cursor {}",
            op, old_capacity, self.capacity, self.in_point, self.out_point, self.cursor
        );

        let cursor = self.cursor;
        self.cursor_listeners.notify(&cursor);
        let mut kinds = EventKind::DATA_EDITED | EventKind::CURSOR_MOVED;
        if self.capacity > old_capacity {
            kinds |= EventKind::GREW;
        }
        let mut event = self.event(kinds);
        event.edit = Some(EditMeta {
            op,
            old_capacity,
            new_capacity: self.capacity,
        });
        self.events.emit(event);
    }

    // ── Analysis ────────────────────────────────────────────────────────

    pub fn average_of(&self, variable: &VariableRef) -> Option<f64> {
        self.entry_for(variable).map(|e| e.average())
    }

    pub fn time_variable_name(&self) -> &str {
        &self.time_variable_name
    }

    /// Only a name that resolves to an entry is accepted.
    pub fn set_time_variable_name(&mut self, name: &str) -> Result<()> {
        if self.find_entry(name).is_none() {
            warn!("no entry named {:?}, time variable unchanged", name);
            return Err(BufferError::UnknownVariable {
                name: name.to_string(),
            });
        }
        self.time_variable_name = name.to_string();
        Ok(())
    }

    /// Full sample array of the time variable.
    pub fn time_data(&self) -> Option<Vec<f64>> {
        self.find_entry(&self.time_variable_name).map(|e| e.data())
    }

    /// Whether `other` holds the same variables with data within `epsilon`
    /// over the active window.
    ///
    /// Both windows must have the same length. Each side is read from its
    /// own in-point through its out-point inclusive, following the wrap.
    pub fn data_equals(&self, other: &DataBuffer, epsilon: f64) -> bool {
        let length = self.in_out_length();
        if length != other.in_out_length() {
            debug!("window lengths differ: {} vs {}", length, other.in_out_length());
            return false;
        }
        if self.entries.len() != other.entries.len() {
            debug!(
                "entry counts differ: {} vs {}",
                self.entries.len(),
                other.entries.len()
            );
            return false;
        }
        other.entries.iter().all(|theirs| match self.find_entry(theirs.full_name()) {
            Some(ours) => {
                let equal = ours.data_equals(theirs, self.in_point, other.in_point, length, epsilon);
                if !equal {
                    debug!("data differs for {}", theirs.full_name());
                }
                equal
            }
            None => {
                debug!("no entry for {}", theirs.full_name());
                false
            }
        })
    }

    fn event(&self, kinds: EventKind) -> BufferEvent {
        let mut event = BufferEvent::new(kinds);
        event.cursor = self.cursor;
        event.in_point = self.in_point;
        event.out_point = self.out_point;
        event.capacity = self.capacity;
        event
    }
}
