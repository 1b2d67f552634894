//! Operator-marked cursor positions used for quick navigation.

use crate::data::is_in_window;
use crate::events::{KeyPointsChange, ListenerId, Listeners};

/// Ascending, duplicate-free set of marked buffer indices plus the
/// "key point mode" flag.
///
/// Every mutation that changes the set notifies listeners synchronously with
/// a [`KeyPointsChange`]. Point counts are small compared to the buffer, so
/// insertion uses a linear scan.
#[derive(Default)]
pub struct KeyPoints {
    enabled: bool,
    points: Vec<usize>,
    listeners: Listeners<KeyPointsChange>,
}

impl std::fmt::Debug for KeyPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPoints")
            .field("enabled", &self.enabled)
            .field("points", &self.points)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl KeyPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&KeyPointsChange) + Send + 'static,
    {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flip key point mode and notify.
    pub fn toggle_enabled(&mut self) -> KeyPointsChange {
        self.enabled = !self.enabled;
        let change = KeyPointsChange {
            was_toggled: true,
            enabled: self.enabled,
            added: Vec::new(),
            removed: Vec::new(),
        };
        self.listeners.notify(&change);
        change
    }

    /// Set key point mode; only notifies when the flag actually changes.
    pub fn set_enabled(&mut self, enabled: bool) -> Option<KeyPointsChange> {
        (enabled != self.enabled).then(|| self.toggle_enabled())
    }

    pub fn points(&self) -> &[usize] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.points.binary_search(&index).is_ok()
    }

    /// Remove `index` if present, insert it otherwise. Returns the change,
    /// whose `added` or `removed` list holds exactly `[index]`.
    pub fn toggle(&mut self, index: usize) -> KeyPointsChange {
        let change = match self.position(index) {
            Ok(pos) => {
                self.points.remove(pos);
                self.removed_change(vec![index])
            }
            Err(pos) => {
                self.points.insert(pos, index);
                self.added_change(vec![index])
            }
        };
        self.listeners.notify(&change);
        change
    }

    /// Insert `index`; returns `false` without notifying if already present.
    pub fn add(&mut self, index: usize) -> bool {
        match self.position(index) {
            Ok(_) => false,
            Err(pos) => {
                self.points.insert(pos, index);
                let change = self.added_change(vec![index]);
                self.listeners.notify(&change);
                true
            }
        }
    }

    /// Remove `index`; returns `false` without notifying if absent.
    pub fn remove(&mut self, index: usize) -> bool {
        match self.position(index) {
            Ok(pos) => {
                self.points.remove(pos);
                let change = self.removed_change(vec![index]);
                self.listeners.notify(&change);
                true
            }
            Err(_) => false,
        }
    }

    /// First point strictly after `index`, wrapping to the first point.
    /// Returns `index` itself when there are no points.
    pub fn next_after(&self, index: usize) -> usize {
        self.points
            .iter()
            .copied()
            .find(|&p| p > index)
            .or_else(|| self.points.first().copied())
            .unwrap_or(index)
    }

    /// Last point strictly before `index`, wrapping to the last point.
    /// Returns `index` itself when there are no points.
    pub fn previous_before(&self, index: usize) -> usize {
        self.points
            .iter()
            .rev()
            .copied()
            .find(|&p| p < index)
            .or_else(|| self.points.last().copied())
            .unwrap_or(index)
    }

    /// Drop every point outside the circular in/out window, reporting all of
    /// them in one notification. Nothing is emitted when nothing was pruned.
    pub fn prune_to_window(&mut self, in_point: usize, out_point: usize) -> Vec<usize> {
        let mut removed = Vec::new();
        self.points.retain(|&p| {
            let keep = is_in_window(p, in_point, out_point);
            if !keep {
                removed.push(p);
            }
            keep
        });
        if !removed.is_empty() {
            let change = self.removed_change(removed.clone());
            self.listeners.notify(&change);
        }
        removed
    }

    /// Re-index every point after the underlying arrays were rearranged.
    ///
    /// `map` returns the new index of a point, or `None` when its sample no
    /// longer exists. Points that moved or vanished are reported as removed,
    /// their new positions as added, in a single notification.
    pub fn remap<F>(&mut self, mut map: F) -> KeyPointsChange
    where
        F: FnMut(usize) -> Option<usize>,
    {
        let old = std::mem::take(&mut self.points);
        let mut new: Vec<usize> = old.iter().filter_map(|&p| map(p)).collect();
        new.sort_unstable();
        new.dedup();

        let removed: Vec<usize> = old
            .iter()
            .copied()
            .filter(|p| new.binary_search(p).is_err())
            .collect();
        let added: Vec<usize> = new
            .iter()
            .copied()
            .filter(|p| old.binary_search(p).is_err())
            .collect();
        self.points = new;

        let change = KeyPointsChange {
            was_toggled: false,
            enabled: self.enabled,
            added,
            removed,
        };
        if !change.added.is_empty() || !change.removed.is_empty() {
            self.listeners.notify(&change);
        }
        change
    }

    /// Remove every point in one notification.
    pub fn clear(&mut self) {
        if self.points.is_empty() {
            return;
        }
        let removed = std::mem::take(&mut self.points);
        let change = self.removed_change(removed);
        self.listeners.notify(&change);
    }

    fn position(&self, index: usize) -> Result<usize, usize> {
        for (pos, &p) in self.points.iter().enumerate() {
            if p == index {
                return Ok(pos);
            }
            if p > index {
                return Err(pos);
            }
        }
        Err(self.points.len())
    }

    fn added_change(&self, added: Vec<usize>) -> KeyPointsChange {
        KeyPointsChange {
            was_toggled: false,
            enabled: self.enabled,
            added,
            removed: Vec::new(),
        }
    }

    fn removed_change(&self, removed: Vec<usize>) -> KeyPointsChange {
        KeyPointsChange {
            was_toggled: false,
            enabled: self.enabled,
            added: Vec::new(),
            removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorded(points: &mut KeyPoints) -> Arc<Mutex<Vec<KeyPointsChange>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        points.add_listener(move |change| sink.lock().push(change.clone()));
        log
    }

    #[test]
    fn toggle_twice_round_trips() {
        let mut kp = KeyPoints::new();
        let log = recorded(&mut kp);

        kp.toggle(4);
        assert_eq!(kp.points(), &[4]);
        kp.toggle(4);
        assert!(kp.is_empty());

        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].added, vec![4]);
        assert!(log[0].removed.is_empty());
        assert_eq!(log[1].removed, vec![4]);
        assert!(log[1].added.is_empty());
    }

    #[test]
    fn toggle_appending_at_end_still_notifies() {
        let mut kp = KeyPoints::new();
        let log = recorded(&mut kp);
        kp.toggle(1);
        kp.toggle(9);
        assert_eq!(kp.points(), &[1, 9]);
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn points_stay_sorted_and_unique() {
        let mut kp = KeyPoints::new();
        for i in [5, 1, 9, 3, 5, 7] {
            kp.add(i);
        }
        assert_eq!(kp.points(), &[1, 3, 5, 7, 9]);
        assert!(!kp.add(3));
        assert!(kp.remove(3));
        assert!(!kp.remove(3));
        assert_eq!(kp.points(), &[1, 5, 7, 9]);
    }

    #[test]
    fn nearest_neighbours_wrap_around() {
        let mut kp = KeyPoints::new();
        assert_eq!(kp.next_after(6), 6);
        assert_eq!(kp.previous_before(6), 6);

        kp.add(2);
        kp.add(5);
        kp.add(8);
        assert_eq!(kp.next_after(5), 8);
        assert_eq!(kp.next_after(8), 2);
        assert_eq!(kp.previous_before(5), 2);
        assert_eq!(kp.previous_before(2), 8);
        assert_eq!(kp.previous_before(100), 8);
    }

    #[test]
    fn prune_contiguous_window_batches_removals() {
        let mut kp = KeyPoints::new();
        for i in [1, 3, 5, 7, 9] {
            kp.add(i);
        }
        let log = recorded(&mut kp);
        let removed = kp.prune_to_window(3, 7);
        assert_eq!(removed, vec![1, 9]);
        assert_eq!(kp.points(), &[3, 5, 7]);
        let log = log.lock();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].removed, vec![1, 9]);
    }

    #[test]
    fn prune_wrapped_window_keeps_both_ends() {
        let mut kp = KeyPoints::new();
        for i in [0, 2, 4, 6, 8] {
            kp.add(i);
        }
        // Window covers [0, 2] and [6, capacity).
        kp.prune_to_window(6, 2);
        assert_eq!(kp.points(), &[0, 2, 6, 8]);
    }

    #[test]
    fn prune_without_removals_is_silent() {
        let mut kp = KeyPoints::new();
        kp.add(4);
        let log = recorded(&mut kp);
        kp.prune_to_window(0, 9);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn remap_reports_moves_in_one_change() {
        let mut kp = KeyPoints::new();
        for i in [2, 4, 6] {
            kp.add(i);
        }
        let log = recorded(&mut kp);
        let change = kp.remap(|p| if p == 4 { None } else { Some(p / 2) });
        assert_eq!(kp.points(), &[1, 3]);
        assert_eq!(change.removed, vec![2, 4, 6]);
        assert_eq!(change.added, vec![1, 3]);
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn enable_toggles_notify() {
        let mut kp = KeyPoints::new();
        let log = recorded(&mut kp);
        assert!(kp.set_enabled(false).is_none());
        assert!(kp.set_enabled(true).is_some());
        assert!(kp.is_enabled());
        kp.toggle_enabled();
        assert!(!kp.is_enabled());
        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|c| c.was_toggled));
        assert!(log[0].enabled);
        assert!(!log[1].enabled);
    }
}
