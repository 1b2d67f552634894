//! Change notification for buffers.
//!
//! Two mechanisms live here:
//!
//! - [`Listeners`]: an ordered list of synchronous callbacks. The buffer uses
//!   it for cursor and key-point listeners, which run in registration order
//!   before the triggering call returns. A panicking listener is not caught.
//! - [`EventController`]: channel-based subscribers that receive a
//!   [`BufferEvent`] whenever its [`EventKind`] flags intersect their
//!   [`EventFilter`]. Useful for a presentation thread that polls.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

// ─────────────────────────────────────────────────────────────────────────────
// EventKind – bitflags
// ─────────────────────────────────────────────────────────────────────────────

/// Bitflags describing the categories an event belongs to.
///
/// A recorded step that also wrapped the buffer carries both `RECORDED` and
/// `WRAPPED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKind(pub u32);

impl EventKind {
    /// The read/write cursor moved (scrub, tick or record).
    pub const CURSOR_MOVED: Self = Self(1 << 0);
    /// A simulation step was recorded.
    pub const RECORDED: Self = Self(1 << 1);
    /// Capacity grew, on overflow or through an edit such as `resize`.
    pub const GREW: Self = Self(1 << 2);
    /// The write cursor wrapped back to index 0.
    pub const WRAPPED: Self = Self(1 << 3);
    /// In-point or out-point changed explicitly.
    pub const WINDOW_CHANGED: Self = Self(1 << 4);
    pub const KEY_POINT_ADDED: Self = Self(1 << 5);
    pub const KEY_POINT_REMOVED: Self = Self(1 << 6);
    /// Key point mode was enabled or disabled.
    pub const KEY_POINTS_TOGGLED: Self = Self(1 << 7);
    /// A destructive edit (pack, crop, cut, thin, resize) completed.
    pub const DATA_EDITED: Self = Self(1 << 8);
    /// All entries were reallocated empty.
    pub const DATA_CLEARED: Self = Self(1 << 9);

    pub const ALL: Self = Self(u32::MAX);

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for EventKind {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for EventKind {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for EventKind {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "EMPTY");
        }
        if *self == EventKind::ALL {
            return write!(f, "ALL");
        }

        let pairs: &[(EventKind, &str)] = &[
            (EventKind::CURSOR_MOVED, "CURSOR_MOVED"),
            (EventKind::RECORDED, "RECORDED"),
            (EventKind::GREW, "GREW"),
            (EventKind::WRAPPED, "WRAPPED"),
            (EventKind::WINDOW_CHANGED, "WINDOW_CHANGED"),
            (EventKind::KEY_POINT_ADDED, "KEY_POINT_ADDED"),
            (EventKind::KEY_POINT_REMOVED, "KEY_POINT_REMOVED"),
            (EventKind::KEY_POINTS_TOGGLED, "KEY_POINTS_TOGGLED"),
            (EventKind::DATA_EDITED, "DATA_EDITED"),
            (EventKind::DATA_CLEARED, "DATA_CLEARED"),
        ];

        let mut names = Vec::new();
        let mut known_bits: u32 = 0;
        for (kind, name) in pairs {
            known_bits |= kind.0;
            if self.contains(*kind) {
                names.push((*name).to_string());
            }
        }

        let extra = self.0 & !known_bits;
        if extra != 0 {
            names.push(format!("0x{:x}", extra));
        }
        write!(f, "{}", names.join("|"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metadata
// ─────────────────────────────────────────────────────────────────────────────

/// Which destructive edit produced a `DATA_EDITED` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Pack { start: usize },
    Crop { start: usize, end: usize },
    Cut { start: usize, end: usize },
    Thin { stride: usize },
    Resize { capacity: usize },
    Grow,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditMeta {
    pub op: EditOp,
    pub old_capacity: usize,
    pub new_capacity: usize,
}

/// Payload of a key point notification.
///
/// `was_toggled` is set when key point mode was switched; `added` and
/// `removed` are ascending and empty for a pure toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPointsChange {
    pub was_toggled: bool,
    pub enabled: bool,
    pub added: Vec<usize>,
    pub removed: Vec<usize>,
}

impl KeyPointsChange {
    pub fn kinds(&self) -> EventKind {
        let mut kinds = EventKind(0);
        if self.was_toggled {
            kinds |= EventKind::KEY_POINTS_TOGGLED;
        }
        if !self.added.is_empty() {
            kinds |= EventKind::KEY_POINT_ADDED;
        }
        if !self.removed.is_empty() {
            kinds |= EventKind::KEY_POINT_REMOVED;
        }
        kinds
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BufferEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot of buffer state delivered to channel subscribers.
#[derive(Debug, Clone)]
pub struct BufferEvent {
    pub kinds: EventKind,
    /// Seconds since the controller was created, set on emit.
    pub timestamp: f64,
    pub cursor: usize,
    pub in_point: usize,
    pub out_point: usize,
    pub capacity: usize,
    pub edit: Option<EditMeta>,
    pub key_points: Option<KeyPointsChange>,
}

impl BufferEvent {
    pub fn new(kinds: EventKind) -> Self {
        Self {
            kinds,
            timestamp: 0.0,
            cursor: 0,
            in_point: 0,
            out_point: 0,
            capacity: 0,
            edit: None,
            key_points: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventFilter
// ─────────────────────────────────────────────────────────────────────────────

/// OR-mask over event kinds: an event passes when its kinds intersect the mask.
#[derive(Debug, Clone, Copy)]
pub struct EventFilter {
    pub mask: EventKind,
}

impl EventFilter {
    pub const fn all() -> Self {
        Self {
            mask: EventKind::ALL,
        }
    }

    pub const fn only(mask: EventKind) -> Self {
        Self { mask }
    }

    #[inline]
    pub fn matches(&self, event: &BufferEvent) -> bool {
        event.kinds.intersects(self.mask)
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventController
// ─────────────────────────────────────────────────────────────────────────────

struct Subscriber {
    filter: EventFilter,
    sender: Sender<BufferEvent>,
}

/// Distributes [`BufferEvent`]s to channel subscribers.
///
/// Cloning shares the subscriber list, so a UI can keep a handle and
/// subscribe after the buffer has been built.
#[derive(Clone)]
pub struct EventController {
    inner: Arc<Mutex<EventCtrlInner>>,
}

struct EventCtrlInner {
    subscribers: Vec<Subscriber>,
    start_instant: Instant,
}

impl EventController {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EventCtrlInner {
                subscribers: Vec::new(),
                start_instant: Instant::now(),
            })),
        }
    }

    pub fn subscribe(&self, filter: EventFilter) -> Receiver<BufferEvent> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.inner.lock().subscribers.push(Subscriber { filter, sender: tx });
        rx
    }

    pub fn subscribe_all(&self) -> Receiver<BufferEvent> {
        self.subscribe(EventFilter::all())
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Send `event` to every matching subscriber. Subscribers whose
    /// receiver was dropped are removed when an event reaches them.
    pub fn emit(&self, mut event: BufferEvent) {
        let mut inner = self.inner.lock();
        if inner.subscribers.is_empty() {
            return;
        }
        event.timestamp = inner.start_instant.elapsed().as_secs_f64();
        inner.subscribers.retain(|sub| {
            if sub.filter.matches(&event) {
                sub.sender.send(event.clone()).is_ok()
            } else {
                true
            }
        });
    }
}

impl Default for EventController {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Listeners – synchronous callbacks
// ─────────────────────────────────────────────────────────────────────────────

/// Handle returned when attaching a listener, used to detach it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<E> = Box<dyn FnMut(&E) + Send>;

/// Ordered list of callbacks invoked synchronously in registration order.
pub struct Listeners<E> {
    next_id: u64,
    callbacks: Vec<(ListenerId, Callback<E>)>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            callbacks: Vec::new(),
        }
    }
}

impl<E> Listeners<E> {
    pub fn add<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&E) + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(other, _)| *other != id);
        self.callbacks.len() != before
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn notify(&mut self, event: &E) {
        for (_, callback) in self.callbacks.iter_mut() {
            callback(event);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────────────────────────
