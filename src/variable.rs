//! The variable capability the buffer records from and replays into.
//!
//! A buffer never knows what kind of value it is looking at (boolean,
//! integer, enum or double). It only needs to read the current value as an
//! `f64` when recording and write an `f64` back when scrubbing. Variables are
//! owned elsewhere and shared with the buffer as `Arc<dyn Variable>`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use downcast_rs::{impl_downcast, DowncastSync};

/// Read/write-as-double handle to an externally owned variable.
///
/// Implementations must use interior mutability: the simulation thread
/// writes through a shared reference while the buffer holds another.
pub trait Variable: DowncastSync {
    /// Dotted, fully qualified name such as `root.arm.elbow.q`.
    fn full_name(&self) -> &str;

    fn value_as_f64(&self) -> f64;

    fn set_from_f64(&self, value: f64);

    /// Last segment of the full name.
    fn name(&self) -> &str {
        short_name(self.full_name())
    }

    /// Everything before the last `.`, empty for a top-level variable.
    fn namespace(&self) -> &str {
        namespace_of(self.full_name())
    }
}
impl_downcast!(sync Variable);

pub type VariableRef = Arc<dyn Variable>;

/// Identity comparison of two variable handles (same allocation).
pub fn same_variable(a: &VariableRef, b: &VariableRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

pub fn short_name(full_name: &str) -> &str {
    match full_name.rfind('.') {
        Some(pos) => &full_name[pos + 1..],
        None => full_name,
    }
}

pub fn namespace_of(full_name: &str) -> &str {
    match full_name.rfind('.') {
        Some(pos) => &full_name[..pos],
        None => "",
    }
}

/// `true` when `full_name` ends with the dotted `query` on a segment
/// boundary, ignoring case. `"a.b.c"` matches `"c"`, `"b.c"` and `"A.B.C"`
/// but not `"bc"`.
pub fn ends_with_segments(full_name: &str, query: &str) -> bool {
    let full = full_name.to_lowercase();
    let query = query.to_lowercase();
    if full == query {
        return true;
    }
    full.len() > query.len()
        && full.ends_with(&query)
        && full.as_bytes()[full.len() - query.len() - 1] == b'.'
}

/// Minimal `f64` variable stored as atomic bits.
///
/// Enough to drive a buffer in tests and tools; richer variable kinds only
/// need to implement [`Variable`].
#[derive(Debug)]
pub struct ScalarVariable {
    full_name: String,
    bits: AtomicU64,
}

impl ScalarVariable {
    pub fn new<S: Into<String>>(full_name: S, initial: f64) -> Self {
        Self {
            full_name: full_name.into(),
            bits: AtomicU64::new(initial.to_bits()),
        }
    }

    /// Convenience constructor returning the shared handle a buffer expects.
    pub fn shared<S: Into<String>>(full_name: S, initial: f64) -> Arc<Self> {
        Arc::new(Self::new(full_name, initial))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }
}

impl Variable for ScalarVariable {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn value_as_f64(&self) -> f64 {
        self.get()
    }

    fn set_from_f64(&self, value: f64) {
        self.set(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_helpers_split_on_last_dot() {
        assert_eq!(short_name("root.arm.q"), "q");
        assert_eq!(namespace_of("root.arm.q"), "root.arm");
        assert_eq!(short_name("q"), "q");
        assert_eq!(namespace_of("q"), "");
    }

    #[test]
    fn segment_matching_is_case_insensitive_and_boundary_aware() {
        assert!(ends_with_segments("root.Arm.q", "arm.Q"));
        assert!(ends_with_segments("root.arm.q", "q"));
        assert!(ends_with_segments("root.arm.q", "ROOT.ARM.Q"));
        assert!(!ends_with_segments("root.arm.xq", "q"));
        assert!(!ends_with_segments("q", "arm.q"));
    }

    #[test]
    fn scalar_variable_reads_back_what_was_written() {
        let v = ScalarVariable::new("root.x", 1.5);
        assert_eq!(v.value_as_f64(), 1.5);
        v.set_from_f64(-3.25);
        assert_eq!(v.get(), -3.25);
        assert_eq!(v.name(), "x");
        assert_eq!(v.namespace(), "root");
    }

    #[test]
    fn downcast_recovers_concrete_type() {
        let v: VariableRef = ScalarVariable::shared("a.b", 2.0);
        let concrete = v.downcast_ref::<ScalarVariable>().unwrap();
        assert_eq!(concrete.get(), 2.0);
    }

    #[test]
    fn identity_is_by_allocation() {
        let a: VariableRef = ScalarVariable::shared("a", 0.0);
        let b: VariableRef = ScalarVariable::shared("a", 0.0);
        let a2 = Arc::clone(&a);
        assert!(same_variable(&a, &a2));
        assert!(!same_variable(&a, &b));
    }
}
