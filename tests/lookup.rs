use std::sync::Arc;

use replay_buffer::{BufferConfig, BufferEntry, BufferError, DataBuffer, ScalarVariable, VariableRef};

fn robot() -> (DataBuffer, Vec<Arc<ScalarVariable>>) {
    let vars: Vec<_> = ["robot.arm.q", "robot.leg.q", "robot.t"]
        .iter()
        .map(|name| ScalarVariable::shared(*name, 0.0))
        .collect();
    let mut buffer = DataBuffer::new(8);
    buffer
        .add_variables(vars.iter().map(|v| v.clone() as VariableRef))
        .unwrap();
    (buffer, vars)
}

#[test]
fn short_name_lookup_prefers_first_registered() {
    let (buffer, _) = robot();
    assert_eq!(buffer.entry_count(), 3);
    assert_eq!(buffer.find_entries("q").len(), 2);
    assert_eq!(buffer.find_entry("q").unwrap().full_name(), "robot.arm.q");
    assert_eq!(buffer.find_entry("LEG.Q").unwrap().full_name(), "robot.leg.q");
    assert!(buffer.find_entry("eg.q").is_none());
    assert!(buffer.find_entry("x").is_none());

    assert!(!buffer.has_unique_entry("q"));
    assert!(buffer.has_unique_entry("leg.q"));
    assert!(buffer.has_unique_entry("T"));
}

#[test]
fn namespace_lookup_surfaces_ambiguity() {
    let (mut buffer, _) = robot();
    buffer
        .add_variable(ScalarVariable::shared("left.arm.q", 0.0))
        .unwrap();

    let arm = buffer.find_entries_in("arm", "q").unwrap();
    assert_eq!(arm.len(), 2);
    assert!(matches!(
        buffer.find_entry_in("arm", "q"),
        Err(BufferError::AmbiguousName { matches: 2, .. })
    ));

    let entry = buffer.find_entry_in("robot.arm", "q").unwrap().unwrap();
    assert_eq!(entry.full_name(), "robot.arm.q");
    assert!(buffer.find_entry_in("leg", "t").unwrap().is_none());
    assert!(matches!(
        buffer.find_entry_in("robot", "arm.q"),
        Err(BufferError::InvalidName { .. })
    ));
}

#[test]
fn entry_for_uses_handle_identity() {
    let (buffer, vars) = robot();
    let arm: VariableRef = vars[0].clone();
    let entry = buffer.entry_for(&arm).unwrap();
    assert!(entry.is_variable(&arm));

    let lookalike: VariableRef = ScalarVariable::shared("robot.arm.q", 0.0);
    assert!(buffer.entry_for(&lookalike).is_none());
}

#[test]
fn registration_rejects_duplicates_and_wrong_length() {
    let (mut buffer, _) = robot();
    let err = buffer
        .add_variable(ScalarVariable::shared("robot.arm.q", 1.0))
        .unwrap_err();
    assert!(matches!(err, BufferError::DuplicateVariable { .. }));

    let short = BufferEntry::new(ScalarVariable::shared("robot.hand.q", 0.0), 3);
    assert!(matches!(
        buffer.add_entry(short),
        Err(BufferError::CapacityMismatch { expected: 8, actual: 3 })
    ));
    assert_eq!(buffer.entry_count(), 3);
}

#[test]
fn removing_an_entry_updates_name_index() {
    let (mut buffer, vars) = robot();
    let arm: VariableRef = vars[0].clone();
    assert!(buffer.remove_entry(&arm).is_some());
    assert!(buffer.remove_entry(&arm).is_none());
    assert_eq!(buffer.find_entry("q").unwrap().full_name(), "robot.leg.q");
    assert!(buffer.has_unique_entry("q"));

    buffer.remove_all_entries();
    assert_eq!(buffer.entry_count(), 0);
    assert!(buffer.find_entry("t").is_none());
}

#[test]
fn variable_search_by_short_name() {
    let (buffer, _) = robot();
    assert_eq!(buffer.variables_starting_with("Q", false).len(), 2);
    assert!(buffer.variables_starting_with("Q", true).is_empty());
    let found = buffer.variables_containing("T", false);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].full_name(), "robot.t");
    assert_eq!(buffer.variables().len(), 3);
}

#[test]
fn time_variable_must_exist() {
    let (mut buffer, vars) = robot();
    assert_eq!(buffer.time_variable_name(), "t");
    assert!(matches!(
        buffer.set_time_variable_name("clock"),
        Err(BufferError::UnknownVariable { .. })
    ));
    assert_eq!(buffer.time_variable_name(), "t");

    vars[2].set(0.25);
    buffer.write_at_cursor();
    let time = buffer.time_data().unwrap();
    assert_eq!(time.len(), 8);
    assert_eq!(time[0], 0.25);

    buffer.set_time_variable_name("leg.q").unwrap();
    assert_eq!(buffer.time_data().unwrap(), vec![0.0; 8]);
}

#[test]
fn average_over_whole_array() {
    let (buffer, vars) = robot();
    let arm: VariableRef = vars[0].clone();
    let entry = buffer.entry_for(&arm).unwrap();
    for i in 0..8 {
        entry.set_data(i as f64, i);
    }
    assert_eq!(buffer.average_of(&arm), Some(3.5));
    let stranger: VariableRef = ScalarVariable::shared("x", 0.0);
    assert_eq!(buffer.average_of(&stranger), None);
}

#[test]
fn buffers_compare_over_active_window() {
    let (mut a, va) = robot();
    let (mut b, vb) = robot();
    for (buffer, vars) in [(&mut a, &va), (&mut b, &vb)] {
        buffer.write_at_cursor();
        for i in 1..6 {
            vars[0].set(i as f64);
            vars[2].set(i as f64 * 0.1);
            buffer.record_step();
        }
    }
    assert!(a.data_equals(&b, 1e-9));

    b.find_entry("arm.q").unwrap().set_data(2.5, 2);
    assert!(!a.data_equals(&b, 1e-9));
    assert!(a.data_equals(&b, 1.0));

    b.remove_all_entries();
    assert!(!a.data_equals(&b, 1.0));
}

/// Fixed-capacity wrapping buffer holding one variable recorded from `values`.
fn wrapping(capacity: usize, values: &[f64]) -> DataBuffer {
    let mut buffer = DataBuffer::with_config(&BufferConfig {
        initial_capacity: capacity,
        max_capacity: capacity,
        wrap_on_full: true,
        ..BufferConfig::default()
    })
    .unwrap();
    let var = ScalarVariable::shared("sim.x", 0.0);
    buffer.add_variable(var.clone()).unwrap();
    let (first, rest) = values.split_first().unwrap();
    var.set(*first);
    buffer.write_at_cursor();
    for v in rest {
        var.set(*v);
        buffer.record_step();
    }
    buffer
}

#[test]
fn wrapped_windows_compare_from_their_own_in_points() {
    let values: Vec<f64> = (1..=7).map(|i| i as f64).collect();
    let a = wrapping(5, &values);
    let b = wrapping(5, &values);
    assert_eq!((a.in_point(), a.out_point()), (2, 1));
    assert!(a.data_equals(&b, 0.0));

    // same history, stored unrotated
    let c = wrapping(5, &values[2..]);
    assert_eq!((c.in_point(), c.out_point()), (0, 4));
    assert!(a.data_equals(&c, 0.0));
    assert!(c.data_equals(&a, 0.0));
}

#[test]
fn comparison_includes_the_out_point() {
    let a = wrapping(8, &[1.0, 2.0, 3.0, 4.0]);
    let b = wrapping(8, &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(a.out_point(), 3);
    assert!(a.data_equals(&b, 1e-9));

    b.find_entry("x").unwrap().set_data(400.0, 3);
    assert!(!a.data_equals(&b, 1e-9));
}

#[test]
fn comparison_needs_equal_window_lengths() {
    let a = wrapping(8, &[1.0, 2.0, 3.0, 4.0]);
    let b = wrapping(8, &[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert!(!a.data_equals(&b, 10.0));
}

#[test]
fn identical_nan_samples_compare_equal() {
    let a = wrapping(4, &[1.0, f64::NAN, 3.0]);
    let b = wrapping(4, &[1.0, f64::NAN, 3.0]);
    assert!(a.data_equals(&b, 1e-9));
}
