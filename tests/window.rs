use replay_buffer::{is_in_window, DataBuffer, EventFilter, EventKind};

#[test]
fn both_ends_are_always_inside() {
    let capacity = 7;
    for in_point in 0..capacity {
        for out_point in 0..capacity {
            assert!(is_in_window(in_point, in_point, out_point));
            assert!(is_in_window(out_point, in_point, out_point));
        }
    }
}

#[test]
fn membership_count_matches_window_length() {
    let mut buffer = DataBuffer::new(7);
    buffer.set_in_out_full();
    for in_point in 0..7 {
        for out_point in 0..7 {
            buffer.set_in_out_full();
            buffer.set_in_point(in_point).unwrap();
            buffer.set_out_point(out_point).unwrap();
            let inside = (0..7).filter(|&i| buffer.is_in_window(i)).count();
            assert_eq!(inside, buffer.in_out_length(), "in {in_point} out {out_point}");
        }
    }
}

#[test]
fn interpretation_flips_at_equal_points() {
    // contiguous: only the single shared index
    let inside: Vec<usize> = (0..6).filter(|&i| is_in_window(i, 3, 3)).collect();
    assert_eq!(inside, vec![3]);

    // out just before in: the whole buffer
    assert!((0..6).all(|i| is_in_window(i, 3, 2)));

    // wrapped with a gap
    let inside: Vec<usize> = (0..6).filter(|&i| is_in_window(i, 4, 1)).collect();
    assert_eq!(inside, vec![0, 1, 4, 5]);
}

#[test]
fn cursor_based_setters_use_current_position() {
    let mut buffer = DataBuffer::new(8);
    buffer.set_in_out_full();
    let rx = buffer.events().subscribe(EventFilter::only(EventKind::WINDOW_CHANGED));

    buffer.set_cursor(5);
    buffer.set_out_point_at_cursor();
    buffer.set_cursor(2);
    buffer.set_in_point_at_cursor();
    assert_eq!((buffer.in_point(), buffer.out_point()), (2, 5));

    buffer.goto_out_point();
    assert!(buffer.at_out_point());
    buffer.goto_in_point();
    assert!(buffer.at_in_point());

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(events.len(), 2);
    assert_eq!((events[1].in_point, events[1].out_point), (2, 5));
}
