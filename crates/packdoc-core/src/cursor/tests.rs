use super::*;
use crate::{
    error::{ErrorClass, InternalError},
    heap::{HeapValue, ValueRef},
    value::canonical_cmp_ref,
};

// ---- helpers -----------------------------------------------------------

fn sub(address: &str, ints: &[i64]) -> SubCursor {
    let mut sub_cursor = SubCursor::new(ProducerAddress::from(address));
    for &n in ints {
        sub_cursor.append(HeapValue::create_int(n));
    }
    sub_cursor
}

fn int(value: Option<&OwnedValue>) -> Option<i64> {
    value.and_then(ValueRef::as_value).and_then(|v| v.as_int())
}

fn drain(cursor: &mut Cursor) -> Vec<i64> {
    let mut out = Vec::new();
    while cursor.has_next() {
        out.extend(int(cursor.next()));
    }
    out
}

fn merged() -> Cursor {
    let mut cursor = Cursor::new();
    cursor.push(sub("a", &[1, 2])).unwrap();
    cursor.push(sub("b", &[3])).unwrap();
    cursor.push(sub("c", &[4, 5])).unwrap();
    cursor
}

// ---- unsorted ----------------------------------------------------------

#[test]
fn unsorted_iteration_concatenates_in_push_order() {
    let mut cursor = merged();

    assert_eq!(cursor.size(), 5);
    assert_eq!(int(cursor.get(3).ok()), Some(4));
    assert_eq!(drain(&mut cursor), vec![1, 2, 3, 4, 5]);
    assert!(!cursor.has_next());
    assert!(cursor.next().is_none());
}

#[test]
fn random_access_does_not_move_the_sequential_position() {
    let mut cursor = merged();
    assert_eq!(int(cursor.next()), Some(1));

    assert_eq!(int(cursor.get(4).ok()), Some(5));
    assert_eq!(int(cursor.current()), Some(1));
    assert_eq!(int(cursor.next()), Some(2));
}

#[test]
fn peek_tracks_the_last_returned_element() {
    let mut cursor = merged();
    assert!(cursor.current().is_none());

    cursor.next();
    cursor.next();
    assert_eq!(int(cursor.current()), Some(2));
    assert_eq!(int(cursor.current()), Some(2));
}

#[test]
fn out_of_range_index_is_reported() {
    let cursor = merged();
    let err = cursor.get(5).expect_err("past the end");

    assert_eq!(err, CursorError::OutOfRange { index: 5, size: 5 });
    assert_eq!(InternalError::from(err).class, ErrorClass::OutOfRange);
}

#[test]
fn empty_cursor_is_exhausted_from_the_start() {
    let mut cursor = Cursor::new();

    assert!(cursor.is_empty());
    assert_eq!(cursor.size(), 0);
    assert!(!cursor.has_next());
    assert!(cursor.next().is_none());
    assert!(cursor.get(0).is_err());
}

#[test]
fn empty_sub_cursors_are_skipped() {
    let mut cursor = Cursor::new();
    cursor.push(sub("a", &[])).unwrap();
    cursor.push(sub("b", &[7])).unwrap();
    cursor.push(sub("c", &[])).unwrap();

    assert_eq!(cursor.size(), 1);
    assert_eq!(drain(&mut cursor), vec![7]);
}

// ---- sorted ------------------------------------------------------------

#[test]
fn descending_sort_reorders_iteration() {
    let mut cursor = merged();
    cursor.sort_by(|a, b| canonical_cmp_ref(b, a));

    assert!(cursor.is_sorted());
    assert_eq!(int(cursor.get(0).ok()), Some(5));
    assert_eq!(drain(&mut cursor), vec![5, 4, 3, 2, 1]);
}

#[test]
fn sort_restarts_sequential_reads() {
    let mut cursor = merged();
    cursor.next();
    cursor.next();

    cursor.sort_by(|a, b| canonical_cmp_ref(b, a));
    assert!(cursor.current().is_none());
    assert_eq!(int(cursor.next()), Some(5));
}

#[test]
fn resorting_derives_the_view_from_scratch() {
    let mut cursor = merged();
    cursor.sort_by(|a, b| canonical_cmp_ref(b, a));
    cursor.sort();

    assert_eq!(drain(&mut cursor), vec![1, 2, 3, 4, 5]);
}

#[test]
fn ties_keep_push_order_then_append_order() {
    let mut cursor = Cursor::new();
    cursor.push(sub("a", &[10, 11])).unwrap();
    cursor.push(sub("b", &[20])).unwrap();
    cursor.push(sub("c", &[12, 21])).unwrap();

    // compare by tens digit only
    cursor.sort_by(|a, b| {
        let tens = |v: &OwnedValue| int(Some(v)).map(|n| n / 10);
        tens(a).cmp(&tens(b))
    });

    assert_eq!(drain(&mut cursor), vec![10, 11, 12, 20, 21]);
}

#[test]
fn push_after_sort_is_rejected() {
    let mut cursor = merged();
    cursor.sort();

    let err = cursor.push(sub("late", &[6, 7])).expect_err("sorted");
    assert_eq!(err, CursorError::PushAfterSort { values: 2 });
    assert_eq!(cursor.size(), 5);
}

// ---- bulk access -------------------------------------------------------

#[test]
fn sub_cursors_iterate_in_push_order() {
    let cursor = merged();

    let addresses: Vec<String> = cursor.iter().map(|s| s.address().to_string()).collect();
    assert_eq!(addresses, vec!["a", "b", "c"]);

    let sizes: Vec<usize> = (&cursor).into_iter().map(SubCursor::size).collect();
    assert_eq!(sizes, vec![2, 1, 2]);
}

#[test]
fn values_follow_the_current_order() {
    let mut cursor = merged();
    let unsorted: Vec<_> = cursor.values().filter_map(|v| int(Some(v))).collect();
    assert_eq!(unsorted, vec![1, 2, 3, 4, 5]);

    cursor.sort_by(|a, b| canonical_cmp_ref(b, a));
    let sorted: Vec<_> = cursor.values().filter_map(|v| int(Some(v))).collect();
    assert_eq!(sorted, vec![5, 4, 3, 2, 1]);
}

#[test]
fn session_is_carried_but_not_interpreted() {
    assert_eq!(Cursor::new().session(), None);

    let cursor = Cursor::with_session(SessionId::new(42));
    assert_eq!(cursor.session().map(|s| *s), Some(42));
    assert_eq!(SessionId::new(42).to_string(), "42");
}

#[test]
fn sub_cursor_owns_its_values() {
    let mut sub_cursor = sub("x", &[1]);
    sub_cursor.append(crate::heap::HardWired::Null);

    assert_eq!(sub_cursor.size(), 2);
    assert_eq!(&**sub_cursor.address(), "x");
    assert!(sub_cursor.data()[1].as_value().is_some_and(|v| v.is_null()));

    let owned: Vec<OwnedValue> = sub_cursor.into_iter().collect();
    assert_eq!(owned.len(), 2);
}
