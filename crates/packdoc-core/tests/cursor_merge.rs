use packdoc_core::{
    cursor::{Cursor, ProducerAddress, SubCursor},
    heap::{HardWired, HeapValue, OwnedValue, ValueRef},
    mutable::mutable_copy,
    obs::{metrics_report, metrics_reset_all},
    value::{Encoder, ValueTag, canonical_cmp_ref},
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn producer(address: &str, ints: &[i64]) -> SubCursor {
    let data = ints
        .iter()
        .map(|&n| ValueRef::from(HeapValue::create_int(n)))
        .collect();

    SubCursor::with_data(ProducerAddress::new(address), data)
}

fn as_int(value: &OwnedValue) -> Option<i64> {
    value.as_value().and_then(|v| v.as_int())
}

fn drain(cursor: &mut Cursor) -> Vec<i64> {
    let mut out = Vec::new();
    while cursor.has_next() {
        out.extend(cursor.next().and_then(as_int));
    }
    out
}

#[test]
fn three_producers_merge_then_sort_descending() {
    init_tracing();
    metrics_reset_all();

    let mut cursor = Cursor::new();
    cursor.push(producer("shard-a", &[1, 2])).unwrap();
    cursor.push(producer("shard-b", &[3])).unwrap();
    cursor.push(producer("shard-c", &[4, 5])).unwrap();

    assert_eq!(cursor.size(), 5);
    assert_eq!(cursor.get(3).ok().and_then(as_int), Some(4));
    assert_eq!(drain(&mut cursor), vec![1, 2, 3, 4, 5]);

    cursor.sort_by(|a, b| canonical_cmp_ref(b, a));
    assert_eq!(cursor.get(0).ok().and_then(as_int), Some(5));
    assert!(cursor.current().is_none());
    assert_eq!(drain(&mut cursor), vec![5, 4, 3, 2, 1]);

    let counters = metrics_report(None).counters.expect("counters recorded");
    assert_eq!(counters.ops.cursor_pushes, 3);
    assert_eq!(counters.ops.cursor_values, 5);
    assert_eq!(counters.ops.cursor_sorts, 1);
    assert_eq!(counters.ops.heap_allocs, 5);
}

#[test]
fn empty_cursor_signals_end_of_stream() {
    let mut cursor = Cursor::new();

    assert!(!cursor.has_next());
    assert_eq!(cursor.size(), 0);
    assert!(cursor.next().is_none());
}

#[test]
fn dropping_a_cursor_releases_its_values() {
    metrics_reset_all();

    let shared = HeapValue::create_string("kept elsewhere");
    let mut sub_cursor = SubCursor::new(ProducerAddress::new("shard-a"));
    sub_cursor.append(shared.retain().unwrap());
    sub_cursor.append(HeapValue::create_int(7));
    sub_cursor.append(HardWired::Null);

    let mut cursor = Cursor::new();
    cursor.push(sub_cursor).unwrap();
    assert_eq!(shared.ref_count(), 2);

    drop(cursor);

    assert_eq!(shared.ref_count(), 1);
    let counters = metrics_report(None).counters.expect("counters recorded");
    assert_eq!(counters.ops.deallocs, 1);
}

#[test]
fn mutable_documents_flow_through_the_cursor() {
    let mut enc = Encoder::new();
    enc.begin_dict().unwrap();
    enc.write_key("score").unwrap().write_int(10).unwrap();
    enc.end_dict().unwrap();
    let doc = ValueRef::from(HeapValue::from_encoded(&enc.finish().unwrap()).unwrap());

    let edited = mutable_copy(Some(&doc), ValueTag::Dict)
        .unwrap()
        .expect("doc is a dict");
    edited
        .as_dict_mut()
        .unwrap()
        .set("score", HeapValue::create_int(99));
    assert!(edited.is_changed());

    let mut sub_cursor = SubCursor::new(ProducerAddress::new("shard-a"));
    sub_cursor.append(doc);
    sub_cursor.append(edited);

    let mut cursor = Cursor::new();
    cursor.push(sub_cursor).unwrap();
    cursor.sort_by(|a, b| canonical_cmp_ref(b, a));

    let rendered: Vec<String> = cursor.values().map(ToString::to_string).collect();
    assert_eq!(rendered, vec![r#"{"score":99}"#, r#"{"score":10}"#]);
}
