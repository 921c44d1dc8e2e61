use super::*;
use crate::{
    error::ErrorClass,
    heap::HardWired,
    obs::{MetricsSink, with_metrics_sink},
    value::Encoder,
};
use std::cell::RefCell;

// ---- helpers -----------------------------------------------------------

// ["a", [1, 2], {"k": true}]
fn packed_array() -> OwnedValue {
    let mut enc = Encoder::new();
    enc.begin_array().unwrap();
    enc.write_string("a").unwrap();
    enc.begin_array().unwrap();
    enc.write_int(1).unwrap().write_int(2).unwrap();
    enc.end_array().unwrap();
    enc.begin_dict().unwrap();
    enc.write_key("k").unwrap().write_bool(true).unwrap();
    enc.end_dict().unwrap();
    enc.end_array().unwrap();

    ValueRef::from(HeapValue::from_encoded(&enc.finish().unwrap()).unwrap())
}

// {"z": 1, "a": [3]}
fn packed_dict() -> OwnedValue {
    let mut enc = Encoder::new();
    enc.begin_dict().unwrap();
    enc.write_key("z").unwrap().write_int(1).unwrap();
    enc.write_key("a").unwrap().begin_array().unwrap();
    enc.write_int(3).unwrap();
    enc.end_array().unwrap();
    enc.end_dict().unwrap();

    ValueRef::from(HeapValue::from_encoded(&enc.finish().unwrap()).unwrap())
}

fn copy(value: &OwnedValue, kind: Tag) -> Retained<HeapCollection> {
    mutable_copy(Some(value), kind)
        .expect("supported kind")
        .expect("matching kind")
}

#[derive(Default)]
struct CopyLog(RefCell<Vec<(Tag, bool)>>);

impl MetricsSink for CopyLog {
    fn record(&self, event: MetricsEvent) {
        if let MetricsEvent::MutableCopy { tag, reused } = event {
            self.0.borrow_mut().push((tag, reused));
        }
    }
}

// ---- mutable_copy ------------------------------------------------------

#[test]
fn copy_of_packed_array_starts_unchanged() {
    let source = packed_array();
    let array = copy(&source, Tag::Array);

    assert_eq!(array.tag(), Tag::Array);
    assert_eq!(array.len(), 3);
    assert!(!array.is_changed());

    let guard = array.as_array().expect("array body");
    assert_eq!(
        guard.get(0).and_then(|v| v.as_value()).and_then(|v| v.as_str()),
        Some("a")
    );
}

#[test]
fn copy_is_idempotent_on_mutable_input() {
    let log = CopyLog::default();
    let source = packed_array();

    let (first, second) = with_metrics_sink(&log, || {
        let first = ValueRef::from(copy(&source, Tag::Array));
        let second = copy(&first, Tag::Array);
        (first, second)
    });

    let ValueRef::Collection(first) = first else {
        panic!("expected a collection");
    };
    assert!(Retained::ptr_eq(&first, &second));
    assert_eq!(first.ref_count(), 2);
    assert_eq!(
        log.0.borrow().as_slice(),
        &[(Tag::Array, false), (Tag::Array, true)]
    );
}

#[test]
fn absent_or_mismatched_values_copy_to_none() {
    let array = packed_array();

    assert!(mutable_copy(None, Tag::Array).unwrap().is_none());
    assert!(mutable_copy(Some(&array), Tag::Dict).unwrap().is_none());

    let string = ValueRef::from(HeapValue::create_string("not a container"));
    assert!(mutable_copy(Some(&string), Tag::Array).unwrap().is_none());

    let mutable_dict = ValueRef::from(HeapCollection::new_dict());
    assert!(mutable_copy(Some(&mutable_dict), Tag::Array)
        .unwrap()
        .is_none());
}

#[test]
fn non_collection_kinds_are_unsupported() {
    let array = packed_array();
    let err = mutable_copy(Some(&array), Tag::String).expect_err("unsupported kind");

    assert_eq!(err.class, ErrorClass::Unsupported);
}

#[test]
fn hard_wired_empty_containers_copy_to_fresh_collections() {
    let empty = ValueRef::from(HardWired::EmptyDict);
    let dict = copy(&empty, Tag::Dict);

    assert!(dict.is_empty());
    assert!(!dict.is_changed());
}

// ---- MutableArray ------------------------------------------------------

#[test]
fn every_array_mutation_sets_changed() {
    let mutations: [fn(&mut MutableArray); 5] = [
        |a| a.push(HardWired::Null),
        |a| a.set(0, HardWired::True).unwrap(),
        |a| a.insert(1, HeapValue::create_int(9)).unwrap(),
        |a| drop(a.remove(0).unwrap()),
        MutableArray::clear,
    ];

    for mutate in mutations {
        let source = packed_array();
        let array = copy(&source, Tag::Array);
        mutate(&mut array.as_array_mut().unwrap());
        assert!(array.is_changed());
    }
}

#[test]
fn array_edits_land_where_expected() {
    let array = HeapCollection::new_array();
    {
        let mut items = array.as_array_mut().unwrap();
        items.push(HeapValue::create_int(1));
        items.push(HeapValue::create_int(3));
        items.insert(1, HeapValue::create_int(2)).unwrap();
        items.insert(3, HeapValue::create_int(4)).unwrap();
    }

    let encoded = array.encode();
    assert_eq!(encoded.as_value().to_string(), "[1,2,3,4]");
}

#[test]
fn array_index_errors_are_out_of_range() {
    let array = HeapCollection::new_array();
    let mut items = array.as_array_mut().unwrap();

    assert!(items.set(0, HardWired::Null).unwrap_err().is_out_of_range());
    assert!(items.insert(1, HardWired::Null).unwrap_err().is_out_of_range());
    assert!(items.remove(0).unwrap_err().is_out_of_range());
    assert!(items.get_mutable_array(0).unwrap_err().is_out_of_range());
    assert!(!items.is_changed());
}

#[test]
fn nested_promotion_replaces_the_child_in_place() {
    let source = packed_array();
    let outer = copy(&source, Tag::Array);

    let inner = outer
        .as_array_mut()
        .unwrap()
        .get_mutable_array(1)
        .unwrap()
        .expect("child is an array");
    assert!(!outer.is_changed());

    // second promotion returns the same identity
    let again = outer
        .as_array_mut()
        .unwrap()
        .get_mutable_array(1)
        .unwrap()
        .unwrap();
    assert!(Retained::ptr_eq(&inner, &again));

    inner.as_array_mut().unwrap().push(HeapValue::create_int(3));
    assert!(!outer.is_changed());
    assert!(outer.has_changes());
    assert_eq!(
        outer.encode().as_value().to_string(),
        r#"["a",[1,2,3],{"k":true}]"#
    );

    // wrong kind at that index
    assert!(outer.as_array_mut().unwrap().get_mutable_dict(0).unwrap().is_none());
}

// ---- MutableDict -------------------------------------------------------

#[test]
fn dict_copy_sorts_keys_on_encode() {
    let source = packed_dict();
    let dict = copy(&source, Tag::Dict);

    assert_eq!(dict.encode().as_value().to_string(), r#"{"a":[3],"z":1}"#);
    assert!(!dict.is_changed());
}

#[test]
fn repeated_dict_keys_keep_the_last_value() {
    let mut enc = Encoder::new();
    enc.begin_dict().unwrap();
    enc.write_key("k").unwrap().write_int(1).unwrap();
    enc.write_key("j").unwrap().write_int(2).unwrap();
    enc.write_key("k").unwrap().write_int(3).unwrap();
    enc.end_dict().unwrap();
    let source = ValueRef::from(HeapValue::from_encoded(&enc.finish().unwrap()).unwrap());

    let dict = copy(&source, Tag::Dict);
    assert_eq!(dict.len(), 2);
    assert!(dict.is_changed());
    assert_eq!(dict.encode().as_value().to_string(), r#"{"j":2,"k":3}"#);
}

#[test]
fn dict_mutations_set_changed() {
    let source = packed_dict();
    let dict = copy(&source, Tag::Dict);

    assert!(dict.as_dict_mut().unwrap().remove("missing").is_none());
    assert!(!dict.is_changed());

    dict.as_dict_mut().unwrap().set("b", HardWired::False);
    assert!(dict.is_changed());

    let removed = dict.as_dict_mut().unwrap().remove("z").expect("present");
    assert_eq!(removed.as_value().and_then(|v| v.as_int()), Some(1));

    let view = dict.as_dict().unwrap();
    assert_eq!(view.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert!(view.contains_key("b"));
}

#[test]
fn dict_promotion_by_key() {
    let source = packed_dict();
    let dict = copy(&source, Tag::Dict);

    let nested = dict
        .as_dict_mut()
        .unwrap()
        .get_mutable_array("a")
        .unwrap()
        .expect("array under a");
    nested.as_array_mut().unwrap().clear();
    assert!(!dict.is_changed());
    assert!(dict.has_changes());

    assert!(dict.as_dict_mut().unwrap().get_mutable_array("nope").unwrap().is_none());
    assert!(dict.as_dict_mut().unwrap().get_mutable_dict("z").unwrap().is_none());
    assert_eq!(dict.encode().as_value().to_string(), r#"{"a":[],"z":1}"#);
}

#[test]
fn wrong_body_accessors_return_none() {
    let array = HeapCollection::new_array();
    assert!(array.as_dict().is_none());
    assert!(array.as_dict_mut().is_none());

    let dict = HeapCollection::new_dict();
    assert!(dict.as_array().is_none());
    assert!(dict.as_array_mut().is_none());
}

#[test]
fn collections_compare_by_encoded_contents() {
    let source = packed_array();
    let mutable = ValueRef::from(copy(&source, Tag::Array));

    assert_eq!(
        crate::value::canonical_cmp_ref(&source, &mutable),
        std::cmp::Ordering::Equal
    );
}
