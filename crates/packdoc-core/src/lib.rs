//! Core runtime for packdoc: the packed value codec, heap-owned values,
//! reference-counted lifetimes, copy-on-write collections, and the result
//! cursor that merges per-producer value runs.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod cursor;
pub mod error;
pub mod heap;
pub mod lifecycle;
pub mod mutable;
pub mod obs;
pub mod value;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sinks, or configuration are re-exported here.
///

pub mod prelude {
    pub use crate::{
        cursor::{Cursor, ProducerAddress, SessionId, SubCursor},
        heap::{HardWired, HeapValue, OwnedValue, ValueRef},
        lifecycle::Retained,
        mutable::{HeapCollection, MutableArray, MutableDict, mutable_copy},
        value::{Array, Dict, Encoder, Value, ValueTag, ValueType},
    };
}
