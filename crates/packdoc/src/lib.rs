//! ## Crate layout
//! - `core`: value codec, heap values, lifecycles, mutable collections,
//!   cursors, errors, and observability.
//! - `primitives`: the value-kind registry shared by every layer.
//!
//! The `prelude` module mirrors the surface used by query operators and
//! transport glue.

pub use packdoc_core as core;
pub use packdoc_primitives as primitives;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::core::error::InternalError as Error;

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        cursor::{Cursor, CursorError, ProducerAddress, SessionId, SubCursor},
        heap::{self, HardWired, HeapValue, IntoHeapValue as _, OwnedValue, ValueRef},
        lifecycle::Retained,
        mutable::{HeapCollection, MutableArray, MutableDict, mutable_copy},
        value::{Array, Dict, Encoder, Value, ValueType, canonical_cmp, canonical_cmp_ref},
    };
    pub use crate::primitives::Tag;
}
