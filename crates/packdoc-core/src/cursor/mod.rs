//! Result cursor: merges per-producer sub-cursors into one sequence.
//!
//! Sub-cursors are kept in push order. Without a sort the logical sequence
//! is their concatenation; after `sort_by` it is a stable ordering of
//! `(sub-cursor, position)` pairs over the same storage. Sequential reads
//! start before the first element and only move forward.

mod sub_cursor;

#[cfg(test)]
mod tests;

pub use sub_cursor::SubCursor;

use crate::{
    heap::OwnedValue,
    obs::sink::{self, MetricsEvent},
    value::canonical_cmp_ref,
};
use derive_more::{Deref, Display};
use std::cmp::Ordering;
use thiserror::Error as ThisError;

///
/// CursorError
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
pub enum CursorError {
    #[error("cursor index {index} out of range (size {size})")]
    OutOfRange { index: usize, size: usize },

    #[error("sub-cursor of {values} values pushed after the cursor was sorted")]
    PushAfterSort { values: usize },
}

///
/// ProducerAddress
///
/// Opaque identifier of the remote collection that produced a sub-cursor.
///

#[derive(Clone, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ProducerAddress(String);

impl ProducerAddress {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }
}

impl From<&str> for ProducerAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

///
/// SessionId
///
/// Correlates a cursor with one query round-trip. Never interpreted here.
///

#[derive(Clone, Copy, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SessionId(u64);

impl SessionId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

///
/// Cursor
///

#[derive(Debug, Default)]
pub struct Cursor {
    session: Option<SessionId>,
    sub_cursors: Vec<SubCursor>,
    size: usize,
    // index of the element last returned by `next`
    position: Option<usize>,
    sorted: Option<Vec<(usize, usize)>>,
}

impl Cursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(session: SessionId) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn session(&self) -> Option<SessionId> {
        self.session
    }

    ///
    /// POPULATION
    ///

    /// Append a producer's results. Rejected once a sorted view exists.
    pub fn push(&mut self, sub_cursor: SubCursor) -> Result<(), CursorError> {
        let values = sub_cursor.size();
        if self.sorted.is_some() {
            return Err(CursorError::PushAfterSort { values });
        }

        self.size += values;
        sink::record(MetricsEvent::CursorPush { values });
        tracing::debug!(
            address = %sub_cursor.address(),
            values,
            total = self.size,
            "cursor.push"
        );
        self.sub_cursors.push(sub_cursor);

        Ok(())
    }

    /// Total number of values across all sub-cursors.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    ///
    /// SEQUENTIAL ACCESS
    ///

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next_index() < self.size
    }

    /// Advance and return the next value, or `None` once exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&OwnedValue> {
        let index = self.next_index();
        if index >= self.size {
            return None;
        }
        self.position = Some(index);

        self.resolve(index)
    }

    /// The value last returned by [`Self::next`], without advancing.
    #[must_use]
    pub fn current(&self) -> Option<&OwnedValue> {
        self.position.and_then(|index| self.resolve(index))
    }

    const fn next_index(&self) -> usize {
        match self.position {
            Some(index) => index + 1,
            None => 0,
        }
    }

    ///
    /// RANDOM ACCESS
    ///

    /// Value at `index` in the current order. Does not move the
    /// sequential position.
    pub fn get(&self, index: usize) -> Result<&OwnedValue, CursorError> {
        self.resolve(index).ok_or(CursorError::OutOfRange {
            index,
            size: self.size,
        })
    }

    fn resolve(&self, index: usize) -> Option<&OwnedValue> {
        match &self.sorted {
            Some(order) => {
                let &(sub, pos) = order.get(index)?;
                self.sub_cursors.get(sub)?.get(pos)
            }
            None => self.get_unsorted(index),
        }
    }

    fn get_unsorted(&self, mut index: usize) -> Option<&OwnedValue> {
        for sub_cursor in &self.sub_cursors {
            if index < sub_cursor.size() {
                return sub_cursor.get(index);
            }
            index -= sub_cursor.size();
        }

        None
    }

    ///
    /// SORTING
    ///

    /// Order every value with `compare`. Ties keep push order, then
    /// append order. Re-sorting derives the view from scratch and resets
    /// sequential reads to the start.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&OwnedValue, &OwnedValue) -> Ordering,
    {
        let mut order: Vec<(usize, usize)> = self
            .sub_cursors
            .iter()
            .enumerate()
            .flat_map(|(sub, sub_cursor)| (0..sub_cursor.size()).map(move |pos| (sub, pos)))
            .collect();

        let subs = &self.sub_cursors;
        order.sort_by(|&(sa, pa), &(sb, pb)| {
            compare(&subs[sa].data()[pa], &subs[sb].data()[pb])
        });

        sink::record(MetricsEvent::CursorSort {
            values: order.len(),
        });
        tracing::debug!(values = order.len(), "cursor.sorted");

        self.sorted = Some(order);
        self.position = None;
    }

    /// Sort ascending by canonical value order.
    pub fn sort(&mut self) {
        self.sort_by(canonical_cmp_ref);
    }

    #[must_use]
    pub const fn is_sorted(&self) -> bool {
        self.sorted.is_some()
    }

    ///
    /// BULK ACCESS
    ///

    /// Sub-cursors in push order.
    pub fn iter(&self) -> std::slice::Iter<'_, SubCursor> {
        self.sub_cursors.iter()
    }

    /// Every value in the current order.
    pub fn values(&self) -> impl Iterator<Item = &OwnedValue> {
        (0..self.size).filter_map(|index| self.resolve(index))
    }
}

impl<'a> IntoIterator for &'a Cursor {
    type Item = &'a SubCursor;
    type IntoIter = std::slice::Iter<'a, SubCursor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
