use crate::value::{Value, data_size};
use std::iter::FusedIterator;

///
/// Array
///
/// Read-only view over an encoded array. Children are variable-width, so
/// positional access walks from the first child.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Array<'a> {
    value: Value<'a>,
    count: usize,
    first: usize,
}

impl<'a> Array<'a> {
    pub(crate) fn new(value: Value<'a>) -> Self {
        Self {
            value,
            count: value.stored_length(),
            first: 1 + value.length_prefix_len(),
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value<'a>> {
        self.iter().nth(index)
    }

    #[must_use]
    pub fn iter(&self) -> ChildIter<'a> {
        ChildIter::new(&self.value.as_bytes()[self.first..], self.count)
    }

    #[must_use]
    pub const fn as_value(&self) -> Value<'a> {
        self.value
    }
}

impl<'a> IntoIterator for Array<'a> {
    type Item = Value<'a>;
    type IntoIter = ChildIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

///
/// Dict
///
/// Read-only view over an encoded dict: `count` pairs of
/// (string key, value), in encoded order.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Dict<'a> {
    value: Value<'a>,
    count: usize,
    first: usize,
}

impl<'a> Dict<'a> {
    pub(crate) fn new(value: Value<'a>) -> Self {
        Self {
            value,
            count: value.stored_length(),
            first: 1 + value.length_prefix_len(),
        }
    }

    /// Number of key/value pairs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Look up a key. Linear in the number of pairs.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value<'a>> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn iter(&self) -> DictIter<'a> {
        DictIter {
            inner: ChildIter::new(&self.value.as_bytes()[self.first..], self.count * 2),
        }
    }

    #[must_use]
    pub const fn as_value(&self) -> Value<'a> {
        self.value
    }
}

impl<'a> IntoIterator for Dict<'a> {
    type Item = (&'a str, Value<'a>);
    type IntoIter = DictIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

///
/// ChildIter
///
/// Walks consecutive sibling values by skipping `data_size()` bytes each.
///

#[derive(Clone, Debug)]
pub struct ChildIter<'a> {
    rest: &'a [u8],
    remaining: usize,
}

impl<'a> ChildIter<'a> {
    const fn new(rest: &'a [u8], remaining: usize) -> Self {
        Self { rest, remaining }
    }
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = Value<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let Ok(size) = data_size(self.rest) else {
            self.remaining = 0;
            return None;
        };
        let (head, tail) = self.rest.split_at(size);
        self.rest = tail;
        self.remaining -= 1;

        Some(Value::from_trusted(head))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ChildIter<'_> {}
impl FusedIterator for ChildIter<'_> {}

///
/// DictIter
///

#[derive(Clone, Debug)]
pub struct DictIter<'a> {
    inner: ChildIter<'a>,
}

impl<'a> Iterator for DictIter<'a> {
    type Item = (&'a str, Value<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.inner.next()?;
        let value = self.inner.next()?;

        Some((key.as_str().unwrap_or_default(), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pairs = self.inner.remaining / 2;
        (pairs, Some(pairs))
    }
}

impl FusedIterator for DictIter<'_> {}
