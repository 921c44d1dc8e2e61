use crate::{cursor::ProducerAddress, heap::OwnedValue};
use derive_more::IntoIterator;

///
/// SubCursor
///
/// Append-only run of values contributed by one producer.
///

#[derive(Debug, IntoIterator)]
pub struct SubCursor {
    address: ProducerAddress,
    #[into_iterator(owned, ref)]
    data: Vec<OwnedValue>,
}

impl SubCursor {
    #[must_use]
    pub const fn new(address: ProducerAddress) -> Self {
        Self {
            address,
            data: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_data(address: ProducerAddress, data: Vec<OwnedValue>) -> Self {
        Self { address, data }
    }

    #[must_use]
    pub const fn address(&self) -> &ProducerAddress {
        &self.address
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn data(&self) -> &[OwnedValue] {
        &self.data
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&OwnedValue> {
        self.data.get(index)
    }

    pub fn append(&mut self, value: impl Into<OwnedValue>) {
        self.data.push(value.into());
    }
}
