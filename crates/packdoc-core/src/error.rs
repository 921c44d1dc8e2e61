use crate::{cursor::CursorError, lifecycle::LifecycleError, value::CodecError};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError without a detail payload.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a heap-origin invalid-data error.
    pub(crate) fn heap_invalid_data(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidData, ErrorOrigin::Heap, message)
    }

    /// Construct a collection-origin unsupported error.
    pub(crate) fn collection_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Collection, message)
    }

    /// Construct a collection-origin out-of-range error.
    pub(crate) fn collection_out_of_range(index: usize, len: usize) -> Self {
        Self::new(
            ErrorClass::OutOfRange,
            ErrorOrigin::Collection,
            format!("collection index {index} out of range (len {len})"),
        )
    }

    /// Construct a codec-origin corruption error.
    pub(crate) fn codec_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Codec, message)
    }

    #[must_use]
    pub const fn is_out_of_range(&self) -> bool {
        matches!(self.class, ErrorClass::OutOfRange)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Codec(CodecError),
    #[error("{0}")]
    Lifecycle(LifecycleError),
    #[error("{0}")]
    Cursor(CursorError),
}

impl From<CodecError> for InternalError {
    fn from(err: CodecError) -> Self {
        let class = match err {
            CodecError::KindMismatch { .. } => ErrorClass::Unsupported,
            _ => ErrorClass::Corruption,
        };

        Self {
            class,
            origin: ErrorOrigin::Codec,
            message: err.to_string(),
            detail: Some(ErrorDetail::Codec(err)),
        }
    }
}

impl From<LifecycleError> for InternalError {
    fn from(err: LifecycleError) -> Self {
        Self {
            class: ErrorClass::LifetimeViolation,
            origin: ErrorOrigin::Lifecycle,
            message: err.to_string(),
            detail: Some(ErrorDetail::Lifecycle(err)),
        }
    }
}

impl From<CursorError> for InternalError {
    fn from(err: CursorError) -> Self {
        let class = match err {
            CursorError::OutOfRange { .. } => ErrorClass::OutOfRange,
            CursorError::PushAfterSort { .. } => ErrorClass::InvariantViolation,
        };

        Self {
            class,
            origin: ErrorOrigin::Cursor,
            message: err.to_string(),
            detail: Some(ErrorDetail::Cursor(err)),
        }
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Retain/release or downcast of something that is not an owned value.
    InvalidData,
    /// Reference count observed outside its legal range.
    LifetimeViolation,
    OutOfRange,
    Unsupported,
    Corruption,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidData => "invalid_data",
            Self::LifetimeViolation => "lifetime_violation",
            Self::OutOfRange => "out_of_range",
            Self::Unsupported => "unsupported",
            Self::Corruption => "corruption",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Codec,
    Heap,
    Lifecycle,
    Collection,
    Cursor,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Codec => "codec",
            Self::Heap => "heap",
            Self::Lifecycle => "lifecycle",
            Self::Collection => "collection",
            Self::Cursor => "cursor",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
