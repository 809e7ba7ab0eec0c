//! Raw data sources and their classification.
//!
//! A [`Source`] is one of three shapes, or a value that is already wrapped:
//!
//! | Shape      | Variant               | Emits                               |
//! |------------|-----------------------|-------------------------------------|
//! | space      | [`Source::Space`]     | every list element, then completes  |
//! | deferred   | [`Source::Deferred`]  | one value, or fails                 |
//! | stream     | [`Source::Stream`]    | zero or more values, then ends      |
//! | canonical  | [`Source::Wrapped`]   | whatever the wrapper's sequence does |
//!
//! Classification is an exhaustive match over the variant, see [`Source::kind`].

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::Stream;

use crate::burrito::Burrito;
use crate::error::Result;
use crate::sequence::Sequence;

/// Shape tag of a [`Source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Already a [`Burrito`]; normalization just unwraps it.
    Canonical,
    /// A finite, materialized list.
    Space,
    /// A single value resolved in the future.
    Deferred,
    /// A push-based multi-value stream.
    Stream,
}

impl SourceKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Canonical => "canonical",
            Self::Space => "space",
            Self::Deferred => "deferred",
            Self::Stream => "stream",
        }
    }

    /// Returns `true` for sources whose values arrive over time.
    #[must_use]
    pub const fn is_time(&self) -> bool {
        matches!(self, Self::Deferred | Self::Stream)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any input a [`Burrito`] can be built from.
pub enum Source<T> {
    /// An ordered, already-materialized list.
    Space(Vec<T>),
    /// A value that resolves or rejects exactly once.
    Deferred(BoxFuture<'static, Result<T>>),
    /// A push-based stream of values.
    Stream(Sequence<T>),
    /// An existing wrapper.
    Wrapped(Burrito<T>),
}

impl<T> Source<T> {
    /// Classify this source.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::Wrapped(_) => SourceKind::Canonical,
            Self::Space(_) => SourceKind::Space,
            Self::Deferred(_) => SourceKind::Deferred,
            Self::Stream(_) => SourceKind::Stream,
        }
    }

    /// A deferred source from any future.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }

    /// A single-element list.
    #[must_use]
    pub fn single(value: T) -> Self {
        Self::Space(vec![value])
    }
}

impl<T: Send + 'static> Source<T> {
    /// A stream source from a one-shot [`Stream`].
    ///
    /// See [`Sequence::from_stream`] for the single-subscriber restriction.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self::Stream(Sequence::from_stream(stream))
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Space(values) => f.debug_struct("Space").field("len", &values.len()).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
            Self::Stream(seq) => f.debug_tuple("Stream").field(seq).finish(),
            Self::Wrapped(burrito) => f.debug_tuple("Wrapped").field(burrito).finish(),
        }
    }
}

impl<T> From<Vec<T>> for Source<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Space(values)
    }
}

impl<T, const N: usize> From<[T; N]> for Source<T> {
    fn from(values: [T; N]) -> Self {
        Self::Space(values.into())
    }
}

impl<T> From<Sequence<T>> for Source<T> {
    fn from(seq: Sequence<T>) -> Self {
        Self::Stream(seq)
    }
}

impl<T> From<Burrito<T>> for Source<T> {
    fn from(burrito: Burrito<T>) -> Self {
        Self::Wrapped(burrito)
    }
}
