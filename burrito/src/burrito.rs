//! The [`Burrito`] sequence wrapper and its operator surface.
//!
//! A burrito wraps exactly one canonical [`Sequence`]. It is an immutable
//! handle: every operator takes `&self` and returns a new burrito over a newly
//! derived sequence, so one burrito can seed any number of independent chains.
//!
//! Operators only describe work. Nothing runs until [`Burrito::collect`] or
//! [`Burrito::subscribe`] opens the sequence.

use std::fmt;
use std::future;
use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use futures::stream::{BoxStream, Stream};

use crate::error::{Error, Result};
use crate::flatten::{MergeFlatten, SwitchFlatten};
use crate::normalize::normalize;
use crate::ops::{self, DistinctUntilChanged};
use crate::sequence::{Filling, Sequence};
use crate::source::Source;
use crate::subscription::{self, Observer, Subscription};
use crate::timing::{Debounced, Delayed, Throttled};

type MakeDefault<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Build a [`Burrito`] from a list of values, in argument order.
///
/// ```rust,ignore
/// let burrito = burrito::wrap_all![1, 2, 3];
/// ```
#[macro_export]
macro_rules! wrap_all {
    ($($value:expr),* $(,)?) => {
        $crate::Burrito::wrap_all([$($value),*])
    };
}

/// A chainable, immutable handle over a canonical sequence.
pub struct Burrito<T> {
    filling: Sequence<T>,
}

impl<T> Clone for Burrito<T> {
    fn clone(&self) -> Self {
        Self {
            filling: self.filling.clone(),
        }
    }
}

impl<T> fmt::Debug for Burrito<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Burrito").field(&self.filling).finish()
    }
}

impl<T: Filling> Burrito<T> {
    /// Wrap any source.
    ///
    /// Wrapping a burrito returns a burrito over the same sequence rather
    /// than a nested one.
    pub fn wrap(source: impl Into<Source<T>>) -> Self {
        Self::from_sequence(normalize(source))
    }

    /// Wrap a list built from `values`, in iteration order.
    pub fn wrap_all(values: impl IntoIterator<Item = T>) -> Self {
        Self::wrap(values.into_iter().collect::<Vec<_>>())
    }

    /// Wrap a deferred value.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self::wrap(Source::deferred(future))
    }

    /// Flatten a burrito of sources with the merge discipline.
    ///
    /// Each inner source is subscribed as it arrives; their values are merged
    /// in emission order.
    #[must_use]
    pub fn flatten<S>(burrito: &Burrito<S>) -> Self
    where
        S: Into<Source<T>> + Send + 'static,
    {
        Self::from_sequence(burrito.filling.pipe(MergeFlatten::new))
    }
}

impl<T: Send + 'static> Burrito<T> {
    /// A burrito over an existing canonical sequence.
    #[must_use]
    pub const fn from_sequence(filling: Sequence<T>) -> Self {
        Self { filling }
    }

    /// The empty burrito: completes immediately, never errors.
    #[must_use]
    pub fn tortilla() -> Self {
        Self::from_sequence(Sequence::empty())
    }

    /// A burrito that fails immediately with `error`.
    #[must_use]
    pub fn fail(error: Error) -> Self {
        Self::from_sequence(Sequence::fail(error))
    }

    /// Apply a stream-level operator to every subscription.
    pub fn pipe<U, F, S>(&self, op: F) -> Burrito<U>
    where
        U: Send + 'static,
        F: Fn(BoxStream<'static, Result<T>>) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<U>> + Send + 'static,
    {
        Burrito::from_sequence(self.filling.pipe(op))
    }

    /// Project every value through `transform`.
    pub fn map<U, F>(&self, transform: F) -> Burrito<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let transform = Arc::new(transform);
        self.pipe(move |upstream| {
            let transform = Arc::clone(&transform);
            upstream.map_ok(move |value| transform(value))
        })
    }

    /// Project every value through a fallible `transform`.
    ///
    /// The first `Err` terminates the derived sequence; values already
    /// emitted stay emitted.
    pub fn try_map<U, F>(&self, transform: F) -> Burrito<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Result<U> + Send + Sync + 'static,
    {
        let transform = Arc::new(transform);
        self.pipe(move |upstream| {
            let transform = Arc::clone(&transform);
            upstream.and_then(move |value| future::ready(transform(value)))
        })
    }

    /// Keep values for which `predicate(value, index)` holds.
    ///
    /// `index` is the 0-based position in the upstream sequence.
    #[must_use]
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&T, usize) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        self.pipe(move |upstream| {
            let predicate = Arc::clone(&predicate);
            let mut index = 0;
            upstream.try_filter(move |value| {
                let keep = predicate(value, index);
                index += 1;
                future::ready(keep)
            })
        })
    }

    /// [`filter`](Self::filter) with a fallible predicate.
    #[must_use]
    pub fn try_filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&T, usize) -> Result<bool> + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        self.pipe(move |upstream| {
            let predicate = Arc::clone(&predicate);
            let mut index = 0;
            upstream.try_filter_map(move |value| {
                let kept = predicate(&value, index).map(|keep| keep.then_some(value));
                index += 1;
                future::ready(kept)
            })
        })
    }

    /// Map every value to a source and merge all of them, concurrently.
    ///
    /// Completes once upstream and every spawned inner sequence completed.
    pub fn flat_map<U, S, F>(&self, transform: F) -> Burrito<U>
    where
        U: Filling,
        S: Into<Source<U>> + Send + 'static,
        F: Fn(T) -> S + Send + Sync + 'static,
    {
        Burrito::flatten(&self.map(transform))
    }

    /// Map every value to a source, keeping only the latest one subscribed.
    ///
    /// A new upstream value cancels the active inner sequence first.
    pub fn switch_map<U, S, F>(&self, transform: F) -> Burrito<U>
    where
        U: Filling,
        S: Into<Source<U>> + Send + 'static,
        F: Fn(T) -> S + Send + Sync + 'static,
    {
        self.map(transform).pipe(SwitchFlatten::new)
    }

    /// Suppress values equal to the previously emitted one.
    #[must_use]
    pub fn distinct_until_changed(&self) -> Self
    where
        T: Clone + PartialEq,
    {
        self.distinct_until_changed_by(|previous: &T, next: &T| previous == next)
    }

    /// Suppress values `same` considers equal to the previously emitted one.
    #[must_use]
    pub fn distinct_until_changed_by<F>(&self, same: F) -> Self
    where
        T: Clone,
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let same = Arc::new(same);
        self.pipe(move |upstream| {
            let same = Arc::clone(&same);
            DistinctUntilChanged::new(upstream, move |a: &T, b: &T| same(a, b))
        })
    }

    /// Emit a value only after `period` passes without a newer one.
    #[must_use]
    pub fn debounce_time(&self, period: Duration) -> Self {
        self.pipe(move |upstream| Debounced::new(upstream, period))
    }

    /// Emit the first value of a burst, then drop values for `window`.
    #[must_use]
    pub fn throttle_time(&self, window: Duration) -> Self {
        self.pipe(move |upstream| Throttled::new(upstream, window))
    }

    /// Shift every value, and termination, later by `delay`.
    #[must_use]
    pub fn delay(&self, delay: Duration) -> Self {
        self.pipe(move |upstream| Delayed::new(upstream, delay))
    }

    /// Emit the first value, then complete. Fails with [`Error::NoMatch`] when empty.
    #[must_use]
    pub fn first(&self) -> Self {
        self.first_impl(|_: &T, _: usize| true, None)
    }

    /// Emit the first value, or `default` when upstream is empty.
    #[must_use]
    pub fn first_or(&self, default: T) -> Self
    where
        T: Clone + Sync,
    {
        self.first_impl(|_: &T, _: usize| true, Some(Arc::new(move || default.clone())))
    }

    /// Emit the first value matching `predicate(value, index)`, then complete.
    ///
    /// Fails with [`Error::NoMatch`] when nothing matches.
    #[must_use]
    pub fn first_where<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T, usize) -> bool + Send + Sync + 'static,
    {
        self.first_impl(predicate, None)
    }

    /// Like [`first_where`](Self::first_where), emitting `default` when nothing matches.
    #[must_use]
    pub fn first_where_or<P>(&self, predicate: P, default: T) -> Self
    where
        T: Clone + Sync,
        P: Fn(&T, usize) -> bool + Send + Sync + 'static,
    {
        self.first_impl(predicate, Some(Arc::new(move || default.clone())))
    }

    fn first_impl<P>(&self, predicate: P, default: Option<MakeDefault<T>>) -> Self
    where
        P: Fn(&T, usize) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        self.pipe(move |upstream| {
            let default = default.as_ref().map(|make| make());
            ops::first(upstream, Arc::clone(&predicate), default)
        })
    }

    /// Drain the sequence into a list, in emission order.
    ///
    /// # Errors
    ///
    /// Returns the sequence's error if it fails; no partial list is returned.
    pub async fn collect(&self) -> Result<Vec<T>> {
        self.filling.open().try_collect().await
    }

    /// Attach an observer.
    ///
    /// Values that are available right away are delivered before this
    /// returns; the rest is driven on the ambient tokio runtime. Each call
    /// opens its own subscription to the sequence.
    pub fn subscribe(&self, observer: impl Observer<T>) -> Subscription {
        subscription::attach(self.filling.open(), observer)
    }

    /// The underlying canonical sequence.
    #[must_use]
    pub const fn sequence(&self) -> &Sequence<T> {
        &self.filling
    }

    /// Unwrap into the underlying canonical sequence.
    #[must_use]
    pub fn into_sequence(self) -> Sequence<T> {
        self.filling
    }
}

impl<T: Send + 'static> Default for Burrito<T> {
    fn default() -> Self {
        Self::tortilla()
    }
}

impl<T: Send + 'static> From<Sequence<T>> for Burrito<T> {
    fn from(filling: Sequence<T>) -> Self {
        Self::from_sequence(filling)
    }
}
