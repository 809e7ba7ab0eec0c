//! The canonical push-based sequence every source is normalized into.
//!
//! A [`Sequence`] is a cold description of work: it holds a factory that opens
//! a fresh [`BoxStream`] for every subscriber. Nothing runs until a stream is
//! opened and polled.
//!
//! Every opened stream honors the canonical contract: it yields values, then
//! ends either with `None` (completion) or with exactly one `Err` (failure),
//! and yields nothing after that.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};

use futures::future::{self, FutureExt};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use pin_project_lite::pin_project;
use tracing::warn;

use crate::error::{Error, Result};

/// Element types that can be replayed from raw sources.
///
/// Lists replay their elements to each subscriber and deferred values share
/// their single resolution, so raw-source elements must be cloneable and
/// shareable across threads.
pub trait Filling: Clone + Send + Sync + 'static {}

impl<T> Filling for T where T: Clone + Send + Sync + 'static {}

type Factory<T> = dyn Fn() -> BoxStream<'static, Result<T>> + Send + Sync;

/// A cold, cloneable, push-based sequence of `T`.
pub struct Sequence<T> {
    factory: Arc<Factory<T>>,
}

impl<T> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Sequence<T> {
    /// Create a sequence from a stream factory.
    ///
    /// The factory runs once per subscriber.
    pub fn new<F, S>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self {
            factory: Arc::new(move || factory().boxed()),
        }
    }

    /// A sequence that completes immediately without emitting.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(stream::empty)
    }

    /// A sequence that fails immediately with `error`.
    #[must_use]
    pub fn fail(error: Error) -> Self {
        Self::new(move || stream::once(future::ready(Err(error.clone()))))
    }

    /// Wrap a one-shot stream.
    ///
    /// The stream can only be consumed once: the first subscriber takes it
    /// and every later subscriber fails with [`Error::AlreadyConsumed`].
    pub fn from_stream<S>(source: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(Some(source.boxed())));
        Self::new(move || {
            let taken = take_slot(&slot);
            taken.unwrap_or_else(|| {
                warn!("one-shot stream subscribed more than once");
                stream::once(future::ready(Err(Error::AlreadyConsumed))).boxed()
            })
        })
    }

    /// Open a fresh stream over this sequence.
    #[must_use]
    pub fn open(&self) -> BoxStream<'static, Result<T>> {
        Terminating::new((self.factory)()).boxed()
    }

    /// Consume the handle and open a stream for use with `futures` combinators.
    #[must_use]
    pub fn into_stream(self) -> BoxStream<'static, Result<T>> {
        self.open()
    }

    /// Derive a new sequence by applying `op` to every stream opened from this one.
    pub fn pipe<U, F, S>(&self, op: F) -> Sequence<U>
    where
        U: Send + 'static,
        F: Fn(BoxStream<'static, Result<T>>) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<U>> + Send + 'static,
    {
        let upstream = self.clone();
        Sequence::new(move || op(upstream.open()))
    }

    /// Returns `true` if both handles share the same underlying factory.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.factory, &other.factory)
    }
}

/// Take the value out of `slot`, recovering it from a poisoned lock.
fn take_slot<V>(slot: &Mutex<Option<V>>) -> Option<V> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

impl<T: Filling> Sequence<T> {
    /// A sequence that emits `values` in order, then completes.
    #[must_use]
    pub fn from_vec(values: Vec<T>) -> Self {
        let values: Arc<[T]> = values.into();
        Self::new(move || {
            let values = Arc::clone(&values);
            stream::iter((0..values.len()).map(move |i| Ok(values[i].clone())))
        })
    }

    /// A sequence over a deferred value.
    ///
    /// The future is polled lazily by the first subscriber and resolves at
    /// most once; every subscriber observes that same resolution.
    pub fn from_future<F>(deferred: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let shared = deferred.boxed().shared();
        Self::new(move || stream::once(shared.clone()))
    }
}

impl<T: Send + 'static> Default for Sequence<T> {
    fn default() -> Self {
        Self::empty()
    }
}

pin_project! {
    /// Ends the inner stream after its first error.
    struct Terminating<S> {
        #[pin]
        inner: S,
        done: bool,
    }
}

impl<S> Terminating<S> {
    const fn new(inner: S) -> Self {
        Self { inner, done: false }
    }
}

impl<S, T> Stream for Terminating<S>
where
    S: Stream<Item = Result<T>>,
{
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        let item = ready!(this.inner.poll_next(cx));
        if !matches!(item, Some(Ok(_))) {
            *this.done = true;
        }
        Poll::Ready(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, self.inner.size_hint().1)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::TryStreamExt;

    use super::*;

    async fn drain<T: Send + 'static>(seq: &Sequence<T>) -> Vec<Result<T>> {
        seq.open().collect().await
    }

    mod construction {
        use super::*;

        #[tokio::test]
        async fn empty_completes_without_values() {
            let seq = Sequence::<i32>::empty();
            assert!(drain(&seq).await.is_empty());
        }

        #[tokio::test]
        async fn fail_yields_single_error() {
            let seq = Sequence::<i32>::fail(Error::msg("boom"));
            let items = drain(&seq).await;
            assert_eq!(items.len(), 1);
            assert!(matches!(&items[0], Err(Error::Message(m)) if m == "boom"));
        }

        #[tokio::test]
        async fn from_vec_replays_for_every_subscriber() {
            let seq = Sequence::from_vec(vec![1, 2, 3]);
            let first: Vec<i32> = seq.open().try_collect().await.unwrap();
            let second: Vec<i32> = seq.open().try_collect().await.unwrap();
            assert_eq!(first, vec![1, 2, 3]);
            assert_eq!(second, vec![1, 2, 3]);
        }

        #[tokio::test]
        async fn from_future_resolves_once_for_all_subscribers() {
            let polls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&polls);
            let seq = Sequence::from_future(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            });

            let a: Vec<i32> = seq.open().try_collect().await.unwrap();
            let b: Vec<i32> = seq.open().try_collect().await.unwrap();
            assert_eq!(a, vec![7]);
            assert_eq!(b, vec![7]);
            assert_eq!(polls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn from_future_is_lazy() {
            let polls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&polls);
            let _seq = Sequence::from_future(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            tokio::task::yield_now().await;
            assert_eq!(polls.load(Ordering::SeqCst), 0);
        }

        #[test]
        fn slot_survives_a_poisoned_lock() {
            let slot = Arc::new(Mutex::new(Some(5)));
            let holder = Arc::clone(&slot);
            let _ = std::thread::spawn(move || {
                let _guard = holder.lock().unwrap();
                panic!("poison the slot");
            })
            .join();
            assert!(slot.is_poisoned());
            assert_eq!(take_slot(&slot), Some(5));
            assert_eq!(take_slot(&slot), None);
        }

        #[tokio::test]
        async fn from_stream_is_unicast() {
            let seq = Sequence::from_stream(stream::iter(vec![Ok(1), Ok(2)]));
            let first: Vec<i32> = seq.open().try_collect().await.unwrap();
            assert_eq!(first, vec![1, 2]);

            let second: Result<Vec<i32>> = seq.open().try_collect().await;
            assert!(matches!(second, Err(Error::AlreadyConsumed)));
        }
    }

    mod contract {
        use super::*;

        #[tokio::test]
        async fn nothing_is_emitted_after_an_error() {
            let seq = Sequence::new(|| {
                stream::iter(vec![Ok(1), Err(Error::msg("mid")), Ok(2), Ok(3)])
            });
            let items = drain(&seq).await;
            assert_eq!(items.len(), 2);
            assert!(matches!(items[0], Ok(1)));
            assert!(items[1].is_err());
        }

        #[tokio::test]
        async fn pipe_applies_op_per_subscriber() {
            let opened = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&opened);
            let doubled = Sequence::from_vec(vec![1, 2]).pipe(move |upstream| {
                counter.fetch_add(1, Ordering::SeqCst);
                upstream.map(|item| item.map(|v| v * 2))
            });
            assert_eq!(opened.load(Ordering::SeqCst), 0);

            let a: Vec<i32> = doubled.open().try_collect().await.unwrap();
            let b: Vec<i32> = doubled.open().try_collect().await.unwrap();
            assert_eq!(a, vec![2, 4]);
            assert_eq!(a, b);
            assert_eq!(opened.load(Ordering::SeqCst), 2);
        }

        #[test]
        fn clones_share_the_factory() {
            let seq = Sequence::from_vec(vec![1]);
            let other = Sequence::from_vec(vec![1]);
            assert!(seq.ptr_eq(&seq.clone()));
            assert!(!seq.ptr_eq(&other));
        }
    }
}
