//! Stateful element-wise operators.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use async_stream::stream;
use futures::stream::{Stream, StreamExt};
use pin_project_lite::pin_project;

use crate::error::{Error, Result};

pin_project! {
    /// Drops a value when `same(last_emitted, value)` holds.
    ///
    /// Only the most recently emitted value is compared, never the full history.
    #[must_use = "streams do nothing unless polled"]
    pub struct DistinctUntilChanged<S, T, F> {
        #[pin]
        upstream: S,
        same: F,
        last: Option<T>,
    }
}

impl<S, T, F> DistinctUntilChanged<S, T, F> {
    /// Suppress consecutive values of `upstream` that `same` considers equal.
    pub const fn new(upstream: S, same: F) -> Self {
        Self {
            upstream,
            same,
            last: None,
        }
    }
}

impl<S, T, F> Stream for DistinctUntilChanged<S, T, F>
where
    S: Stream<Item = Result<T>>,
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            match ready!(this.upstream.as_mut().poll_next(cx)) {
                Some(Ok(value)) => {
                    if let Some(last) = this.last.as_ref() {
                        if (this.same)(last, &value) {
                            continue;
                        }
                    }
                    *this.last = Some(value.clone());
                    return Poll::Ready(Some(Ok(value)));
                }
                other => return Poll::Ready(other),
            }
        }
    }
}

/// Emit the first upstream value matching `predicate`, then complete.
///
/// When upstream completes without a match, emits `default` if given and
/// fails with [`Error::NoMatch`] otherwise. Upstream is dropped as soon as a
/// match is found.
pub fn first<S, T, P>(
    upstream: S,
    predicate: Arc<P>,
    default: Option<T>,
) -> impl Stream<Item = Result<T>> + Send
where
    S: Stream<Item = Result<T>> + Send + Unpin,
    T: Send,
    P: Fn(&T, usize) -> bool + Send + Sync + ?Sized,
{
    stream! {
        let mut upstream = upstream;
        let mut index = 0;
        while let Some(item) = upstream.next().await {
            match item {
                Ok(value) => {
                    if predicate(&value, index) {
                        yield Ok(value);
                        return;
                    }
                    index += 1;
                }
                Err(err) => {
                    yield Err(err);
                    return;
                }
            }
        }
        match default {
            Some(value) => yield Ok(value),
            None => yield Err(Error::NoMatch),
        }
    }
}
