//! Time-gated operators.
//!
//! Timers come from [`futures_timer`], so these streams run on any executor.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::stream::Stream;
use futures_timer::Delay;
use pin_project_lite::pin_project;

use crate::error::Result;

pin_project! {
    /// Emits a value once `period` passes with no newer upstream value.
    ///
    /// A value still pending when upstream completes is emitted right before
    /// completion. An upstream error discards the pending value.
    #[must_use = "streams do nothing unless polled"]
    pub struct Debounced<S, T> {
        #[pin]
        upstream: S,
        period: Duration,
        pending: Option<T>,
        timer: Option<Delay>,
        upstream_done: bool,
    }
}

impl<S, T> Debounced<S, T> {
    /// Debounce `upstream` by `period`.
    pub const fn new(upstream: S, period: Duration) -> Self {
        Self {
            upstream,
            period,
            pending: None,
            timer: None,
            upstream_done: false,
        }
    }
}

impl<S, T> Stream for Debounced<S, T>
where
    S: Stream<Item = Result<T>>,
{
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        while !*this.upstream_done {
            match this.upstream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(value))) => {
                    *this.pending = Some(value);
                    *this.timer = Some(Delay::new(*this.period));
                }
                Poll::Ready(Some(Err(err))) => {
                    *this.upstream_done = true;
                    *this.pending = None;
                    *this.timer = None;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    *this.upstream_done = true;
                    *this.timer = None;
                    return Poll::Ready(this.pending.take().map(Ok));
                }
                Poll::Pending => break,
            }
        }

        if let Some(timer) = this.timer.as_mut() {
            if timer.poll_unpin(cx).is_pending() {
                return Poll::Pending;
            }
            *this.timer = None;
            if let Some(value) = this.pending.take() {
                return Poll::Ready(Some(Ok(value)));
            }
        }

        if *this.upstream_done {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}

pin_project! {
    /// Emits the first value of a burst, then drops values until `window`
    /// has passed since that emission.
    #[must_use = "streams do nothing unless polled"]
    pub struct Throttled<S> {
        #[pin]
        upstream: S,
        window: Duration,
        last_emit: Option<Instant>,
    }
}

impl<S> Throttled<S> {
    /// Throttle `upstream` to one value per `window`.
    pub const fn new(upstream: S, window: Duration) -> Self {
        Self {
            upstream,
            window,
            last_emit: None,
        }
    }
}

impl<S, T> Stream for Throttled<S>
where
    S: Stream<Item = Result<T>>,
{
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            match this.upstream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(value))) => {
                    let now = Instant::now();
                    let open = this
                        .last_emit
                        .is_none_or(|at| now.duration_since(at) >= *this.window);
                    if open {
                        *this.last_emit = Some(now);
                        return Poll::Ready(Some(Ok(value)));
                    }
                }
                other => return other,
            }
        }
    }
}

pin_project! {
    /// Shifts every upstream signal, values and termination alike, later by `delay`.
    #[must_use = "streams do nothing unless polled"]
    pub struct Delayed<S, T> {
        #[pin]
        upstream: S,
        delay: Duration,
        queue: VecDeque<(Delay, Result<T>)>,
        end: Option<Delay>,
        upstream_done: bool,
    }
}

impl<S, T> Delayed<S, T> {
    /// Delay every signal of `upstream` by `delay`.
    pub const fn new(upstream: S, delay: Duration) -> Self {
        Self {
            upstream,
            delay,
            queue: VecDeque::new(),
            end: None,
            upstream_done: false,
        }
    }
}

impl<S, T> Stream for Delayed<S, T>
where
    S: Stream<Item = Result<T>>,
{
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        while !*this.upstream_done {
            match this.upstream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => {
                    // errors are terminal; the queue still drains up to them
                    *this.upstream_done = item.is_err();
                    this.queue.push_back((Delay::new(*this.delay), item));
                }
                Poll::Ready(None) => {
                    *this.upstream_done = true;
                    *this.end = Some(Delay::new(*this.delay));
                }
                Poll::Pending => break,
            }
        }

        if let Some((timer, _)) = this.queue.front_mut() {
            if timer.poll_unpin(cx).is_pending() {
                return Poll::Pending;
            }
            return Poll::Ready(this.queue.pop_front().map(|(_, item)| item));
        }

        if !*this.upstream_done {
            return Poll::Pending;
        }
        if let Some(timer) = this.end.as_mut() {
            if timer.poll_unpin(cx).is_pending() {
                return Poll::Pending;
            }
        }
        *this.end = None;
        Poll::Ready(None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::StreamExt;
    use futures::channel::mpsc;
    use futures::stream;
    use tokio_test::{assert_pending, task};

    use super::*;
    use crate::error::Error;

    fn burst(values: Vec<i32>) -> impl Stream<Item = Result<i32>> {
        stream::iter(values.into_iter().map(Ok))
    }

    mod debounce {
        use super::*;

        #[tokio::test]
        async fn synchronous_burst_keeps_last() {
            let out: Vec<Result<i32>> =
                Debounced::new(burst(vec![1, 1, 2, 2, 3, 3]), Duration::from_millis(50))
                    .collect()
                    .await;
            assert_eq!(out.len(), 1);
            assert!(matches!(out[0], Ok(3)));
        }

        #[tokio::test]
        async fn emits_after_quiet_period() {
            let (tx, rx) = mpsc::unbounded::<Result<i32>>();
            let mut debounced = Debounced::new(rx, Duration::from_millis(20));

            tx.unbounded_send(Ok(1)).unwrap();
            tx.unbounded_send(Ok(2)).unwrap();
            assert!(matches!(debounced.next().await, Some(Ok(2))));

            tx.unbounded_send(Ok(3)).unwrap();
            assert!(matches!(debounced.next().await, Some(Ok(3))));

            drop(tx);
            assert!(debounced.next().await.is_none());
        }

        #[tokio::test]
        async fn newer_value_restarts_the_timer() {
            let upstream = async_stream::stream! {
                yield Ok::<i32, Error>(1);
                tokio::time::sleep(Duration::from_millis(15)).await;
                yield Ok(2);
                tokio::time::sleep(Duration::from_millis(80)).await;
                yield Ok(3);
            };
            let out: Vec<i32> = Debounced::new(upstream, Duration::from_millis(40))
                .map(Result::unwrap)
                .collect()
                .await;
            assert_eq!(out, vec![2, 3]);
        }

        #[test]
        fn holds_value_while_upstream_is_open() {
            let (tx, rx) = mpsc::unbounded::<Result<i32>>();
            let mut debounced = task::spawn(Debounced::new(rx, Duration::from_secs(60)));
            tx.unbounded_send(Ok(1)).unwrap();
            assert_pending!(debounced.poll_next());
        }

        #[tokio::test]
        async fn error_discards_pending_value() {
            let upstream = stream::iter(vec![Ok(1), Err(Error::msg("boom"))]);
            let out: Vec<Result<i32>> = Debounced::new(upstream, Duration::from_millis(10))
                .collect()
                .await;
            assert_eq!(out.len(), 1);
            assert!(out[0].is_err());
        }
    }

    mod throttle {
        use super::*;

        #[tokio::test]
        async fn synchronous_burst_keeps_first() {
            let out: Vec<Result<i32>> =
                Throttled::new(burst(vec![1, 1, 2, 2, 3, 3]), Duration::from_millis(50))
                    .collect()
                    .await;
            assert_eq!(out.len(), 1);
            assert!(matches!(out[0], Ok(1)));
        }

        #[tokio::test]
        async fn window_reopens_after_quiet_period() {
            let upstream = async_stream::stream! {
                yield Ok::<i32, Error>(1);
                yield Ok(2);
                tokio::time::sleep(Duration::from_millis(40)).await;
                yield Ok(3);
                yield Ok(4);
            };
            let out: Vec<i32> = Throttled::new(upstream, Duration::from_millis(20))
                .map(Result::unwrap)
                .collect()
                .await;
            assert_eq!(out, vec![1, 3]);
        }
    }

    mod delay {
        use super::*;

        #[tokio::test]
        async fn preserves_order_and_values() {
            let start = Instant::now();
            let out: Vec<i32> = Delayed::new(burst(vec![1, 2, 3]), Duration::from_millis(30))
                .map(Result::unwrap)
                .collect()
                .await;
            assert_eq!(out, vec![1, 2, 3]);
            assert!(start.elapsed() >= Duration::from_millis(30));
        }

        #[tokio::test]
        async fn completion_is_shifted() {
            let start = Instant::now();
            let out: Vec<Result<i32>> = Delayed::new(burst(vec![]), Duration::from_millis(30))
                .collect()
                .await;
            assert!(out.is_empty());
            assert!(start.elapsed() >= Duration::from_millis(30));
        }

        #[test]
        fn nothing_is_ready_before_the_delay() {
            let mut delayed = task::spawn(Delayed::new(burst(vec![1]), Duration::from_secs(60)));
            assert_pending!(delayed.poll_next());
        }

        #[tokio::test]
        async fn error_is_shifted() {
            let start = Instant::now();
            let upstream = stream::iter(vec![Err::<i32, _>(Error::msg("now"))]);
            let out: Vec<Result<i32>> = Delayed::new(upstream, Duration::from_millis(50))
                .collect()
                .await;
            assert_eq!(out.len(), 1);
            assert!(out[0].is_err());
            assert!(start.elapsed() >= Duration::from_millis(50));
        }

        #[tokio::test]
        async fn error_is_delivered_after_earlier_values() {
            let upstream = stream::iter(vec![Ok(1), Err(Error::msg("late")), Ok(2)]);
            let out: Vec<Result<i32>> = Delayed::new(upstream, Duration::from_millis(5))
                .collect()
                .await;
            assert_eq!(out.len(), 2);
            assert!(matches!(out[0], Ok(1)));
            assert!(out[1].is_err());
        }
    }
}
