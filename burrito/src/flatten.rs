//! Flattening a sequence of sources into one sequence of values.
//!
//! Two disciplines are provided:
//!
//! - [`MergeFlatten`]: every inner source is subscribed as soon as it arrives
//!   and all of them run concurrently. Output completes once the outer stream
//!   and every inner stream have completed.
//! - [`SwitchFlatten`]: at most one inner source is active. A new outer value
//!   drops (cancels) the current inner stream before the new one is opened.
//!
//! Both terminate immediately on the first error from the outer stream or any
//! inner stream.
//!
//! Inner streams are polled before the outer stream is pulled again, so an
//! inner source that is synchronously ready emits all of its values before
//! the next outer value is seen.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};
use tracing::trace;

use crate::error::Result;
use crate::normalize::normalize;
use crate::sequence::Filling;
use crate::source::Source;

fn open_inner<S, T>(source: S) -> BoxStream<'static, Result<T>>
where
    S: Into<Source<T>>,
    T: Filling,
{
    normalize(source).open()
}

/// Merge-discipline flatten stream.
#[must_use = "streams do nothing unless polled"]
pub struct MergeFlatten<S, T> {
    outer: BoxStream<'static, Result<S>>,
    inners: Vec<BoxStream<'static, Result<T>>>,
    outer_done: bool,
    failed: bool,
}

impl<S, T> MergeFlatten<S, T> {
    /// Flatten `outer` with the merge discipline.
    pub fn new(outer: BoxStream<'static, Result<S>>) -> Self {
        Self {
            outer,
            inners: Vec::new(),
            outer_done: false,
            failed: false,
        }
    }

    /// Number of inner streams currently subscribed.
    #[must_use]
    pub fn active(&self) -> usize {
        self.inners.len()
    }

    fn fail(&mut self) {
        self.failed = true;
        self.outer_done = true;
        self.inners.clear();
    }
}

impl<S, T> fmt::Debug for MergeFlatten<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeFlatten")
            .field("active", &self.inners.len())
            .field("outer_done", &self.outer_done)
            .finish_non_exhaustive()
    }
}

impl<S, T> Stream for MergeFlatten<S, T>
where
    S: Into<Source<T>>,
    T: Filling,
{
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.failed {
            return Poll::Ready(None);
        }

        loop {
            let mut i = 0;
            while i < this.inners.len() {
                match this.inners[i].poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(value))) => return Poll::Ready(Some(Ok(value))),
                    Poll::Ready(Some(Err(err))) => {
                        this.fail();
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Ready(None) => {
                        drop(this.inners.remove(i));
                    }
                    Poll::Pending => i += 1,
                }
            }

            if this.outer_done {
                return if this.inners.is_empty() {
                    Poll::Ready(None)
                } else {
                    Poll::Pending
                };
            }

            match this.outer.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(source))) => this.inners.push(open_inner(source)),
                Poll::Ready(Some(Err(err))) => {
                    this.fail();
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => this.outer_done = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Switch-discipline flatten stream.
#[must_use = "streams do nothing unless polled"]
pub struct SwitchFlatten<S, T> {
    outer: BoxStream<'static, Result<S>>,
    active: Option<BoxStream<'static, Result<T>>>,
    outer_done: bool,
    failed: bool,
}

impl<S, T> SwitchFlatten<S, T> {
    /// Flatten `outer` with the switch discipline.
    pub fn new(outer: BoxStream<'static, Result<S>>) -> Self {
        Self {
            outer,
            active: None,
            outer_done: false,
            failed: false,
        }
    }

    /// Returns `true` while an inner stream is subscribed.
    #[must_use]
    pub const fn has_active(&self) -> bool {
        self.active.is_some()
    }

    fn fail(&mut self) {
        self.failed = true;
        self.outer_done = true;
        self.active = None;
    }
}

impl<S, T> fmt::Debug for SwitchFlatten<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchFlatten")
            .field("has_active", &self.active.is_some())
            .field("outer_done", &self.outer_done)
            .finish_non_exhaustive()
    }
}

impl<S, T> Stream for SwitchFlatten<S, T>
where
    S: Into<Source<T>>,
    T: Filling,
{
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.failed {
            return Poll::Ready(None);
        }

        loop {
            if let Some(inner) = this.active.as_mut() {
                match inner.poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(value))) => return Poll::Ready(Some(Ok(value))),
                    Poll::Ready(Some(Err(err))) => {
                        this.fail();
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Ready(None) => this.active = None,
                    Poll::Pending => {}
                }
            }

            if this.outer_done {
                return if this.active.is_none() {
                    Poll::Ready(None)
                } else {
                    Poll::Pending
                };
            }

            match this.outer.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(source))) => {
                    if this.active.take().is_some() {
                        trace!("switch_map cancelled active inner sequence");
                    }
                    this.active = Some(open_inner(source));
                }
                Poll::Ready(Some(Err(err))) => {
                    this.fail();
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => this.outer_done = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
