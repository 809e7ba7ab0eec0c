//! Push-based consumption: observers and subscription handles.
//!
//! [`attach`] delivers every value that is available synchronously before it
//! returns, then hands the rest of the sequence to the ambient tokio runtime.
//! The returned [`Subscription`] can cancel that remaining work.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::future::{AbortHandle, Abortable};
use futures::stream::{BoxStream, StreamExt};
use futures::task::noop_waker_ref;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Receives the signals of a sequence.
///
/// Only [`next`](Observer::next) is required. Without an
/// [`error`](Observer::error) override, failures are logged at `warn` level
/// and otherwise swallowed.
///
/// Any `FnMut(T)` closure is an observer that only handles values.
pub trait Observer<T>: Send + 'static {
    /// Called once per emitted value.
    fn next(&mut self, value: T);

    /// Called at most once, when the sequence fails.
    fn error(&mut self, error: Error) {
        warn!(error = %error, "sequence failed with no error handler registered");
    }

    /// Called at most once, when the sequence completes.
    fn complete(&mut self) {}
}

impl<T, F> Observer<T> for F
where
    F: FnMut(T) + Send + 'static,
{
    fn next(&mut self, value: T) {
        self(value);
    }
}

/// An observer assembled from separate callbacks.
///
/// # Example
///
/// ```rust,ignore
/// use burrito::observer;
///
/// let obs = observer(|v: i32| println!("{v}"))
///     .on_error(|e| eprintln!("failed: {e}"))
///     .on_complete(|| println!("done"));
/// ```
pub struct CallbackObserver<T> {
    next: Box<dyn FnMut(T) + Send>,
    error: Option<Box<dyn FnMut(Error) + Send>>,
    complete: Option<Box<dyn FnMut() + Send>>,
}

/// Start a [`CallbackObserver`] from a value callback.
pub fn observer<T, F>(next: F) -> CallbackObserver<T>
where
    F: FnMut(T) + Send + 'static,
{
    CallbackObserver {
        next: Box::new(next),
        error: None,
        complete: None,
    }
}

impl<T> CallbackObserver<T> {
    /// Handle the terminal error.
    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(Error) + Send + 'static,
    {
        self.error = Some(Box::new(f));
        self
    }

    /// Handle completion.
    #[must_use]
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.complete = Some(Box::new(f));
        self
    }
}

impl<T> fmt::Debug for CallbackObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackObserver")
            .field("on_error", &self.error.is_some())
            .field("on_complete", &self.complete.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: 'static> Observer<T> for CallbackObserver<T> {
    fn next(&mut self, value: T) {
        (self.next)(value);
    }

    fn error(&mut self, error: Error) {
        match self.error.as_mut() {
            Some(handler) => handler(error),
            None => warn!(error = %error, "sequence failed with no error handler registered"),
        }
    }

    fn complete(&mut self) {
        if let Some(handler) = self.complete.as_mut() {
            handler();
        }
    }
}

/// Handle to an attached observer.
///
/// Dropping the handle does not cancel delivery; call
/// [`unsubscribe`](Self::unsubscribe) for that.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    abort: Option<AbortHandle>,
    closed: Arc<AtomicBool>,
}

impl Subscription {
    fn finished(id: u64) -> Self {
        debug!(subscription = id, "subscription closed");
        Self {
            id,
            abort: None,
            closed: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Process-unique id, used in log events.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns `true` once the sequence terminated or the subscription was cancelled.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop delivery and drop all upstream work owned by this subscription.
    ///
    /// The observer receives neither `error` nor `complete` afterwards.
    pub fn unsubscribe(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(abort) = &self.abort {
            abort.abort();
        }
        debug!(subscription = self.id, "unsubscribed");
    }
}

fn next_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// Forward one signal; returns `false` once the sequence has terminated.
fn dispatch<T, O: Observer<T>>(observer: &mut O, signal: Option<Result<T>>) -> bool {
    match signal {
        Some(Ok(value)) => {
            observer.next(value);
            true
        }
        Some(Err(error)) => {
            observer.error(error);
            false
        }
        None => {
            observer.complete();
            false
        }
    }
}

/// Attach `observer` to an opened stream.
pub(crate) fn attach<T, O>(mut stream: BoxStream<'static, Result<T>>, mut observer: O) -> Subscription
where
    T: Send + 'static,
    O: Observer<T>,
{
    let id = next_id();
    debug!(subscription = id, "subscription attached");

    let mut cx = Context::from_waker(noop_waker_ref());
    loop {
        match stream.poll_next_unpin(&mut cx) {
            Poll::Ready(signal) => {
                if !dispatch(&mut observer, signal) {
                    return Subscription::finished(id);
                }
            }
            Poll::Pending => break,
        }
    }

    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        observer.error(Error::NoRuntime);
        return Subscription::finished(id);
    };

    let closed = Arc::new(AtomicBool::new(false));
    let (abort, registration) = AbortHandle::new_pair();
    let done = Arc::clone(&closed);
    let drive = async move {
        loop {
            let signal = stream.next().await;
            if !dispatch(&mut observer, signal) {
                break;
            }
        }
        done.store(true, Ordering::Release);
        debug!(subscription = id, "subscription closed");
    };
    handle.spawn(Abortable::new(drive, registration));

    Subscription {
        id,
        abort: Some(abort),
        closed,
    }
}
