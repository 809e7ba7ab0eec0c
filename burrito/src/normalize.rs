//! Lifting any [`Source`] into its canonical [`Sequence`].

use tracing::trace;

use crate::sequence::{Filling, Sequence};
use crate::source::Source;

/// Convert a source into the canonical sequence representation.
///
/// - space: emits each element in order, then completes
/// - deferred: emits the resolved value then completes, or fails with the rejection
/// - stream: passed through unchanged
/// - wrapped: the wrapper's own sequence, never re-normalized
pub fn normalize<T: Filling>(source: impl Into<Source<T>>) -> Sequence<T> {
    let source = source.into();
    trace!(kind = %source.kind(), "normalizing source");
    match source {
        Source::Wrapped(burrito) => burrito.into_sequence(),
        Source::Space(values) => Sequence::from_vec(values),
        Source::Deferred(future) => Sequence::from_future(future),
        Source::Stream(seq) => seq,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use futures::TryStreamExt;
    use futures::stream;

    use super::*;
    use crate::burrito::Burrito;
    use crate::error::{Error, Result};

    async fn values<T: Filling>(seq: &Sequence<T>) -> Result<Vec<T>> {
        seq.open().try_collect().await
    }

    #[tokio::test]
    async fn space_keeps_order() {
        let seq = normalize(vec![3, 1, 2]);
        assert_eq!(values(&seq).await.unwrap(), vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn deferred_success_emits_once() {
        let seq = normalize(Source::deferred(async {
            futures_timer::Delay::new(Duration::from_millis(20)).await;
            Ok("done")
        }));
        assert_eq!(values(&seq).await.unwrap(), vec!["done"]);
    }

    #[tokio::test]
    async fn deferred_rejection_is_a_stream_error() {
        let seq = normalize(Source::<i32>::deferred(async {
            Err(Error::rejected("rejected"))
        }));
        let items: Vec<Result<i32>> = futures::StreamExt::collect(seq.open()).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::Rejected(_))));
    }

    #[tokio::test]
    async fn stream_passes_through() {
        let original = Sequence::new(|| stream::iter(vec![Ok(1), Ok(2)]));
        let seq = normalize(original.clone());
        assert!(seq.ptr_eq(&original));
        assert_eq!(values(&seq).await.unwrap(), vec![1, 2]);
    }

    #[test]
    fn wrapper_is_unwrapped_not_renormalized() {
        let burrito = Burrito::wrap_all([1, 2]);
        let seq = normalize(burrito.clone());
        assert!(seq.ptr_eq(burrito.sequence()));
    }
}
