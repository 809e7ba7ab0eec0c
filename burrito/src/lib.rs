//! Burrito - one sequence type for lists, futures and streams
//!
//! This crate normalizes three differently shaped data producers into a
//! single canonical push-based [`Sequence`], and wraps it in a chainable
//! [`Burrito`] handle:
//!
//! - a **space** source: a finite `Vec<T>`
//! - a **deferred** source: a future resolving to one value or an error
//! - a **stream** source: zero or more values over time, then completion or error
//!
//! Scheduling is left to the surrounding async runtime. Sequences are built
//! on `futures` streams, timers come from `futures-timer`, and
//! [`Burrito::subscribe`] drives long-running work on the ambient tokio
//! runtime.
//!
//! # Example
//!
//! ```rust,ignore
//! use burrito::prelude::*;
//!
//! let doubled = wrap_all![1, 2, 3, 4]
//!     .filter(|v, _| v % 2 == 0)
//!     .map(|v| v * 2)
//!     .collect()
//!     .await?;
//! assert_eq!(doubled, vec![4, 8]);
//! ```
//!
//! # Fan-out
//!
//! Sequences are cold: every `collect` or `subscribe` opens its own stream.
//! Lists replay their elements, and deferred values share their one
//! resolution between subscribers. A one-shot [`futures::Stream`] wrapped
//! with [`Source::stream`] can be consumed only once; later subscribers fail
//! with [`Error::AlreadyConsumed`].

pub mod burrito;
pub mod error;
pub mod flatten;
pub mod normalize;
pub mod ops;
pub mod prelude;
pub mod sequence;
pub mod source;
pub mod subscription;
pub mod timing;

pub use burrito::Burrito;
pub use error::{Error, Result};
pub use normalize::normalize;
pub use sequence::{Filling, Sequence};
pub use source::{Source, SourceKind};
pub use subscription::{CallbackObserver, Observer, Subscription, observer};
