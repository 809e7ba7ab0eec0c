//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use burrito::prelude::*;
//! ```

pub use crate::burrito::Burrito;
pub use crate::error::{Error, Result};
pub use crate::sequence::{Filling, Sequence};
pub use crate::source::{Source, SourceKind};
pub use crate::subscription::{CallbackObserver, Observer, Subscription, observer};
pub use crate::wrap_all;
