//! Streaming metadata loader: cache replay or adaptive live paging,
//! events over a channel.

pub mod batch;
pub mod events;
pub mod stream;

pub use batch::{AdaptiveBatcher, TuningConfig};
pub use events::{Command, LoaderEvent, StartArgs};
pub use stream::{LoadContext, LoadOutcome, LoadedMeta, LoaderHandle, run_load, spawn_load};
