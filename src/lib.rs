//! Schemax: database metadata browsing core. Cached streaming loads,
//! prefix/fuzzy search, and a line-JSON event protocol.

pub mod cache;
pub mod cancel;
pub mod cli;
pub mod loader;
pub mod search;
pub mod source;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;

/// Result alias used by the public schemax API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub use cache::{CacheConfig, MetaCache, cache_key, default_cache_dir};
pub use cancel::CancelToken;
pub use loader::{
    LoadContext, LoadOutcome, LoadedMeta, LoaderEvent, StartArgs, TuningConfig, run_load,
    spawn_load,
};
pub use search::{SearchIndex, SearchResults};
pub use source::{AnsiQueries, MockExecutor, QueryBuilder, QueryExecutor};

/// Single convenience entry point: run one load to completion on the
/// current thread, collecting the stream into a [`LoadedMeta`].
///
/// With `on_event: None` this is plain collection; read the result when
/// the run finishes. With `Some(f)`, `f` observes every event as it
/// happens (drive a UI, forward over a socket) while collection still
/// runs. Keep it fast or hand off to a channel.
///
/// Callers that want the load off their thread use [`spawn_load`]
/// instead and drain the channel themselves.
pub fn load_metadata<F>(
    ctx: &mut LoadContext,
    request: &LoadRequest,
    on_event: Option<F>,
) -> (LoadedMeta, LoadOutcome)
where
    F: FnMut(&LoaderEvent),
{
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        request
    );
    let mut on_event = on_event;
    let mut meta = LoadedMeta::default();
    let outcome = run_load(ctx, request, &mut |event| {
        if let Some(f) = on_event.as_mut() {
            f(&event);
        }
        match event {
            LoaderEvent::Chunk {
                tables, columns, ..
            } => {
                meta.tables.extend(tables);
                meta.columns.extend(columns);
            }
            LoaderEvent::Schemas { schemas } => meta.schemas = schemas,
            _ => {}
        }
    });
    (meta, outcome)
}
