//! The load run itself: cache replay or live paging, events out as they
//! happen.
//!
//! One run steps `Idle`, `Connecting`, `CacheHit` or `CacheMiss`,
//! `Streaming`, `Done`, with `Error` reachable while connecting or
//! streaming. The event order the consumer sees is fixed: progress,
//! chunks, schemas, done; a failed run ends with a single error event
//! and nothing after it.

use std::collections::HashSet;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, bounded};
use log::{debug, info, warn};

use crate::cache::MetaCache;
use crate::cancel::CancelToken;
use crate::loader::batch::{AdaptiveBatcher, TuningConfig};
use crate::loader::events::LoaderEvent;
use crate::source::{QueryBuilder, QueryExecutor};
use crate::types::{ColumnInfo, LoadRequest, SchemaInfo, TableInfo, schemas_from_tables};
use crate::utils::config::LoaderConsts;

/// Lifecycle of one run. Logged on every transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoaderState {
    Idle,
    Connecting,
    CacheHit,
    CacheMiss,
    Streaming,
    Done,
    Error,
}

fn transition(state: &mut LoaderState, next: LoaderState) {
    debug!("loader state {state:?} -> {next:?}");
    *state = next;
}

/// How a run ended. A failure is an outcome, not an `Err`: the stream
/// already carried the error event, the caller only picks an exit path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Live stream ran to exhaustion.
    Completed { tables: usize },
    /// Served entirely from cache.
    FromCache { tables: usize },
    Cancelled,
    Failed { message: String },
}

/// Everything one run needs, bundled so the entry points stay readable.
/// Executor, builder and cache are injected; nothing here is global.
pub struct LoadContext<'a> {
    pub executor: &'a mut dyn QueryExecutor,
    pub builder: &'a dyn QueryBuilder,
    pub cache: &'a MetaCache,
    pub tuning: TuningConfig,
    pub cancel: CancelToken,
}

/// Run one load on the current thread, handing each event to `emit`.
/// Never panics and never returns `Err`: every failure mode is either an
/// error event plus [`LoadOutcome::Failed`], or a logged degradation.
pub fn run_load(
    ctx: &mut LoadContext,
    request: &LoadRequest,
    emit: &mut dyn FnMut(LoaderEvent),
) -> LoadOutcome {
    let mut state = LoaderState::Idle;
    transition(&mut state, LoaderState::Connecting);
    emit(progress("Connecting to database", 0, 0));

    let cached = if request.refresh {
        debug!("refresh requested, skipping cache read");
        None
    } else {
        ctx.cache.load(request.schema_filter.as_deref())
    };

    match cached {
        Some((tables, columns)) => {
            transition(&mut state, LoaderState::CacheHit);
            replay_cached(ctx, request, tables, columns, &mut state, emit)
        }
        None => {
            transition(&mut state, LoaderState::CacheMiss);
            stream_live(ctx, request, &mut state, emit)
        }
    }
}

/// Replay a cached entry as chunk events: a small first chunk for fast
/// first paint, then `batch_size` per chunk. Rows before `start_offset`
/// are skipped; the consumer already has them from the prior run.
fn replay_cached(
    ctx: &mut LoadContext,
    request: &LoadRequest,
    tables: Vec<TableInfo>,
    columns: Vec<ColumnInfo>,
    state: &mut LoaderState,
    emit: &mut dyn FnMut(LoaderEvent),
) -> LoadOutcome {
    let total = tables.len();
    info!("cache hit: {total} tables, {} columns", columns.len());
    let mut cursor = request.start_offset.min(total);
    emit(progress("Loading from cache", cursor, total));

    let mut first = true;
    while cursor < total {
        if ctx.cancel.is_cancelled() {
            info!("cancelled during cache replay at {cursor}/{total} tables");
            return LoadOutcome::Cancelled;
        }
        let budget = if first {
            request.initial_limit.min(ctx.tuning.first_chunk_cap)
        } else {
            request.batch_size
        }
        .max(1);
        first = false;
        let end = (cursor + budget).min(total);
        let chunk_tables = tables[cursor..end].to_vec();
        let chunk_columns = columns_for_chunk(&columns, &chunk_tables);
        cursor = end;
        emit(LoaderEvent::Chunk {
            tables: chunk_tables,
            columns: chunk_columns,
            loaded: cursor,
            estimated: total,
        });
    }
    if ctx.cancel.is_cancelled() {
        info!("cancelled after cache replay, suppressing done");
        return LoadOutcome::Cancelled;
    }

    let schemas = ctx
        .cache
        .load_schemas()
        .unwrap_or_else(|| schemas_from_tables(&tables));
    emit(LoaderEvent::Schemas { schemas });
    transition(state, LoaderState::Done);
    emit(LoaderEvent::Done);
    LoadOutcome::FromCache { tables: total }
}

/// Page the executor until a short or empty page, emitting a chunk per
/// page and feeding page times to the batch controller. On exhaustion the
/// accumulated set is persisted and the schemas event goes out.
fn stream_live(
    ctx: &mut LoadContext,
    request: &LoadRequest,
    state: &mut LoaderState,
    emit: &mut dyn FnMut(LoaderEvent),
) -> LoadOutcome {
    transition(state, LoaderState::Streaming);
    emit(progress("Loading table metadata", request.start_offset, 0));

    let mut batcher = AdaptiveBatcher::new(request.batch_size, ctx.tuning.clone());
    let mut all_tables: Vec<TableInfo> = Vec::new();
    let mut all_columns: Vec<ColumnInfo> = Vec::new();
    let mut offset = request.start_offset;
    let mut loaded = request.start_offset;
    let mut first = true;

    loop {
        if ctx.cancel.is_cancelled() {
            info!("cancelled after {} tables, no cache write", all_tables.len());
            return LoadOutcome::Cancelled;
        }
        let budget = if first {
            request.initial_limit.min(ctx.tuning.first_chunk_cap)
        } else {
            batcher.size()
        }
        .max(1);
        first = false;

        let started = Instant::now();
        let page = match fetch_page(ctx, request, budget, offset) {
            Ok(page) => page,
            Err(err) => {
                transition(state, LoaderState::Error);
                let message = format!("{err:#}");
                warn!("load failed: {message}");
                emit(LoaderEvent::Error {
                    message: message.clone(),
                });
                return LoadOutcome::Failed { message };
            }
        };
        let elapsed = started.elapsed();

        if page.tables.is_empty() {
            break;
        }
        let got = page.tables.len();
        let exhausted = got < budget;
        offset += got;
        loaded += got;
        batcher.record(elapsed);
        let estimated = if exhausted {
            loaded
        } else {
            loaded + batcher.size()
        };

        all_tables.extend(page.tables.iter().cloned());
        all_columns.extend(page.columns.iter().cloned());
        emit(LoaderEvent::Chunk {
            tables: page.tables,
            columns: page.columns,
            loaded,
            estimated,
        });
        if exhausted {
            break;
        }
    }
    if ctx.cancel.is_cancelled() {
        info!("cancelled after final page, suppressing done and cache write");
        return LoadOutcome::Cancelled;
    }

    // A resumed run only accumulated the tail; caching it under the
    // filter key would replay an incomplete set as if it were everything.
    if request.start_offset == 0 {
        ctx.cache
            .save(request.schema_filter.as_deref(), &all_tables, &all_columns);
    } else {
        debug!(
            "resumed at offset {}, skipping cache write of partial set",
            request.start_offset
        );
    }

    let schemas = match ctx.cache.load_schemas() {
        Some(schemas) => schemas,
        None => {
            let derived = schemas_from_tables(&all_tables);
            // Same poisoning concern: a filtered or resumed run sees only
            // a slice of the schema list.
            if request.schema_filter.is_none() && request.start_offset == 0 {
                ctx.cache.save_schemas(&derived);
            }
            derived
        }
    };
    emit(LoaderEvent::Schemas { schemas });
    transition(state, LoaderState::Done);
    emit(LoaderEvent::Done);
    info!(
        "loaded {} tables, {} columns",
        all_tables.len(),
        all_columns.len()
    );
    LoadOutcome::Completed {
        tables: all_tables.len(),
    }
}

struct Page {
    tables: Vec<TableInfo>,
    columns: Vec<ColumnInfo>,
}

/// Fetch one page: the tables query, then the page's columns. Raw rows
/// convert to canonical types right here and nowhere else.
fn fetch_page(
    ctx: &mut LoadContext,
    request: &LoadRequest,
    limit: usize,
    offset: usize,
) -> Result<Page> {
    let sql = ctx
        .builder
        .tables_page_query(request.schema_filter.as_deref(), limit, offset);
    let rows = ctx.executor.execute(&sql).context("fetch tables page")?;
    let tables: Vec<TableInfo> = rows.iter().map(TableInfo::from_row).collect();
    if tables.is_empty() {
        return Ok(Page {
            tables,
            columns: Vec::new(),
        });
    }
    let sql = ctx.builder.columns_query(&tables);
    let rows = ctx
        .executor
        .execute(&sql)
        .context("fetch columns for page")?;
    let columns = rows.iter().map(ColumnInfo::from_row).collect();
    Ok(Page { tables, columns })
}

/// Columns belonging to the chunk's tables, preserving cached order.
fn columns_for_chunk(columns: &[ColumnInfo], tables: &[TableInfo]) -> Vec<ColumnInfo> {
    let keys: HashSet<(&str, &str)> = tables
        .iter()
        .map(|t| (t.schema.as_str(), t.name.as_str()))
        .collect();
    columns
        .iter()
        .filter(|c| keys.contains(&c.table_key()))
        .cloned()
        .collect()
}

fn progress(message: &str, current: usize, total: usize) -> LoaderEvent {
    LoaderEvent::Progress {
        message: message.to_string(),
        current,
        total,
    }
}

/// A running load: receive events, cancel it, join for the outcome.
pub struct LoaderHandle {
    pub events: Receiver<LoaderEvent>,
    pub cancel: CancelToken,
    handle: JoinHandle<LoadOutcome>,
}

impl LoaderHandle {
    /// Wait for the worker thread and return its outcome.
    pub fn join(self) -> Result<LoadOutcome> {
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("loader thread panicked"))
    }
}

/// Run a load on its own thread, events over a bounded channel. A slow
/// consumer backpressures the worker; a dropped receiver cancels the run
/// so the worker winds down quietly instead of filling a dead channel.
pub fn spawn_load(
    mut executor: Box<dyn QueryExecutor + Send>,
    builder: Box<dyn QueryBuilder + Send>,
    cache: MetaCache,
    tuning: TuningConfig,
    request: LoadRequest,
    cancel: CancelToken,
) -> LoaderHandle {
    let (event_tx, event_rx) = bounded(LoaderConsts::EVENT_CHANNEL_CAP);
    let worker_cancel = cancel.clone();
    let handle = thread::spawn(move || {
        let emit_cancel = worker_cancel.clone();
        let mut ctx = LoadContext {
            executor: &mut *executor,
            builder: &*builder,
            cache: &cache,
            tuning,
            cancel: worker_cancel,
        };
        let mut emit = move |event: LoaderEvent| {
            if event_tx.send(event).is_err() {
                emit_cancel.cancel();
            }
        };
        run_load(&mut ctx, &request, &mut emit)
    });
    LoaderHandle {
        events: event_rx,
        cancel,
        handle,
    }
}

/// Collected result of a drained run, for callers that don't need
/// streaming.
#[derive(Clone, Debug, Default)]
pub struct LoadedMeta {
    pub tables: Vec<TableInfo>,
    pub columns: Vec<ColumnInfo>,
    pub schemas: Vec<SchemaInfo>,
}
