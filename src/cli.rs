//! CLI command handler: load metadata and stream JSON events to stdout.
//! `--stdin` switches to protocol mode driven by start/cancel commands;
//! `--pretty` trades the event stream for a progress bar and a human
//! summary.

use std::env;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossbeam_channel::{Receiver, bounded};
use kdam::{Animation, Bar, BarExt};
use log::{debug, error, info, warn};

use crate::cache::{CacheConfig, MetaCache, default_cache_dir};
use crate::cancel::CancelToken;
use crate::loader::{
    Command, LoadOutcome, LoadedMeta, LoaderEvent, StartArgs, TuningConfig, spawn_load,
};
use crate::search::{SearchIndex, SearchResults};
use crate::source::{AnsiQueries, MockExecutor, QueryExecutor};
use crate::utils::config::{CacheConsts, LoaderConsts};
use crate::utils::schemax_toml::{apply_file_to_settings, load_schemax_toml};
use crate::utils::setup_logging;

/// Stream database metadata as JSON events; search it from the terminal.
#[derive(Clone, Parser)]
#[command(name = "schemax")]
#[command(about = "Load table/column metadata (cached, streaming) and emit JSON events.")]
pub struct Cli {
    /// Restrict the load to one schema.
    #[arg(long, short = 's', value_name = "SCHEMA")]
    pub schema: Option<String>,

    /// Use the built-in mock catalog instead of a live connection.
    #[arg(long)]
    pub mock: bool,

    /// Row budget for the first chunk (fast first paint).
    #[arg(long, value_name = "N")]
    pub initial_limit: Option<usize>,

    /// Seed for the adaptive page size on subsequent chunks.
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Resume: skip rows already delivered in a prior run.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub offset: usize,

    /// Bypass the cache read; the post-load write still happens.
    #[arg(long)]
    pub refresh: bool,

    /// Cache directory. Default: platform cache dir (~/.cache/schemax on Linux).
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Write cache blobs as plain .json instead of .json.gz.
    #[arg(long)]
    pub no_compress: bool,

    /// Remove all cache files and exit.
    #[arg(long)]
    pub clear_cache: bool,

    /// Protocol mode: read start/cancel commands as JSON lines on stdin.
    #[arg(long)]
    pub stdin: bool,

    /// Human output: progress bar plus a load summary instead of JSON events.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub pretty: Option<bool>,

    /// Run a search over the loaded metadata once the stream completes.
    #[arg(long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

/// Effective settings after defaults, `.schemax.toml`, env, and flags
/// merge (in that order; later wins).
#[derive(Clone, Debug)]
pub struct RunSettings {
    pub cache_dir: Option<PathBuf>,
    pub ttl_secs: u64,
    pub compress: bool,
    pub initial_limit: usize,
    pub batch_size: usize,
    pub target_page_ms: u64,
    pub verbose: bool,
    pub pretty: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            ttl_secs: CacheConsts::DEFAULT_TTL_SECS,
            compress: true,
            initial_limit: LoaderConsts::DEFAULT_INITIAL_LIMIT,
            batch_size: LoaderConsts::DEFAULT_BATCH_SIZE,
            target_page_ms: LoaderConsts::TARGET_PAGE_MS,
            verbose: false,
            pretty: false,
        }
    }
}

impl RunSettings {
    /// Settled cache directory: configured value, else the platform default.
    pub fn resolve_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_cache_dir()
                .context("no cache directory configured and no platform default available"),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.ttl_secs),
            compress: self.compress,
        }
    }

    pub fn tuning(&self) -> TuningConfig {
        TuningConfig {
            target_page_time: Duration::from_millis(self.target_page_ms),
            ..TuningConfig::default()
        }
    }
}

fn setup_settings(cli: &Cli) -> RunSettings {
    let mut settings = RunSettings::default();
    if let Some(file) = load_schemax_toml(Path::new(".")) {
        apply_file_to_settings(&file, &mut settings);
    }
    if let Ok(dir) = env::var("SCHEMAX_CACHE_DIR")
        && !dir.is_empty()
    {
        settings.cache_dir = Some(PathBuf::from(dir));
    }
    if let Ok(secs) = env::var("SCHEMAX_TTL_SECS") {
        match secs.parse() {
            Ok(secs) => settings.ttl_secs = secs,
            Err(_) => warn!("ignoring unparsable SCHEMAX_TTL_SECS: {secs}"),
        }
    }
    if let Some(ref dir) = cli.cache_dir {
        settings.cache_dir = Some(dir.clone());
    }
    if cli.no_compress {
        settings.compress = false;
    }
    if let Some(n) = cli.initial_limit {
        settings.initial_limit = n;
    }
    if let Some(n) = cli.batch_size {
        settings.batch_size = n;
    }
    if let Some(v) = cli.verbose {
        settings.verbose = v;
    }
    if let Some(v) = cli.pretty {
        settings.pretty = v;
    }
    settings
}

/// Run the load (or housekeeping) and return the process exit code:
/// success for done and cancelled runs, failure after an error event.
pub fn handle_run(cli: &Cli) -> Result<ExitCode> {
    let settings = setup_settings(cli);
    setup_logging(settings.verbose);

    let cache_dir = settings.resolve_cache_dir()?;
    let cache = MetaCache::new(&cache_dir, settings.cache_config());

    if cli.clear_cache {
        let removed = cache.clear().context("clear cache")?;
        println!("removed {removed} cache files from {}", cache_dir.display());
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = CancelToken::new();
    if let Err(err) = cancel.hook_ctrlc() {
        warn!("could not install Ctrl-C handler: {err}");
    }

    let start = if cli.stdin {
        let commands = spawn_stdin_commands(cancel.clone());
        match commands.recv() {
            Ok(Ok(args)) => args,
            Ok(Err(message)) => return Ok(report_failure(message, settings.pretty)),
            Err(_) => {
                let message = "stdin closed before a start command".to_string();
                return Ok(report_failure(message, settings.pretty));
            }
        }
    } else {
        start_from_flags(cli, &settings)
    };

    let executor = match make_executor(start.use_mock || cli.mock) {
        Ok(executor) => executor,
        Err(err) => return Ok(report_failure(format!("{err:#}"), settings.pretty)),
    };

    let request = start.to_request(cli.refresh);
    let started = Instant::now();
    let handle = spawn_load(
        executor,
        Box::new(AnsiQueries),
        cache,
        settings.tuning(),
        request,
        cancel.clone(),
    );

    let mut view = ProgressView::new(settings.pretty);
    let mut collected = LoadedMeta::default();
    for event in handle.events.iter() {
        view.observe(&event);
        if !settings.pretty {
            emit_event(&event);
        }
        match event {
            LoaderEvent::Chunk {
                tables, columns, ..
            } => {
                collected.tables.extend(tables);
                collected.columns.extend(columns);
            }
            LoaderEvent::Schemas { schemas } => collected.schemas = schemas,
            _ => {}
        }
    }
    view.finish();

    let outcome = handle.join()?;
    if settings.pretty {
        println!("{}", render_summary(&outcome, &collected, started.elapsed()));
    }
    match &outcome {
        LoadOutcome::Completed { tables } => debug!("live load complete: {tables} tables"),
        LoadOutcome::FromCache { tables } => debug!("cache replay complete: {tables} tables"),
        LoadOutcome::Cancelled => info!("load cancelled"),
        LoadOutcome::Failed { .. } => return Ok(ExitCode::FAILURE),
    }

    if let Some(ref query) = cli.search {
        let index = SearchIndex::build(collected.tables, collected.columns);
        let results = index.search(query, &CancelToken::new());
        print_search_results(query, &results, settings.pretty)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Surface a pre-load failure: an error event in machine mode, a logged
/// error in pretty mode.
fn report_failure(message: String, pretty: bool) -> ExitCode {
    if pretty {
        error!("{message}");
    } else {
        emit_event(&LoaderEvent::Error { message });
    }
    ExitCode::FAILURE
}

fn start_from_flags(cli: &Cli, settings: &RunSettings) -> StartArgs {
    StartArgs {
        schema_filter: cli.schema.clone(),
        use_mock: cli.mock,
        initial_limit: settings.initial_limit,
        batch_size: settings.batch_size,
        start_offset: cli.offset,
    }
}

fn make_executor(use_mock: bool) -> Result<Box<dyn QueryExecutor + Send>> {
    if use_mock {
        return Ok(Box::new(MockExecutor::new()));
    }
    bail!(
        "no database driver is wired into this build; run with --mock, or embed \
         the crate and supply your own QueryExecutor"
    )
}

/// Read commands from stdin on a background thread. The first must be
/// `start`; later `cancel` lines flip the token. The channel carries the
/// start command, or the rejection message for a bad opening command.
fn spawn_stdin_commands(cancel: CancelToken) -> Receiver<Result<StartArgs, String>> {
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let stdin = io::stdin();
        let mut started = false;
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Command>(line) {
                Ok(Command::Start(args)) if !started => {
                    started = true;
                    let _ = tx.send(Ok(args));
                }
                Ok(Command::Start(_)) => {
                    warn!("ignoring second start command; one loader per session");
                }
                Ok(Command::Cancel) => {
                    info!("cancel command received");
                    cancel.cancel();
                    if !started {
                        let _ = tx.send(Err("cancelled before start".to_string()));
                        break;
                    }
                }
                Err(err) => {
                    if !started {
                        let _ = tx.send(Err(format!("invalid command: {err}")));
                        break;
                    }
                    warn!("ignoring malformed command line: {err}");
                }
            }
        }
    });
    rx
}

fn emit_event(event: &LoaderEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!("could not encode event: {err}"),
    }
}

/// One-paragraph human account of a finished run, schema counts included.
pub fn render_summary(outcome: &LoadOutcome, meta: &LoadedMeta, elapsed: Duration) -> String {
    let tables = meta.tables.len();
    let columns = meta.columns.len();
    let mut out = match outcome {
        LoadOutcome::Completed { .. } => format!(
            "loaded {tables} tables, {columns} columns across {} schemas in {:.1}s",
            meta.schemas.len(),
            elapsed.as_secs_f64()
        ),
        LoadOutcome::FromCache { .. } => format!(
            "replayed {tables} tables, {columns} columns across {} schemas from cache in {:.1}s",
            meta.schemas.len(),
            elapsed.as_secs_f64()
        ),
        LoadOutcome::Cancelled => format!("cancelled after {tables} tables, {columns} columns"),
        LoadOutcome::Failed { message } => format!("load failed: {message}"),
    };
    for schema in &meta.schemas {
        out.push_str(&format!("\n  {}: {}", schema.name, schema.table_count));
    }
    out
}

/// Human listing of one search's matches, qualified names one per line.
pub fn render_search_results(query: &str, results: &SearchResults) -> String {
    let mut out = format!(
        "{} tables, {} columns match {query:?}",
        results.tables.len(),
        results.columns.len()
    );
    for table in &results.tables {
        out.push_str(&format!("\n  {}", table.qualified_name()));
    }
    for column in &results.columns {
        out.push_str(&format!("\n  {}.{}.{}", column.schema, column.table, column.name));
    }
    out
}

fn print_search_results(query: &str, results: &SearchResults, pretty: bool) -> Result<()> {
    if pretty {
        println!("{}", render_search_results(query, results));
        return Ok(());
    }
    let doc = serde_json::json!({
        "query": query,
        "tables": results.tables,
        "columns": results.columns,
    });
    let line = serde_json::to_string(&doc).context("encode search results")?;
    println!("{line}");
    Ok(())
}

/// Table counter on stderr while the stream runs; pretty mode only.
/// Machine runs stay silent outside the JSON stream.
struct ProgressView {
    bar: Option<Bar>,
    last: usize,
}

impl ProgressView {
    fn new(enabled: bool) -> Self {
        let bar = enabled.then(|| {
            kdam::tqdm!(
                total = 0,
                desc = "tables",
                animation = Animation::Classic,
                position = 0,
                unit = " tables"
            )
        });
        Self { bar, last: 0 }
    }

    fn observe(&mut self, event: &LoaderEvent) {
        let Some(bar) = self.bar.as_mut() else { return };
        if let LoaderEvent::Chunk {
            loaded, estimated, ..
        } = event
        {
            bar.total = *estimated;
            let delta = loaded.saturating_sub(self.last);
            self.last = *loaded;
            let _ = bar.update(delta);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.as_mut() {
            let _ = bar.refresh();
            eprintln!();
        }
    }
}
