//! Wire types: the outbound event stream and the inbound control commands.

use serde::{Deserialize, Serialize};

use crate::types::{ColumnInfo, LoadRequest, SchemaInfo, TableInfo};
use crate::utils::config::LoaderConsts;

/// One event on the loader stream, serialized as a single JSON document,
/// e.g. `{"type":"chunk","tables":[...],"columns":[...],"loaded":7,"estimated":12}`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LoaderEvent {
    /// Phase announcement. `total` is 0 while the full count is unknown.
    Progress {
        message: String,
        current: usize,
        total: usize,
    },
    /// One delivered page. `loaded` counts rows the consumer now has
    /// (including rows skipped by a resume offset); `estimated` is the
    /// loader's current guess at the final count.
    Chunk {
        tables: Vec<TableInfo>,
        columns: Vec<ColumnInfo>,
        loaded: usize,
        estimated: usize,
    },
    /// The schema list, emitted once after the last chunk.
    Schemas { schemas: Vec<SchemaInfo> },
    /// Terminal: everything delivered.
    Done,
    /// Terminal: the run failed. Nothing follows this.
    Error { message: String },
}

/// A control command, one JSON document per line on stdin. Tagged on
/// `cmd`; anything unrecognized fails deserialization and is answered
/// with an error event.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Command {
    Start(StartArgs),
    Cancel,
}

/// Arguments of the start command. Every field has a default, so
/// `{"cmd":"start"}` alone is a valid full-load request.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StartArgs {
    #[serde(default)]
    pub schema_filter: Option<String>,
    #[serde(default)]
    pub use_mock: bool,
    #[serde(default = "default_initial_limit")]
    pub initial_limit: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub start_offset: usize,
}

impl Default for StartArgs {
    fn default() -> Self {
        Self {
            schema_filter: None,
            use_mock: false,
            initial_limit: default_initial_limit(),
            batch_size: default_batch_size(),
            start_offset: 0,
        }
    }
}

impl StartArgs {
    /// The command as a [`LoadRequest`]. `refresh` comes from the CLI, not
    /// the wire.
    pub fn to_request(&self, refresh: bool) -> LoadRequest {
        LoadRequest {
            schema_filter: self.schema_filter.clone(),
            initial_limit: self.initial_limit,
            batch_size: self.batch_size,
            start_offset: self.start_offset,
            refresh,
        }
    }
}

fn default_initial_limit() -> usize {
    LoaderConsts::DEFAULT_INITIAL_LIMIT
}

fn default_batch_size() -> usize {
    LoaderConsts::DEFAULT_BATCH_SIZE
}
