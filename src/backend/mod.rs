//! Where compiled filters are sent.
//!
//! - [`LocalCollection`]: game documents on disk, filtered in process
//! - [`RemoteBackend`]: a hosted `queries/top-documents` endpoint

mod local;
mod remote;

pub use local::{read_paths_from_stdin, LocalCollection};
pub use remote::RemoteBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::FilterExpr;
use crate::record::GameRecord;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("missing credentials: set {0}")]
    MissingCredentials(String),

    #[error("no games found under {0}")]
    EmptyCollection(String),
}

/// Body of a search call. `filter` is left out entirely when there is none.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    #[serde(rename = "collection_name")]
    pub collection: String,
    pub query: String,
    pub k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterExpr>,
    pub include_metadata: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub path: String,
    pub score: f64,
    #[serde(default)]
    pub metadata: GameRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

impl SearchResponse {
    pub fn records(&self) -> Vec<GameRecord> {
        self.results.iter().map(|hit| hit.metadata.clone()).collect()
    }
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError>;

    /// Year most of the collection's games were played in, when known.
    fn season_year(&self) -> Option<i32> {
        None
    }
}
