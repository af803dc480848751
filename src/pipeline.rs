use serde::Serialize;
use std::future::Future;

use crate::analysis::{self, Summary};
use crate::backend::{BackendError, SearchBackend, SearchHit, SearchRequest};
use crate::context::RequestContext;
use crate::extract::Category;
use crate::interpret::{InterpretationResult, InterpreterStrategy};

/// Everything produced for one query, ready for formatting.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub query: String,
    pub context: RequestContext,
    pub interpretation: InterpretationResult,
    pub hits: Vec<SearchHit>,
    pub summary: Summary,
}

impl Outcome {
    pub fn matched(&self) -> bool {
        !self.hits.is_empty()
    }
}

/// Interpret, search, analyse. A backend failure ends the request; an
/// interpretation failure never does.
pub async fn run<F>(
    query: &str,
    ctx: RequestContext,
    strategy: &InterpreterStrategy,
    backend: &dyn SearchBackend,
    cancel: F,
) -> Result<Outcome, BackendError>
where
    F: Future<Output = ()> + Send,
{
    let interpretation = strategy.interpret_until(query, &ctx, cancel).await;
    tracing::info!(mode = %interpretation.mode, backend = backend.name(), "interpreted query");

    let request = SearchRequest {
        collection: ctx.collection.clone(),
        query: query.to_string(),
        k: ctx.k,
        filter: interpretation.filter.clone(),
        include_metadata: true,
    };
    let response = backend.search(&request).await?;
    tracing::debug!(hits = response.results.len(), "search finished");

    let records = response.records();
    let team = subject_team(query, &ctx, strategy);
    let summary = analysis::summarize(&records, team.as_deref());

    Ok(Outcome {
        query: query.to_string(),
        context: ctx,
        interpretation,
        hits: response.results,
        summary,
    })
}

/// The caller's team, or the only team the query names.
fn subject_team(
    query: &str,
    ctx: &RequestContext,
    strategy: &InterpreterStrategy,
) -> Option<String> {
    if let Some(team) = &ctx.subject_team {
        return Some(team.clone());
    }
    match strategy.extractor().extract(query).get(Category::Team) {
        [team] => Some(team.clone()),
        _ => None,
    }
}
