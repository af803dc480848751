use super::{InterpretationResult, Mode};
use crate::extract::ExtractedEntities;
use crate::filter::FilterCompiler;

/// Deterministic interpretation from extracted entities. No external calls.
pub fn interpret_with_patterns(
    entities: &ExtractedEntities,
    compiler: &FilterCompiler<'_>,
) -> InterpretationResult {
    let compiled = compiler.compile(entities);

    let intent = if compiled.applied.is_empty() {
        "Search all games by relevance".to_string()
    } else {
        format!("Search for games matching: {}", compiled.applied.join(", "))
    };

    let mut explanation = match &compiled.filter {
        Some(filter) => format!("Applied filters: {}", filter.describe()),
        None => "No filters applied".to_string(),
    };
    if compiled.range_corrected {
        explanation.push_str(" (the date range was given end-first and has been swapped)");
    }
    for note in &compiled.notes {
        explanation.push_str("; ");
        explanation.push_str(note);
    }

    let mode = if compiled.filter.is_some() {
        Mode::Filtered
    } else {
        Mode::Semantic
    };

    InterpretationResult {
        intent,
        filter: compiled.filter,
        explanation,
        mode,
        range_corrected: compiled.range_corrected,
        fallback_reason: None,
    }
}
