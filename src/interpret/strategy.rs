use std::future::{self, Future};
use std::time::Duration;

use super::{
    interpret_with_patterns, GenerativeInterpreter, InterpretError, InterpretationResult, Mode,
};
use crate::context::RequestContext;
use crate::dates::DateContext;
use crate::extract::{Category, ExtractedEntities, PatternExtractor};
use crate::filter::FilterCompiler;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Picks exactly one interpretation path per query.
///
/// The generative interpreter runs first when one is configured. If it fails
/// in any way the result comes from the pattern path alone, marked
/// [`Mode::Fallback`]. Results from the two paths are never merged.
pub struct InterpreterStrategy {
    generative: Option<Box<dyn GenerativeInterpreter>>,
    extractor: PatternExtractor,
    timeout: Duration,
}

impl InterpreterStrategy {
    pub fn new(extractor: PatternExtractor) -> Self {
        Self {
            generative: None,
            extractor,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_generative(mut self, interpreter: Box<dyn GenerativeInterpreter>) -> Self {
        self.generative = Some(interpreter);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn extractor(&self) -> &PatternExtractor {
        &self.extractor
    }

    pub async fn interpret(&self, query: &str, ctx: &RequestContext) -> InterpretationResult {
        self.interpret_until(query, ctx, future::pending::<()>()).await
    }

    /// Like [`interpret`](Self::interpret), but gives up on the generative
    /// path as soon as `cancel` completes.
    pub async fn interpret_until<F>(
        &self,
        query: &str,
        ctx: &RequestContext,
        cancel: F,
    ) -> InterpretationResult
    where
        F: Future<Output = ()> + Send,
    {
        let dates = DateContext::resolve(ctx.today);
        let entities = self.extractor.extract(query);
        if entities.is_empty() {
            tracing::debug!(%query, "no catalog entities in query");
        }

        let Some(generative) = self.generative.as_deref() else {
            return self.from_patterns(&entities, &dates, ctx);
        };
        if ctx.date_range.is_some() {
            // The model never sees the caller's range, so only the pattern
            // path can honour it.
            tracing::debug!("explicit date range given, skipping generative interpreter");
            return self.from_patterns(&entities, &dates, ctx);
        }

        let attempt = tokio::select! {
            biased;
            _ = cancel => Err(InterpretError::Cancelled),
            reply = tokio::time::timeout(self.timeout, generative.interpret(query, &dates)) => {
                reply.unwrap_or(Err(InterpretError::Timeout(self.timeout)))
            }
        };

        match attempt.and_then(|candidate| validate(candidate, &entities)) {
            Ok(result) => {
                tracing::debug!(
                    interpreter = generative.name(),
                    mode = ?result.mode,
                    "generative interpretation accepted"
                );
                result
            }
            Err(err) => {
                tracing::warn!(
                    interpreter = generative.name(),
                    error = %err,
                    "falling back to pattern interpretation"
                );
                let mut result = self.from_patterns(&entities, &dates, ctx);
                result.mode = Mode::Fallback;
                result.fallback_reason = Some(err.to_string());
                result
            }
        }
    }

    fn from_patterns(
        &self,
        entities: &ExtractedEntities,
        dates: &DateContext,
        ctx: &RequestContext,
    ) -> InterpretationResult {
        let mut compiler = FilterCompiler::new(dates, ctx.season_year);
        if let Some((start, end)) = ctx.date_range {
            compiler = compiler.with_range(start, end);
        }
        interpret_with_patterns(entities, &compiler)
    }
}

/// Rejects generative output that is well-formed but still wrong.
fn validate(
    mut candidate: InterpretationResult,
    entities: &ExtractedEntities,
) -> Result<InterpretationResult, InterpretError> {
    match (candidate.mode, &candidate.filter) {
        (Mode::Fallback, _) => {
            return Err(InterpretError::ContractViolation(
                "generative interpreter reported fallback mode".into(),
            ))
        }
        (Mode::Semantic, Some(_)) => {
            return Err(InterpretError::ContractViolation(
                "semantic result carries a filter".into(),
            ))
        }
        (Mode::Filtered, None) => candidate.mode = Mode::Semantic,
        (Mode::Filtered, Some(_)) | (Mode::Semantic, None) => {}
    }

    // Without a time reference the answer must be a plain semantic search.
    if candidate.filter.is_some() && !entities.has(Category::Date) {
        return Err(InterpretError::ContractViolation(
            "filter without a time reference in the query".into(),
        ));
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_iso;
    use crate::filter::{Field, FilterExpr};
    use async_trait::async_trait;

    enum Mock {
        Reply(InterpretationResult),
        Fail,
        Slow,
        Hang,
    }

    #[async_trait]
    impl GenerativeInterpreter for Mock {
        fn name(&self) -> &str {
            "mock"
        }

        async fn interpret(
            &self,
            _query: &str,
            _dates: &DateContext,
        ) -> Result<InterpretationResult, InterpretError> {
            match self {
                Mock::Reply(result) => Ok(result.clone()),
                Mock::Fail => Err(InterpretError::Malformed("garbage".into())),
                Mock::Slow => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Err(InterpretError::Transport("too late".into()))
                }
                Mock::Hang => future::pending().await,
            }
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new("games", 10, parse_iso("2024-09-12").unwrap())
    }

    fn strategy(mock: Mock) -> InterpreterStrategy {
        InterpreterStrategy::new(PatternExtractor::new().unwrap())
            .with_generative(Box::new(mock))
            .with_timeout(Duration::from_millis(50))
    }

    fn filtered(filter: FilterExpr) -> InterpretationResult {
        InterpretationResult {
            intent: "model intent".into(),
            filter: Some(filter),
            explanation: "model explanation".into(),
            mode: Mode::Filtered,
            range_corrected: false,
            fallback_reason: None,
        }
    }

    #[tokio::test]
    async fn test_pattern_only_is_never_fallback() {
        let strategy = InterpreterStrategy::new(PatternExtractor::new().unwrap());
        let result = strategy.interpret("liverpool games", &ctx()).await;
        assert_eq!(result.mode, Mode::Filtered);
        let result = strategy.interpret("something vague", &ctx()).await;
        assert_eq!(result.mode, Mode::Semantic);
    }

    #[tokio::test]
    async fn test_generative_result_is_used_as_is() {
        let reply = filtered(FilterExpr::And(vec![
            FilterExpr::eq(Field::Venue, "Anfield"),
            FilterExpr::eq(Field::Date, "2024-09-11"),
        ]));
        let result = strategy(Mock::Reply(reply.clone()))
            .interpret("games at anfield yesterday", &ctx())
            .await;
        assert_eq!(result, reply);
    }

    #[tokio::test]
    async fn test_filter_without_time_reference_falls_back() {
        let reply = filtered(FilterExpr::eq(Field::Venue, "Anfield"));
        let result = strategy(Mock::Reply(reply))
            .interpret("show me games at anfield", &ctx())
            .await;
        assert_eq!(result.mode, Mode::Fallback);
        assert!(result.fallback_reason.unwrap().contains("time reference"));
        let filter = result.filter.unwrap();
        assert!(filter.leaves().iter().all(|c| c.field == Field::Venue));
    }

    #[tokio::test]
    async fn test_semantic_without_time_reference_is_accepted() {
        let mut reply = filtered(FilterExpr::eq(Field::Venue, "Anfield"));
        reply.mode = Mode::Semantic;
        reply.filter = None;
        let result = strategy(Mock::Reply(reply.clone()))
            .interpret("show me games at anfield", &ctx())
            .await;
        assert_eq!(result, reply);
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back() {
        let result = strategy(Mock::Fail).interpret("arsenal games", &ctx()).await;
        assert_eq!(result.mode, Mode::Fallback);
        assert_eq!(result.intent, "Search for games matching: team");
        assert!(result.filter.is_some());
        assert!(result.fallback_reason.unwrap().contains("garbage"));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let result = strategy(Mock::Slow).interpret("arsenal games", &ctx()).await;
        assert_eq!(result.mode, Mode::Fallback);
        assert!(result.fallback_reason.unwrap().contains("did not answer"));
    }

    #[tokio::test]
    async fn test_cancellation_falls_back() {
        let result = strategy(Mock::Hang)
            .interpret_until("arsenal games", &ctx(), async {})
            .await;
        assert_eq!(result.mode, Mode::Fallback);
        assert_eq!(
            result.fallback_reason.as_deref(),
            Some("interpretation was cancelled")
        );
    }

    #[tokio::test]
    async fn test_guessed_date_is_rejected() {
        let reply = filtered(FilterExpr::And(vec![
            FilterExpr::eq(Field::Venue, "Anfield"),
            FilterExpr::eq(Field::Date, "2024-09-12"),
        ]));
        let result = strategy(Mock::Reply(reply))
            .interpret("games at anfield", &ctx())
            .await;
        assert_eq!(result.mode, Mode::Fallback);
        let filter = result.filter.unwrap();
        assert!(filter.leaves().iter().all(|c| c.field != Field::Date));
    }

    #[tokio::test]
    async fn test_date_with_time_reference_is_kept() {
        let reply = filtered(FilterExpr::eq(Field::Date, "2024-09-11"));
        let result = strategy(Mock::Reply(reply.clone()))
            .interpret("games yesterday", &ctx())
            .await;
        assert_eq!(result, reply);
    }

    #[tokio::test]
    async fn test_semantic_with_filter_is_rejected() {
        let mut reply = filtered(FilterExpr::eq(Field::Venue, "Anfield"));
        reply.mode = Mode::Semantic;
        let result = strategy(Mock::Reply(reply)).interpret("anfield", &ctx()).await;
        assert_eq!(result.mode, Mode::Fallback);
    }

    #[tokio::test]
    async fn test_explicit_range_skips_generative() {
        let mut ctx = ctx();
        ctx.date_range = Some((parse_iso("2024-09-30").unwrap(), parse_iso("2024-09-01").unwrap()));
        let result = strategy(Mock::Hang).interpret("arsenal games", &ctx).await;
        assert_eq!(result.mode, Mode::Filtered);
        assert!(result.range_corrected);
    }
}
