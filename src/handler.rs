//! Query pipeline: search, fit the context into the budget, complete
//!
//! Strictly sequential, one attempt per stage. Any upstream failure aborts the
//! request.

use crate::completion::CompletionClient;
use crate::context::{AssembledContext, BudgetConfig, ContextBudgeter, TokenCounter};
use crate::error::{RelayError, Result};
use crate::metrics::METRICS;
use crate::search::{SearchClient, SearchResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Answers questions from retrieved documents
pub struct QueryHandler {
    search: Arc<dyn SearchClient>,
    completion: Arc<dyn CompletionClient>,
    budgeter: ContextBudgeter,
}

impl QueryHandler {
    pub fn new(
        search: Arc<dyn SearchClient>,
        completion: Arc<dyn CompletionClient>,
        counter: Arc<dyn TokenCounter>,
        budget: BudgetConfig,
    ) -> Result<Self> {
        let budgeter = ContextBudgeter::new(counter, budget)
            .map_err(|e| RelayError::Internal(e.to_string()))?;

        Ok(Self {
            search,
            completion,
            budgeter,
        })
    }

    pub fn budgeter(&self) -> &ContextBudgeter {
        &self.budgeter
    }

    /// Answer `user_query`; an absent or blank query is rejected before any upstream call
    pub async fn handle_query(&self, user_query: Option<&str>) -> Result<String> {
        let request_id = Uuid::new_v4();
        let span = info_span!("query", %request_id);

        async move {
            let start = Instant::now();
            let result = self.run(user_query).await;
            METRICS.observe_stage("total", start.elapsed().as_secs_f64());

            match &result {
                Ok(answer) => {
                    METRICS.record_query("success");
                    info!(
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        answer_chars = answer.len(),
                        "Query answered"
                    );
                }
                Err(e @ RelayError::InvalidInput(_)) => {
                    METRICS.record_query(e.stage());
                    warn!(error = %e, "Query rejected");
                }
                Err(e) => {
                    METRICS.record_query(e.stage());
                    error!(stage = e.stage(), error = %e, "Query failed");
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, user_query: Option<&str>) -> Result<String> {
        let user_query = match user_query {
            Some(query) if !query.trim().is_empty() => query,
            Some(_) => return Err(RelayError::InvalidInput("Query cannot be empty".to_string())),
            None => return Err(RelayError::InvalidInput("Missing query".to_string())),
        };
        debug!(query = user_query, "Handling query");

        let stage = Instant::now();
        let results: SearchResult = self.search.search(user_query).await?;
        METRICS.observe_stage("search", stage.elapsed().as_secs_f64());
        METRICS.record_search(results.len());
        info!(documents = results.len(), "Search returned documents");

        let context: AssembledContext = self
            .budgeter
            .build_default_context(&results.documents, user_query);
        METRICS.record_context(
            context.context_tokens,
            context.budget.available_for_context,
            context.truncated,
        );
        debug!(context = %context.text, truncated = context.truncated, "Context assembled");

        let stage = Instant::now();
        let answer = self.completion.complete(&context.text, user_query).await?;
        METRICS.observe_stage("completion", stage.elapsed().as_secs_f64());

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionError;
    use crate::context::WordCounter;
    use crate::search::{Document, SearchError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubSearch {
        documents: Vec<Document>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SearchClient for StubSearch {
        async fn search(&self, _query: &str) -> std::result::Result<SearchResult, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SearchResult::new(self.documents.clone()))
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl SearchClient for FailingSearch {
        async fn search(&self, _query: &str) -> std::result::Result<SearchResult, SearchError> {
            Err(SearchError::Upstream {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    /// Records what it was asked and answers with a fixed string
    #[derive(Default)]
    struct RecordingCompletion {
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CompletionClient for RecordingCompletion {
        async fn complete(
            &self,
            context: &str,
            user_query: &str,
        ) -> std::result::Result<String, CompletionError> {
            self.seen
                .lock()
                .unwrap()
                .push((context.to_string(), user_query.to_string()));
            Ok("fixed answer".to_string())
        }
    }

    fn handler(
        search: Arc<dyn SearchClient>,
        completion: Arc<dyn CompletionClient>,
        budget: BudgetConfig,
    ) -> QueryHandler {
        QueryHandler::new(search, completion, Arc::new(WordCounter::default()), budget).unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_passes_context_and_query() {
        let search = Arc::new(StubSearch {
            documents: vec![Document::new("A B C"), Document::new("D E")],
            calls: AtomicUsize::new(0),
        });
        let completion = Arc::new(RecordingCompletion::default());
        let handler = handler(search.clone(), completion.clone(), BudgetConfig::default());

        let answer = handler.handle_query(Some("Q")).await.unwrap();

        assert_eq!(answer, "fixed answer");
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        let seen = completion.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[("A B C\nD E".to_string(), "Q".to_string())]);
    }

    #[tokio::test]
    async fn test_pipeline_truncates_with_configured_budget() {
        let search = Arc::new(StubSearch {
            documents: vec![Document::new("A B C"), Document::new("D E")],
            calls: AtomicUsize::new(0),
        });
        let completion = Arc::new(RecordingCompletion::default());
        let budget = BudgetConfig {
            max_total_tokens: 204,
            safety_margin: 200,
        };
        let handler = handler(search, completion.clone(), budget);

        handler.handle_query(Some("Q")).await.unwrap();

        let seen = completion.seen.lock().unwrap();
        assert_eq!(seen[0].0, "A B C");
    }

    #[tokio::test]
    async fn test_empty_search_still_completes() {
        let search = Arc::new(StubSearch {
            documents: vec![],
            calls: AtomicUsize::new(0),
        });
        let completion = Arc::new(RecordingCompletion::default());
        let handler = handler(search, completion.clone(), BudgetConfig::default());

        let answer = handler.handle_query(Some("Who is the dean?")).await.unwrap();

        assert_eq!(answer, "fixed answer");
        assert_eq!(completion.seen.lock().unwrap()[0].0, "");
    }

    #[tokio::test]
    async fn test_missing_query_is_rejected_before_search() {
        let search = Arc::new(StubSearch {
            documents: vec![Document::new("A")],
            calls: AtomicUsize::new(0),
        });
        let handler = handler(
            search.clone(),
            Arc::new(RecordingCompletion::default()),
            BudgetConfig::default(),
        );

        assert!(matches!(
            handler.handle_query(None).await,
            Err(RelayError::InvalidInput(_))
        ));
        assert!(matches!(
            handler.handle_query(Some("   ")).await,
            Err(RelayError::InvalidInput(_))
        ));
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_query_is_counted() {
        let handler = handler(
            Arc::new(FailingSearch),
            Arc::new(RecordingCompletion::default()),
            BudgetConfig::default(),
        );
        let rejected = || METRICS.query_requests.with_label_values(&["input"]).get();

        let before = rejected();
        let _ = handler.handle_query(None).await;
        let _ = handler.handle_query(Some("")).await;

        // other tests share the global registry, so only a lower bound holds
        assert!(rejected() >= before + 2.0);
    }

    #[tokio::test]
    async fn test_search_failure_aborts_request() {
        let completion = Arc::new(RecordingCompletion::default());
        let handler = handler(
            Arc::new(FailingSearch),
            completion.clone(),
            BudgetConfig::default(),
        );

        let result = handler.handle_query(Some("Q")).await;

        assert!(matches!(result, Err(RelayError::Search(_))));
        assert!(completion.seen.lock().unwrap().is_empty());
    }
}
