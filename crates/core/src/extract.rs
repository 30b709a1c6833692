//! Concept extraction engine.
//!
//! Each group of chunks becomes one LLM call. Responses are sanitized, parsed
//! and folded into a single concept list strictly in group order, whatever
//! order the calls complete in. A response that cannot be parsed only drops
//! that group's concepts; a failing backend call aborts the whole run.

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ExtractionConfig,
    cost::CostEstimate,
    error::{DynamoError, ExtractionBackendError, Result},
    grouping::{Group, group},
    llm::LlmClient,
    parse::parse_concepts,
    sanitize::strip_code_fences,
    types::{Chunk, ConceptEntry},
};

const RAW_SNIPPET_CHARS: usize = 200;

pub fn concepts_prompt(text: &str) -> String {
    format!(
        r#"Find and define key concepts or terms found in the text: {text}

Respond in the following format as a single flat JSON object without any backticks or code fences, separating each concept with a comma:
{{"concept": "definition", "concept": "definition", "concept": "definition", ...}}"#
    )
}

/// Diagnostics for one group.
#[derive(Clone, Debug, Serialize)]
pub struct GroupOutcome {
    pub index: usize,
    pub chunks: usize,
    pub cost: CostEstimate,
    pub accepted: usize,
    /// Keys dropped because their value was not a string.
    pub skipped: Vec<String>,
    /// Set when the whole response was unusable.
    pub parse_error: Option<String>,
    pub raw_snippet: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Extraction {
    pub concepts: Vec<ConceptEntry>,
    pub cost: CostEstimate,
    pub outcomes: Vec<GroupOutcome>,
}

impl Extraction {
    pub fn failed_groups(&self) -> impl Iterator<Item = &GroupOutcome> {
        self.outcomes.iter().filter(|o| o.parse_error.is_some())
    }
}

struct GroupCall {
    index: usize,
    chunks: usize,
    input: String,
    raw: String,
}

pub struct ConceptExtractor {
    client: Arc<dyn LlmClient>,
    config: ExtractionConfig,
}

impl ConceptExtractor {
    pub fn new(client: Arc<dyn LlmClient>, config: ExtractionConfig) -> Self {
        Self { client, config }
    }

    /// Group `chunks` and extract concepts from every group.
    ///
    /// Group size errors are returned before any LLM call is made.
    pub async fn find_key_concepts(
        &self,
        chunks: &[Chunk],
        group_size: usize,
        cancel: &CancellationToken,
    ) -> Result<Extraction> {
        let groups = group(chunks, group_size)?;
        self.extract(&groups, cancel).await
    }

    pub async fn extract(
        &self,
        groups: &[Group<'_>],
        cancel: &CancellationToken,
    ) -> Result<Extraction> {
        if cancel.is_cancelled() {
            return Err(DynamoError::Cancelled);
        }

        tracing::info!(
            groups = groups.len(),
            model = self.client.model(),
            concurrency = self.config.concurrency,
            "Finding key concepts"
        );

        let calls: Vec<_> = groups.iter().map(|g| self.call_group(g, cancel)).collect();
        let calls = futures::stream::iter(calls)
            .buffered(self.config.concurrency.max(1));
        let mut calls = std::pin::pin!(calls);

        let mut extraction = Extraction::default();
        while let Some(call) = calls.next().await {
            self.fold(call?, &mut extraction);
        }

        tracing::info!(
            concepts = extraction.concepts.len(),
            failed_groups = extraction.failed_groups().count(),
            "Total analysis cost: ${:.6}",
            extraction.cost.total()
        );

        Ok(extraction)
    }

    async fn call_group(&self, group: &Group<'_>, cancel: &CancellationToken) -> Result<GroupCall> {
        let input = group.text();
        let prompt = concepts_prompt(&input);
        let timeout = self.config.call_timeout;

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(DynamoError::Cancelled),
            response = tokio::time::timeout(timeout, self.client.complete(&prompt)) => response,
        };

        let raw = match response {
            Ok(Ok(raw)) => raw,
            Ok(Err(source)) => {
                return Err(DynamoError::Backend {
                    group: group.index,
                    source,
                });
            }
            Err(_) => {
                return Err(DynamoError::Backend {
                    group: group.index,
                    source: ExtractionBackendError::Timeout {
                        seconds: timeout.as_secs(),
                    },
                });
            }
        };

        Ok(GroupCall {
            index: group.index,
            chunks: group.chunks.len(),
            input,
            raw,
        })
    }

    fn fold(&self, call: GroupCall, extraction: &mut Extraction) {
        let cost = CostEstimate::for_call(&call.input, &call.raw, &self.config.rates);
        tracing::info!(
            group = call.index,
            chunks = call.chunks,
            input_chars = cost.input_chars,
            input_cost = cost.input_cost,
            output_chars = cost.output_chars,
            output_cost = cost.output_cost,
            "Group cost: ${:.6}",
            cost.total()
        );
        extraction.cost += cost;

        let mut outcome = GroupOutcome {
            index: call.index,
            chunks: call.chunks,
            cost,
            accepted: 0,
            skipped: Vec::new(),
            parse_error: None,
            raw_snippet: None,
        };

        match parse_concepts(strip_code_fences(&call.raw)) {
            Ok(mut parsed) => {
                if self.config.sort_concepts {
                    parsed
                        .entries
                        .sort_by_cached_key(|e| e.concept.to_lowercase());
                }
                if !parsed.skipped.is_empty() {
                    tracing::warn!(
                        group = call.index,
                        skipped = ?parsed.skipped,
                        "Skipped concepts with non-string definitions"
                    );
                    outcome.raw_snippet = Some(snippet(&call.raw));
                }
                outcome.accepted = parsed.entries.len();
                outcome.skipped = parsed.skipped;
                extraction.concepts.extend(parsed.entries);
            }
            Err(e) => {
                let raw_snippet = snippet(&call.raw);
                tracing::warn!(
                    group = call.index,
                    error = %e,
                    raw = %raw_snippet,
                    "Failed to parse concepts, dropping group"
                );
                outcome.parse_error = Some(e.to_string());
                outcome.raw_snippet = Some(raw_snippet);
            }
        }

        extraction.outcomes.push(outcome);
    }
}

fn snippet(raw: &str) -> String {
    let mut snippet: String = raw.chars().take(RAW_SNIPPET_CHARS).collect();
    if raw.chars().nth(RAW_SNIPPET_CHARS).is_some() {
        snippet.push('…');
    }
    snippet
}
