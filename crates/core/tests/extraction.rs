use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use dynamo_core::{
    CancellationToken, Chunk, ConceptEntry, ConceptExtractor, CostRates, DynamoError,
    ExtractionBackendError, ExtractionConfig, LlmClient, group,
};

/// Answers each prompt with the reply registered for the first marker the
/// prompt contains.
struct ScriptedClient {
    replies: Vec<(String, Reply)>,
    calls: AtomicUsize,
}

#[derive(Clone)]
enum Reply {
    Text(String),
    Delayed(Duration, String),
    Fail,
    Hang,
}

impl ScriptedClient {
    fn new(replies: Vec<(&str, Reply)>) -> Arc<Self> {
        Arc::new(Self {
            replies: replies
                .into_iter()
                .map(|(marker, reply)| (marker.to_string(), reply))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionBackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Reply::Text("{}".to_string()));
        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Reply::Fail => Err(ExtractionBackendError::Status {
                status: 429,
                body: "quota exceeded".to_string(),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

fn text(reply: &str) -> Reply {
    Reply::Text(reply.to_string())
}

/// One chunk per marker, so group `i` is exactly chunk `i` with group size = n.
fn chunks(markers: &[&str]) -> Vec<Chunk> {
    markers.iter().map(|m| Chunk::new(format!("[{m}]"))).collect()
}

fn extractor(client: Arc<ScriptedClient>) -> ConceptExtractor {
    ConceptExtractor::new(client, ExtractionConfig::default())
}

#[tokio::test]
async fn single_group_round_trip_keeps_key_order() {
    let client = ScriptedClient::new(vec![("[g1]", text(r#"{"A": "def1", "B": "def2"}"#))]);
    let input = chunks(&["g1"]);

    let extraction = extractor(client)
        .find_key_concepts(&input, 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        extraction.concepts,
        vec![ConceptEntry::new("A", "def1"), ConceptEntry::new("B", "def2")]
    );
}

#[tokio::test]
async fn malformed_group_is_dropped_without_aborting() {
    let client = ScriptedClient::new(vec![
        ("[g1]", text(r#"{"A": "from g1"}"#)),
        ("[g2]", text(r#"{"B": "unterminated"#)),
        ("[g3]", text(r#"{"C": "from g3"}"#)),
    ]);
    let input = chunks(&["g1", "g2", "g3"]);

    let extraction = extractor(client.clone())
        .find_key_concepts(&input, 3, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(client.calls(), 3);
    assert_eq!(
        extraction.concepts,
        vec![
            ConceptEntry::new("A", "from g1"),
            ConceptEntry::new("C", "from g3")
        ]
    );
    let failed: Vec<usize> = extraction.failed_groups().map(|o| o.index).collect();
    assert_eq!(failed, vec![1]);
    let snippet = extraction.outcomes[1].raw_snippet.as_deref().unwrap();
    assert!(snippet.contains("unterminated"));
}

#[tokio::test]
async fn fenced_and_plain_responses_parse_the_same() {
    let body = r#"{"Borrowing": "Using a value without owning it"}"#;
    let fenced = format!("```json\n{body}\n```");
    let client = ScriptedClient::new(vec![("[plain]", text(body)), ("[fenced]", text(&fenced))]);
    let input = chunks(&["plain", "fenced"]);

    let extraction = extractor(client)
        .find_key_concepts(&input, 2, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(extraction.concepts.len(), 2);
    assert_eq!(extraction.concepts[0], extraction.concepts[1]);
    assert_eq!(extraction.failed_groups().count(), 0);
}

#[tokio::test]
async fn non_string_entries_are_skipped_per_entry() {
    let client = ScriptedClient::new(vec![(
        "[g1]",
        text(r#"{"Trait": "Shared behaviour", "Count": 3, "Enum": "Tagged union"}"#),
    )]);
    let input = chunks(&["g1"]);

    let extraction = extractor(client)
        .find_key_concepts(&input, 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(extraction.concepts.len(), 2);
    assert_eq!(extraction.outcomes[0].accepted, 2);
    assert_eq!(extraction.outcomes[0].skipped, vec!["Count".to_string()]);
    assert!(extraction.outcomes[0].parse_error.is_none());
}

#[tokio::test]
async fn cost_is_summed_from_raw_character_counts() {
    let fenced = "```json\n{\"A\": \"x\"}\n```";
    let client = ScriptedClient::new(vec![("[g1]", text(fenced)), ("[g2]", text("nope"))]);
    let input = chunks(&["g1", "g2"]);
    let rates = CostRates {
        input_per_1k_chars: 1.0,
        output_per_1k_chars: 2.0,
    };
    let config = ExtractionConfig {
        rates,
        ..Default::default()
    };

    let extraction = ConceptExtractor::new(client, config)
        .find_key_concepts(&input, 2, &CancellationToken::new())
        .await
        .unwrap();

    let output_chars = fenced.chars().count() + "nope".chars().count();
    assert_eq!(extraction.cost.input_chars, "[g1]".len() + "[g2]".len());
    assert_eq!(extraction.cost.output_chars, output_chars);
    assert!((extraction.cost.output_cost - output_chars as f64 / 1000.0 * 2.0).abs() < 1e-12);

    let mut running = 0.0;
    let mut summed = 0.0;
    for outcome in &extraction.outcomes {
        let next = running + outcome.cost.total();
        assert!(next >= running);
        running = next;
        summed += outcome.cost.input_cost + outcome.cost.output_cost;
    }
    assert!((extraction.cost.total() - summed).abs() < 1e-12);
}

#[tokio::test]
async fn chunks_in_a_group_are_sent_as_one_prompt() {
    let client = ScriptedClient::new(vec![("[a][b][c]", text(r#"{"Joined": "yes"}"#))]);
    let input = chunks(&["a", "b", "c", "d"]);

    let extraction = extractor(client.clone())
        .find_key_concepts(&input, 2, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(client.calls(), 2);
    assert_eq!(extraction.outcomes[0].chunks, 2);
    // "[a][b]" and "[c][d]" never contain "[a][b][c]".
    assert!(extraction.concepts.is_empty());
}

#[tokio::test]
async fn group_size_errors_happen_before_any_call() {
    let client = ScriptedClient::new(vec![]);
    let engine = extractor(client.clone());
    let cancel = CancellationToken::new();

    let err = engine
        .find_key_concepts(&chunks(&["a", "b"]), 3, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DynamoError::InvalidGroupSize { .. }));

    let many: Vec<Chunk> = (0..25).map(|i| Chunk::new(i.to_string())).collect();
    let err = engine.find_key_concepts(&many, 2, &cancel).await.unwrap_err();
    assert!(matches!(err, DynamoError::GroupTooLarge { docs_per_group: 13, .. }));
    assert!(err.is_client_error());

    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn backend_failure_aborts_with_group_index() {
    let client = ScriptedClient::new(vec![
        ("[g1]", text(r#"{"A": "a"}"#)),
        ("[g2]", Reply::Fail),
        ("[g3]", text(r#"{"C": "c"}"#)),
    ]);
    let input = chunks(&["g1", "g2", "g3"]);

    let err = extractor(client.clone())
        .find_key_concepts(&input, 3, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        DynamoError::Backend { group, source } => {
            assert_eq!(group, 1);
            assert!(matches!(source, ExtractionBackendError::Status { status: 429, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn concurrent_dispatch_keeps_group_order() {
    // Earlier groups answer slower, so completion order is reversed.
    let client = ScriptedClient::new(vec![
        ("[g1]", Reply::Delayed(Duration::from_millis(60), r#"{"A": "1"}"#.into())),
        ("[g2]", Reply::Delayed(Duration::from_millis(30), r#"{"B": "2"}"#.into())),
        ("[g3]", Reply::Delayed(Duration::from_millis(1), r#"{"C": "3"}"#.into())),
    ]);
    let input = chunks(&["g1", "g2", "g3"]);
    let cancel = CancellationToken::new();

    let sequential = extractor(client.clone())
        .find_key_concepts(&input, 3, &cancel)
        .await
        .unwrap();
    let parallel = ConceptExtractor::new(
        client,
        ExtractionConfig {
            concurrency: 3,
            ..Default::default()
        },
    )
    .find_key_concepts(&input, 3, &cancel)
    .await
    .unwrap();

    let concepts: Vec<&str> = parallel.concepts.iter().map(|c| c.concept.as_str()).collect();
    assert_eq!(concepts, ["A", "B", "C"]);
    assert_eq!(parallel.concepts, sequential.concepts);
    assert_eq!(parallel.cost, sequential.cost);
    let order: Vec<usize> = parallel.outcomes.iter().map(|o| o.index).collect();
    assert_eq!(order, vec![0, 1, 2]);
}

#[tokio::test]
async fn sorting_is_opt_in() {
    let client = ScriptedClient::new(vec![("[g1]", text(r#"{"zeta": "z", "Alpha": "a", "beta": "b"}"#))]);
    let input = chunks(&["g1"]);
    let cancel = CancellationToken::new();

    let unsorted = extractor(client.clone())
        .find_key_concepts(&input, 1, &cancel)
        .await
        .unwrap();
    let sorted = ConceptExtractor::new(
        client,
        ExtractionConfig {
            sort_concepts: true,
            ..Default::default()
        },
    )
    .find_key_concepts(&input, 1, &cancel)
    .await
    .unwrap();

    let names = |e: &dynamo_core::Extraction| -> Vec<String> {
        e.concepts.iter().map(|c| c.concept.clone()).collect()
    };
    assert_eq!(names(&unsorted), ["zeta", "Alpha", "beta"]);
    assert_eq!(names(&sorted), ["Alpha", "beta", "zeta"]);
}

#[tokio::test(start_paused = true)]
async fn slow_call_times_out() {
    let client = ScriptedClient::new(vec![("[g1]", Reply::Hang)]);
    let input = chunks(&["g1"]);
    let config = ExtractionConfig {
        call_timeout: Duration::from_secs(5),
        ..Default::default()
    };

    let err = ConceptExtractor::new(client, config)
        .find_key_concepts(&input, 1, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DynamoError::Backend {
            group: 0,
            source: ExtractionBackendError::Timeout { seconds: 5 }
        }
    ));
}

#[tokio::test]
async fn cancelled_token_stops_before_calling() {
    let client = ScriptedClient::new(vec![]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = extractor(client.clone())
        .find_key_concepts(&chunks(&["g1"]), 1, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, DynamoError::Cancelled));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn cancelling_mid_call_returns_cancelled() {
    let client = ScriptedClient::new(vec![("[g1]", Reply::Hang)]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = extractor(client)
        .find_key_concepts(&chunks(&["g1"]), 1, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, DynamoError::Cancelled));
}

#[test]
fn default_group_size_on_fifty_chunks() {
    let input: Vec<Chunk> = (0..50).map(|i| Chunk::new(i.to_string())).collect();
    let groups = group(&input, 0).unwrap();
    assert_eq!(groups.len(), 10);
    assert!(groups.iter().all(|g| g.chunks.len() == 5));
}
