//! Dynamo Core Library
//!
//! Retrieves YouTube transcripts, splits them into chunks, and asks an LLM to
//! find and define the key concepts, a group of chunks at a time.

pub mod cache;
pub mod config;
pub mod cost;
pub mod error;
pub mod extract;
pub mod format;
pub mod grouping;
pub mod llm;
pub mod parse;
pub mod provider;
pub mod retriever;
pub mod sanitize;
pub mod splitter;
pub mod types;
pub mod video_id;

// Re-export commonly used items at crate root
pub use cache::{get_cache_dir, get_root_cache_dir, get_transcript_path};
pub use config::{CostRates, DEFAULT_TEMPERATURE, ExtractionConfig, RetrieverConfig};
pub use cost::CostEstimate;
pub use error::{DynamoError, ExtractionBackendError, Result, RetrievalError};
pub use extract::{ConceptExtractor, Extraction, GroupOutcome};
pub use format::{format_concepts_readable, format_timestamp};
pub use grouping::{Group, GroupPlan, GroupQuality, group, plan_groups};
pub use llm::{ChatCompletionsClient, LlmClient};
pub use provider::{Provider, ProviderConfig};
pub use retriever::{ChunkRetriever, YoutubeRetriever};
pub use types::{Chunk, ChunkMetadata, ConceptEntry, Transcript};
pub use tokio_util::sync::CancellationToken;
