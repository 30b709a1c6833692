//! Application state shared across all request handlers.

use std::sync::Arc;

use dynamo_core::{ChunkRetriever, ConceptExtractor};
use tokio_util::sync::CancellationToken;

/// Group size used when a request does not name one.
pub const DEFAULT_GROUP_SIZE: usize = 15;

pub struct AppState {
    pub retriever: Arc<dyn ChunkRetriever>,
    pub extractor: ConceptExtractor,
    pub default_group_size: usize,
    /// Cancelled on shutdown; every request works under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(retriever: Arc<dyn ChunkRetriever>, extractor: ConceptExtractor) -> Self {
        Self {
            retriever,
            extractor,
            default_group_size: DEFAULT_GROUP_SIZE,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_default_group_size(mut self, group_size: usize) -> Self {
        self.default_group_size = group_size;
        self
    }
}
