use serde::{Deserialize, Serialize};

/// Video-level details, carried only by the first chunk of a transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub author: String,
    /// Video duration in seconds.
    pub length: u64,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChunkMetadata>,
}

impl Chunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            content: content.into(),
            metadata: Some(metadata),
        }
    }
}

/// Full transcript of a video as returned by the retriever, before splitting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transcript {
    pub metadata: ChunkMetadata,
    pub language: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptEntry {
    pub concept: String,
    pub definition: String,
}

impl ConceptEntry {
    pub fn new(concept: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            definition: definition.into(),
        }
    }
}
