use std::{
    hash::{DefaultHasher, Hash, Hasher},
    path::{Path, PathBuf},
};

use tokio::fs;

use crate::types::Transcript;

/// Get the cache directory for a given video id
pub fn get_cache_dir(root: &Path, video_id: &str) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    video_id.hash(&mut hasher);
    root.join(hasher.finish().to_string())
}

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("dynamo")
}

/// Get the path for a cached transcript file
pub fn get_transcript_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("transcript.json")
}

/// Load a transcript from a cached file
pub async fn load_transcript(path: &Path) -> std::io::Result<Transcript> {
    let json_content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&json_content)?)
}

/// Save a transcript, creating its directory if needed.
///
/// The file is written next to its target and renamed into place, so readers
/// never see a partial transcript.
pub async fn save_transcript(transcript: &Transcript, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let pretty_json = serde_json::to_string_pretty(transcript)?;
    let tmp_path = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
    if let Err(e) = fs::write(&tmp_path, &pretty_json).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}
