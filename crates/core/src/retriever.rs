//! Transcript retrieval.
//!
//! [`YoutubeRetriever`] asks `yt-dlp` for video info and the caption track
//! list, downloads the best caption track in `json3` format and splits the
//! joined text into chunks. Video metadata lands on the first chunk only.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::{
    cache::{get_cache_dir, get_transcript_path, load_transcript, save_transcript},
    config::RetrieverConfig,
    error::RetrievalError,
    splitter::RecursiveSplitter,
    types::{Chunk, ChunkMetadata, Transcript},
    video_id::{parse_video_id, watch_url},
};

#[async_trait]
pub trait ChunkRetriever: Send + Sync {
    async fn retrieve(&self, video_url: &str) -> Result<Vec<Chunk>, RetrievalError>;
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    subtitles: BTreeMap<String, Vec<CaptionTrack>>,
    #[serde(default)]
    automatic_captions: BTreeMap<String, Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    ext: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Join the caption events of a `json3` track into plain text.
pub fn parse_json3(body: &str) -> Result<String, serde_json::Error> {
    let captions: Json3 = serde_json::from_str(body)?;
    let lines: Vec<String> = captions
        .events
        .iter()
        .map(|event| {
            let line: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            line.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect();
    Ok(lines.join(" "))
}

fn matches_language(track_lang: &str, wanted: &str) -> bool {
    track_lang == wanted
        || track_lang
            .strip_prefix(wanted)
            .is_some_and(|rest| rest.starts_with('-'))
}

fn json3_url(tracks: &[CaptionTrack]) -> Option<&str> {
    tracks
        .iter()
        .find(|t| t.ext == "json3")
        .map(|t| t.url.as_str())
}

/// Manual subtitles beat automatic captions; the wanted language beats
/// English, which beats anything else the uploader provided. Automatic
/// captions are only taken in their original language, never as machine
/// translations.
fn pick_caption<'a>(info: &'a VideoInfo, language: &str) -> Option<(&'a str, &'a str)> {
    let find = |tracks: &'a BTreeMap<String, Vec<CaptionTrack>>, wanted: &str| {
        tracks
            .iter()
            .filter(|(lang, _)| matches_language(lang, wanted))
            .find_map(|(lang, t)| json3_url(t).map(|url| (lang.as_str(), url)))
    };
    let original_auto = || {
        info.automatic_captions
            .iter()
            .filter(|(lang, _)| lang.ends_with("-orig"))
            .find_map(|(lang, t)| json3_url(t).map(|url| (lang.as_str(), url)))
    };
    let any_manual = || {
        info.subtitles
            .iter()
            .find_map(|(lang, t)| json3_url(t).map(|url| (lang.as_str(), url)))
    };

    find(&info.subtitles, language)
        .or_else(|| find(&info.automatic_captions, &format!("{language}-orig")))
        .or_else(|| find(&info.automatic_captions, language))
        .or_else(|| find(&info.subtitles, "en"))
        .or_else(any_manual)
        .or_else(original_auto)
}

/// Split a transcript into chunks, attaching the video metadata to the first.
pub fn chunk_transcript(transcript: &Transcript, splitter: &RecursiveSplitter) -> Vec<Chunk> {
    splitter
        .split_text(&transcript.text)
        .into_iter()
        .enumerate()
        .map(|(i, content)| {
            if i == 0 {
                Chunk::with_metadata(content, transcript.metadata.clone())
            } else {
                Chunk::new(content)
            }
        })
        .collect()
}

pub struct YoutubeRetriever {
    http: reqwest::Client,
    config: RetrieverConfig,
    splitter: RecursiveSplitter,
    yt_dlp: PathBuf,
    cache_root: Option<PathBuf>,
    force: bool,
}

impl YoutubeRetriever {
    pub fn new(config: RetrieverConfig) -> Self {
        let splitter = RecursiveSplitter::new(config.chunk_size, config.chunk_overlap);
        Self {
            http: reqwest::Client::new(),
            config,
            splitter,
            yt_dlp: PathBuf::from("yt-dlp"),
            cache_root: None,
            force: false,
        }
    }

    /// Keep fetched transcripts under `root`, one directory per video.
    pub fn with_cache(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    /// Ignore cached transcripts (they are still refreshed).
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Split a transcript with this retriever's chunk settings.
    pub fn split(&self, transcript: &Transcript) -> Vec<Chunk> {
        chunk_transcript(transcript, &self.splitter)
    }

    /// Fetch the transcript, going through the cache when one is configured.
    pub async fn transcript(&self, video_url: &str) -> Result<Transcript, RetrievalError> {
        let video_id = parse_video_id(video_url)?;

        let Some(root) = &self.cache_root else {
            return self.fetch_transcript(&video_id).await;
        };
        let path = get_transcript_path(&get_cache_dir(root, &video_id));
        if !self.force && path.exists() {
            match load_transcript(&path).await {
                Ok(transcript) => {
                    tracing::info!(video_id = %video_id, path = %path.display(), "Using cached transcript");
                    return Ok(transcript);
                }
                Err(e) => {
                    tracing::warn!(
                        video_id = %video_id,
                        path = %path.display(),
                        error = %e,
                        "Unreadable cached transcript, fetching again"
                    );
                }
            }
        }

        let transcript = self.fetch_transcript(&video_id).await?;
        if let Err(e) = save_transcript(&transcript, &path).await {
            tracing::warn!(path = %path.display(), error = %e, "Could not cache transcript");
        }
        Ok(transcript)
    }

    async fn video_info(&self, url: &str) -> Result<VideoInfo, RetrievalError> {
        let output = Command::new(&self.yt_dlp)
            .arg("-J")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg(url)
            .output()
            .await
            .map_err(|e| RetrievalError::Command {
                program: "yt-dlp",
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(RetrievalError::Command {
                program: "yt-dlp",
                url: url.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    async fn fetch_transcript(&self, video_id: &str) -> Result<Transcript, RetrievalError> {
        let url = watch_url(video_id);
        let info = self.video_info(&url).await?;

        let (language, caption_url) = pick_caption(&info, &self.config.language)
            .map(|(lang, url)| (lang.trim_end_matches("-orig").to_string(), url.to_string()))
            .ok_or_else(|| RetrievalError::NoTranscript { url: url.clone() })?;
        tracing::debug!(video_id, language = %language, "Selected caption track");

        let body = self
            .http
            .get(&caption_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let text = parse_json3(&body)?;
        if text.is_empty() {
            return Err(RetrievalError::NoTranscript { url });
        }

        Ok(Transcript {
            metadata: ChunkMetadata {
                source: info.id.clone(),
                author: info
                    .uploader
                    .or(info.channel)
                    .unwrap_or_else(|| "Unknown".to_string()),
                length: info.duration.unwrap_or(0.0).max(0.0).round() as u64,
                title: info.title.unwrap_or_default(),
            },
            language,
            text,
        })
    }
}

#[async_trait]
impl ChunkRetriever for YoutubeRetriever {
    async fn retrieve(&self, video_url: &str) -> Result<Vec<Chunk>, RetrievalError> {
        let transcript = self.transcript(video_url).await?;
        let chunks = self.split(&transcript);
        if chunks.is_empty() {
            return Err(RetrievalError::NoTranscript {
                url: video_url.to_string(),
            });
        }

        tracing::info!(
            author = %transcript.metadata.author,
            length = transcript.metadata.length,
            title = %transcript.metadata.title,
            language = %transcript.language,
            chunks = chunks.len(),
            characters = transcript.text.chars().count(),
            "Retrieved transcript"
        );
        Ok(chunks)
    }
}

/// Whether a transcript for `video_url` is already cached under `root`.
pub fn is_cached(root: &Path, video_url: &str) -> bool {
    parse_video_id(video_url)
        .map(|id| get_transcript_path(&get_cache_dir(root, &id)).exists())
        .unwrap_or(false)
}
