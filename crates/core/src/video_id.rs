use url::Url;

use crate::error::RetrievalError;

const YOUTUBE_HOSTS: [&str; 5] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "www.youtube-nocookie.com",
];

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract the 11 character video id from any of the usual YouTube link
/// shapes (`watch?v=`, `youtu.be/`, `/shorts/`, `/embed/`, `/live/`).
pub fn parse_video_id(link: &str) -> Result<String, RetrievalError> {
    let invalid = |reason: &str| RetrievalError::InvalidUrl {
        url: link.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(link.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http(s) link"));
    }
    let host = url.host_str().ok_or_else(|| invalid("missing host"))?;

    let candidate = if host == "youtu.be" {
        url.path_segments().and_then(|mut s| s.next()).map(str::to_string)
    } else if YOUTUBE_HOSTS.contains(&host) {
        let mut segments = url.path_segments().into_iter().flatten();
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            Some("shorts" | "embed" | "live" | "v") => segments.next().map(str::to_string),
            _ => None,
        }
    } else {
        return Err(RetrievalError::Unsupported {
            url: link.to_string(),
        });
    };

    match candidate {
        Some(id) if is_video_id(&id) => Ok(id),
        Some(_) => Err(invalid("malformed video id")),
        None => Err(invalid("no video id in link")),
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}
