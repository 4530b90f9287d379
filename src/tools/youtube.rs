//! YouTube transcript fetching.
//!
//! Caption tracks are listed in the player response embedded in the watch
//! page. The chosen track is then downloaded in YouTube's `json3` format.

use super::{required_str, Tool, ToolOutput};
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matches the watch, short, embed and /v/ URL shapes, or a bare ID
        Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.)?
                (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    })
}

/// Extract the 11-character video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = video_id_regex().captures(input.trim())?;

    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Format seconds as `mm:ss`; minutes are not wrapped into hours.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[derive(Debug, Error)]
enum TranscriptError {
    #[error("Error: Transcripts are disabled for this video.")]
    Disabled,

    #[error("Error: No transcripts found for this video.")]
    NotFound,

    #[error("Error retrieving transcript: {0}")]
    Fetch(String),
}

impl From<reqwest::Error> for TranscriptError {
    fn from(e: reqwest::Error) -> Self {
        TranscriptError::Fetch(e.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    /// `"asr"` for auto-generated tracks.
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_english(&self) -> bool {
        self.language_code == "en" || self.language_code.starts_with("en-")
    }

    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedEvent {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    segs: Vec<TimedSegment>,
}

#[derive(Debug, Deserialize)]
struct TimedSegment {
    #[serde(default)]
    utf8: String,
}

/// Pull the caption track list out of a watch page.
fn parse_caption_tracks(html: &str) -> Option<Vec<CaptionTrack>> {
    const MARKER: &str = "\"captionTracks\":";
    let start = html.find(MARKER)? + MARKER.len();
    // The array is followed by more player JSON; stop after the first value.
    serde_json::Deserializer::from_str(&html[start..])
        .into_iter::<Vec<CaptionTrack>>()
        .next()?
        .ok()
}

/// Prefer an auto-generated English track, then any English track.
fn choose_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.is_english() && t.is_generated())
        .or_else(|| tracks.iter().find(|t| t.is_english()))
}

/// Render `[mm:ss] text` lines, one per caption event.
fn render_transcript(timed: &TimedText) -> String {
    timed
        .events
        .iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.replace('\n', " ");
            let text = text.trim();
            if text.is_empty() {
                None
            } else {
                Some(format!(
                    "[{}] {}",
                    format_timestamp(event.t_start_ms as f64 / 1000.0),
                    text
                ))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Loads the timestamped transcript of a YouTube video.
pub struct YoutubeTranscriptTool {
    http: reqwest::Client,
    base_url: String,
}

impl YoutubeTranscriptTool {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: YOUTUBE_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_transcript(&self, video_id: &str) -> std::result::Result<String, TranscriptError> {
        let page = self
            .http
            .get(format!("{}/watch", self.base_url))
            .query(&[("v", video_id)])
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;

        if !page.status().is_success() {
            return Err(TranscriptError::Fetch(format!(
                "watch page returned {}",
                page.status()
            )));
        }

        let html = page.text().await?;
        let tracks = parse_caption_tracks(&html).unwrap_or_default();
        if tracks.is_empty() {
            return Err(TranscriptError::Disabled);
        }

        let track = choose_track(&tracks).ok_or(TranscriptError::NotFound)?;
        debug!(
            "Using {} caption track ({}) for {}",
            track.language_code,
            if track.is_generated() { "generated" } else { "manual" },
            video_id
        );

        let timed: TimedText = self
            .http
            .get(&track.base_url)
            .query(&[("fmt", "json3")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let transcript = render_transcript(&timed);
        if transcript.is_empty() {
            return Err(TranscriptError::NotFound);
        }
        Ok(transcript)
    }
}

#[async_trait]
impl Tool for YoutubeTranscriptTool {
    fn name(&self) -> &str {
        "get_youtube_transcript"
    }

    fn description(&self) -> &str {
        "Load a YouTube video's transcript and return the full timestamped transcript."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "video_url": {
                    "type": "string",
                    "description": "YouTube URL (watch, youtu.be, embed or /v/ form) or an 11-character video ID"
                }
            },
            "required": ["video_url"]
        })
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolOutput> {
        let url = required_str(&arguments, "video_url")?;

        let Some(video_id) = extract_video_id(url) else {
            return Ok(ToolOutput::error("Invalid YouTube URL."));
        };

        match self.fetch_transcript(&video_id).await {
            Ok(transcript) => Ok(ToolOutput::text(transcript)),
            Err(e) => Ok(ToolOutput::text(e.to_string())),
        }
    }
}
