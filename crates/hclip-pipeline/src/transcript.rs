//! Caption normalization.
//!
//! Turns a downloaded VTT caption track into a single line of plain text
//! suitable for a language-model prompt.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use hclip_models::{AcquiredMedia, Transcript};

/// Inline markup: `<c>`, `</c>`, `<i>`, `<00:00:01.000>`, `<v Speaker>`.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<>]*>").unwrap());

/// Block keywords whose whole block carries no caption text.
const SKIPPED_BLOCKS: &[&str] = &["NOTE", "STYLE", "REGION"];

/// Load the preferred caption track of `media` and normalize it.
///
/// Missing captions, unreadable files and blank results all yield an
/// unavailable transcript.
pub async fn load_transcript(media: &AcquiredMedia, languages: &[String]) -> Transcript {
    let Some(track) = media.preferred_caption(languages) else {
        debug!(media_id = %media.media_id, "No caption track downloaded");
        return Transcript::unavailable();
    };

    let raw = match tokio::fs::read(&track.path).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!(
                path = %track.path.display(),
                error = %e,
                "Failed to read caption file"
            );
            return Transcript::unavailable();
        }
    };

    let text = normalize_text(&raw);
    debug!(
        media_id = %media.media_id,
        language = %track.language,
        chars = text.chars().count(),
        "Normalized caption track"
    );

    Transcript::new(text, track.language.clone())
}

/// Normalize caption text to a single space-joined line.
///
/// Lines containing `-->` or `WEBVTT`, and pure digit lines, are dropped.
/// Inline tags are stripped, leftover unpaired `<`/`>` removed and
/// consecutive duplicate lines (rolling auto-captions) collapsed. For WebVTT documents the header block and
/// `NOTE`/`STYLE`/`REGION` blocks are skipped as well.
///
/// Applying the function to its own output returns the output unchanged.
pub fn normalize_text(raw: &str) -> String {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let is_vtt = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| l.starts_with("WEBVTT"))
        .unwrap_or(false);

    let mut kept: Vec<String> = Vec::new();
    let mut in_header = is_vtt;
    let mut skipping_block = false;
    let mut block_start = true;

    for line in raw.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            in_header = false;
            skipping_block = false;
            block_start = true;
            continue;
        }

        let at_block_start = block_start;
        block_start = false;

        if in_header || skipping_block {
            continue;
        }

        if is_vtt && at_block_start && starts_skipped_block(trimmed) {
            skipping_block = true;
            continue;
        }

        let text = strip_tags(trimmed);
        if text.contains("-->") {
            continue;
        }

        // Unpaired brackets would pair up across the join on a later pass
        let text = text.replace(['<', '>', '\u{feff}'], "");
        let text = text.trim();

        if text.is_empty()
            || text.contains("WEBVTT")
            || text.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }

        if kept.last().map(String::as_str) != Some(text) {
            kept.push(text.to_string());
        }
    }

    kept.join(" ")
}

fn starts_skipped_block(line: &str) -> bool {
    SKIPPED_BLOCKS.iter().any(|kw| {
        line.strip_prefix(kw)
            .map(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
            .unwrap_or(false)
    })
}

/// Remove tags until none remain, so `<<b>i>` cannot leave a tag behind.
fn strip_tags(line: &str) -> String {
    let mut out = line.to_string();
    while TAG_PATTERN.is_match(&out) {
        out = TAG_PATTERN.replace_all(&out, "").into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hclip_models::{CaptionTrack, MediaId};
    use std::path::PathBuf;

    const SAMPLE_VTT: &str = "WEBVTT
Kind: captions
Language: en

NOTE This is a comment
spanning two lines

STYLE
::cue { color: yellow }

1
00:00:01.000 --> 00:00:04.000 align:start position:0%
Hello <c.colorE5E5E5>everyone</c>

2
00:00:04.000 --> 00:00:06.000
Hello everyone

3
00:00:06.000 --> 00:00:09.000
<00:00:06.500><c>welcome to the</c> show
";

    #[test]
    fn test_normalize_vtt() {
        assert_eq!(normalize_text(SAMPLE_VTT), "Hello everyone welcome to the show");
    }

    #[test]
    fn test_basic_rules() {
        let raw = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n  first line  \n42\nsecond line\n";
        assert_eq!(normalize_text(raw), "first line second line");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            SAMPLE_VTT,
            "WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.000\nNOTE that this is kept\n",
            "plain text\nwith <<b>i> nested tags\n--<b>> arrow\n",
            "1\n2\n3\n",
            "x <\n> y",
            "1<\n>2\nend",
            "a --\n> b\nWEB<\n>VTT",
            "first\n\u{feff}second",
            "",
        ];

        for raw in samples {
            let once = normalize_text(raw);
            assert_eq!(normalize_text(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_unpaired_brackets_do_not_span_lines() {
        assert_eq!(normalize_text("x <\n> y"), "x y");
        assert_eq!(normalize_text("1<\n>2\nend"), "end");
        assert_eq!(normalize_text("a --\n> b"), "a -- b");
    }

    #[test]
    fn test_note_inside_cue_is_text() {
        let raw = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nNOTE that this is kept\n";
        assert_eq!(normalize_text(raw), "NOTE that this is kept");
    }

    #[test]
    fn test_tags_that_form_arrows_are_dropped() {
        assert_eq!(normalize_text("--<b>> arrow\nkept"), "kept");
    }

    #[test]
    fn test_only_cues_is_empty() {
        let raw = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.000\n\n";
        assert_eq!(normalize_text(raw), "");
    }

    fn media_with_captions(dir: &std::path::Path, tracks: &[(&str, Option<&str>)]) -> AcquiredMedia {
        let captions = tracks
            .iter()
            .map(|(lang, content)| {
                let path = dir.join(format!("abc.{}.vtt", lang));
                if let Some(content) = content {
                    std::fs::write(&path, content).unwrap();
                }
                CaptionTrack::new(*lang, path)
            })
            .collect();

        AcquiredMedia {
            media_id: MediaId::new("abc"),
            title: "Title".to_string(),
            video_path: PathBuf::from("/tmp/abc.mp4"),
            duration_secs: 100.0,
            captions,
        }
    }

    fn langs() -> Vec<String> {
        vec!["id".to_string(), "en".to_string()]
    }

    #[tokio::test]
    async fn test_load_prefers_primary_language() {
        let dir = tempfile::tempdir().unwrap();
        let media = media_with_captions(
            dir.path(),
            &[
                ("en", Some("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhello\n")),
                ("id", Some("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhalo\n")),
            ],
        );

        let transcript = load_transcript(&media, &langs()).await;
        assert!(transcript.is_available());
        assert_eq!(transcript.text, "halo");
        assert_eq!(transcript.language.as_deref(), Some("id"));
    }

    #[tokio::test]
    async fn test_load_falls_back_to_secondary() {
        let dir = tempfile::tempdir().unwrap();
        let media = media_with_captions(
            dir.path(),
            &[("en", Some("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhello\n"))],
        );

        let transcript = load_transcript(&media, &langs()).await;
        assert_eq!(transcript.language.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_no_captions_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let media = media_with_captions(dir.path(), &[]);
        assert!(!load_transcript(&media, &langs()).await.is_available());
    }

    #[tokio::test]
    async fn test_unreadable_caption_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let media = media_with_captions(dir.path(), &[("id", None)]);
        assert!(!load_transcript(&media, &langs()).await.is_available());
    }

    #[tokio::test]
    async fn test_blank_caption_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let media = media_with_captions(dir.path(), &[("id", Some("WEBVTT\n\n"))]);
        assert!(!load_transcript(&media, &langs()).await.is_available());
    }
}
