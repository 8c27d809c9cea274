use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::boundaries::PageState;
use crate::language_utils;

// @module: Caption track discovery and selection from host page state

/// Display name of a track as the page embeds it: either a bare
/// `{"simpleText": …}` or a `{"runs": [{"text": …}]}` fragment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TrackName {
    Simple {
        #[serde(rename = "simpleText")]
        simple_text: String,
    },
    Runs {
        runs: Vec<TrackNameRun>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackNameRun {
    pub text: String,
}

impl TrackName {
    /// Flattened display text
    pub fn display(&self) -> String {
        match self {
            TrackName::Simple { simple_text } => simple_text.clone(),
            TrackName::Runs { runs } => runs.iter().map(|r| r.text.as_str()).collect(),
        }
    }
}

/// Ephemeral caption track descriptor, sourced from page state once per
/// session and never persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackDescriptor {
    // @field: Fetchable payload URL (may be absent on stub entries)
    pub base_url: Option<String>,

    // @field: BCP-47-ish language code ("en", "en-GB", …)
    pub language_code: Option<String>,

    // @field: Opaque track identifier (".en", "a.en", …)
    pub vss_id: Option<String>,

    // @field: Track kind; "asr" marks auto-generated captions
    pub kind: Option<String>,

    pub is_translatable: Option<bool>,

    // @field: Human-readable display name
    pub name: Option<TrackName>,
}

impl TrackDescriptor {
    /// Whether this track is auto-generated speech recognition output
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Resolve caption track descriptors from the page, trying three sources in
/// order and returning the first non-empty result:
/// (a) the host player API object,
/// (b) the page-global preloaded player-response state,
/// (c) a last-resort scan of inline script payloads.
///
/// Every parse failure is local to its strategy: it logs at debug level and
/// falls through, never escalating.
pub fn get_caption_tracks(page: &dyn PageState) -> Vec<TrackDescriptor> {
    if let Some(value) = page.player_api_tracks() {
        let tracks = tracks_from_value(&value);
        if !tracks.is_empty() {
            debug!("resolved {} caption tracks via player API", tracks.len());
            return tracks;
        }
    }

    if let Some(response) = page.player_response() {
        let tracks = tracks_from_player_response(&response);
        if !tracks.is_empty() {
            debug!("resolved {} caption tracks via player response", tracks.len());
            return tracks;
        }
    }

    for script in page.inline_scripts() {
        let tracks = tracks_from_script(&script);
        if !tracks.is_empty() {
            debug!("resolved {} caption tracks via inline script scan", tracks.len());
            return tracks;
        }
    }

    Vec::new()
}

/// Parse a JSON array of track objects, skipping malformed elements
fn tracks_from_value(value: &Value) -> Vec<TrackDescriptor> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<TrackDescriptor>(item.clone()) {
            Ok(track) if track != TrackDescriptor::default() => Some(track),
            Ok(_) => None,
            Err(e) => {
                debug!("skipping malformed track entry: {}", e);
                None
            }
        })
        .collect()
}

/// Navigate the preloaded player response down to its caption track list
fn tracks_from_player_response(response: &Value) -> Vec<TrackDescriptor> {
    response
        .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
        .map(tracks_from_value)
        .unwrap_or_default()
}

/// Last-resort strategy: find a `"captionTracks":[…]` array inside an inline
/// script body and parse it.
fn tracks_from_script(script: &str) -> Vec<TrackDescriptor> {
    let Some(raw) = extract_json_array(script, "\"captionTracks\":") else {
        return Vec::new();
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => tracks_from_value(&value),
        Err(e) => {
            debug!("inline captionTracks array did not parse: {}", e);
            Vec::new()
        }
    }
}

/// Extract the balanced JSON array following `key` in `haystack`.
///
/// A minimal non-regex extractor: walks the text tracking bracket depth and
/// correctly skipping quoted strings (including escapes), since track URLs
/// routinely contain `[` and `]` inside string values.
pub fn extract_json_array(haystack: &str, key: &str) -> Option<String> {
    let key_pos = haystack.find(key)?;
    let after_key = &haystack[key_pos + key.len()..];
    let open = after_key.find('[')?;
    let body = &after_key[open..];

    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in body.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(body[..=i].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// Score and select the best caption track for a preferred language.
///
/// Soft weighted ranking instead of a hard filter: different videos expose
/// inconsistent or missing metadata fields, so a candidate is never rejected
/// outright for a missing field, it just scores lower. Returns the
/// max-scoring candidate (first wins on ties), or `None` for an empty list.
pub fn pick_best_track<'a>(
    tracks: &'a [TrackDescriptor],
    preferred_language: &str,
) -> Option<&'a TrackDescriptor> {
    let preferred_name = language_utils::get_language_name(preferred_language)
        .unwrap_or_default()
        .to_lowercase();

    let mut best: Option<(&TrackDescriptor, i32)> = None;
    for track in tracks {
        let score = score_track(track, preferred_language, &preferred_name);
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((track, score)),
        }
    }

    best.map(|(track, _)| track)
}

fn score_track(track: &TrackDescriptor, preferred: &str, preferred_name: &str) -> i32 {
    let mut score = 0;

    if let Some(code) = &track.language_code {
        if code.eq_ignore_ascii_case(preferred) {
            score += 50;
        } else if language_utils::is_regional_variant(code, preferred) {
            score += 35;
        } else if language_utils::language_codes_match(code, preferred) {
            score += 30;
        }
    }

    if let Some(vss_id) = &track.vss_id {
        // vssId patterns like ".en" (manual) or "a.en" (auto) suggest the
        // language even when languageCode is absent
        let lowered = vss_id.to_lowercase();
        if lowered.ends_with(&format!(".{}", preferred))
            || lowered.contains(&format!(".{}-", preferred))
        {
            score += 20;
        }
    }

    if !preferred_name.is_empty()
        && track
            .name
            .as_ref()
            .is_some_and(|n| n.display().to_lowercase().contains(preferred_name))
    {
        score += 15;
    }

    if !track.is_auto_generated() {
        score += 10;
    }

    if track.is_translatable == Some(true) {
        score += 5;
    }

    score
}
