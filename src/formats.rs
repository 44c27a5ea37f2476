use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Codec value meaning "this track does not exist in this format".
pub const CODEC_NONE: &str = "none";
pub const RECOMMENDED_MIN_HEIGHT: i64 = 720;
const RECOMMENDED_EXT_MARKERS: &[&str] = &["mp4", "m4a"];

/// Resolution descriptor as the backend reports it: either text such as
/// `"1920x1080"` / `"720p"`, or a bare number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resolution {
    Numeric(serde_json::Number),
    Text(String),
}

impl Resolution {
    pub fn score(&self) -> i64 {
        match self {
            Resolution::Numeric(n) => numeric_score(n),
            Resolution::Text(text) => score_resolution_text(text),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Resolution::Text(t) if t.trim().is_empty())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Numeric(n) => match n.as_f64() {
                Some(v) if n.is_f64() && v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.0}"),
                _ => write!(f, "{n}"),
            },
            Resolution::Text(t) => f.write_str(t),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatRecord {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub format_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub ext: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_resolution",
        skip_serializing_if = "Option::is_none"
    )]
    pub resolution: Option<Resolution>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub format_note: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub vcodec: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub acodec: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_filesize",
        skip_serializing_if = "Option::is_none"
    )]
    pub filesize: Option<u64>,
}

impl FormatRecord {
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn has_video(&self) -> bool {
        codec_present(self.vcodec.as_deref())
    }

    pub fn has_audio(&self) -> bool {
        codec_present(self.acodec.as_deref())
    }

    pub fn resolution_score(&self) -> i64 {
        self.resolution.as_ref().map(Resolution::score).unwrap_or(0)
    }

    pub fn resolution_text(&self) -> Option<String> {
        self.resolution
            .as_ref()
            .filter(|r| !r.is_blank())
            .map(|r| r.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackCategory {
    Video,
    Audio,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterCategory {
    #[default]
    Recommended,
    Video,
    Audio,
    Other,
    All,
}

impl FilterCategory {
    pub const ALL: [FilterCategory; 5] = [
        FilterCategory::Recommended,
        FilterCategory::Video,
        FilterCategory::Audio,
        FilterCategory::Other,
        FilterCategory::All,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterCategory::Recommended => "recommended",
            FilterCategory::Video => "video",
            FilterCategory::Audio => "audio",
            FilterCategory::Other => "other",
            FilterCategory::All => "all",
        }
    }

    pub fn matches(self, record: &FormatRecord) -> bool {
        match self {
            FilterCategory::Recommended => is_recommended(record),
            FilterCategory::Video => classify(record) == TrackCategory::Video,
            FilterCategory::Audio => classify(record) == TrackCategory::Audio,
            FilterCategory::Other => classify(record) == TrackCategory::Other,
            FilterCategory::All => true,
        }
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FilterCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                format!("unknown filter category: {s} (expected recommended, video, audio, other or all)")
            })
    }
}

pub fn classify(record: &FormatRecord) -> TrackCategory {
    if record.has_video() {
        TrackCategory::Video
    } else if record.has_audio() {
        TrackCategory::Audio
    } else {
        TrackCategory::Other
    }
}

/// A sensible one-click default: combined audio+video first, then either a
/// widely compatible container or at least 720 lines.
pub fn is_recommended(record: &FormatRecord) -> bool {
    if !(record.has_video() && record.has_audio()) {
        return false;
    }
    let compatible_ext = record
        .ext
        .as_deref()
        .map(|ext| RECOMMENDED_EXT_MARKERS.iter().any(|m| ext.contains(*m)))
        .unwrap_or(false);
    compatible_ext || record.resolution_score() >= RECOMMENDED_MIN_HEIGHT
}

pub fn resolution_score(resolution: Option<&Resolution>) -> i64 {
    resolution.map(Resolution::score).unwrap_or(0)
}

/// Pixel height from `"720p"` or `"1920x1080"`, 0 when neither matches.
pub fn score_resolution_text(text: &str) -> i64 {
    if let Some(caps) = progressive_re().captures(text) {
        return caps[1].parse().unwrap_or(i64::MAX);
    }
    if let Some(caps) = dimensions_re().captures(text) {
        return caps[2].parse().unwrap_or(i64::MAX);
    }
    0
}

pub fn search_haystack(record: &FormatRecord) -> String {
    let resolution = record.resolution_text();
    [
        record.format_id.as_deref(),
        record.ext.as_deref(),
        resolution.as_deref(),
        record.vcodec.as_deref(),
        record.acodec.as_deref(),
        record.format_note.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

/// Label for the quality choice list, e.g. `"22 – 1280x720"`.
pub fn selection_label(record: &FormatRecord) -> String {
    let id = non_empty(record.format_id.as_deref()).unwrap_or("?");
    let quality = record
        .resolution_text()
        .or_else(|| non_empty(record.format_note.as_deref()).map(str::to_string))
        .or_else(|| non_empty(record.ext.as_deref()).map(str::to_string))
        .or_else(|| non_empty(record.format_id.as_deref()).map(str::to_string));
    match quality {
        Some(q) => format!("{id} \u{2013} {q}"),
        None => id.to_string(),
    }
}

fn codec_present(codec: Option<&str>) -> bool {
    match codec.map(str::trim) {
        Some(c) => !c.is_empty() && c != CODEC_NONE,
        None => false,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn numeric_score(n: &serde_json::Number) -> i64 {
    if let Some(v) = n.as_i64() {
        return v;
    }
    if n.as_u64().is_some() {
        return i64::MAX;
    }
    n.as_f64().map(|f| f as i64).unwrap_or(0)
}

fn progressive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)[pP]").expect("progressive resolution regex"))
}

fn dimensions_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)[xX](\d+)").expect("dimensions resolution regex"))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_resolution<'de, D>(deserializer: D) -> Result<Option<Resolution>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(Resolution::Text(s)),
        Value::Number(n) => Some(Resolution::Numeric(n)),
        _ => None,
    })
}

fn lenient_filesize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Number(n) = value else {
        return Ok(None);
    };
    if let Some(v) = n.as_u64() {
        return Ok(Some(v));
    }
    Ok(n.as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f as u64))
}

/// Decodes a `formats` list; absent, `null` or non-array input is empty.
pub fn deserialize_records<'de, D>(deserializer: D) -> Result<Vec<FormatRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.iter().map(FormatRecord::from_value).collect(),
        _ => Vec::new(),
    })
}
