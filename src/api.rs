use crate::config::ClientConfig;
use crate::formats::{deserialize_records, FormatRecord};
use crate::{EngineError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const INFO_PATH: &str = "api/info";
const DOWNLOAD_PATH: &str = "api/download";
const BULK_PATH: &str = "api/bulk";
const SETTINGS_PATH: &str = "api/settings";
const FILES_PATH: &str = "files";

pub const MISSING_INFO_URL: &str = "Enter a URL first.";
pub const MISSING_DOWNLOAD_URL: &str = "Please enter a URL.";
pub const MISSING_BULK_URLS: &str = "Provide at least one URL.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    /// Ordered lowest to highest quality.
    #[serde(default, deserialize_with = "lenient_thumbnails")]
    pub thumbnails: Vec<Thumbnail>,
    #[serde(default, deserialize_with = "deserialize_records")]
    pub formats: Vec<FormatRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub format_id: Option<String>,
    pub audio_only: bool,
    pub output_template: Option<String>,
    pub target_dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkDownloadRequest {
    pub urls: String,
    /// Optional text file with one URL per line, merged into `urls`.
    pub url_file: Option<PathBuf>,
    pub target_dir: Option<String>,
    pub format_id: Option<String>,
    pub audio_only: bool,
    pub archive: bool,
    pub output_template: Option<String>,
}

impl BulkDownloadRequest {
    pub fn collect_urls(&self) -> Result<Vec<String>> {
        let mut raw = self.urls.clone();
        if let Some(path) = &self.url_file {
            let bytes = std::fs::read(path)?;
            raw.push('\n');
            raw.push_str(&String::from_utf8_lossy(&bytes));
        }
        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn form_fields(&self, urls: &[String]) -> Vec<(&'static str, String)> {
        vec![
            ("urls", urls.join("\n")),
            ("target_dir", self.target_dir.clone().unwrap_or_default()),
            ("format_id", self.format_id.clone().unwrap_or_default()),
            ("audio_only", bool_field(self.audio_only)),
            ("archive", bool_field(self.archive)),
            (
                "output_template",
                self.output_template.clone().unwrap_or_default(),
            ),
        ]
    }
}

/// Outcome of a bulk run; `errors` may be non-empty on success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkDownloadResponse {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub archive: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl BulkDownloadResponse {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub download_dir: String,
    #[serde(default)]
    pub auto_archive_bulk: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_archive_bulk: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    agent: ureq::Agent,
    download_agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(server_url: &str) -> Result<Self> {
        Self::from_config(&ClientConfig {
            server_url: server_url.to_string(),
            ..ClientConfig::default()
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let base = normalize_server_url(&config.server_url)?;
        Ok(Self {
            base,
            agent: build_agent(config.info_timeout_secs),
            download_agent: build_agent(config.download_timeout_secs),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn fetch_info(&self, media_url: &str) -> Result<MediaInfo> {
        let media_url = require_url(media_url, MISSING_INFO_URL)?;
        log::debug!("fetching info for {}", redact_url_for_log(media_url));
        let (status, text) =
            self.post_json(&self.agent, INFO_PATH, &serde_json::json!({ "url": media_url }))?;
        let value = decode_envelope(status, &text, "Failed to fetch info")?;
        let info = value
            .get("info")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        Ok(serde_json::from_value(info)?)
    }

    pub fn download(&self, request: &DownloadRequest) -> Result<DownloadResponse> {
        require_url(&request.url, MISSING_DOWNLOAD_URL)?;
        let mut request = request.clone();
        request.url = request.url.trim().to_string();
        log::debug!("starting download for {}", redact_url_for_log(&request.url));
        let (status, text) = self.post_json(&self.download_agent, DOWNLOAD_PATH, &request)?;
        let value = decode_envelope(status, &text, "Download failed")?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn bulk_download(&self, request: &BulkDownloadRequest) -> Result<BulkDownloadResponse> {
        let urls = request.collect_urls()?;
        if urls.is_empty() {
            return Err(EngineError::Validation(MISSING_BULK_URLS.to_string()));
        }
        log::debug!("starting bulk download of {} urls", urls.len());

        let endpoint = self.endpoint(BULK_PATH)?;
        let mut resp = self
            .download_agent
            .post(endpoint.as_str())
            .header("Accept", "application/json")
            .send_form(request.form_fields(&urls))?;
        let status = resp.status().as_u16();
        let text = resp.body_mut().read_to_string()?;
        let value = decode_envelope(status, &text, "Bulk download failed")?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn settings(&self) -> Result<Settings> {
        let endpoint = self.endpoint(SETTINGS_PATH)?;
        let mut resp = self
            .agent
            .get(endpoint.as_str())
            .header("Accept", "application/json")
            .call()?;
        let status = resp.status().as_u16();
        let text = resp.body_mut().read_to_string()?;
        let value = decode_envelope(status, &text, "Failed to load settings")?;
        settings_from(&value)
    }

    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<Settings> {
        let (status, text) = self.post_json(&self.agent, SETTINGS_PATH, update)?;
        let value = decode_envelope(status, &text, "Failed to update settings")?;
        settings_from(&value)
    }

    pub fn file_link(&self, path: &str) -> String {
        match self.endpoint(FILES_PATH) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("path", path);
                url.to_string()
            }
            Err(_) => file_link_path(path),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| EngineError::InvalidUrl(format!("{path}: {e}")))
    }

    fn post_json<B: Serialize>(
        &self,
        agent: &ureq::Agent,
        path: &str,
        body: &B,
    ) -> Result<(u16, String)> {
        let endpoint = self.endpoint(path)?;
        let payload = serde_json::to_string(body)?;
        let mut resp = agent
            .post(endpoint.as_str())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(payload.as_str())?;
        let status = resp.status().as_u16();
        let text = resp.body_mut().read_to_string()?;
        Ok((status, text))
    }
}

/// Server-relative link for a produced file, e.g. `/files?path=%2Ftmp%2Fa.mp4`.
pub fn file_link_path(path: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("path", path)
        .finish();
    format!("/{FILES_PATH}?{query}")
}

pub fn normalize_server_url(value: &str) -> Result<Url> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidUrl("empty server URL".to_string()));
    }
    let mut parsed = Url::parse(trimmed)
        .map_err(|_| EngineError::InvalidUrl(format!("invalid URL format: {trimmed}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        _ => {
            return Err(EngineError::InvalidUrl(format!(
                "unsupported URL scheme for {}; only http/https are allowed",
                redact_url_for_log(trimmed)
            )));
        }
    }
    if parsed.host_str().is_none() {
        return Err(EngineError::InvalidUrl(format!(
            "URL is missing host: {}",
            redact_url_for_log(trimmed)
        )));
    }
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed)
}

/// Scheme and host only; media URLs may carry tokens in path or query.
pub fn redact_url_for_log(value: &str) -> String {
    let Ok(parsed) = Url::parse(value.trim()) else {
        return "[invalid-url]".to_string();
    };
    let host = parsed.host_str().unwrap_or("unknown-host");
    match parsed.port() {
        Some(port) => format!("{}://{host}:{port}/...", parsed.scheme()),
        None => format!("{}://{host}/...", parsed.scheme()),
    }
}

fn build_agent(timeout_secs: u64) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(timeout_secs.max(1))))
        .http_status_as_error(false)
        .build();
    config.into()
}

fn require_url<'a>(value: &'a str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(message.to_string()));
    }
    Ok(trimmed)
}

fn bool_field(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// Checks the `{ok, error, errors}` envelope shared by every endpoint.
fn decode_envelope(status: u16, text: &str, fallback: &str) -> Result<Value> {
    let success_status = (200..300).contains(&status);
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) if !success_status => {
            return Err(EngineError::Api {
                status,
                message: fallback.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let ok = value.get("ok").and_then(Value::as_bool).unwrap_or(false);
    if ok && success_status {
        return Ok(value);
    }

    let message = value
        .get("error")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
        .or_else(|| {
            let errors: Vec<&str> = value
                .get("errors")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            (!errors.is_empty()).then(|| errors.join("\n"))
        })
        .unwrap_or_else(|| fallback.to_string());
    Err(EngineError::Api { status, message })
}

fn settings_from(value: &Value) -> Result<Settings> {
    let settings = value
        .get("settings")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));
    Ok(serde_json::from_value(settings)?)
}

fn lenient_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|s| s.is_finite() && *s >= 0.0))
}

fn lenient_thumbnails<'de, D>(deserializer: D) -> std::result::Result<Vec<Thumbnail>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .iter()
        .filter_map(|item| item.get("url").and_then(Value::as_str))
        .filter(|url| !url.is_empty())
        .map(|url| Thumbnail {
            url: url.to_string(),
        })
        .collect())
}
