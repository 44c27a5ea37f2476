use crate::activity_log;
use crate::api::{self, BulkDownloadResponse, DownloadResponse, MediaInfo, Settings};
use crate::catalog::FormatCatalog;
use crate::config::ClientConfig;
use crate::display;
use crate::paths::AppPaths;
use crate::ui_state::{ActivityKind, DownloadLink, Panel, StatusKind, UiState};
use crate::Result;
use serde::Serialize;
use url::Url;

const DESCRIPTION_PREVIEW_CHARS: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Info,
    Download,
    Bulk,
    Settings,
}

impl RequestKind {
    fn index(self) -> usize {
        match self {
            RequestKind::Info => 0,
            RequestKind::Download => 1,
            RequestKind::Bulk => 2,
            RequestKind::Settings => 3,
        }
    }

    fn panel(self) -> Panel {
        match self {
            RequestKind::Info | RequestKind::Download => Panel::Single,
            RequestKind::Bulk => Panel::Bulk,
            RequestKind::Settings => Panel::Settings,
        }
    }

    fn pending_message(self) -> &'static str {
        match self {
            RequestKind::Info => "Loading info\u{2026}",
            RequestKind::Download => "Downloading\u{2026}",
            RequestKind::Bulk => "Preparing downloads\u{2026}",
            RequestKind::Settings => "Saving\u{2026}",
        }
    }
}

/// Handle for an in-flight request. Only the latest ticket of each kind
/// may apply its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    kind: RequestKind,
    generation: u64,
}

impl RequestTicket {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// A newer request of the same kind was issued; nothing changed.
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaInfoView {
    pub title: String,
    pub uploader_line: String,
    pub duration_line: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
}

impl MediaInfoView {
    pub fn from_info(info: &MediaInfo) -> Self {
        let title = info
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled")
            .to_string();
        let uploader_line = info
            .uploader
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| format!("By {u}"))
            .unwrap_or_default();
        let duration_line = info
            .duration
            .filter(|d| *d > 0.0)
            .map(|d| format!("Duration: {}", display::format_seconds(d)))
            .unwrap_or_default();
        let description = info
            .description
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(DESCRIPTION_PREVIEW_CHARS)
            .collect();
        let thumbnail_url = info.thumbnails.last().map(|t| t.url.clone());

        Self {
            title,
            uploader_line,
            duration_line,
            description,
            thumbnail_url,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    catalog: FormatCatalog,
    info: Option<MediaInfoView>,
    ui: UiState,
    generations: [u64; 4],
    link_base: Option<Url>,
    activity_log: Option<AppPaths>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl Session {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            catalog: FormatCatalog::new(),
            info: None,
            ui: UiState::new(
                config.toast_capacity,
                config.toast_ttl_ms,
                config.activity_capacity,
            ),
            generations: [0; 4],
            link_base: None,
            activity_log: None,
        }
    }

    pub fn with_link_base(mut self, base: Url) -> Self {
        self.link_base = Some(base);
        self
    }

    pub fn with_activity_log(mut self, paths: AppPaths) -> Self {
        self.activity_log = Some(paths);
        self
    }

    pub fn catalog(&self) -> &FormatCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut FormatCatalog {
        &mut self.catalog
    }

    pub fn info_view(&self) -> Option<&MediaInfoView> {
        self.info.as_ref()
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut UiState {
        &mut self.ui
    }

    /// Starts a request: supersedes older tickets of the same kind and
    /// shows the pending status.
    pub fn begin(&mut self, kind: RequestKind) -> RequestTicket {
        let slot = &mut self.generations[kind.index()];
        *slot += 1;
        let ticket = RequestTicket {
            kind,
            generation: *slot,
        };
        self.ui
            .set_status(kind.panel(), kind.pending_message(), StatusKind::Pending);
        ticket
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.generations[ticket.kind.index()] == ticket.generation
    }

    pub fn apply_info(
        &mut self,
        ticket: RequestTicket,
        result: Result<MediaInfo>,
    ) -> ApplyOutcome {
        if !self.accept(ticket, RequestKind::Info) {
            return ApplyOutcome::Stale;
        }

        match result {
            Ok(mut info) => {
                let formats = std::mem::take(&mut info.formats);
                let count = formats.len();
                let view = MediaInfoView::from_info(&info);
                log::info!("loaded {count} formats for {:?}", view.title);
                self.catalog.replace_catalog(formats);
                self.ui
                    .set_status(Panel::Single, "Formats loaded", StatusKind::Success);
                self.record(
                    ActivityKind::InfoLoaded,
                    StatusKind::Success,
                    &format!("Loaded {count} formats for {}", view.title),
                    Vec::new(),
                );
                self.info = Some(view);
            }
            Err(err) => {
                let message = err.to_string();
                self.catalog.clear();
                self.info = None;
                self.fail(Panel::Single, &message);
            }
        }
        ApplyOutcome::Applied
    }

    pub fn apply_download(
        &mut self,
        ticket: RequestTicket,
        result: Result<DownloadResponse>,
    ) -> ApplyOutcome {
        if !self.accept(ticket, RequestKind::Download) {
            return ApplyOutcome::Stale;
        }

        match result {
            Ok(resp) => {
                let message = if resp.message.trim().is_empty() {
                    "Download complete".to_string()
                } else {
                    resp.message.clone()
                };
                self.ui
                    .set_status(Panel::Single, &message, StatusKind::Success);
                let links = self.links_for(&resp.files);
                self.ui.add_links(Panel::Single, links);
                self.record(
                    ActivityKind::Download,
                    StatusKind::Success,
                    &message,
                    resp.files,
                );
            }
            Err(err) => self.fail(Panel::Single, &err.to_string()),
        }
        ApplyOutcome::Applied
    }

    /// Partial success keeps every produced file and lists the per-item
    /// errors as warnings.
    pub fn apply_bulk(
        &mut self,
        ticket: RequestTicket,
        result: Result<BulkDownloadResponse>,
    ) -> ApplyOutcome {
        if !self.accept(ticket, RequestKind::Bulk) {
            return ApplyOutcome::Stale;
        }

        match result {
            Ok(resp) => {
                let (message, kind) = bulk_summary(&resp);
                self.ui.set_status(Panel::Bulk, &message, kind);

                let mut links = self.links_for(&resp.files);
                let mut files = resp.files.clone();
                if let Some(archive) = &resp.archive {
                    links.extend(self.links_for(std::slice::from_ref(archive)));
                    files.push(archive.clone());
                }
                self.ui.add_links(Panel::Bulk, links);
                self.record(ActivityKind::BulkDownload, kind, &message, files);
            }
            Err(err) => self.fail(Panel::Bulk, &err.to_string()),
        }
        ApplyOutcome::Applied
    }

    pub fn apply_settings(
        &mut self,
        ticket: RequestTicket,
        result: Result<Settings>,
    ) -> ApplyOutcome {
        if !self.accept(ticket, RequestKind::Settings) {
            return ApplyOutcome::Stale;
        }

        match result {
            Ok(settings) => {
                self.ui
                    .set_status(Panel::Settings, "Settings saved", StatusKind::Success);
                self.ui.default_target_dir = settings.download_dir.clone();
                self.record(
                    ActivityKind::SettingsSaved,
                    StatusKind::Success,
                    "Settings saved",
                    Vec::new(),
                );
            }
            Err(err) => self.fail(Panel::Settings, &err.to_string()),
        }
        ApplyOutcome::Applied
    }

    pub fn links_for(&self, files: &[String]) -> Vec<DownloadLink> {
        files
            .iter()
            .map(|file| DownloadLink {
                file: file.clone(),
                href: self.link_href(file),
            })
            .collect()
    }

    fn link_href(&self, file: &str) -> String {
        let relative = api::file_link_path(file);
        match &self.link_base {
            Some(base) => base
                .join(relative.trim_start_matches('/'))
                .map(|u| u.to_string())
                .unwrap_or(relative),
            None => relative,
        }
    }

    fn accept(&self, ticket: RequestTicket, expected: RequestKind) -> bool {
        if ticket.kind != expected || !self.is_current(ticket) {
            log::warn!(
                "dropping stale {:?} response (generation {})",
                ticket.kind,
                ticket.generation
            );
            return false;
        }
        true
    }

    fn fail(&mut self, panel: Panel, message: &str) {
        log::info!("{panel:?} request failed: {message}");
        self.ui.set_status(panel, message, StatusKind::Error);
        self.record(ActivityKind::Failure, StatusKind::Error, message, Vec::new());
    }

    fn record(&mut self, kind: ActivityKind, toast: StatusKind, message: &str, files: Vec<String>) {
        let now = activity_log::now_ms();
        self.ui.toasts.push(toast, message, now);
        let entry = self.ui.activity.record(kind, message, files, now).clone();

        if let Some(paths) = &self.activity_log {
            let level = if toast == StatusKind::Error { "error" } else { "info" };
            let data = serde_json::json!({
                "id": entry.id,
                "message": entry.message,
                "files": entry.files,
            });
            if let Err(e) = activity_log::log_line(paths, level, kind.as_str(), data) {
                log::warn!("failed to write activity log: {e}");
            }
        }
    }
}

pub fn bulk_summary(resp: &BulkDownloadResponse) -> (String, StatusKind) {
    if resp.is_partial() {
        (
            format!(
                "Bulk download complete with warnings (\n{}\n)",
                resp.errors.join("\n")
            ),
            StatusKind::Neutral,
        )
    } else {
        ("Bulk download complete".to_string(), StatusKind::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Thumbnail;
    use crate::formats::FilterCategory;
    use crate::EngineError;
    use serde_json::json;

    fn info_with_formats(title: &str, formats: serde_json::Value) -> MediaInfo {
        serde_json::from_value(json!({"title": title, "formats": formats})).expect("info")
    }

    #[test]
    fn info_view_formats_fields() {
        let info = MediaInfo {
            title: Some(String::new()),
            uploader: Some("Chan".to_string()),
            duration: Some(3725.0),
            description: Some("d".repeat(500)),
            thumbnails: vec![
                Thumbnail {
                    url: "low.jpg".to_string(),
                },
                Thumbnail {
                    url: "high.jpg".to_string(),
                },
            ],
            formats: Vec::new(),
        };
        let view = MediaInfoView::from_info(&info);
        assert_eq!(view.title, "Untitled");
        assert_eq!(view.uploader_line, "By Chan");
        assert_eq!(view.duration_line, "Duration: 01:02:05");
        assert_eq!(view.description.chars().count(), 400);
        assert_eq!(view.thumbnail_url.as_deref(), Some("high.jpg"));

        let bare = MediaInfoView::from_info(&MediaInfo::default());
        assert_eq!(bare.duration_line, "");
        assert_eq!(bare.uploader_line, "");
        assert!(bare.thumbnail_url.is_none());
    }

    #[test]
    fn stale_info_response_is_dropped() {
        let mut session = Session::default();
        let slow = session.begin(RequestKind::Info);
        let fast = session.begin(RequestKind::Info);

        let newer = info_with_formats("new", json!([{"format_id": "new", "vcodec": "h264", "acodec": "aac", "ext": "mp4"}]));
        assert_eq!(session.apply_info(fast, Ok(newer)), ApplyOutcome::Applied);

        let older = info_with_formats("old", json!([{"format_id": "old"}]));
        assert_eq!(session.apply_info(slow, Ok(older)), ApplyOutcome::Stale);

        assert_eq!(session.info_view().map(|v| v.title.as_str()), Some("new"));
        assert_eq!(
            session.catalog().items()[0].format_id.as_deref(),
            Some("new")
        );
    }

    #[test]
    fn tickets_are_tracked_per_kind() {
        let mut session = Session::default();
        let info = session.begin(RequestKind::Info);
        let settings = session.begin(RequestKind::Settings);
        assert!(session.is_current(info));
        assert!(session.is_current(settings));
        assert_eq!(
            session.apply_download(info, Ok(DownloadResponse::default())),
            ApplyOutcome::Stale
        );
    }

    #[test]
    fn info_success_resets_catalog_state() {
        let mut session = Session::default();
        session.catalog_mut().set_filter(FilterCategory::Audio);
        session.catalog_mut().set_search("opus");

        let ticket = session.begin(RequestKind::Info);
        assert_eq!(session.ui().status(Panel::Single).kind, StatusKind::Pending);
        session.apply_info(ticket, Ok(info_with_formats("t", json!([{"format_id": "1"}]))));

        assert_eq!(session.catalog().active_filter(), FilterCategory::Recommended);
        assert_eq!(session.catalog().search_text(), "");
        let status = session.ui().status(Panel::Single);
        assert_eq!(status.message, "Formats loaded");
        assert_eq!(status.kind, StatusKind::Success);
        assert_eq!(session.ui().activity.len(), 1);
    }

    #[test]
    fn info_failure_clears_catalog_and_panel() {
        let mut session = Session::default();
        let t = session.begin(RequestKind::Info);
        session.apply_info(t, Ok(info_with_formats("t", json!([{"format_id": "1"}]))));

        let t = session.begin(RequestKind::Info);
        session.apply_info(
            t,
            Err(EngineError::Api {
                status: 400,
                message: "Failed to fetch info: unsupported URL".to_string(),
            }),
        );
        assert!(session.catalog().is_empty());
        assert!(session.info_view().is_none());
        let status = session.ui().status(Panel::Single);
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.message, "Failed to fetch info: unsupported URL");
    }

    #[test]
    fn download_uses_backend_message_and_links() {
        let mut session = Session::default();
        let t = session.begin(RequestKind::Download);
        session.apply_download(
            t,
            Ok(DownloadResponse {
                message: String::new(),
                files: vec!["/dl/clip.mp4".to_string()],
            }),
        );
        let status = session.ui().status(Panel::Single);
        assert_eq!(status.message, "Download complete");
        assert_eq!(status.links[0].href, "/files?path=%2Fdl%2Fclip.mp4");
    }

    #[test]
    fn partial_bulk_keeps_files_and_warns() {
        let base = Url::parse("http://127.0.0.1:5000/").expect("url");
        let mut session = Session::default().with_link_base(base);
        let t = session.begin(RequestKind::Bulk);
        session.apply_bulk(
            t,
            Ok(BulkDownloadResponse {
                files: vec!["/dl/a.mp4".to_string()],
                archive: Some("/dl/bulk.zip".to_string()),
                errors: vec!["https://x.example: unavailable".to_string()],
            }),
        );

        let status = session.ui().status(Panel::Bulk);
        assert_eq!(status.kind, StatusKind::Neutral);
        assert_eq!(
            status.message,
            "Bulk download complete with warnings (\nhttps://x.example: unavailable\n)"
        );
        assert_eq!(status.links.len(), 2);
        assert_eq!(
            status.links[1].href,
            "http://127.0.0.1:5000/files?path=%2Fdl%2Fbulk.zip"
        );
        let entry = session.ui().activity.entries().next().expect("entry");
        assert_eq!(entry.files.len(), 2);
    }

    #[test]
    fn settings_update_prefills_target_dir() {
        let mut session = Session::default();
        let t = session.begin(RequestKind::Settings);
        session.apply_settings(
            t,
            Ok(Settings {
                download_dir: "/srv/media".to_string(),
                auto_archive_bulk: true,
            }),
        );
        assert_eq!(session.ui().default_target_dir, "/srv/media");
        assert_eq!(session.ui().status(Panel::Settings).message, "Settings saved");
    }

    #[test]
    fn activity_is_mirrored_to_log_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        let mut session = Session::default().with_activity_log(paths.clone());
        let t = session.begin(RequestKind::Download);
        session.apply_download(t, Err(EngineError::Validation("Please enter a URL.".to_string())));

        let lines = activity_log::read_lines(&paths).expect("read");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["event"], "failure");
        assert_eq!(lines[0]["level"], "error");
        assert_eq!(lines[0]["data"]["message"], "Please enter a URL.");
    }
}
