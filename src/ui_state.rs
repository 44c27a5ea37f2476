use serde::Serialize;
use std::collections::VecDeque;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    #[default]
    Single,
    Bulk,
    Settings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    #[default]
    Neutral,
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadLink {
    pub file: String,
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub message: String,
    pub kind: StatusKind,
    pub links: Vec<DownloadLink>,
}

impl StatusLine {
    pub fn is_empty(&self) -> bool {
        self.message.is_empty() && self.links.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub id: u64,
    pub kind: StatusKind,
    pub message: String,
    pub created_at_ms: i64,
    pub ttl_ms: u64,
}

impl Toast {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) >= self.ttl_ms as i64
    }
}

/// Bounded queue of transient notifications; overflow drops the oldest.
#[derive(Debug, Clone)]
pub struct ToastQueue {
    capacity: usize,
    ttl_ms: u64,
    next_id: u64,
    toasts: VecDeque<Toast>,
}

impl ToastQueue {
    pub fn new(capacity: usize, ttl_ms: u64) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl_ms,
            next_id: 1,
            toasts: VecDeque::new(),
        }
    }

    pub fn push(&mut self, kind: StatusKind, message: &str, now_ms: i64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.toasts.push_back(Toast {
            id,
            kind,
            message: message.to_string(),
            created_at_ms: now_ms,
            ttl_ms: self.ttl_ms,
        });
        while self.toasts.len() > self.capacity {
            self.toasts.pop_front();
        }
        id
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    pub fn expire(&mut self, now_ms: i64) -> usize {
        let before = self.toasts.len();
        self.toasts.retain(|t| !t.is_expired(now_ms));
        before - self.toasts.len()
    }

    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    InfoLoaded,
    Download,
    BulkDownload,
    SettingsSaved,
    Failure,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::InfoLoaded => "info_loaded",
            ActivityKind::Download => "download",
            ActivityKind::BulkDownload => "bulk_download",
            ActivityKind::SettingsSaved => "settings_saved",
            ActivityKind::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub id: String,
    pub ts_ms: i64,
    pub kind: ActivityKind,
    pub message: String,
    pub files: Vec<String>,
}

/// Most recent activity first, capped at `capacity` entries.
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    capacity: usize,
    entries: VecDeque<ActivityEntry>,
}

impl ActivityFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn record(
        &mut self,
        kind: ActivityKind,
        message: &str,
        files: Vec<String>,
        ts_ms: i64,
    ) -> &ActivityEntry {
        self.entries.push_front(ActivityEntry {
            id: Uuid::new_v4().to_string(),
            ts_ms,
            kind,
            message: message.to_string(),
            files,
        });
        self.entries.truncate(self.capacity);
        &self.entries[0]
    }

    pub fn entries(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub active_tab: Panel,
    single: StatusLine,
    bulk: StatusLine,
    settings: StatusLine,
    pub toasts: ToastQueue,
    pub activity: ActivityFeed,
    /// Prefilled target directory of the single and bulk forms.
    pub default_target_dir: String,
}

impl UiState {
    pub fn new(toast_capacity: usize, toast_ttl_ms: u64, activity_capacity: usize) -> Self {
        Self {
            active_tab: Panel::default(),
            single: StatusLine::default(),
            bulk: StatusLine::default(),
            settings: StatusLine::default(),
            toasts: ToastQueue::new(toast_capacity, toast_ttl_ms),
            activity: ActivityFeed::new(activity_capacity),
            default_target_dir: String::new(),
        }
    }

    pub fn select_tab(&mut self, panel: Panel) -> bool {
        if self.active_tab == panel {
            return false;
        }
        self.active_tab = panel;
        true
    }

    pub fn status(&self, panel: Panel) -> &StatusLine {
        match panel {
            Panel::Single => &self.single,
            Panel::Bulk => &self.bulk,
            Panel::Settings => &self.settings,
        }
    }

    /// Replaces the panel's status; an empty message clears it.
    pub fn set_status(&mut self, panel: Panel, message: &str, kind: StatusKind) {
        let line = self.status_mut(panel);
        line.links.clear();
        if message.is_empty() {
            line.message.clear();
            line.kind = StatusKind::Neutral;
            return;
        }
        line.message = message.to_string();
        line.kind = kind;
    }

    pub fn add_links(&mut self, panel: Panel, links: Vec<DownloadLink>) {
        self.status_mut(panel).links.extend(links);
    }

    fn status_mut(&mut self, panel: Panel) -> &mut StatusLine {
        match panel {
            Panel::Single => &mut self.single,
            Panel::Bulk => &mut self.bulk,
            Panel::Settings => &mut self.settings,
        }
    }
}
