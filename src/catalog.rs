use crate::formats::{self, FilterCategory, FormatRecord};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionOption {
    /// Format id sent to the backend; empty means "let the backend pick".
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct CatalogView<'a> {
    pub records: Vec<&'a FormatRecord>,
    /// Filter that produced `records` (after any widening).
    pub filter: FilterCategory,
    /// True when an empty default view fell back from recommended to all.
    pub widened: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FormatCatalog {
    items: Vec<FormatRecord>,
    active_filter: FilterCategory,
    search_text: String,
}

impl FormatCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<FormatRecord>) -> Self {
        let mut catalog = Self::new();
        catalog.replace_catalog(records);
        catalog
    }

    pub fn replace_catalog(&mut self, records: Vec<FormatRecord>) {
        log::debug!("catalog replaced with {} formats", records.len());
        self.items = records;
        self.active_filter = FilterCategory::Recommended;
        self.search_text.clear();
    }

    pub fn clear(&mut self) {
        self.replace_catalog(Vec::new());
    }

    pub fn set_filter(&mut self, category: FilterCategory) -> bool {
        if self.active_filter == category {
            return false;
        }
        self.active_filter = category;
        true
    }

    pub fn set_search(&mut self, text: &str) {
        self.search_text = text.trim().to_string();
    }

    pub fn items(&self) -> &[FormatRecord] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn active_filter(&self) -> FilterCategory {
        self.active_filter
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn query(&mut self) -> Vec<&FormatRecord> {
        self.query_view().records
    }

    /// An empty result under the default state (recommended, no search)
    /// switches the active filter to `All` and recomputes once; the switch
    /// sticks until the caller changes the filter again.
    pub fn query_view(&mut self) -> CatalogView<'_> {
        let mut widened = false;
        let mut indices = self.matching_indices(self.active_filter);
        if indices.is_empty()
            && self.active_filter == FilterCategory::Recommended
            && self.search_text.is_empty()
        {
            log::debug!("no recommended formats; widening filter to all");
            self.active_filter = FilterCategory::All;
            indices = self.matching_indices(FilterCategory::All);
            widened = true;
        }

        CatalogView {
            records: indices.into_iter().map(|i| &self.items[i]).collect(),
            filter: self.active_filter,
            widened,
        }
    }

    /// Whole catalog ranked by resolution score, best first. Equal scores
    /// keep catalog order.
    pub fn sorted_for_selection(&self) -> Vec<&FormatRecord> {
        sort_for_selection(&self.items)
    }

    pub fn selection_options(&self) -> Vec<SelectionOption> {
        let mut options = Vec::with_capacity(self.items.len() + 1);
        options.push(SelectionOption {
            value: String::new(),
            label: if self.items.is_empty() {
                "No formats found".to_string()
            } else {
                "Auto (best)".to_string()
            },
        });
        for record in self.sorted_for_selection() {
            options.push(SelectionOption {
                value: record.format_id.clone().unwrap_or_default(),
                label: formats::selection_label(record),
            });
        }
        options
    }

    fn matching_indices(&self, filter: FilterCategory) -> Vec<usize> {
        let needle = self.search_text.to_lowercase();
        self.items
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.matches(r))
            .filter(|(_, r)| needle.is_empty() || formats::search_haystack(r).contains(&needle))
            .map(|(i, _)| i)
            .collect()
    }
}

pub fn sort_for_selection(records: &[FormatRecord]) -> Vec<&FormatRecord> {
    let mut ranked: Vec<&FormatRecord> = records.iter().collect();
    ranked.sort_by_key(|r| std::cmp::Reverse(r.resolution_score()));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: serde_json::Value) -> Vec<FormatRecord> {
        values
            .as_array()
            .expect("array")
            .iter()
            .map(FormatRecord::from_value)
            .collect()
    }

    fn sample() -> Vec<FormatRecord> {
        records(json!([
            {"format_id": "249", "ext": "webm", "acodec": "opus", "vcodec": "none", "format_note": "low"},
            {"format_id": "18", "ext": "mp4", "resolution": "640x360", "vcodec": "avc1", "acodec": "mp4a"},
            {"format_id": "137", "ext": "mp4", "resolution": "1920x1080", "vcodec": "avc1", "acodec": "none"},
            {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none"},
            {"format_id": "22", "ext": "mp4", "resolution": "1280x720", "vcodec": "avc1", "acodec": "mp4a"}
        ]))
    }

    fn ids(view: &[&FormatRecord]) -> Vec<String> {
        view.iter()
            .map(|r| r.format_id.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn default_view_is_recommended() {
        let mut catalog = FormatCatalog::with_records(sample());
        let view = catalog.query_view();
        assert!(!view.widened);
        assert_eq!(view.filter, FilterCategory::Recommended);
        assert_eq!(ids(&view.records), vec!["18", "22"]);
    }

    #[test]
    fn category_filters_use_classification() {
        let mut catalog = FormatCatalog::with_records(sample());
        catalog.set_filter(FilterCategory::Video);
        assert_eq!(ids(&catalog.query()), vec!["18", "137", "22"]);
        catalog.set_filter(FilterCategory::Audio);
        assert_eq!(ids(&catalog.query()), vec!["249"]);
        catalog.set_filter(FilterCategory::Other);
        assert_eq!(ids(&catalog.query()), vec!["sb0"]);
        catalog.set_filter(FilterCategory::All);
        assert_eq!(catalog.query().len(), 5);
    }

    #[test]
    fn empty_recommended_view_widens_to_all() {
        let mut catalog = FormatCatalog::with_records(records(json!([
            {"format_id": "a", "vcodec": "vp9", "acodec": "none"},
            {"format_id": "b", "vcodec": "none", "acodec": "opus"}
        ])));
        let view = catalog.query_view();
        assert!(view.widened);
        assert_eq!(view.filter, FilterCategory::All);
        assert_eq!(ids(&view.records), vec!["a", "b"]);
        assert_eq!(catalog.active_filter(), FilterCategory::All);

        let again = catalog.query_view();
        assert!(!again.widened);
    }

    #[test]
    fn no_widening_while_searching() {
        let mut catalog = FormatCatalog::with_records(records(json!([
            {"format_id": "a", "vcodec": "vp9", "acodec": "none"}
        ])));
        catalog.set_search("vp9");
        assert!(catalog.query().is_empty());
        assert_eq!(catalog.active_filter(), FilterCategory::Recommended);
    }

    #[test]
    fn empty_catalog_widens_and_stays_empty() {
        let mut catalog = FormatCatalog::new();
        assert!(catalog.query().is_empty());
        assert_eq!(catalog.active_filter(), FilterCategory::All);
    }

    #[test]
    fn search_is_case_insensitive_and_trimmed() {
        let mut catalog = FormatCatalog::with_records(sample());
        catalog.set_filter(FilterCategory::All);
        catalog.set_search("  MP4 ");
        assert_eq!(catalog.search_text(), "MP4");
        let upper = ids(&catalog.query());
        catalog.set_search("mp4");
        let lower = ids(&catalog.query());
        assert_eq!(upper, lower);
        assert_eq!(lower, vec!["18", "137", "22"]);

        catalog.set_search("1920X1080");
        assert_eq!(ids(&catalog.query()), vec!["137"]);
    }

    #[test]
    fn replace_resets_filter_and_search() {
        let mut catalog = FormatCatalog::with_records(sample());
        catalog.set_filter(FilterCategory::Audio);
        catalog.set_search("opus");
        catalog.replace_catalog(sample());
        assert_eq!(catalog.active_filter(), FilterCategory::Recommended);
        assert_eq!(catalog.search_text(), "");
    }

    #[test]
    fn set_filter_reports_changes() {
        let mut catalog = FormatCatalog::new();
        assert!(!catalog.set_filter(FilterCategory::Recommended));
        assert!(catalog.set_filter(FilterCategory::Video));
        assert!(!catalog.set_filter(FilterCategory::Video));
    }

    #[test]
    fn query_only_returns_current_catalog_records() {
        let mut catalog = FormatCatalog::with_records(sample());
        catalog.set_filter(FilterCategory::All);
        let replacement = records(json!([{"format_id": "new", "vcodec": "h264", "acodec": "aac"}]));
        catalog.replace_catalog(replacement.clone());
        for r in catalog.query() {
            assert!(replacement.contains(r));
        }
        assert_eq!(catalog.items().len(), 1);
    }

    #[test]
    fn selection_is_stable_by_score_over_full_catalog() {
        let mut catalog = FormatCatalog::with_records(records(json!([
            {"format_id": "x", "resolution": "720p"},
            {"format_id": "y", "resolution": 1080},
            {"format_id": "z", "resolution": "1280x720"},
            {"format_id": "w"}
        ])));
        catalog.set_filter(FilterCategory::Audio);
        catalog.set_search("nothing matches this");
        assert_eq!(ids(&catalog.sorted_for_selection()), vec!["y", "x", "z", "w"]);
    }

    #[test]
    fn selection_options_start_with_auto() {
        let catalog = FormatCatalog::with_records(sample());
        let options = catalog.selection_options();
        assert_eq!(options[0].label, "Auto (best)");
        assert_eq!(options[0].value, "");
        assert_eq!(options[1].value, "137");
        assert_eq!(options.len(), 6);

        let empty = FormatCatalog::new();
        assert_eq!(empty.selection_options()[0].label, "No formats found");
    }
}
