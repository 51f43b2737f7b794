/// Data structures for Tab Finder
use serde::{Deserialize, Serialize};

/// Host-assigned tab identifier
pub type TabId = i32;

/// Host-assigned tab group identifier
pub type GroupId = i32;

/// Information about an open browser tab, as reported by the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub id: TabId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Milliseconds since the epoch; absent for tabs the host never tracked
    #[serde(default)]
    pub last_accessed: Option<f64>,
    #[serde(default, rename = "favIconUrl")]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

impl TabRecord {
    pub fn new(id: TabId, url: String, title: String) -> TabRecord {
        TabRecord {
            id,
            url,
            title,
            last_accessed: None,
            fav_icon_url: None,
            active: false,
            group_id: None,
        }
    }
}

/// A visited page from the browser history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub last_visit_time: Option<f64>,
}

impl HistoryRecord {
    /// Title to show, falling back to the URL for untitled visits
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.url,
        }
    }
}

/// A tab snapshot kept in the saved list; survives the tab being closed.
/// Identity is the URL, not the tab id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedTab {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "favIconUrl")]
    pub fav_icon_url: Option<String>,
}

impl From<&TabRecord> for SavedTab {
    fn from(tab: &TabRecord) -> Self {
        SavedTab {
            url: tab.url.clone(),
            title: tab.title.clone(),
            fav_icon_url: tab.fav_icon_url.clone(),
        }
    }
}

/// One occurrence of a content query inside a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentMatch {
    pub snippet: String,
    /// Byte offset of the occurrence in the extracted page text
    pub index: usize,
}

/// All occurrences found inside one tab
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabContentResult {
    pub tab_id: TabId,
    pub title: String,
    pub matches: Vec<ContentMatch>,
}

/// A native tab group created for one hostname
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainGroup {
    pub group_id: GroupId,
    pub tab_ids: Vec<TabId>,
    pub domain: String,
    pub title: String,
}

/// Which search areas the user keeps switched on between sessions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchPreferences {
    #[serde(alias = "opentabs")]
    pub open_tabs: bool,
    pub history: bool,
    #[serde(alias = "savedtabs")]
    pub saved_tabs: bool,
}

impl Default for SearchPreferences {
    fn default() -> Self {
        SearchPreferences {
            open_tabs: true,
            history: false,
            saved_tabs: false,
        }
    }
}
