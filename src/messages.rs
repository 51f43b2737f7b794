//! Background side of the extension message channel.
//!
//! Every request carries an `action` tag. The router answers each one
//! with a JSON object; any failure becomes `{"error": message}` so the
//! caller always receives a structured response.

use log::{debug, error};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::filters::{DomainFilter, FilterPipeline, TimeFilter, now_ms};
use crate::grouping::{group_tabs_by_domain, ungroup_all};
use crate::host::{BrowserHost, KeyValueStore};
use crate::matcher::MatchMode;
use crate::operations::{domain_options, get_all_tabs, get_recent_tabs};
use crate::sources::{search_history, search_inside_tabs, search_open_tabs, search_saved_tabs};
use crate::storage::SavedTabsStore;
use crate::tab_data::{SavedTab, TabId};

/// A message addressed to the background
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    SearchTabs {
        query: String,
        #[serde(default)]
        use_regex: bool,
        #[serde(default)]
        domain_filter: DomainFilter,
        #[serde(default)]
        time_filter: TimeFilter,
    },
    SearchHistory {
        query: String,
    },
    SearchSavedTabs {
        query: String,
        #[serde(default)]
        use_regex: bool,
    },
    GetAllTabs,
    GetRecentTabs,
    GetDomainOptions,
    /// Tab records are accepted; only url, title and icon are kept
    SaveTabs {
        tabs: Vec<SavedTab>,
    },
    GetSavedTabs,
    UnsaveTab {
        tab: SavedTab,
    },
    UnsaveAllTabs,
    GroupTabs,
    UngroupTabs,
    SearchInsideTabs {
        query: String,
    },
    ActivateTab {
        tab_id: TabId,
    },
    OpenUrl {
        url: String,
    },
}

/// Routes requests to the search engine, the saved-tabs store and the tab operations
pub struct Background<'a, H: BrowserHost + ?Sized, S: KeyValueStore + ?Sized> {
    host: &'a H,
    store: &'a S,
    config: SearchConfig,
    clock: fn() -> f64,
}

impl<'a, H: BrowserHost + ?Sized, S: KeyValueStore + ?Sized> Background<'a, H, S> {
    pub fn new(host: &'a H, store: &'a S) -> Self {
        Background {
            host,
            store,
            config: SearchConfig::default(),
            clock: now_ms,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> f64) -> Self {
        self.clock = clock;
        self
    }

    /// Parse and answer a raw message
    pub async fn handle_json(&self, raw: Value) -> Value {
        match serde_json::from_value::<Request>(raw) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                error!("Malformed request: {}", e);
                json!({ "error": format!("Malformed request: {}", e) })
            }
        }
    }

    pub async fn handle(&self, request: Request) -> Value {
        debug!("Handling {:?}", request);
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Request failed: {}", e);
                json!({ "error": e.wire_message() })
            }
        }
    }

    async fn dispatch(&self, request: Request) -> Result<Value, SearchError> {
        let saved = SavedTabsStore::new(self.store);

        match request {
            Request::SearchTabs {
                query,
                use_regex,
                domain_filter,
                time_filter,
            } => {
                let filters = FilterPipeline::new(domain_filter, time_filter).with_window(self.config.recent_window_ms);
                let results = search_open_tabs(
                    self.host,
                    &query,
                    MatchMode::from_flag(use_regex),
                    &filters,
                    &self.config,
                    (self.clock)(),
                )
                .await?;
                Ok(json!({ "results": results }))
            }
            Request::SearchHistory { query } => {
                let results = search_history(self.host, &query, &self.config).await?;
                Ok(json!({ "results": results }))
            }
            Request::SearchSavedTabs { query, use_regex } => {
                let results = search_saved_tabs(self.store, &query, MatchMode::from_flag(use_regex), &self.config).await?;
                Ok(json!({ "results": results }))
            }
            Request::GetAllTabs => Ok(json!({ "tabs": get_all_tabs(self.host).await? })),
            Request::GetRecentTabs => {
                let tabs = get_recent_tabs(self.host, self.config.recent_tabs_limit).await?;
                Ok(json!({ "tabs": tabs }))
            }
            Request::GetDomainOptions => Ok(json!({ "domains": domain_options(self.host).await? })),
            Request::SaveTabs { tabs } => {
                let saved_tabs = saved.save_tabs(tabs).await?;
                Ok(json!({ "success": true, "savedTabs": saved_tabs }))
            }
            Request::GetSavedTabs => Ok(json!({ "savedTabs": saved.load().await?.tabs })),
            Request::UnsaveTab { tab } => {
                let saved_tabs = saved.unsave_tab(&tab.url).await?;
                Ok(json!({ "success": true, "savedTabs": saved_tabs }))
            }
            Request::UnsaveAllTabs => {
                let saved_tabs = saved.unsave_all().await?;
                Ok(json!({ "success": true, "savedTabs": saved_tabs }))
            }
            Request::GroupTabs => {
                let report = group_tabs_by_domain(self.host).await?;
                Ok(json!({ "groupedTabs": report.grouped_tabs() }))
            }
            Request::UngroupTabs => {
                let released = ungroup_all(self.host).await?;
                debug!("Released {} tabs from their groups", released);
                Ok(json!({ "success": true }))
            }
            Request::SearchInsideTabs { query } => {
                let results = search_inside_tabs(self.host, &query).await?;
                Ok(json!({ "results": results }))
            }
            Request::ActivateTab { tab_id } => {
                self.host.activate_tab(tab_id).await?;
                Ok(json!({ "success": true }))
            }
            Request::OpenUrl { url } => {
                self.host.open_url(&url).await?;
                Ok(json!({ "success": true }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryStore;
    use crate::tab_data::TabRecord;
    use crate::testing::FakeBrowser;
    use futures::executor::block_on;

    const NOW: f64 = 1_700_000_000_000.0;

    fn fixed_clock() -> f64 {
        NOW
    }

    fn browser() -> FakeBrowser {
        let mut docs = TabRecord::new(1, "https://docs.rs/serde".to_string(), "serde - Rust".to_string());
        docs.last_accessed = Some(NOW - 1000.0);
        docs.active = true;
        let mut github = TabRecord::new(2, "https://github.com/serde-rs/serde".to_string(), "serde-rs/serde".to_string());
        github.last_accessed = Some(NOW - 90_000_000.0);
        let mut blog = TabRecord::new(3, "https://github.com/blog".to_string(), "The GitHub Blog".to_string());
        blog.last_accessed = Some(NOW - 2000.0);
        FakeBrowser::with_tabs(vec![docs, github, blog])
    }

    fn ask(background: &Background<FakeBrowser, MemoryStore>, raw: Value) -> Value {
        block_on(background.handle_json(raw))
    }

    #[test]
    fn test_parse_search_tabs_defaults() {
        let request: Request = serde_json::from_value(json!({ "action": "searchTabs", "query": "x" })).unwrap();

        assert_eq!(
            request,
            Request::SearchTabs {
                query: "x".to_string(),
                use_regex: false,
                domain_filter: DomainFilter::All,
                time_filter: TimeFilter::All,
            }
        );
    }

    #[test]
    fn test_search_tabs_tolerates_unknown_filters() {
        let browser = browser();
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store).with_clock(fixed_clock);

        let response = ask(
            &background,
            json!({
                "action": "searchTabs",
                "query": "serde",
                "useRegex": true,
                "domainFilter": null,
                "timeFilter": "yesterday"
            }),
        );

        assert!(response.get("error").is_none(), "unexpected error: {}", response);
        assert_eq!(response["results"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_search_tabs_with_filters() {
        let browser = browser();
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store).with_clock(fixed_clock);

        let response = ask(
            &background,
            json!({
                "action": "searchTabs",
                "query": "serde",
                "useRegex": true,
                "domainFilter": "github.com",
                "timeFilter": "older"
            }),
        );

        let ids: Vec<i64> = response["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_search_tabs_invalid_regex() {
        let browser = browser();
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store);

        let response = ask(&background, json!({ "action": "searchTabs", "query": "(", "useRegex": true }));

        assert_eq!(response, json!({ "error": "Invalid regex syntax" }));
    }

    #[test]
    fn test_malformed_request() {
        let browser = browser();
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store);

        let response = ask(&background, json!({ "action": "launchRockets" }));

        assert!(response["error"].as_str().unwrap().starts_with("Malformed request"));
    }

    #[test]
    fn test_recent_tabs_excludes_active() {
        let browser = browser();
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store);

        let response = ask(&background, json!({ "action": "getRecentTabs" }));

        let ids: Vec<i64> = response["tabs"].as_array().unwrap().iter().map(|t| t["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_save_get_unsave_round_trip() {
        let browser = browser();
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store);
        let tab = json!({ "id": 7, "url": "https://a.com", "title": "A", "active": false });

        ask(&background, json!({ "action": "saveTabs", "tabs": [tab.clone(), tab.clone()] }));
        let response = ask(&background, json!({ "action": "getSavedTabs" }));
        assert_eq!(response["savedTabs"].as_array().unwrap().len(), 2);
        assert_eq!(response["savedTabs"][0]["url"], "https://a.com");

        let response = ask(&background, json!({ "action": "unsaveTab", "tab": tab }));
        assert_eq!(response["success"], true);
        assert_eq!(response["savedTabs"], json!([]));
    }

    #[test]
    fn test_unsave_all() {
        let browser = browser();
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store);
        ask(&background, json!({ "action": "saveTabs", "tabs": [{ "url": "https://a.com", "title": "A" }] }));

        let response = ask(&background, json!({ "action": "unsaveAllTabs" }));

        assert_eq!(response, json!({ "success": true, "savedTabs": [] }));
    }

    #[test]
    fn test_search_saved_tabs() {
        let browser = browser();
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store);
        ask(
            &background,
            json!({ "action": "saveTabs", "tabs": [
                { "url": "https://crates.io", "title": "crates.io" },
                { "url": "https://docs.rs", "title": "Docs.rs" }
            ] }),
        );

        let response = ask(&background, json!({ "action": "searchSavedTabs", "query": "^docs", "useRegex": true }));

        assert_eq!(response["results"].as_array().unwrap().len(), 1);
        assert_eq!(response["results"][0]["url"], "https://docs.rs");
    }

    #[test]
    fn test_group_tabs_response_shape() {
        let browser = browser();
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store);

        let response = ask(&background, json!({ "action": "groupTabs" }));

        let grouped = response["groupedTabs"].as_object().unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["github.com"]["title"], "github");
        assert_eq!(grouped["github.com"]["tabIds"], json!([2, 3]));
        assert!(grouped["github.com"]["groupId"].is_i64());
    }

    #[test]
    fn test_group_tabs_keys_in_discovery_order() {
        let browser = FakeBrowser::with_tabs(vec![
            TabRecord::new(1, "https://zulip.com/a".to_string(), "Zulip A".to_string()),
            TabRecord::new(2, "https://b.com/a".to_string(), "B A".to_string()),
            TabRecord::new(3, "https://zulip.com/b".to_string(), "Zulip B".to_string()),
            TabRecord::new(4, "https://b.com/b".to_string(), "B B".to_string()),
        ]);
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store);

        let response = ask(&background, json!({ "action": "groupTabs" }));

        let keys: Vec<&str> = response["groupedTabs"].as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zulip.com", "b.com"]);
    }

    #[test]
    fn test_ungroup_tabs() {
        let browser = browser();
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store);
        ask(&background, json!({ "action": "groupTabs" }));

        let response = ask(&background, json!({ "action": "ungroupTabs" }));

        assert_eq!(response, json!({ "success": true }));
        assert!(browser.tabs().iter().all(|t| t.group_id.is_none()));
    }

    #[test]
    fn test_search_inside_tabs() {
        let browser = browser();
        browser.set_page(1, "Serde is a framework for serializing");
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store);

        let response = ask(&background, json!({ "action": "searchInsideTabs", "query": "serde" }));

        assert_eq!(response["results"][0]["tabId"], 1);
        assert_eq!(response["results"][0]["matches"][0]["index"], 0);
    }

    #[test]
    fn test_activate_and_open() {
        let browser = browser();
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store);

        ask(&background, json!({ "action": "activateTab", "tabId": 3 }));
        ask(&background, json!({ "action": "openUrl", "url": "https://example.com" }));

        assert!(browser.tab(3).unwrap().active);
        assert!(!browser.tab(1).unwrap().active);
        assert_eq!(browser.opened_urls(), vec!["https://example.com".to_string()]);
    }

    #[test]
    fn test_activate_missing_tab_is_error() {
        let browser = browser();
        let store = MemoryStore::new();
        let background = Background::new(&browser, &store);

        let response = ask(&background, json!({ "action": "activateTab", "tabId": 99 }));

        assert!(response["error"].is_string());
    }
}
