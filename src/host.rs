//! Contracts of the browser-side collaborators.
//!
//! Tab and window management, the history store, key-value persistence and
//! per-tab content messaging are owned by the host environment. The search
//! engine only talks to them through these traits; `crate::chrome` binds
//! them to the extension APIs and the tests bind them to in-memory fakes.
//!
//! Futures are not `Send`: everything runs on the single extension thread.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use crate::content::{ContentRequest, ContentResponse};
use crate::error::{HostError, StorageError};
use crate::grouping::GroupColor;
use crate::tab_data::{GroupId, HistoryRecord, TabId, TabRecord};

/// Selection criteria for a tab query; `None` fields match everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabQuery {
    pub active: Option<bool>,
    pub group_id: Option<GroupId>,
}

impl TabQuery {
    pub fn all() -> Self {
        TabQuery::default()
    }

    pub fn inactive() -> Self {
        TabQuery {
            active: Some(false),
            ..TabQuery::default()
        }
    }

    pub fn in_group(group_id: GroupId) -> Self {
        TabQuery {
            group_id: Some(group_id),
            ..TabQuery::default()
        }
    }

    pub fn matches(&self, tab: &TabRecord) -> bool {
        self.active.is_none_or(|active| tab.active == active)
            && self.group_id.is_none_or(|group| tab.group_id == Some(group))
    }
}

/// Tab, window and native tab-group primitives
#[async_trait::async_trait(?Send)]
pub trait TabHost {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabRecord>, HostError>;

    async fn activate_tab(&self, tab_id: TabId) -> Result<(), HostError>;

    /// Open `url` in a new tab
    async fn open_url(&self, url: &str) -> Result<(), HostError>;

    /// Put the tabs into one new group and return its id
    async fn group_tabs(&self, tab_ids: &[TabId]) -> Result<GroupId, HostError>;

    async fn update_group(&self, group_id: GroupId, title: &str, color: GroupColor) -> Result<(), HostError>;

    async fn query_groups(&self) -> Result<Vec<GroupId>, HostError>;

    async fn ungroup_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError>;
}

/// The browser history store
#[async_trait::async_trait(?Send)]
pub trait HistoryHost {
    /// Host-side text search, newest first, at most `max_results` entries
    async fn search_history(&self, text: &str, max_results: u32) -> Result<Vec<HistoryRecord>, HostError>;
}

/// Message channel to the content script of a tab
#[async_trait::async_trait(?Send)]
pub trait ContentHost {
    /// Fails with [`HostError::Unreachable`] when nothing answers in the tab
    async fn send_to_tab(&self, tab_id: TabId, request: &ContentRequest) -> Result<ContentResponse, HostError>;
}

/// Flat key-value persistence, read and written one whole value at a time
#[async_trait::async_trait(?Send)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Everything the search side of the extension needs from the browser
pub trait BrowserHost: TabHost + HistoryHost + ContentHost {}

impl<T: TabHost + HistoryHost + ContentHost + ?Sized> BrowserHost for T {}

/// Key-value store kept in memory for the lifetime of the value.
/// Useful for testing or when the host store is unavailable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.values.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_tab_query_matches() {
        let mut tab = TabRecord::new(1, "https://a.com".to_string(), "A".to_string());
        tab.group_id = Some(5);

        assert!(TabQuery::all().matches(&tab));
        assert!(TabQuery::inactive().matches(&tab));
        assert!(TabQuery::in_group(5).matches(&tab));
        assert!(!TabQuery::in_group(6).matches(&tab));

        tab.active = true;
        assert!(!TabQuery::inactive().matches(&tab));
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();

        block_on(async {
            assert_eq!(store.get("savedTabs").await.unwrap(), None);

            store.set("savedTabs", json!([1, 2])).await.unwrap();

            assert_eq!(store.get("savedTabs").await.unwrap(), Some(json!([1, 2])));
        });
    }
}
