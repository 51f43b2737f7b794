//! In-memory browser used by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::ops::Range;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::content::{ContentRequest, ContentResponse, ContentSession};
use crate::error::HostError;
use crate::grouping::GroupColor;
use crate::host::{ContentHost, HistoryHost, TabHost, TabQuery};
use crate::tab_data::{GroupId, HistoryRecord, TabId, TabRecord};

#[derive(Default)]
pub struct FakeBrowser {
    tabs: RefCell<Vec<TabRecord>>,
    history: RefCell<Vec<HistoryRecord>>,
    pages: RefCell<HashMap<TabId, String>>,
    groups: RefCell<Vec<(GroupId, String, GroupColor)>>,
    next_group_id: Cell<GroupId>,
    grouping_failures: RefCell<HashSet<TabId>>,
    tabs_fail: Cell<bool>,
    tabs_yield: Cell<bool>,
    history_fails: Cell<bool>,
    calls: Cell<usize>,
    opened: RefCell<Vec<String>>,
}

impl FakeBrowser {
    pub fn with_tabs(tabs: Vec<TabRecord>) -> Self {
        let browser = FakeBrowser::default();
        browser.next_group_id.set(100);
        *browser.tabs.borrow_mut() = tabs;
        browser
    }

    pub fn add_history(&self, entries: Vec<HistoryRecord>) {
        self.history.borrow_mut().extend(entries);
    }

    /// Give a tab a content script serving `text`
    pub fn set_page(&self, tab_id: TabId, text: &str) {
        self.pages.borrow_mut().insert(tab_id, text.to_string());
    }

    pub fn fail_grouping_for(&self, tab_id: TabId) {
        self.grouping_failures.borrow_mut().insert(tab_id);
    }

    pub fn fail_tab_queries(&self) {
        self.tabs_fail.set(true);
    }

    /// Make tab queries return `Pending` once before completing
    pub fn yield_on_tab_query(&self) {
        self.tabs_yield.set(true);
    }

    pub fn fail_history(&self) {
        self.history_fails.set(true);
    }

    /// Number of host calls made so far
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn tabs(&self) -> Vec<TabRecord> {
        self.tabs.borrow().clone()
    }

    pub fn tab(&self, tab_id: TabId) -> Option<TabRecord> {
        self.tabs.borrow().iter().find(|t| t.id == tab_id).cloned()
    }

    pub fn group_colors(&self) -> Vec<(GroupId, String, GroupColor)> {
        self.groups.borrow().clone()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }

    fn record_call(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

#[async_trait::async_trait(?Send)]
impl TabHost for FakeBrowser {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabRecord>, HostError> {
        self.record_call();
        if self.tabs_yield.get() {
            YieldNow(false).await;
        }
        if self.tabs_fail.get() {
            return Err(HostError::Api("tabs.query failed".to_string()));
        }
        Ok(self.tabs.borrow().iter().filter(|t| query.matches(t)).cloned().collect())
    }

    async fn activate_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        self.record_call();
        let mut tabs = self.tabs.borrow_mut();
        if !tabs.iter().any(|t| t.id == tab_id) {
            return Err(HostError::Api(format!("No tab with id: {}", tab_id)));
        }
        for tab in tabs.iter_mut() {
            tab.active = tab.id == tab_id;
        }
        Ok(())
    }

    async fn open_url(&self, url: &str) -> Result<(), HostError> {
        self.record_call();
        self.opened.borrow_mut().push(url.to_string());
        Ok(())
    }

    async fn group_tabs(&self, tab_ids: &[TabId]) -> Result<GroupId, HostError> {
        self.record_call();
        if tab_ids.iter().any(|id| self.grouping_failures.borrow().contains(id)) {
            return Err(HostError::Api("Tabs cannot be edited right now".to_string()));
        }

        let group_id = self.next_group_id.get();
        self.next_group_id.set(group_id + 1);
        for tab in self.tabs.borrow_mut().iter_mut() {
            if tab_ids.contains(&tab.id) {
                tab.group_id = Some(group_id);
            }
        }
        Ok(group_id)
    }

    async fn update_group(&self, group_id: GroupId, title: &str, color: GroupColor) -> Result<(), HostError> {
        self.record_call();
        self.groups.borrow_mut().push((group_id, title.to_string(), color));
        Ok(())
    }

    async fn query_groups(&self) -> Result<Vec<GroupId>, HostError> {
        self.record_call();
        Ok(self.groups.borrow().iter().map(|(id, _, _)| *id).collect())
    }

    async fn ungroup_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError> {
        self.record_call();
        for tab in self.tabs.borrow_mut().iter_mut() {
            if tab_ids.contains(&tab.id) {
                tab.group_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait(?Send)]
impl HistoryHost for FakeBrowser {
    async fn search_history(&self, text: &str, max_results: u32) -> Result<Vec<HistoryRecord>, HostError> {
        self.record_call();
        if self.history_fails.get() {
            return Err(HostError::Api("history.search failed".to_string()));
        }

        let needle = text.to_lowercase();
        Ok(self
            .history
            .borrow()
            .iter()
            .filter(|h| {
                h.url.to_lowercase().contains(&needle)
                    || h.title.as_deref().unwrap_or_default().to_lowercase().contains(&needle)
            })
            .take(max_results as usize)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait(?Send)]
impl ContentHost for FakeBrowser {
    async fn send_to_tab(&self, tab_id: TabId, request: &ContentRequest) -> Result<ContentResponse, HostError> {
        self.record_call();
        let url = self.tab(tab_id).map(|t| t.url).unwrap_or_default();
        let pages = self.pages.borrow();
        let text = pages.get(&tab_id).ok_or(HostError::Unreachable(tab_id))?;

        Ok(ContentSession::new(50).handle(&url, text, request, &|_: Range<usize>| true))
    }
}

/// Future that is pending on its first poll and ready on the second
struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
