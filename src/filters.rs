/// Refinement filters applied after matching: domain first, then recency
use serde::{Deserialize, Serialize};

use crate::config::ONE_DAY_MS;
use crate::domain::{is_domain_match, normalize_domain, normalize_filter_domain};
use crate::tab_data::TabRecord;

const ALL: &str = "all";

/// Restricts results to one domain and its subdomains
///
/// Read leniently: null, empty and "all" all mean no restriction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum DomainFilter {
    #[default]
    All,
    Domain(String),
}

impl From<String> for DomainFilter {
    fn from(value: String) -> Self {
        if value.is_empty() || value == ALL {
            DomainFilter::All
        } else {
            DomainFilter::Domain(value)
        }
    }
}

impl From<Option<String>> for DomainFilter {
    fn from(value: Option<String>) -> Self {
        value.map_or(DomainFilter::All, DomainFilter::from)
    }
}

impl From<DomainFilter> for String {
    fn from(filter: DomainFilter) -> Self {
        match filter {
            DomainFilter::All => ALL.to_string(),
            DomainFilter::Domain(domain) => domain,
        }
    }
}

/// Recency bucket relative to the moment the filter runs
///
/// Anything other than "recent" or "older" reads as no restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum TimeFilter {
    #[default]
    All,
    Recent,
    Older,
}

impl From<&str> for TimeFilter {
    fn from(value: &str) -> Self {
        match value {
            "recent" => TimeFilter::Recent,
            "older" => TimeFilter::Older,
            _ => TimeFilter::All,
        }
    }
}

impl From<Option<String>> for TimeFilter {
    fn from(value: Option<String>) -> Self {
        value.as_deref().map_or(TimeFilter::All, TimeFilter::from)
    }
}

impl From<TimeFilter> for String {
    fn from(filter: TimeFilter) -> Self {
        match filter {
            TimeFilter::All => ALL,
            TimeFilter::Recent => "recent",
            TimeFilter::Older => "older",
        }
        .to_string()
    }
}

/// Milliseconds since the epoch, as the host clock reports them
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// Milliseconds since the epoch, as the host clock reports them
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64() * 1000.0)
}

/// True if the tab was accessed within `window_ms` of `now_ms`
///
/// A tab without a last-accessed time is never recent.
pub fn is_recent(tab: &TabRecord, now_ms: f64, window_ms: f64) -> bool {
    tab.last_accessed
        .is_some_and(|accessed| now_ms - accessed <= window_ms)
}

/// Keep tabs on the filter domain or its subdomains
pub fn filter_by_domain(tabs: Vec<TabRecord>, filter: &DomainFilter) -> Vec<TabRecord> {
    let DomainFilter::Domain(value) = filter else {
        return tabs;
    };

    let filter_domain = normalize_filter_domain(value);
    tabs.into_iter()
        .filter(|tab| is_domain_match(&normalize_domain(&tab.url), &filter_domain))
        .collect()
}

/// Keep tabs in the requested recency bucket; "older" is everything not recent
pub fn filter_by_time(tabs: Vec<TabRecord>, filter: TimeFilter, now_ms: f64, window_ms: f64) -> Vec<TabRecord> {
    match filter {
        TimeFilter::All => tabs,
        TimeFilter::Recent => tabs
            .into_iter()
            .filter(|tab| is_recent(tab, now_ms, window_ms))
            .collect(),
        TimeFilter::Older => tabs
            .into_iter()
            .filter(|tab| !is_recent(tab, now_ms, window_ms))
            .collect(),
    }
}

/// The refinement filters of one search request
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPipeline {
    pub domain: DomainFilter,
    pub time: TimeFilter,
    pub window_ms: f64,
}

impl FilterPipeline {
    pub fn new(domain: DomainFilter, time: TimeFilter) -> Self {
        FilterPipeline {
            domain,
            time,
            window_ms: ONE_DAY_MS,
        }
    }

    pub fn with_window(mut self, window_ms: f64) -> Self {
        self.window_ms = window_ms;
        self
    }

    /// Apply the domain filter, then the time filter
    pub fn apply(&self, tabs: Vec<TabRecord>, now_ms: f64) -> Vec<TabRecord> {
        let tabs = filter_by_domain(tabs, &self.domain);
        filter_by_time(tabs, self.time, now_ms, self.window_ms)
    }
}
