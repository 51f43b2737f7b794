//! Fan-out of one query to every enabled source and the single combined render.
//!
//! Each search invocation gets its own join: the enabled sources run
//! concurrently, each fills exactly one slot of [`SearchResults`], and the
//! outcome is produced once every slot has settled. A failing source
//! settles with an empty slot and a recorded error.
//!
//! Searches are numbered by a [`SearchGeneration`]. When a newer search has
//! started by the time an older one finishes, the older outcome is dropped
//! instead of being rendered over the newer one.

use std::cell::Cell;
use std::rc::Rc;

use futures::join;
use log::{debug, error};

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::filters::{DomainFilter, FilterPipeline, TimeFilter, now_ms};
use crate::host::{BrowserHost, KeyValueStore};
use crate::matcher::MatchMode;
use crate::sources::{search_history, search_inside_tabs, search_open_tabs, search_saved_tabs};
use crate::tab_data::{HistoryRecord, SavedTab, SearchPreferences, TabContentResult, TabRecord};

/// A searchable area, in render order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    OpenTabs,
    History,
    SavedTabs,
    TabContent,
}

impl Source {
    pub const ALL: [Source; 4] = [Source::OpenTabs, Source::History, Source::SavedTabs, Source::TabContent];

    pub fn label(&self) -> &'static str {
        match self {
            Source::OpenTabs => "Open Tabs",
            Source::History => "History",
            Source::SavedTabs => "Saved Tabs",
            Source::TabContent => "Tab Content",
        }
    }
}

/// Which sources a search consults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnabledSources {
    pub open_tabs: bool,
    pub history: bool,
    pub saved_tabs: bool,
    pub tab_content: bool,
}

impl EnabledSources {
    /// Persisted toggles plus the session-only content toggle
    pub fn from_preferences(preferences: &SearchPreferences, tab_content: bool) -> Self {
        EnabledSources {
            open_tabs: preferences.open_tabs,
            history: preferences.history,
            saved_tabs: preferences.saved_tabs,
            tab_content,
        }
    }

    pub fn is_enabled(&self, source: Source) -> bool {
        match source {
            Source::OpenTabs => self.open_tabs,
            Source::History => self.history,
            Source::SavedTabs => self.saved_tabs,
            Source::TabContent => self.tab_content,
        }
    }

    pub fn count(&self) -> usize {
        Source::ALL.iter().filter(|s| self.is_enabled(**s)).count()
    }
}

/// Everything one search needs
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub mode: MatchMode,
    pub domain_filter: DomainFilter,
    pub time_filter: TimeFilter,
    pub sources: EnabledSources,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, sources: EnabledSources) -> Self {
        SearchRequest {
            query: query.into(),
            mode: MatchMode::default(),
            domain_filter: DomainFilter::All,
            time_filter: TimeFilter::All,
            sources,
        }
    }
}

/// One slot per source; disabled sources stay empty
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub tabs: Vec<TabRecord>,
    pub history: Vec<HistoryRecord>,
    pub saved_tabs: Vec<SavedTab>,
    pub tab_content: Vec<TabContentResult>,
    /// Sources that failed, with the message to show
    pub errors: Vec<(Source, String)>,
}

impl SearchResults {
    pub fn len_of(&self, source: Source) -> usize {
        match source {
            Source::OpenTabs => self.tabs.len(),
            Source::History => self.history.len(),
            Source::SavedTabs => self.saved_tabs.len(),
            Source::TabContent => self.tab_content.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        Source::ALL.iter().all(|s| self.len_of(*s) == 0)
    }

    /// Non-empty sections in fixed render order
    pub fn sections(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|s| self.len_of(*s) > 0)
            .collect()
    }

    pub fn error_for(&self, source: Source) -> Option<&str> {
        self.errors
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, message)| message.as_str())
    }

    fn settle<T>(slot: &mut Vec<T>, errors: &mut Vec<(Source, String)>, source: Source, result: Option<Result<Vec<T>, SearchError>>) {
        match result {
            Some(Ok(items)) => *slot = items,
            Some(Err(e)) => {
                error!("{} search failed: {}", source.label(), e);
                errors.push((source, e.wire_message()));
            }
            None => {}
        }
    }
}

/// What the render shows for one search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    NoSourcesSelected,
    /// Every enabled source came back empty
    NoResults { errors: Vec<(Source, String)> },
    Results(SearchResults),
}

impl SearchOutcome {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            SearchOutcome::NoSourcesSelected => Some("No search areas selected"),
            SearchOutcome::NoResults { .. } => Some("No results found"),
            SearchOutcome::Results(_) => None,
        }
    }

    /// Sources that failed during this search
    pub fn errors(&self) -> &[(Source, String)] {
        match self {
            SearchOutcome::NoSourcesSelected => &[],
            SearchOutcome::NoResults { errors } => errors,
            SearchOutcome::Results(results) => &results.errors,
        }
    }
}

/// Monotonic numbering of search invocations, shared by everything that starts searches
#[derive(Debug, Clone, Default)]
pub struct SearchGeneration {
    current: Rc<Cell<u64>>,
}

impl SearchGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new search; every earlier ticket becomes stale
    pub fn begin(&self) -> SearchTicket {
        let id = self.current.get() + 1;
        self.current.set(id);
        SearchTicket {
            id,
            current: Rc::clone(&self.current),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchTicket {
    id: u64,
    current: Rc<Cell<u64>>,
}

impl SearchTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.current.get() == self.id
    }
}

pub struct Aggregator<'a, H: BrowserHost + ?Sized, S: KeyValueStore + ?Sized> {
    host: &'a H,
    store: &'a S,
    config: SearchConfig,
    generation: SearchGeneration,
    clock: fn() -> f64,
}

impl<'a, H: BrowserHost + ?Sized, S: KeyValueStore + ?Sized> Aggregator<'a, H, S> {
    pub fn new(host: &'a H, store: &'a S) -> Self {
        Aggregator {
            host,
            store,
            config: SearchConfig::default(),
            generation: SearchGeneration::new(),
            clock: now_ms,
        }
    }

    /// Share the numbering with other aggregators started by the same view
    pub fn with_generation(mut self, generation: SearchGeneration) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> f64) -> Self {
        self.clock = clock;
        self
    }

    /// Run one search and hand the outcome to `render`, unless a newer search
    /// started meanwhile. Returns whether `render` was called.
    pub async fn search<F: FnOnce(SearchOutcome)>(&self, request: &SearchRequest, render: F) -> bool {
        let ticket = self.generation.begin();
        let outcome = self.collect(request).await;

        if ticket.is_current() {
            render(outcome);
            true
        } else {
            debug!("Dropping results of stale search #{} for {:?}", ticket.id(), request.query);
            false
        }
    }

    /// Query every enabled source concurrently and wait for all of them
    pub async fn collect(&self, request: &SearchRequest) -> SearchOutcome {
        let enabled = request.sources;
        if enabled.count() == 0 {
            return SearchOutcome::NoSourcesSelected;
        }

        let query = request.query.as_str();
        let filters = FilterPipeline::new(request.domain_filter.clone(), request.time_filter)
            .with_window(self.config.recent_window_ms);
        let now = (self.clock)();

        let open_tabs = async {
            if enabled.open_tabs {
                Some(search_open_tabs(self.host, query, request.mode, &filters, &self.config, now).await)
            } else {
                None
            }
        };
        let history = async {
            if enabled.history {
                Some(search_history(self.host, query, &self.config).await)
            } else {
                None
            }
        };
        let saved_tabs = async {
            if enabled.saved_tabs {
                // The regex toggle applies to open tabs only
                Some(search_saved_tabs(self.store, query, MatchMode::Fuzzy, &self.config).await)
            } else {
                None
            }
        };
        let tab_content = async {
            if enabled.tab_content {
                Some(search_inside_tabs(self.host, query).await)
            } else {
                None
            }
        };

        let (open_tabs, history, saved_tabs, tab_content) = join!(open_tabs, history, saved_tabs, tab_content);

        let mut results = SearchResults::default();
        SearchResults::settle(&mut results.tabs, &mut results.errors, Source::OpenTabs, open_tabs);
        SearchResults::settle(&mut results.history, &mut results.errors, Source::History, history);
        SearchResults::settle(&mut results.saved_tabs, &mut results.errors, Source::SavedTabs, saved_tabs);
        SearchResults::settle(&mut results.tab_content, &mut results.errors, Source::TabContent, tab_content);

        if results.is_empty() {
            SearchOutcome::NoResults { errors: results.errors }
        } else {
            SearchOutcome::Results(results)
        }
    }
}
