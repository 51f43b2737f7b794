/// The four searchable sources, each wrapping one collaborator
use futures::future::join_all;
use log::debug;

use crate::config::SearchConfig;
use crate::content::{ContentRequest, ContentResponse};
use crate::error::SearchError;
use crate::filters::FilterPipeline;
use crate::host::{ContentHost, HistoryHost, KeyValueStore, TabHost, TabQuery};
use crate::matcher::{MatchMode, PatternMatcher};
use crate::storage::SavedTabsStore;
use crate::tab_data::{HistoryRecord, SavedTab, TabContentResult, TabRecord};

/// Match every open tab against the query, then apply the refinement filters
pub async fn search_open_tabs<H: TabHost + ?Sized>(
    host: &H,
    query: &str,
    mode: MatchMode,
    filters: &FilterPipeline,
    config: &SearchConfig,
    now_ms: f64,
) -> Result<Vec<TabRecord>, SearchError> {
    let matcher = PatternMatcher::new(query, mode, &config.fuzzy)?;
    let tabs = host.query_tabs(TabQuery::all()).await?;

    let matched = matcher.apply(&tabs);
    debug!("{} of {} open tabs match {:?}", matched.len(), tabs.len(), query);

    Ok(filters.apply(matched, now_ms))
}

/// Ask the history store; its own text search decides what matches
pub async fn search_history<H: HistoryHost + ?Sized>(
    host: &H,
    query: &str,
    config: &SearchConfig,
) -> Result<Vec<HistoryRecord>, SearchError> {
    Ok(host.search_history(query, config.history_max_results).await?)
}

/// Match the saved list with `mode`; the popup always searches it fuzzily
pub async fn search_saved_tabs<S: KeyValueStore + ?Sized>(
    store: &S,
    query: &str,
    mode: MatchMode,
    config: &SearchConfig,
) -> Result<Vec<SavedTab>, SearchError> {
    let matcher = PatternMatcher::new(query, mode, &config.fuzzy)?;
    let saved = SavedTabsStore::new(store).load().await?;

    Ok(matcher.apply(&saved.tabs))
}

/// Search the page text of every open tab
///
/// One request goes to each tab and all of them are awaited together. A tab
/// that cannot be reached, answers with an error, or has no occurrence is
/// left out; results keep tab order.
pub async fn search_inside_tabs<H: TabHost + ContentHost + ?Sized>(
    host: &H,
    query: &str,
) -> Result<Vec<TabContentResult>, SearchError> {
    let tabs = host.query_tabs(TabQuery::all()).await?;
    let request = ContentRequest::SearchInsideContent {
        query: query.to_string(),
    };

    let responses = join_all(tabs.iter().map(|tab| host.send_to_tab(tab.id, &request))).await;

    let results = tabs
        .into_iter()
        .zip(responses)
        .filter_map(|(tab, response)| match response {
            Ok(ContentResponse::Search { found: true, matches }) => Some(TabContentResult {
                tab_id: tab.id,
                title: tab.title,
                matches,
            }),
            Ok(ContentResponse::Error { error }) => {
                debug!("Tab {} answered with error: {}", tab.id, error);
                None
            }
            Ok(_) => None,
            Err(e) => {
                debug!("Skipping tab {}: {}", tab.id, e);
                None
            }
        })
        .collect();

    Ok(results)
}
