/// Tab listing operations: all tabs, recently used tabs, domain-filter options

use std::cmp::Ordering;

use crate::domain::unique_hostnames;
use crate::error::HostError;
use crate::host::{TabHost, TabQuery};
use crate::tab_data::TabRecord;

pub async fn get_all_tabs<H: TabHost + ?Sized>(host: &H) -> Result<Vec<TabRecord>, HostError> {
    host.query_tabs(TabQuery::all()).await
}

/// The `limit` most recently accessed inactive tabs, newest first
pub async fn get_recent_tabs<H: TabHost + ?Sized>(host: &H, limit: usize) -> Result<Vec<TabRecord>, HostError> {
    let tabs = host.query_tabs(TabQuery::inactive()).await?;
    Ok(most_recent(tabs, limit))
}

/// Sort by last access descending (tabs never accessed go last) and keep `limit`
pub fn most_recent(mut tabs: Vec<TabRecord>, limit: usize) -> Vec<TabRecord> {
    tabs.sort_by(|a, b| match (a.last_accessed, b.last_accessed) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    tabs.truncate(limit);
    tabs
}

/// Hostnames offered by the domain filter, first-seen order
pub async fn domain_options<H: TabHost + ?Sized>(host: &H) -> Result<Vec<String>, HostError> {
    let tabs = get_all_tabs(host).await?;
    Ok(unique_hostnames(tabs.iter().map(|t| t.url.as_str())))
}
