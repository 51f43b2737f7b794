/// Batch grouping of open tabs into native tab groups, one per hostname
use std::collections::HashMap;

use log::{error, info, warn};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::domain::{group_title, hostname};
use crate::error::HostError;
use crate::host::{TabHost, TabQuery};
use crate::tab_data::{DomainGroup, GroupId, TabId, TabRecord};

/// Colors offered by the native tab-group feature, in assignment order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

pub const PALETTE: [GroupColor; 8] = [
    GroupColor::Blue,
    GroupColor::Red,
    GroupColor::Yellow,
    GroupColor::Green,
    GroupColor::Pink,
    GroupColor::Purple,
    GroupColor::Cyan,
    GroupColor::Orange,
];

impl GroupColor {
    /// The `n`th color of the palette, wrapping around
    pub fn nth(n: usize) -> GroupColor {
        PALETTE[n % PALETTE.len()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupColor::Blue => "blue",
            GroupColor::Red => "red",
            GroupColor::Yellow => "yellow",
            GroupColor::Green => "green",
            GroupColor::Pink => "pink",
            GroupColor::Purple => "purple",
            GroupColor::Cyan => "cyan",
            GroupColor::Orange => "orange",
        }
    }
}

/// Tabs sharing one raw hostname
#[derive(Debug, Clone, PartialEq)]
pub struct HostBucket {
    pub hostname: String,
    pub tab_ids: Vec<TabId>,
}

/// Partition tab ids by hostname, buckets in the order their host was first seen
///
/// Tabs whose URL has no parseable host are left out.
pub fn partition_by_hostname(tabs: &[TabRecord]) -> Vec<HostBucket> {
    let mut buckets: Vec<HostBucket> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for tab in tabs {
        let Some(host) = hostname(&tab.url) else {
            warn!("Skipping tab {} with unparseable URL {:?}", tab.id, tab.url);
            continue;
        };

        match positions.get(&host) {
            Some(&pos) => buckets[pos].tab_ids.push(tab.id),
            None => {
                positions.insert(host.clone(), buckets.len());
                buckets.push(HostBucket {
                    hostname: host,
                    tab_ids: vec![tab.id],
                });
            }
        }
    }

    buckets
}

/// Buckets worth grouping: hostnames with at least two tabs
pub fn groupable_buckets(tabs: &[TabRecord]) -> Vec<HostBucket> {
    partition_by_hostname(tabs)
        .into_iter()
        .filter(|bucket| bucket.tab_ids.len() >= 2)
        .collect()
}

/// A bucket the host refused to group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupFailure {
    pub domain: String,
    pub error: HostError,
}

/// Outcome of one grouping pass; partial success is normal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupingReport {
    pub groups: Vec<DomainGroup>,
    pub failures: Vec<GroupFailure>,
}

impl GroupingReport {
    /// Created groups keyed by hostname, in the order the hosts were found
    pub fn grouped_tabs(&self) -> GroupedTabs<'_> {
        GroupedTabs(&self.groups)
    }
}

/// Serializes as one object keyed by hostname, keys in discovery order
#[derive(Debug, Clone, Copy)]
pub struct GroupedTabs<'a>(&'a [DomainGroup]);

impl Serialize for GroupedTabs<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for group in self.0 {
            map.serialize_entry(&group.domain, group)?;
        }
        map.end()
    }
}

/// Group every open tab by hostname
///
/// Each bucket is grouped, then titled and colored. A failing bucket is
/// logged and recorded, and does not consume a palette color; the
/// remaining buckets still run.
pub async fn group_tabs_by_domain<H: TabHost + ?Sized>(host: &H) -> Result<GroupingReport, HostError> {
    let tabs = host.query_tabs(TabQuery::all()).await?;
    let mut report = GroupingReport::default();
    let mut color_index = 0;

    for bucket in groupable_buckets(&tabs) {
        let title = group_title(&bucket.hostname);
        let color = GroupColor::nth(color_index);

        match create_group(host, &bucket.tab_ids, &title, color).await {
            Ok(group_id) => {
                info!("Grouped {} tabs for {} as {:?}", bucket.tab_ids.len(), bucket.hostname, title);
                report.groups.push(DomainGroup {
                    group_id,
                    tab_ids: bucket.tab_ids,
                    domain: bucket.hostname,
                    title,
                });
                color_index += 1;
            }
            Err(e) => {
                error!("Error creating group for {}: {}", bucket.hostname, e);
                report.failures.push(GroupFailure {
                    domain: bucket.hostname,
                    error: e,
                });
            }
        }
    }

    Ok(report)
}

async fn create_group<H: TabHost + ?Sized>(
    host: &H,
    tab_ids: &[TabId],
    title: &str,
    color: GroupColor,
) -> Result<GroupId, HostError> {
    let group_id = host.group_tabs(tab_ids).await?;
    host.update_group(group_id, title, color).await?;
    Ok(group_id)
}

/// Disband every existing tab group, returning how many tabs were released
pub async fn ungroup_all<H: TabHost + ?Sized>(host: &H) -> Result<usize, HostError> {
    let mut released = 0;

    for group_id in host.query_groups().await? {
        let tab_ids: Vec<TabId> = host
            .query_tabs(TabQuery::in_group(group_id))
            .await?
            .iter()
            .map(|tab| tab.id)
            .collect();

        if !tab_ids.is_empty() {
            host.ungroup_tabs(&tab_ids).await?;
            released += tab_ids.len();
        }
    }

    Ok(released)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBrowser;
    use futures::executor::block_on;

    fn tab(id: i32, url: &str) -> TabRecord {
        TabRecord::new(id, url.to_string(), format!("Tab {}", id))
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(GroupColor::nth(0), GroupColor::Blue);
        assert_eq!(GroupColor::nth(7), GroupColor::Orange);
        assert_eq!(GroupColor::nth(8), GroupColor::Blue);
        assert_eq!(GroupColor::nth(10).as_str(), "yellow");
    }

    #[test]
    fn test_partition_discovery_order_and_raw_hosts() {
        let tabs = vec![
            tab(1, "https://b.com/x"),
            tab(2, "https://www.a.com"),
            tab(3, "https://b.com/y"),
            tab(4, "about:blank"),
            tab(5, "https://a.com"),
        ];

        let buckets = partition_by_hostname(&tabs);

        assert_eq!(
            buckets,
            vec![
                HostBucket { hostname: "b.com".to_string(), tab_ids: vec![1, 3] },
                HostBucket { hostname: "www.a.com".to_string(), tab_ids: vec![2] },
                HostBucket { hostname: "a.com".to_string(), tab_ids: vec![5] },
            ]
        );
    }

    #[test]
    fn test_group_skips_singletons() {
        let browser = FakeBrowser::with_tabs(vec![
            tab(1, "https://a.com/1"),
            tab(2, "https://a.com/2"),
            tab(3, "https://b.com"),
        ]);

        let report = block_on(group_tabs_by_domain(&browser)).unwrap();

        assert_eq!(report.groups.len(), 1);
        let group = &report.groups[0];
        assert_eq!(group.domain, "a.com");
        assert_eq!(group.tab_ids, vec![1, 2]);
        assert_eq!(group.title, "a");
        assert_eq!(browser.group_colors(), vec![(group.group_id, "a".to_string(), GroupColor::Blue)]);
        assert_eq!(browser.tab(3).unwrap().group_id, None);
    }

    #[test]
    fn test_group_failure_does_not_abort_others() {
        let browser = FakeBrowser::with_tabs(vec![
            tab(1, "https://a.com/1"),
            tab(2, "https://a.com/2"),
            tab(3, "https://docs.b.org/1"),
            tab(4, "https://docs.b.org/2"),
            tab(5, "https://c.net/1"),
            tab(6, "https://c.net/2"),
        ]);
        browser.fail_grouping_for(3);

        let report = block_on(group_tabs_by_domain(&browser)).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].domain, "docs.b.org");

        let titles: Vec<&str> = report.groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);

        let colors: Vec<GroupColor> = browser.group_colors().into_iter().map(|(_, _, c)| c).collect();
        assert_eq!(colors, vec![GroupColor::Blue, GroupColor::Red]);
    }

    #[test]
    fn test_grouped_tabs_keep_discovery_order() {
        let browser = FakeBrowser::with_tabs(vec![
            tab(1, "https://zulip.com/1"),
            tab(2, "https://a.com/1"),
            tab(3, "https://zulip.com/2"),
            tab(4, "https://a.com/2"),
        ]);

        let report = block_on(group_tabs_by_domain(&browser)).unwrap();
        let text = serde_json::to_string(&report.grouped_tabs()).unwrap();

        let zulip = text.find("\"zulip.com\":").unwrap();
        let a = text.find("\"a.com\":").unwrap();
        assert!(zulip < a, "keys out of discovery order: {}", text);
        assert!(text.contains("\"tabIds\":[1,3]"));
    }

    #[test]
    fn test_ungroup_all() {
        let browser = FakeBrowser::with_tabs(vec![
            tab(1, "https://a.com/1"),
            tab(2, "https://a.com/2"),
            tab(3, "https://b.com/1"),
            tab(4, "https://b.com/2"),
        ]);
        block_on(group_tabs_by_domain(&browser)).unwrap();

        let released = block_on(ungroup_all(&browser)).unwrap();

        assert_eq!(released, 4);
        assert!(browser.tabs().iter().all(|t| t.group_id.is_none()));
    }
}
