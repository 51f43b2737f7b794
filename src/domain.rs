/// Domain normalization and matching logic for Tab Finder
use std::collections::HashSet;

use log::warn;
use url::Url;

/// Extract the hostname from an absolute URL using strict URL parsing
///
/// Returns `None` when the URL does not parse or carries no host
/// (e.g. `about:blank`).
pub fn hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Some(host.to_string()),
        _ => None,
    }
}

/// Canonicalize a URL to a comparable domain token
///
/// Lowercases the hostname and strips one leading "www." label.
/// An unparseable URL yields the empty string, which never matches a filter.
///
/// Examples:
/// - https://www.google.com/search → google.com
/// - https://Docs.RS/regex → docs.rs
/// - not a url → ""
pub fn normalize_domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default().to_lowercase();
            match host.strip_prefix("www.") {
                Some(stripped) => stripped.to_string(),
                None => host,
            }
        }
        Err(e) => {
            if !url.is_empty() {
                warn!("Invalid URL in normalize_domain: {} ({})", url, e);
            }
            String::new()
        }
    }
}

/// Normalize a bare hostname picked in the domain filter
pub fn normalize_filter_domain(domain: &str) -> String {
    normalize_domain(&format!("http://{}", domain.trim()))
}

/// True if `tab_domain` is `filter_domain` or one of its subdomains
pub fn is_domain_match(tab_domain: &str, filter_domain: &str) -> bool {
    if tab_domain.is_empty() || filter_domain.is_empty() {
        return false;
    }

    tab_domain == filter_domain
        || tab_domain
            .strip_suffix(filter_domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Derive a short group name from a hostname
///
/// Uses the second-to-last label ("github" for github.com). Hosts with more
/// than two labels that do not start with "www" keep their first label as a
/// prefix ("docs.python" for docs.python.org).
pub fn group_title(hostname: &str) -> String {
    let parts: Vec<&str> = hostname.split('.').collect();

    let base = if parts.len() >= 2 && !parts[parts.len() - 2].is_empty() {
        parts[parts.len() - 2].to_string()
    } else {
        hostname.to_string()
    };

    if parts.len() > 2 && parts[0] != "www" {
        format!("{}.{}", parts[0], base)
    } else {
        base
    }
}

/// Unique hostnames across a set of URLs, in first-seen order
pub fn unique_hostnames<'a>(urls: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter_map(hostname)
        .filter(|host| seen.insert(host.clone()))
        .collect()
}
