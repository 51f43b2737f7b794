//! In-page search, run by the content script of each tab.
//!
//! This module decides where the occurrences are and hands the chosen one
//! to a [`PageHighlighter`], which selects it and scrolls it into view.
//! Occurrence offsets of the most recent search are cached so that jumping
//! to the k-th match does not rescan the page from the top.

use std::ops::Range;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{HostError, SearchError};
use crate::matcher::compile_regex;
use crate::tab_data::ContentMatch;

/// Messages the extension sends to a tab's content script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ContentRequest {
    SearchInsideContent { query: String },
    /// Jump to the 0-indexed occurrence of `query`
    ScrollToMatch { query: String, match_number: usize },
}

/// Replies of a content script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentResponse {
    Search {
        found: bool,
        matches: Vec<ContentMatch>,
    },
    Scroll {
        scrolled: bool,
        /// Byte range of the occurrence to highlight
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<Range<usize>>,
    },
    Error {
        error: String,
    },
}

impl ContentResponse {
    pub fn error(message: impl Into<String>) -> Self {
        ContentResponse::Error { error: message.into() }
    }
}

/// Browser internal pages never host a content script
pub fn is_restricted_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("chrome://") || lower.starts_with("about:")
}

/// Selects a byte range of the page text and scrolls it into view
pub trait PageHighlighter {
    /// Returns whether the range was found on the page and highlighted
    fn highlight(&self, range: Range<usize>) -> bool;
}

impl<F: Fn(Range<usize>) -> bool> PageHighlighter for F {
    fn highlight(&self, range: Range<usize>) -> bool {
        self(range)
    }
}

/// Up to `radius` characters either side of `range`
pub fn snippet(text: &str, range: Range<usize>, radius: usize) -> String {
    let begin = text[..range.start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(range.start, |(i, _)| i);
    let finish = text[range.end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(i, _)| range.end + i);

    text[begin..finish].to_string()
}

/// Ordered occurrence ranges of one query in one page text
#[derive(Debug, Clone, PartialEq)]
pub struct MatchIndex {
    query: String,
    text_len: usize,
    ranges: Vec<Range<usize>>,
}

impl MatchIndex {
    pub fn build(text: &str, query: &str) -> Result<Self, SearchError> {
        let regex = compile_regex(query)?;
        Ok(Self::from_regex(text, query, &regex))
    }

    fn from_regex(text: &str, query: &str, regex: &Regex) -> Self {
        MatchIndex {
            query: query.to_string(),
            text_len: text.len(),
            ranges: regex.find_iter(text).map(|m| m.range()).collect(),
        }
    }

    /// Whether this index still describes `query` over `text`
    pub fn is_valid_for(&self, text: &str, query: &str) -> bool {
        self.query == query && self.text_len == text.len()
    }

    pub fn seek(&self, match_number: usize) -> Option<Range<usize>> {
        self.ranges.get(match_number).cloned()
    }
}

/// Per-page state of the content script
#[derive(Debug)]
pub struct ContentSession {
    last_index: Option<MatchIndex>,
    radius: usize,
}

impl ContentSession {
    pub fn new(radius: usize) -> Self {
        ContentSession {
            last_index: None,
            radius,
        }
    }

    /// Answer one request for the page at `page_url` whose text is `text`
    pub fn handle<P: PageHighlighter + ?Sized>(
        &mut self,
        page_url: &str,
        text: &str,
        request: &ContentRequest,
        page: &P,
    ) -> ContentResponse {
        if is_restricted_url(page_url) {
            return ContentResponse::error(HostError::Restricted.to_string());
        }

        match request {
            ContentRequest::SearchInsideContent { query } => self.search(text, query),
            ContentRequest::ScrollToMatch { query, match_number } => {
                let range = self.locate(text, query, *match_number);
                let scrolled = range.clone().is_some_and(|r| page.highlight(r));
                ContentResponse::Scroll { scrolled, range }
            }
        }
    }

    fn search(&mut self, text: &str, query: &str) -> ContentResponse {
        let regex = match compile_regex(query) {
            Ok(regex) => regex,
            Err(e) => return ContentResponse::error(e.wire_message()),
        };

        let index = MatchIndex::from_regex(text, query, &regex);
        let matches: Vec<ContentMatch> = index
            .ranges
            .iter()
            .map(|range| ContentMatch {
                snippet: snippet(text, range.clone(), self.radius),
                index: range.start,
            })
            .collect();
        self.last_index = Some(index);

        ContentResponse::Search {
            found: !matches.is_empty(),
            matches,
        }
    }

    /// Byte range of the `match_number`th occurrence, from the cache when it still applies
    fn locate(&mut self, text: &str, query: &str, match_number: usize) -> Option<Range<usize>> {
        let cached = self
            .last_index
            .as_ref()
            .filter(|index| index.is_valid_for(text, query));

        match cached {
            Some(index) => index.seek(match_number),
            None => {
                debug!("No cached matches for {:?}, rescanning page", query);
                match MatchIndex::build(text, query) {
                    Ok(index) => {
                        let range = index.seek(match_number);
                        self.last_index = Some(index);
                        range
                    }
                    Err(_) => None,
                }
            }
        }
    }
}
