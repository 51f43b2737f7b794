/// Query matching: literal regular expressions or typo-tolerant fuzzy search
use regex::{Regex, RegexBuilder};

use crate::config::FuzzyOptions;
use crate::error::SearchError;
use crate::tab_data::{HistoryRecord, SavedTab, TabRecord};

/// Anything with a title and a URL to match against
pub trait Searchable {
    fn title(&self) -> &str;
    fn url(&self) -> &str;
}

impl Searchable for TabRecord {
    fn title(&self) -> &str {
        &self.title
    }

    fn url(&self) -> &str {
        &self.url
    }
}

impl Searchable for SavedTab {
    fn title(&self) -> &str {
        &self.title
    }

    fn url(&self) -> &str {
        &self.url
    }
}

impl Searchable for HistoryRecord {
    fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// How a query is interpreted; the two modes are never combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Fuzzy,
    Regex,
}

impl MatchMode {
    pub fn from_flag(use_regex: bool) -> Self {
        if use_regex { MatchMode::Regex } else { MatchMode::Fuzzy }
    }
}

/// A query compiled for one search pass
#[derive(Debug, Clone)]
pub enum PatternMatcher {
    Regex(Regex),
    Fuzzy(FuzzyQuery),
}

impl PatternMatcher {
    /// Compile `query` for the given mode
    ///
    /// Only regex mode can fail; a malformed pattern aborts the whole
    /// search for the caller's source.
    pub fn new(query: &str, mode: MatchMode, options: &FuzzyOptions) -> Result<Self, SearchError> {
        match mode {
            MatchMode::Regex => compile_regex(query).map(PatternMatcher::Regex),
            MatchMode::Fuzzy => Ok(PatternMatcher::Fuzzy(FuzzyQuery::new(query, options.clone()))),
        }
    }

    /// Select the matching items
    ///
    /// Regex mode keeps the input order. Fuzzy mode returns items ranked
    /// best-first, ties kept in input order.
    pub fn apply<T: Searchable + Clone>(&self, items: &[T]) -> Vec<T> {
        match self {
            PatternMatcher::Regex(regex) => items
                .iter()
                .filter(|item| regex.is_match(item.title()) || regex.is_match(item.url()))
                .cloned()
                .collect(),
            PatternMatcher::Fuzzy(query) => {
                let mut scored: Vec<(usize, f64)> = items
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, item)| query.score(item).map(|score| (idx, score)))
                    .collect();

                scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

                scored.into_iter().map(|(idx, _)| items[idx].clone()).collect()
            }
        }
    }
}

/// Compile a case-insensitive regular expression from user input
pub fn compile_regex(query: &str) -> Result<Regex, SearchError> {
    RegexBuilder::new(query)
        .case_insensitive(true)
        .build()
        .map_err(|e| SearchError::InvalidPattern(e.to_string()))
}

/// Approximate-match query over the weighted title and url fields
///
/// Each field is scored by the fewest edits needed to turn the query into
/// some substring of the field, as a fraction of the query length, plus a
/// penalty for how far that substring starts from `location`. A field
/// matches when its score is within the threshold. Field scores combine
/// multiplicatively, each raised to its normalized weight.
#[derive(Debug, Clone)]
pub struct FuzzyQuery {
    pattern: Vec<char>,
    options: FuzzyOptions,
}

impl FuzzyQuery {
    pub fn new(query: &str, options: FuzzyOptions) -> Self {
        FuzzyQuery {
            pattern: query.trim().to_lowercase().chars().collect(),
            options,
        }
    }

    /// Combined score of an item, lower is better; `None` if no field matches
    pub fn score<T: Searchable + ?Sized>(&self, item: &T) -> Option<f64> {
        // An empty query matches nothing.
        if self.pattern.is_empty() {
            return None;
        }

        let total_weight = self.options.title_weight + self.options.url_weight;
        let (title_weight, url_weight) = if total_weight > 0.0 {
            (self.options.title_weight / total_weight, self.options.url_weight / total_weight)
        } else {
            (0.5, 0.5)
        };

        let mut combined = 1.0;
        let mut matched = false;

        for (field, weight) in [(item.title(), title_weight), (item.url(), url_weight)] {
            if let Some(score) = self.score_field(field) {
                matched = true;
                combined *= score.max(f64::EPSILON).powf(weight);
            }
        }

        matched.then_some(combined)
    }

    /// Score of a single field, `None` when above the threshold
    pub fn score_field(&self, field: &str) -> Option<f64> {
        if self.pattern.is_empty() || field.is_empty() {
            return None;
        }

        let text: Vec<char> = field.to_lowercase().chars().collect();
        if text == self.pattern {
            return Some(0.0);
        }

        let best = best_substring_match(&self.pattern, &text)
            .into_iter()
            .map(|(errors, start)| self.compute_score(errors, start))
            .fold(f64::INFINITY, f64::min);

        (best <= self.options.threshold).then_some(best)
    }

    fn compute_score(&self, errors: usize, start: usize) -> f64 {
        let accuracy = errors as f64 / self.pattern.len() as f64;
        if self.options.ignore_location {
            return accuracy;
        }

        let proximity = start.abs_diff(self.options.location);
        if self.options.distance == 0 {
            return if proximity > 0 { 1.0 } else { accuracy };
        }

        accuracy + proximity as f64 / self.options.distance as f64
    }
}

/// Edit distance of `pattern` against every substring of `text`
///
/// Returns, for each end position in `text`, the fewest edits and the
/// start position of the substring achieving them.
fn best_substring_match(pattern: &[char], text: &[char]) -> Vec<(usize, usize)> {
    let m = pattern.len();

    // Column for the empty text prefix: deleting every pattern char.
    let mut cost: Vec<usize> = (0..=m).collect();
    let mut start: Vec<usize> = vec![0; m + 1];
    let mut ends = Vec::with_capacity(text.len());

    for (j, &ch) in text.iter().enumerate() {
        let mut next_cost = vec![0; m + 1];
        let mut next_start = vec![j + 1; m + 1];

        for i in 1..=m {
            let substitution = cost[i - 1] + usize::from(pattern[i - 1] != ch);
            let insertion = cost[i] + 1;
            let deletion = next_cost[i - 1] + 1;

            if substitution <= insertion && substitution <= deletion {
                next_cost[i] = substitution;
                next_start[i] = if i == 1 { j } else { start[i - 1] };
            } else if insertion <= deletion {
                next_cost[i] = insertion;
                next_start[i] = start[i];
            } else {
                next_cost[i] = deletion;
                next_start[i] = next_start[i - 1];
            }
        }

        cost = next_cost;
        start = next_start;
        ends.push((cost[m], start[m]));
    }

    ends
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab(id: i32, url: &str, title: &str) -> TabRecord {
        TabRecord::new(id, url.to_string(), title.to_string())
    }

    fn sample_tabs() -> Vec<TabRecord> {
        vec![
            tab(1, "https://github.com/rust-lang/rust", "GitHub - rust-lang"),
            tab(2, "https://docs.rs/regex", "regex - Rust docs"),
            tab(3, "https://news.ycombinator.com", "Hacker News"),
            tab(4, "https://mail.google.com", "Inbox"),
        ]
    }

    fn fuzzy(query: &str) -> PatternMatcher {
        PatternMatcher::new(query, MatchMode::Fuzzy, &FuzzyOptions::default()).unwrap()
    }

    fn ids(tabs: &[TabRecord]) -> Vec<i32> {
        tabs.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_regex_matches_title_or_url_case_insensitive() {
        let matcher = PatternMatcher::new("^hacker", MatchMode::Regex, &FuzzyOptions::default()).unwrap();
        assert_eq!(ids(&matcher.apply(&sample_tabs())), vec![3]);

        let matcher = PatternMatcher::new("GOOGLE\\.com$", MatchMode::Regex, &FuzzyOptions::default()).unwrap();
        assert_eq!(ids(&matcher.apply(&sample_tabs())), vec![4]);
    }

    #[test]
    fn test_regex_keeps_input_order() {
        let matcher = PatternMatcher::new("rust|news", MatchMode::Regex, &FuzzyOptions::default()).unwrap();

        assert_eq!(ids(&matcher.apply(&sample_tabs())), vec![1, 2, 3]);
    }

    #[test]
    fn test_regex_invalid_pattern_is_structured_error() {
        let result = PatternMatcher::new("(", MatchMode::Regex, &FuzzyOptions::default());

        assert!(matches!(result, Err(SearchError::InvalidPattern(_))));
    }

    #[test]
    fn test_fuzzy_exact_title() {
        let results = fuzzy("Hacker News").apply(&sample_tabs());

        assert_eq!(results[0].id, 3);
    }

    #[test]
    fn test_fuzzy_tolerates_one_substitution() {
        let results = fuzzy("Hacker Nuws").apply(&sample_tabs());

        assert_eq!(ids(&results), vec![3]);
    }

    #[test]
    fn test_fuzzy_partial_substring() {
        let results = fuzzy("inbox").apply(&sample_tabs());

        assert_eq!(ids(&results), vec![4]);
    }

    #[test]
    fn test_fuzzy_unrelated_query_is_empty() {
        assert!(fuzzy("qwxzvk").apply(&sample_tabs()).is_empty());
    }

    #[test]
    fn test_fuzzy_empty_query_is_empty() {
        assert!(fuzzy("").apply(&sample_tabs()).is_empty());
        assert!(fuzzy("   ").apply(&sample_tabs()).is_empty());
    }

    #[test]
    fn test_fuzzy_ranks_exact_before_typo() {
        let tabs = vec![tab(1, "https://a.example", "Rist"), tab(2, "https://b.example", "Rust")];

        let results = fuzzy("rust").apply(&tabs);

        assert_eq!(ids(&results), vec![2, 1]);
    }

    #[test]
    fn test_fuzzy_location_penalty() {
        let query = FuzzyQuery::new("needle", FuzzyOptions::default());
        let far = format!("{}needle", "x".repeat(60));

        assert_eq!(query.score_field("needle in a haystack"), Some(0.0));
        assert_eq!(query.score_field(&far), None);

        let anywhere = FuzzyQuery::new(
            "needle",
            FuzzyOptions { ignore_location: true, ..FuzzyOptions::default() },
        );
        assert_eq!(anywhere.score_field(&far), Some(0.0));
    }

    #[test]
    fn test_best_substring_match_start() {
        let pattern: Vec<char> = "abc".chars().collect();
        let text: Vec<char> = "xxabcx".chars().collect();

        let ends = best_substring_match(&pattern, &text);

        assert_eq!(ends[4], (0, 2));
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(MatchMode::from_flag(true), MatchMode::Regex);
        assert_eq!(MatchMode::from_flag(false), MatchMode::Fuzzy);
    }
}
