/// Tunable constants for searching and listing
use serde::{Deserialize, Serialize};

pub const ONE_DAY_MS: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Options of the approximate matcher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FuzzyOptions {
    /// 0.0 requires a perfect match, 1.0 matches anything
    pub threshold: f64,
    pub title_weight: f64,
    pub url_weight: f64,
    /// Expected position of the match in a field
    pub location: usize,
    /// How far from `location` a match may sit before it is penalised to the threshold
    pub distance: usize,
    /// Score matches without regard to where they sit in the field
    pub ignore_location: bool,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        FuzzyOptions {
            threshold: 0.3,
            title_weight: 0.5,
            url_weight: 0.5,
            location: 0,
            distance: 100,
            ignore_location: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub fuzzy: FuzzyOptions,
    pub history_max_results: u32,
    /// Width of the "recent" bucket, counted back from now
    pub recent_window_ms: f64,
    pub recent_tabs_limit: usize,
    /// Characters kept on each side of a content match
    pub snippet_radius: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            fuzzy: FuzzyOptions::default(),
            history_max_results: 20,
            recent_window_ms: ONE_DAY_MS,
            recent_tabs_limit: 10,
            snippet_radius: 50,
        }
    }
}
