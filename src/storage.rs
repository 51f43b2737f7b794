/// Persistence of the saved-tabs list and the search preferences
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::host::KeyValueStore;
use crate::tab_data::{SavedTab, SearchPreferences};

pub const SAVED_TABS_KEY: &str = "savedTabs";
pub const PREFERENCES_KEY: &str = "searchPreferences";

/// The saved-tabs list as stored under [`SAVED_TABS_KEY`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedTabsList {
    pub tabs: Vec<SavedTab>,
}

impl SavedTabsList {
    pub fn new() -> Self {
        SavedTabsList { tabs: Vec::new() }
    }

    /// Append without de-duplication; saving a URL twice keeps two entries
    pub fn append(&mut self, tabs: impl IntoIterator<Item = SavedTab>) {
        self.tabs.extend(tabs);
    }

    /// Remove every entry with this URL, returning how many were removed
    pub fn remove_url(&mut self, url: &str) -> usize {
        let original_len = self.tabs.len();
        self.tabs.retain(|t| t.url != url);
        original_len - self.tabs.len()
    }
}

/// Saved-tabs operations over a key-value store; every write replaces the whole list
pub struct SavedTabsStore<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> SavedTabsStore<'a, S> {
    pub fn new(store: &'a S) -> Self {
        SavedTabsStore { store }
    }

    /// Write an empty list if nothing has been stored yet
    pub async fn ensure_initialized(&self) -> Result<(), StorageError> {
        if self.store.get(SAVED_TABS_KEY).await?.is_none() {
            debug!("Initializing empty saved tabs list");
            self.write(&SavedTabsList::new()).await?;
        }
        Ok(())
    }

    pub async fn load(&self) -> Result<SavedTabsList, StorageError> {
        match self.store.get(SAVED_TABS_KEY).await? {
            Some(value) if !value.is_null() => Ok(serde_json::from_value(value)?),
            _ => Ok(SavedTabsList::new()),
        }
    }

    pub async fn save_tabs(&self, tabs: Vec<SavedTab>) -> Result<Vec<SavedTab>, StorageError> {
        let mut list = self.load().await?;
        list.append(tabs);
        self.write(&list).await?;
        Ok(list.tabs)
    }

    pub async fn unsave_tab(&self, url: &str) -> Result<Vec<SavedTab>, StorageError> {
        let mut list = self.load().await?;
        let removed = list.remove_url(url);
        debug!("Unsaved {} entries for {}", removed, url);
        self.write(&list).await?;
        Ok(list.tabs)
    }

    pub async fn unsave_all(&self) -> Result<Vec<SavedTab>, StorageError> {
        let list = SavedTabsList::new();
        self.write(&list).await?;
        Ok(list.tabs)
    }

    async fn write(&self, list: &SavedTabsList) -> Result<(), StorageError> {
        self.store.set(SAVED_TABS_KEY, serde_json::to_value(list)?).await
    }
}

/// Load the persisted source toggles, falling back to the defaults
pub async fn load_preferences<S: KeyValueStore + ?Sized>(store: &S) -> Result<SearchPreferences, StorageError> {
    match store.get(PREFERENCES_KEY).await? {
        Some(value) if !value.is_null() => Ok(serde_json::from_value(value)?),
        _ => Ok(SearchPreferences::default()),
    }
}

pub async fn save_preferences<S: KeyValueStore + ?Sized>(
    store: &S,
    preferences: &SearchPreferences,
) -> Result<(), StorageError> {
    store.set(PREFERENCES_KEY, serde_json::to_value(preferences)?).await
}
