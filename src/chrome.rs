/// Bindings of the host traits onto the chrome.* extension APIs
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::content::{ContentRequest, ContentResponse};
use crate::error::{HostError, StorageError};
use crate::grouping::GroupColor;
use crate::host::{ContentHost, HistoryHost, KeyValueStore, TabHost, TabQuery};
use crate::tab_data::{GroupId, HistoryRecord, TabId, TabRecord};

/// Group id the host reports for tabs outside any group
const TAB_GROUP_ID_NONE: GroupId = -1;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = query, catch)]
    async fn tabs_query(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = update, catch)]
    async fn tabs_update(tab_id: i32, properties: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = create, catch)]
    async fn tabs_create(properties: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = group, catch)]
    async fn tabs_group(options: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = ungroup, catch)]
    async fn tabs_ungroup(tab_ids: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = sendMessage, catch)]
    async fn tabs_send_message(tab_id: i32, message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabGroups"], js_name = query, catch)]
    async fn tab_groups_query(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabGroups"], js_name = update, catch)]
    async fn tab_groups_update(group_id: i32, properties: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "history"], js_name = search, catch)]
    async fn history_search(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"], js_name = get, catch)]
    async fn storage_local_get(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"], js_name = set, catch)]
    async fn storage_local_set(items: JsValue) -> Result<JsValue, JsValue>;
}

/// Plain JS objects, never `Map`s, so the extension APIs accept them
pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, String> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| format!("Failed to serialize: {:?}", e))
}

pub(crate) fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, String> {
    serde_wasm_bindgen::from_value(value).map_err(|e| format!("Failed to parse: {:?}", e))
}

fn js_message(err: &JsValue) -> String {
    err.dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{:?}", err))
}

fn api_error(err: JsValue) -> HostError {
    HostError::Api(js_message(&err))
}

/// Tabs, groups, history and content messaging of the running browser
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeHost;

impl ChromeHost {
    pub fn new() -> Self {
        ChromeHost
    }
}

#[async_trait::async_trait(?Send)]
impl TabHost for ChromeHost {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabRecord>, HostError> {
        let mut filter = serde_json::Map::new();
        if let Some(active) = query.active {
            filter.insert("active".to_string(), json!(active));
        }
        if let Some(group_id) = query.group_id {
            filter.insert("groupId".to_string(), json!(group_id));
        }

        let tabs_js = tabs_query(to_js(&filter).map_err(HostError::Api)?)
            .await
            .map_err(api_error)?;
        let mut tabs: Vec<TabRecord> = from_js(tabs_js).map_err(HostError::Api)?;
        for tab in tabs.iter_mut() {
            if tab.group_id == Some(TAB_GROUP_ID_NONE) {
                tab.group_id = None;
            }
        }
        Ok(tabs)
    }

    async fn activate_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        let properties = to_js(&json!({ "active": true })).map_err(HostError::Api)?;
        tabs_update(tab_id, properties).await.map_err(api_error)?;
        Ok(())
    }

    async fn open_url(&self, url: &str) -> Result<(), HostError> {
        let properties = to_js(&json!({ "url": url })).map_err(HostError::Api)?;
        tabs_create(properties).await.map_err(api_error)?;
        Ok(())
    }

    async fn group_tabs(&self, tab_ids: &[TabId]) -> Result<GroupId, HostError> {
        let options = to_js(&json!({ "tabIds": tab_ids })).map_err(HostError::Api)?;
        let group_id = tabs_group(options).await.map_err(api_error)?;
        group_id
            .as_f64()
            .map(|id| id as GroupId)
            .ok_or_else(|| HostError::Api("tabs.group returned no group id".to_string()))
    }

    async fn update_group(&self, group_id: GroupId, title: &str, color: GroupColor) -> Result<(), HostError> {
        let properties = to_js(&json!({ "title": title, "color": color })).map_err(HostError::Api)?;
        tab_groups_update(group_id, properties).await.map_err(api_error)?;
        Ok(())
    }

    async fn query_groups(&self) -> Result<Vec<GroupId>, HostError> {
        let groups_js = tab_groups_query(to_js(&json!({})).map_err(HostError::Api)?)
            .await
            .map_err(api_error)?;
        let groups: Vec<Value> = from_js(groups_js).map_err(HostError::Api)?;
        Ok(groups
            .iter()
            .filter_map(|group| group.get("id").and_then(Value::as_i64))
            .map(|id| id as GroupId)
            .collect())
    }

    async fn ungroup_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError> {
        tabs_ungroup(to_js(tab_ids).map_err(HostError::Api)?)
            .await
            .map_err(api_error)?;
        Ok(())
    }
}

#[async_trait::async_trait(?Send)]
impl HistoryHost for ChromeHost {
    async fn search_history(&self, text: &str, max_results: u32) -> Result<Vec<HistoryRecord>, HostError> {
        let query = to_js(&json!({ "text": text, "maxResults": max_results })).map_err(HostError::Api)?;
        let items = history_search(query).await.map_err(api_error)?;
        from_js(items).map_err(HostError::Api)
    }
}

#[async_trait::async_trait(?Send)]
impl ContentHost for ChromeHost {
    async fn send_to_tab(&self, tab_id: TabId, request: &ContentRequest) -> Result<ContentResponse, HostError> {
        let message = to_js(request).map_err(HostError::Api)?;
        match tabs_send_message(tab_id, message).await {
            Ok(response) if response.is_undefined() || response.is_null() => Err(HostError::Unreachable(tab_id)),
            Ok(response) => from_js(response).map_err(HostError::Api),
            Err(e) => {
                log::debug!("No receiving end in tab {}: {}", tab_id, js_message(&e));
                Err(HostError::Unreachable(tab_id))
            }
        }
    }
}

/// chrome.storage.local as a key-value store
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStorage;

impl ChromeStorage {
    pub fn new() -> Self {
        ChromeStorage
    }
}

#[async_trait::async_trait(?Send)]
impl KeyValueStore for ChromeStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let result = storage_local_get(JsValue::from_str(key))
            .await
            .map_err(|e| StorageError::Backend(js_message(&e)))?;
        let mut items: serde_json::Map<String, Value> = from_js(result).map_err(StorageError::Serialization)?;
        Ok(items.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut items = serde_json::Map::new();
        items.insert(key.to_string(), value);
        let items_js = to_js(&items).map_err(StorageError::Serialization)?;
        storage_local_set(items_js)
            .await
            .map_err(|e| StorageError::Backend(js_message(&e)))?;
        Ok(())
    }
}
