/// Tab Finder - Chrome Extension for searching tabs, history, saved tabs and page text
/// Built with Rust + WASM + Yew

pub mod aggregator;
pub mod chrome;
pub mod config;
pub mod content;
pub mod domain;
pub mod error;
pub mod filters;
pub mod grouping;
pub mod host;
pub mod matcher;
pub mod messages;
pub mod operations;
pub mod page;
pub mod sources;
pub mod storage;
pub mod tab_data;
pub mod ui;

#[cfg(test)]
mod testing;

use std::cell::RefCell;

use log::{error, info};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::chrome::{ChromeHost, ChromeStorage, from_js, to_js};
use crate::config::SearchConfig;
use crate::content::{ContentRequest, ContentResponse, ContentSession};
use crate::messages::Background;
use crate::storage::SavedTabsStore;

thread_local! {
    static CONTENT_SESSION: RefCell<ContentSession> =
        RefCell::new(ContentSession::new(SearchConfig::default().snippet_radius));
}

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export core domain functions for JavaScript access
#[wasm_bindgen]
pub fn normalize_domain(url: &str) -> String {
    domain::normalize_domain(url)
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

/// Create the empty saved-tabs list on first install
#[wasm_bindgen]
pub fn initialize_storage() -> js_sys::Promise {
    future_to_promise(async move {
        let store = ChromeStorage::new();
        SavedTabsStore::new(&store)
            .ensure_initialized()
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        info!("Saved tabs storage ready");
        Ok(JsValue::UNDEFINED)
    })
}

/// Answer one message sent to the background; resolves to the JSON response
#[wasm_bindgen]
pub fn handle_background_message(message: JsValue) -> js_sys::Promise {
    future_to_promise(async move {
        let raw: serde_json::Value = from_js(message).map_err(|e| JsValue::from_str(&e))?;
        let host = ChromeHost::new();
        let store = ChromeStorage::new();

        let response = Background::new(&host, &store).handle_json(raw).await;
        to_js(&response).map_err(|e| JsValue::from_str(&e))
    })
}

/// Answer one content request for the page this script runs in
#[wasm_bindgen]
pub fn handle_content_message(message: JsValue) -> JsValue {
    let response = match from_js::<ContentRequest>(message) {
        Ok(request) => {
            let (page_url, text) = page_snapshot();
            CONTENT_SESSION.with(|session| {
                session
                    .borrow_mut()
                    .handle(&page_url, &text, &request, &page::highlight_match)
            })
        }
        Err(e) => {
            error!("Unrecognized content request: {}", e);
            ContentResponse::error(e)
        }
    };

    to_js(&response).unwrap_or(JsValue::NULL)
}

/// Current page URL and the text of its body's text nodes
fn page_snapshot() -> (String, String) {
    let Some(window) = web_sys::window() else {
        return (String::new(), String::new());
    };
    let page_url = window.location().href().unwrap_or_default();
    let text = window
        .document()
        .and_then(|document| document.body())
        .and_then(|body| body.text_content())
        .unwrap_or_default();

    (page_url, text)
}
