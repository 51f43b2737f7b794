/// Popup UI for Tab Finder extension

use log::{debug, error, info};
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use crate::aggregator::{Aggregator, EnabledSources, SearchGeneration, SearchOutcome, SearchRequest, SearchResults, Source};
use crate::chrome::{ChromeHost, ChromeStorage};
use crate::config::SearchConfig;
use crate::content::{ContentRequest, ContentResponse};
use crate::filters::{DomainFilter, TimeFilter};
use crate::grouping::{group_tabs_by_domain, ungroup_all};
use crate::host::{ContentHost, TabHost};
use crate::matcher::MatchMode;
use crate::operations::{domain_options, get_recent_tabs};
use crate::storage::{SavedTabsStore, load_preferences, save_preferences};
use crate::tab_data::{SavedTab, SearchPreferences, TabId, TabRecord};
use crate::ui::components::{ResultItem, ResultSection, SnippetList};

#[derive(Clone, PartialEq)]
enum AppState {
    Idle,
    Loading(String),
    Done(String),
    Error(String),
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| AppState::Idle);
    let query = use_state(String::new);
    let use_regex = use_state(|| false);
    let preferences = use_state(SearchPreferences::default);
    let tab_content = use_state(|| false);
    let domain_filter = use_state(|| DomainFilter::All);
    let time_filter = use_state(|| TimeFilter::All);
    let domains = use_state(Vec::<String>::new);
    let recent_tabs = use_state(Vec::<TabRecord>::new);
    let outcome = use_state(|| None::<SearchOutcome>);
    let generation = use_state(SearchGeneration::new);
    // Bumped to re-run the current search after the saved list changes
    let refresh = use_state(|| 0u32);

    // Load preferences, domain options and recent tabs on mount
    {
        let preferences = preferences.clone();
        let domains = domains.clone();
        let recent_tabs = recent_tabs.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                let host = ChromeHost::new();
                let store = ChromeStorage::new();

                match load_preferences(&store).await {
                    Ok(loaded) => preferences.set(loaded),
                    Err(e) => error!("Failed to load search preferences: {}", e),
                }
                match domain_options(&host).await {
                    Ok(options) => domains.set(options),
                    Err(e) => error!("Failed to list domains: {}", e),
                }
                match get_recent_tabs(&host, SearchConfig::default().recent_tabs_limit).await {
                    Ok(tabs) => recent_tabs.set(tabs),
                    Err(e) => error!("Failed to get recent tabs: {}", e),
                }
            });
            || ()
        });
    }

    let request = SearchRequest {
        query: (*query).clone(),
        mode: MatchMode::from_flag(*use_regex),
        domain_filter: (*domain_filter).clone(),
        time_filter: *time_filter,
        sources: EnabledSources::from_preferences(&preferences, *tab_content),
    };

    // Every change of the query or its settings starts a new search
    {
        let outcome = outcome.clone();
        let generation = (*generation).clone();
        use_effect_with((request.clone(), *refresh), move |(request, _)| {
            if request.query.trim().is_empty() {
                // Invalidate whatever is still in flight
                generation.begin();
                outcome.set(None);
            } else {
                let request = request.clone();
                spawn_local(async move {
                    let host = ChromeHost::new();
                    let store = ChromeStorage::new();
                    let aggregator = Aggregator::new(&host, &store).with_generation(generation);
                    aggregator.search(&request, |result| outcome.set(Some(result))).await;
                });
            }
            || ()
        });
    }

    let on_query = {
        let query = query.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            query.set(input.value());
        })
    };

    let on_regex = {
        let use_regex = use_regex.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            use_regex.set(input.checked());
        })
    };

    let on_tab_content = {
        let tab_content = tab_content.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            tab_content.set(input.checked());
        })
    };

    // Source toggles are persisted, except tab content
    let on_source_toggle = {
        let preferences = preferences.clone();
        move |source: Source| {
            let preferences = preferences.clone();
            Callback::from(move |e: Event| {
                let input: HtmlInputElement = e.target_unchecked_into();
                let mut updated = *preferences;
                match source {
                    Source::OpenTabs => updated.open_tabs = input.checked(),
                    Source::History => updated.history = input.checked(),
                    Source::SavedTabs => updated.saved_tabs = input.checked(),
                    Source::TabContent => return,
                }
                preferences.set(updated);
                spawn_local(async move {
                    if let Err(e) = save_preferences(&ChromeStorage::new(), &updated).await {
                        error!("Failed to save search preferences: {}", e);
                    }
                });
            })
        }
    };

    let on_domain = {
        let domain_filter = domain_filter.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            domain_filter.set(DomainFilter::from(select.value()));
        })
    };

    let on_time = {
        let time_filter = time_filter.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            time_filter.set(TimeFilter::from(select.value().as_str()));
        })
    };

    let on_group = {
        let state = state.clone();
        Callback::from(move |_| {
            let state = state.clone();
            state.set(AppState::Loading("Grouping tabs...".to_string()));
            spawn_local(async move {
                match group_tabs_by_domain(&ChromeHost::new()).await {
                    Ok(report) => {
                        info!("Created {} groups, {} failed", report.groups.len(), report.failures.len());
                        state.set(AppState::Done(format!("Grouped tabs into {} groups", report.groups.len())));
                    }
                    Err(e) => state.set(AppState::Error(format!("Grouping failed: {}", e))),
                }
            });
        })
    };

    let on_ungroup = {
        let state = state.clone();
        Callback::from(move |_| {
            let state = state.clone();
            state.set(AppState::Loading("Ungrouping tabs...".to_string()));
            spawn_local(async move {
                match ungroup_all(&ChromeHost::new()).await {
                    Ok(released) => state.set(AppState::Done(format!("Ungrouped {} tabs", released))),
                    Err(e) => state.set(AppState::Error(format!("Ungrouping failed: {}", e))),
                }
            });
        })
    };

    let on_save = {
        let refresh = refresh.clone();
        move |tab: SavedTab| {
            let refresh = refresh.clone();
            Callback::from(move |_: MouseEvent| {
                let tab = tab.clone();
                let refresh = refresh.clone();
                spawn_local(async move {
                    match SavedTabsStore::new(&ChromeStorage::new()).save_tabs(vec![tab]).await {
                        Ok(saved) => {
                            debug!("{} saved tabs", saved.len());
                            refresh.set(*refresh + 1);
                        }
                        Err(e) => error!("Failed to save tab: {}", e),
                    }
                });
            })
        }
    };

    let on_unsave = {
        let refresh = refresh.clone();
        move |url: String| {
            let refresh = refresh.clone();
            Callback::from(move |_: MouseEvent| {
                let url = url.clone();
                let refresh = refresh.clone();
                spawn_local(async move {
                    match SavedTabsStore::new(&ChromeStorage::new()).unsave_tab(&url).await {
                        Ok(_) => refresh.set(*refresh + 1),
                        Err(e) => error!("Failed to unsave tab: {}", e),
                    }
                });
            })
        }
    };

    let is_busy = matches!(*state, AppState::Loading(_));
    let results_view = match &*outcome {
        None => render_recent(&recent_tabs, &on_save),
        Some(SearchOutcome::Results(results)) => render_results(results, &query, &on_save, &on_unsave),
        Some(other) => html! {
            <>
                <p class="empty-message">{other.message().unwrap_or_default()}</p>
                {source_errors(other.errors())}
            </>
        },
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Tab Finder"}</h1>

            <input
                type="text"
                class="search-input"
                placeholder="Search tabs..."
                value={(*query).clone()}
                oninput={on_query}
            />

            <div class="search-options">
                <label>
                    <input type="checkbox" checked={*use_regex} onchange={on_regex} />
                    {"Regex"}
                </label>
                <label>
                    <input type="checkbox" checked={preferences.open_tabs} onchange={on_source_toggle(Source::OpenTabs)} />
                    {"Open tabs"}
                </label>
                <label>
                    <input type="checkbox" checked={preferences.history} onchange={on_source_toggle(Source::History)} />
                    {"History"}
                </label>
                <label>
                    <input type="checkbox" checked={preferences.saved_tabs} onchange={on_source_toggle(Source::SavedTabs)} />
                    {"Saved tabs"}
                </label>
                <label>
                    <input type="checkbox" checked={*tab_content} onchange={on_tab_content} />
                    {"Tab content"}
                </label>
            </div>

            <div class="filters">
                <select onchange={on_domain}>
                    <option value="all" selected={*domain_filter == DomainFilter::All}>{"All domains"}</option>
                    {for domains.iter().map(|domain| html! {
                        <option
                            value={domain.clone()}
                            selected={*domain_filter == DomainFilter::Domain(domain.clone())}
                        >
                            {domain.clone()}
                        </option>
                    })}
                </select>
                <select onchange={on_time}>
                    <option value="all" selected={*time_filter == TimeFilter::All}>{"Any time"}</option>
                    <option value="recent" selected={*time_filter == TimeFilter::Recent}>{"Last 24 hours"}</option>
                    <option value="older" selected={*time_filter == TimeFilter::Older}>{"Older"}</option>
                </select>
            </div>

            <div class="flex-column-gap">
                <Button onclick={on_group} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                    {"Group Tabs by Domain"}
                </Button>
                <Button onclick={on_ungroup} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                    {"Ungroup All Tabs"}
                </Button>
            </div>

            // Status display
            {match &*state {
                AppState::Loading(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg}</p>
                    </div>
                },
                AppState::Done(msg) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Success} title={msg.clone()} inline={true}>
                        </Alert>
                    </div>
                },
                AppState::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                AppState::Idle => html! {}
            }}

            <div class="results">
                {results_view}
            </div>
        </div>
    }
}

fn render_recent(tabs: &[TabRecord], on_save: &impl Fn(SavedTab) -> Callback<MouseEvent>) -> Html {
    html! {
        <ResultSection title="Recent Tabs" count={tabs.len()}>
            {for tabs.iter().map(|tab| open_tab_item(tab, on_save))}
        </ResultSection>
    }
}

fn render_results(
    results: &SearchResults,
    query: &str,
    on_save: &impl Fn(SavedTab) -> Callback<MouseEvent>,
    on_unsave: &impl Fn(String) -> Callback<MouseEvent>,
) -> Html {
    html! {
        <>
            {for results.sections().into_iter().map(|source| {
                let items = match source {
                    Source::OpenTabs => html! {
                        {for results.tabs.iter().map(|tab| open_tab_item(tab, on_save))}
                    },
                    Source::History => html! {
                        {for results.history.iter().map(|entry| html! {
                            <ResultItem
                                title={entry.display_title().to_string()}
                                url={entry.url.clone()}
                                onclick={open_url_callback(entry.url.clone())}
                            />
                        })}
                    },
                    Source::SavedTabs => html! {
                        {for results.saved_tabs.iter().map(|saved| html! {
                            <ResultItem
                                title={saved.title.clone()}
                                url={saved.url.clone()}
                                fav_icon_url={saved.fav_icon_url.clone().map(AttrValue::from)}
                                onclick={open_url_callback(saved.url.clone())}
                                action={Some((AttrValue::from("Unsave"), on_unsave(saved.url.clone())))}
                            />
                        })}
                    },
                    Source::TabContent => html! {
                        {for results.tab_content.iter().map(|result| html! {
                            <li class="tab-item" onclick={activate_callback(result.tab_id)}>
                                <span class="tab-title">{result.title.clone()}</span>
                                <SnippetList
                                    snippets={result.matches.iter().map(|m| m.snippet.clone()).collect::<Vec<_>>()}
                                    on_select={scroll_callback(result.tab_id, query.to_string())}
                                />
                            </li>
                        })}
                    },
                };
                html! {
                    <ResultSection
                        title={source.label()}
                        count={results.len_of(source)}
                        error={results.error_for(source).map(str::to_string)}
                    >
                        {items}
                    </ResultSection>
                }
            })}
            {source_errors(results.errors.iter().filter(|(source, _)| results.len_of(*source) == 0))}
        </>
    }
}

/// One warning per failed source that has no section of its own
fn source_errors<'a>(errors: impl IntoIterator<Item = &'a (Source, String)>) -> Html {
    html! {
        {for errors.into_iter().map(|(source, message)| html! {
            <Alert r#type={AlertType::Warning} title={format!("{}: {}", source.label(), message)} inline={true}>
            </Alert>
        })}
    }
}

fn open_tab_item(tab: &TabRecord, on_save: &impl Fn(SavedTab) -> Callback<MouseEvent>) -> Html {
    html! {
        <ResultItem
            title={tab.title.clone()}
            url={tab.url.clone()}
            fav_icon_url={tab.fav_icon_url.clone().map(AttrValue::from)}
            onclick={activate_callback(tab.id)}
            action={Some((AttrValue::from("Save"), on_save(SavedTab::from(tab))))}
        />
    }
}

fn activate_callback(tab_id: TabId) -> Callback<MouseEvent> {
    Callback::from(move |_| {
        spawn_local(async move {
            if let Err(e) = ChromeHost::new().activate_tab(tab_id).await {
                error!("Failed to activate tab {}: {}", tab_id, e);
            }
        });
    })
}

fn open_url_callback(url: String) -> Callback<MouseEvent> {
    Callback::from(move |_| {
        let url = url.clone();
        spawn_local(async move {
            if let Err(e) = ChromeHost::new().open_url(&url).await {
                error!("Failed to open {}: {}", url, e);
            }
        });
    })
}

/// Scroll the tab to the chosen occurrence of the query
fn scroll_callback(tab_id: TabId, query: String) -> Callback<usize> {
    Callback::from(move |match_number: usize| {
        let request = ContentRequest::ScrollToMatch {
            query: query.clone(),
            match_number,
        };
        spawn_local(async move {
            match ChromeHost::new().send_to_tab(tab_id, &request).await {
                Ok(ContentResponse::Scroll { scrolled: true, .. }) => debug!("Scrolled to match {}", match_number),
                Ok(_) => error!("Failed to scroll to match {} in tab {}", match_number, tab_id),
                Err(e) => error!("Failed to scroll tab {}: {}", tab_id, e),
            }
        });
    })
}
