/// Reusable UI components

use patternfly_yew::prelude::*;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct ResultSectionProps {
    pub title: AttrValue,
    pub count: usize,
    #[prop_or_default]
    pub error: Option<String>,
    #[prop_or_default]
    pub children: Children,
}

/// Heading plus items of one result source
#[function_component(ResultSection)]
pub fn result_section(props: &ResultSectionProps) -> Html {
    html! {
        <div class="result-section">
            <h2 class="section-title">{format!("{} ({})", props.title, props.count)}</h2>
            if let Some(error) = &props.error {
                <Alert r#type={AlertType::Warning} title={error.clone()} inline={true}>
                </Alert>
            }
            <ul class="result-list">
                {props.children.clone()}
            </ul>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct ResultItemProps {
    pub title: AttrValue,
    pub url: AttrValue,
    #[prop_or_default]
    pub fav_icon_url: Option<AttrValue>,
    pub onclick: Callback<MouseEvent>,
    /// Optional trailing button, e.g. "Save" or "Unsave"
    #[prop_or_default]
    pub action: Option<(AttrValue, Callback<MouseEvent>)>,
}

#[function_component(ResultItem)]
pub fn result_item(props: &ResultItemProps) -> Html {
    let action = props.action.clone().map(|(label, callback)| {
        let onclick = Callback::from(move |e: MouseEvent| {
            e.stop_propagation();
            callback.emit(e);
        });
        html! {
            <Button onclick={onclick} variant={ButtonVariant::Link}>{label}</Button>
        }
    });

    html! {
        <li class="tab-item" onclick={props.onclick.clone()} title={props.url.clone()}>
            if let Some(icon) = &props.fav_icon_url {
                <img class="tab-favicon" src={icon.clone()} />
            }
            <span class="tab-title">{props.title.clone()}</span>
            {for action}
        </li>
    }
}

#[derive(Properties, PartialEq)]
pub struct SnippetListProps {
    pub snippets: Vec<String>,
    /// Receives the 0-based occurrence number
    pub on_select: Callback<usize>,
}

#[function_component(SnippetList)]
pub fn snippet_list(props: &SnippetListProps) -> Html {
    html! {
        <ul class="snippet-list">
            {for props.snippets.iter().enumerate().map(|(occurrence, snippet)| {
                let on_select = props.on_select.clone();
                let onclick = Callback::from(move |e: MouseEvent| {
                    e.stop_propagation();
                    on_select.emit(occurrence);
                });
                html! {
                    <li class="snippet-item" onclick={onclick}>{snippet.clone()}</li>
                }
            })}
        </ul>
    }
}
