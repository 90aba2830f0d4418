//! Dashboard Widgets
//!
//! The unread-topics widget is rendered collapsed; its content is fetched
//! after load and the widget is only revealed when there is something to show.

use js_sys::{Array, Function, Object, Reflect};
use leptos::task::spawn_local;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Element;

use crate::dom;
use crate::error::{AssetError, AssetResult};
use crate::http;
use crate::settings::DashboardSettings;

/// Class that opens a Bootstrap collapse
const SHOW_CLASS: &str = "show";

const TOOLTIP_SELECTOR: &str = r#"[data-bs-tooltip="aa-forum"]"#;

/// Whether a fetched fragment should be shown. Only an empty body counts
/// as nothing to show.
pub fn has_content(fragment: &str) -> bool {
    !fragment.is_empty()
}

/// Element ids to expand, outermost first
pub fn reveal_order(settings: &DashboardSettings) -> [&str; 2] {
    [
        settings.wrapper.element_id.as_str(),
        settings.widget.unread_topics.element_id.as_str(),
    ]
}

/// Constructor from the page's `bootstrap` bundle, if loaded
fn bootstrap_component(name: &str) -> Option<Function> {
    let window = web_sys::window()?;
    let bootstrap = Reflect::get(&window, &JsValue::from_str("bootstrap")).ok()?;
    if bootstrap.is_undefined() || bootstrap.is_null() {
        return None;
    }
    Reflect::get(&bootstrap, &JsValue::from_str(name))
        .ok()?
        .dyn_into::<Function>()
        .ok()
}

/// `new bootstrap.Collapse(el, {show: true})`, or just the `show` class
/// when Bootstrap's JS is not on the page
fn reveal(element: &Element) -> AssetResult<()> {
    match bootstrap_component("Collapse") {
        Some(collapse) => {
            let options = Object::new();
            Reflect::set(&options, &JsValue::from_str("show"), &JsValue::TRUE)?;
            Reflect::construct(&collapse, &Array::of2(element.as_ref(), options.as_ref()))?;
        }
        None => element.class_list().add_1(SHOW_CLASS)?,
    }
    Ok(())
}

fn init_tooltips() -> AssetResult<usize> {
    let Some(tooltip) = bootstrap_component("Tooltip") else {
        log::debug!("[DASHBOARD] bootstrap.Tooltip not loaded");
        return Ok(0);
    };
    let triggers = dom::query_all(TOOLTIP_SELECTOR)?;
    for trigger in &triggers {
        Reflect::construct(&tooltip, &Array::of1(trigger.as_ref()))?;
    }
    Ok(triggers.len())
}

async fn load_unread_topics(settings: DashboardSettings, url: String) -> AssetResult<()> {
    let html = http::get_text(&url).await?;
    if !has_content(&html) {
        log::debug!("[DASHBOARD] No unread topics");
        return Ok(());
    }

    let unread = &settings.widget.unread_topics;
    let widget = dom::by_id(&unread.element_id)?
        .ok_or_else(|| AssetError::MissingElement(unread.element_id.clone()))?;
    let content_selector = format!(".{}", unread.content_element_class);
    let content = widget
        .query_selector(&content_selector)?
        .ok_or(AssetError::MissingElement(content_selector))?;
    content.set_inner_html(&html);

    for id in reveal_order(&settings) {
        match dom::by_id(id)? {
            Some(element) => reveal(&element)?,
            None => log::warn!("[DASHBOARD] #{} not found, cannot reveal", id),
        }
    }

    let tooltips = init_tooltips()?;
    log::debug!("[DASHBOARD] Unread topics shown, {} tooltip(s)", tooltips);
    Ok(())
}

pub fn init_dashboard(settings: &DashboardSettings) -> AssetResult<()> {
    let unread = &settings.widget.unread_topics;
    if dom::by_id(&unread.element_id)?.is_none() {
        return Ok(());
    }
    let Some(url) = unread.url.ajax.clone() else {
        log::warn!("[DASHBOARD] Unread topics widget present but no URL configured");
        return Ok(());
    };
    let settings = settings.clone();
    spawn_local(async move {
        if let Err(e) = load_unread_topics(settings, url).await {
            log::error!("[DASHBOARD] Loading unread topics failed: {}", e);
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_content() {
        assert!(!has_content(""));
        assert!(has_content("\n"));
        assert!(has_content("<ul><li>Topic</li></ul>"));
    }

    #[test]
    fn test_wrapper_revealed_before_widget() {
        let settings = DashboardSettings::default();
        assert_eq!(
            reveal_order(&settings),
            ["aa-forum-dashboard-widgets", "aa-forum-dashboard-widget-unread-topics"]
        );
    }
}
