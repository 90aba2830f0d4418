//! DOM lookups shared by the widgets

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event};

use crate::error::{AssetError, AssetResult};

pub fn document() -> AssetResult<Document> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| AssetError::MissingElement("document".to_string()))
}

pub fn query_all(selector: &str) -> AssetResult<Vec<Element>> {
    let list = document()?.query_selector_all(selector)?;
    Ok(leptos_sortable::dom::elements(list))
}

pub fn query_one(selector: &str) -> AssetResult<Option<Element>> {
    Ok(document()?.query_selector(selector)?)
}

pub fn by_id(id: &str) -> AssetResult<Option<Element>> {
    Ok(document()?.get_element_by_id(id))
}

/// Attach a listener that lives for the rest of the page
pub fn on<F>(target: &Element, event: &str, handler: F) -> AssetResult<()>
where
    F: FnMut(Event) + 'static,
{
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}
