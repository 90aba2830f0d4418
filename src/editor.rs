//! Rich-Text Editor Reset
//!
//! A form reset restores textareas but not the CKEditor instance sitting on
//! top of them, so on `reset` the editor is handed the original content.

use js_sys::{Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlTextAreaElement};

use crate::dom;
use crate::error::{AssetError, AssetResult};

pub trait RichTextEditor {
    fn set_data(&self, content: &str) -> AssetResult<()>;
}

/// `ckeditorInstance` attached to an editable element
pub struct JsEditor(JsValue);

impl JsEditor {
    pub fn from_editable(editable: &Element) -> AssetResult<Self> {
        let instance = Reflect::get(editable, &JsValue::from_str("ckeditorInstance"))?;
        if instance.is_undefined() || instance.is_null() {
            return Err(AssetError::MissingElement("ckeditorInstance".to_string()));
        }
        Ok(Self(instance))
    }
}

impl RichTextEditor for JsEditor {
    fn set_data(&self, content: &str) -> AssetResult<()> {
        let set_data: Function = Reflect::get(&self.0, &JsValue::from_str("setData"))?.dyn_into()?;
        set_data.call1(&self.0, &JsValue::from_str(content))?;
        Ok(())
    }
}

/// Push the form's original content back into the editor
pub fn reset_editor<E: RichTextEditor>(editor: &E, original: Option<&str>) -> AssetResult<()> {
    editor.set_data(original.unwrap_or(""))
}

/// Server-rendered content of the form's textarea
fn original_content(form: &Element) -> Option<String> {
    let textarea = form.query_selector("textarea").ok()??;
    textarea
        .dyn_into::<HtmlTextAreaElement>()
        .ok()
        .and_then(|t| t.default_value().ok())
}

fn handle_reset(form: &Element) -> AssetResult<()> {
    let id = form.id();
    if id.is_empty() {
        return Ok(());
    }
    let selector = format!("#{} .ck-editor__editable", id);
    let Some(editable) = dom::query_one(&selector)? else {
        return Ok(());
    };
    let editor = JsEditor::from_editable(&editable)?;
    reset_editor(&editor, original_content(form).as_deref())
}

pub fn init_editor_reset() -> AssetResult<()> {
    for form in dom::query_all("form")? {
        let target = form.clone();
        dom::on(&form, "reset", move |_ev| {
            if let Err(e) = handle_reset(&target) {
                log::warn!("[EDITOR] Reset of #{} failed: {}", target.id(), e);
            }
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeEditor {
        data: RefCell<Option<String>>,
    }

    impl RichTextEditor for FakeEditor {
        fn set_data(&self, content: &str) -> AssetResult<()> {
            *self.data.borrow_mut() = Some(content.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_reset_restores_original() {
        let editor = FakeEditor::default();
        reset_editor(&editor, Some("<p>Original post</p>")).unwrap();
        assert_eq!(editor.data.borrow().as_deref(), Some("<p>Original post</p>"));
    }

    #[test]
    fn test_reset_new_form_clears() {
        let editor = FakeEditor::default();
        *editor.data.borrow_mut() = Some("typed".to_string());
        reset_editor(&editor, None).unwrap();
        assert_eq!(editor.data.borrow().as_deref(), Some(""));
    }
}
