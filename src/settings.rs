//! Page Settings
//!
//! The server renders `aaForumJsSettingsDefaults` and optionally
//! `aaForumJsSettingsOverride` (plus `aaForumDashboardWidgetsOverride`) into
//! the page. They are deep-merged once at start-up into [`Settings`], which
//! is then handed to every widget by reference.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use wasm_bindgen::JsValue;

use leptos_sortable::RetryPolicy;

use crate::error::{AssetError, AssetResult};

/// Keys never copied from a source: they would reach the JS prototype chain
/// once the settings travel back into script land.
pub const POLLUTION_GUARD_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

pub const DEFAULTS_GLOBAL: &str = "aaForumJsSettingsDefaults";
pub const OVERRIDE_GLOBAL: &str = "aaForumJsSettingsOverride";
pub const DASHBOARD_OVERRIDE_GLOBAL: &str = "aaForumDashboardWidgetsOverride";

fn is_guarded_key(key: &str) -> bool {
    POLLUTION_GUARD_KEYS.contains(&key)
}

/// Recursively merge `sources` into `target`, in order.
///
/// Mappings merge key by key; anything else (scalars, arrays, null) replaces
/// the target value wholesale. Guard keys are skipped at every depth.
pub fn deep_merge<'a>(
    target: &'a mut Map<String, Value>,
    sources: &[&Map<String, Value>],
) -> &'a mut Map<String, Value> {
    for source in sources {
        merge_into(target, source);
    }
    target
}

fn merge_into(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        if is_guarded_key(key) {
            continue;
        }
        match value {
            Value::Object(nested) => {
                let slot = target
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(inner) = slot {
                    merge_into(inner, nested);
                }
            }
            other => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UrlSettings {
    pub category_order: Option<String>,
    pub board_order: Option<String>,
    pub read_message: Option<String>,
    pub unread_messages_count: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormSettings {
    pub csrf_token: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReorderSettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub rollback_on_failure: bool,
    /// Let boards be dragged between categories
    pub connect_board_lists: bool,
}

impl Default for ReorderSettings {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: 500,
            max_delay_ms: 8000,
            rollback_on_failure: false,
            connect_board_lists: false,
        }
    }
}

impl ReorderSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetUrlSettings {
    /// Endpoint returning the widget's HTML fragment
    pub ajax: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnreadTopicsSettings {
    pub element_id: String,
    pub content_element_class: String,
    pub url: WidgetUrlSettings,
}

impl Default for UnreadTopicsSettings {
    fn default() -> Self {
        Self {
            element_id: "aa-forum-dashboard-widget-unread-topics".to_string(),
            content_element_class: "aa-forum-dashboard-widget-unread-topics-content".to_string(),
            url: WidgetUrlSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardWidgets {
    pub unread_topics: UnreadTopicsSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardWrapperSettings {
    pub element_id: String,
}

impl Default for DashboardWrapperSettings {
    fn default() -> Self {
        Self {
            element_id: "aa-forum-dashboard-widgets".to_string(),
        }
    }
}

/// Same layout as `aaForumDashboardWidgetsOverride`; elements are named by id
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSettings {
    pub wrapper: DashboardWrapperSettings,
    pub widget: DashboardWidgets,
}

/// Typed, read-only view of the merged page configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub url: UrlSettings,
    pub form: FormSettings,
    /// One board-list selector per category
    pub categories_with_boards: Vec<String>,
    /// One child-board-list selector per board
    pub boards_with_children: Vec<String>,
    pub reorder: ReorderSettings,
    pub dashboard: DashboardSettings,
}

impl Settings {
    /// Merge the page layers (each optional) and decode.
    /// The dashboard override lands under the `dashboard` key.
    pub fn from_layers(
        defaults: Option<Value>,
        page_override: Option<Value>,
        dashboard_override: Option<Value>,
    ) -> AssetResult<Self> {
        let dashboard = dashboard_override.map(|value| {
            let mut wrapped = Map::new();
            wrapped.insert("dashboard".to_string(), value);
            Value::Object(wrapped)
        });

        let layers: Vec<&Map<String, Value>> = [defaults.as_ref(), page_override.as_ref(), dashboard.as_ref()]
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .collect();

        let mut merged = Map::new();
        deep_merge(&mut merged, &layers);
        serde_json::from_value(Value::Object(merged)).map_err(AssetError::from)
    }

    /// Read the page globals and build settings
    pub fn load() -> AssetResult<Self> {
        let defaults = read_global(DEFAULTS_GLOBAL);
        if defaults.is_none() {
            log::info!("[SETTINGS] {} not present, page widgets stay inactive", DEFAULTS_GLOBAL);
        }
        Self::from_layers(
            defaults,
            read_global(OVERRIDE_GLOBAL),
            read_global(DASHBOARD_OVERRIDE_GLOBAL),
        )
    }
}

/// Plain ASCII identifier, safe to splice into a lookup function
fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Script-scope `const`/`let` bindings are not window properties, so the
/// lookup goes through a function body instead of `Reflect::get`.
fn read_global(name: &str) -> Option<Value> {
    if !is_js_identifier(name) {
        return None;
    }
    let lookup = js_sys::Function::new_no_args(&format!(
        "return typeof {0} !== 'undefined' ? {0} : undefined;",
        name
    ));
    let raw = match lookup.call0(&JsValue::NULL) {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!("[SETTINGS] Reading {} failed: {}", name, AssetError::from(e));
            return None;
        }
    };
    if raw.is_undefined() || raw.is_null() {
        return None;
    }
    match serde_wasm_bindgen::from_value::<Value>(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("[SETTINGS] {} is not plain data: {}", name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_no_sources_is_noop() {
        let mut target = obj(json!({"a": 1}));
        deep_merge(&mut target, &[]);
        assert_eq!(Value::Object(target), json!({"a": 1}));
    }

    #[test]
    fn test_merge_into_empty_equals_defaults() {
        let defaults = obj(json!({
            "url": {"boardOrder": "/b/", "categoryOrder": "/c/"},
            "categoriesWithBoards": ["#cat-1 ul", "#cat-2 ul"],
            "form": {"csrfToken": "t"},
            "flag": true,
            "nothing": null
        }));
        let mut target = Map::new();
        deep_merge(&mut target, &[&defaults]);
        assert_eq!(target, defaults);
    }

    #[test]
    fn test_nested_merge_is_additive() {
        let mut target = Map::new();
        let first = obj(json!({"a": {"b": 1}}));
        let second = obj(json!({"a": {"c": 2}}));
        deep_merge(&mut target, &[&first, &second]);
        assert_eq!(Value::Object(target), json!({"a": {"b": 1, "c": 2}}));
    }

    #[test]
    fn test_later_source_wins_on_scalars() {
        let mut target = Map::new();
        let first = obj(json!({"x": 1, "y": {"z": "old"}}));
        let second = obj(json!({"x": 2, "y": {"z": "new"}}));
        deep_merge(&mut target, &[&first, &second]);
        assert_eq!(Value::Object(target), json!({"x": 2, "y": {"z": "new"}}));
    }

    #[test]
    fn test_arrays_are_replaced() {
        let mut target = obj(json!({"list": [1, 2, 3]}));
        let source = obj(json!({"list": [3, 4]}));
        deep_merge(&mut target, &[&source]);
        assert_eq!(target["list"], json!([3, 4]));
    }

    #[test]
    fn test_mapping_replaces_scalar_slot() {
        let mut target = obj(json!({"a": 5}));
        let source = obj(json!({"a": {"b": 1}}));
        deep_merge(&mut target, &[&source]);
        assert_eq!(target["a"], json!({"b": 1}));
    }

    #[test]
    fn test_guard_keys_never_copied() {
        let defaults = obj(json!({"a": 1}));
        let hostile = obj(json!({
            "__proto__": {"polluted": true},
            "constructor": {"prototype": {"polluted": true}},
            "prototype": "x",
            "nested": {"__proto__": 1, "ok": 2}
        }));
        let mut target = Map::new();
        deep_merge(&mut target, &[&defaults, &hostile]);

        for key in POLLUTION_GUARD_KEYS {
            assert!(!target.contains_key(key), "{} leaked", key);
        }
        assert_eq!(target["nested"], json!({"ok": 2}));
    }

    #[test]
    fn test_guard_keys_in_target_are_not_overwritten() {
        let mut target = obj(json!({"constructor": "keep"}));
        let source = obj(json!({"constructor": "replace"}));
        deep_merge(&mut target, &[&source]);
        assert_eq!(target["constructor"], "keep");
    }

    #[test]
    fn test_settings_from_layers() {
        let defaults = json!({
            "url": {"categoryOrder": "/cat/", "boardOrder": "/board/"},
            "form": {"csrfToken": "abc"},
            "categoriesWithBoards": ["#category-1 .boards-sortable"]
        });
        let page_override = json!({
            "reorder": {"maxRetries": 0},
            "url": {"readMessage": "/pm/read/"}
        });
        let dashboard = json!({"widget": {"unreadTopics": {"url": {"ajax": "/widgets/unread/"}}}});

        let settings = Settings::from_layers(Some(defaults), Some(page_override), Some(dashboard)).unwrap();

        assert_eq!(settings.url.category_order.as_deref(), Some("/cat/"));
        assert_eq!(settings.url.read_message.as_deref(), Some("/pm/read/"));
        assert_eq!(settings.form.csrf_token, "abc");
        assert_eq!(settings.categories_with_boards, vec!["#category-1 .boards-sortable"]);
        assert_eq!(settings.reorder.max_retries, 0);
        assert!(!settings.reorder.rollback_on_failure);
        assert_eq!(
            settings.dashboard.widget.unread_topics.url.ajax.as_deref(),
            Some("/widgets/unread/")
        );
        assert_eq!(settings.dashboard.wrapper.element_id, "aa-forum-dashboard-widgets");
    }

    #[test]
    fn test_settings_without_layers_are_default() {
        let settings = Settings::from_layers(None, None, None).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.url.category_order.is_none());
    }

    #[test]
    fn test_settings_type_mismatch_is_decode_error() {
        let err = Settings::from_layers(Some(json!({"categoriesWithBoards": 3})), None, None).unwrap_err();
        assert!(matches!(err, AssetError::Decode(_)));
    }

    #[test]
    fn test_dashboard_override_as_rendered_by_server() {
        let dashboard = json!({
            "widget": {"unreadTopics": {"url": {"ajax": "/forum/widgets/unread/"}}}
        });
        let settings = Settings::from_layers(Some(json!({})), None, Some(dashboard)).unwrap();

        let unread = &settings.dashboard.widget.unread_topics;
        assert_eq!(unread.url.ajax.as_deref(), Some("/forum/widgets/unread/"));
        assert_eq!(unread.element_id, "aa-forum-dashboard-widget-unread-topics");
        assert_eq!(unread.content_element_class, "aa-forum-dashboard-widget-unread-topics-content");
    }

    #[test]
    fn test_reorder_defaults_save_once_and_keep_order() {
        let reorder = ReorderSettings::default();
        assert!(!reorder.rollback_on_failure);
        assert!(!reorder.connect_board_lists);

        let policy = reorder.retry_policy();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(8));
    }

    #[test]
    fn test_retry_and_rollback_opt_in() {
        let page_override = json!({
            "reorder": {"maxRetries": 2, "rollbackOnFailure": true, "maxDelayMs": 4000}
        });
        let settings = Settings::from_layers(None, Some(page_override), None).unwrap();

        assert!(settings.reorder.rollback_on_failure);
        let policy = settings.reorder.retry_policy();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.max_delay, Duration::from_secs(4));
    }

    #[test]
    fn test_js_identifier() {
        assert!(is_js_identifier("aaForumJsSettingsDefaults"));
        assert!(is_js_identifier("$x_1"));
        assert!(!is_js_identifier("a;alert(1)"));
        assert!(!is_js_identifier("1abc"));
        assert!(!is_js_identifier(""));
    }
}
