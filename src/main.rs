//! Forum Assets Frontend Entry Point
//!
//! Progressive enhancement for the server-rendered forum pages. Settings are
//! built once, then passed to each widget.

mod admin;
mod dashboard;
mod dom;
mod editor;
mod error;
mod http;
mod oembed;
mod personal_messages;
mod settings;

use leptos::prelude::*;
use log::LevelFilter;
use wasm_bindgen::prelude::wasm_bindgen;

use crate::error::AssetResult;
use crate::settings::Settings;

/// Lines kept by the console logger for diagnostics
const LOG_CAPACITY: usize = 200;

/// Recent log lines for bug reports; call `aaForumRecentLog()` from devtools
#[wasm_bindgen(js_name = aaForumRecentLog)]
pub fn recent_log() -> String {
    console_logger::dump_recent()
}

fn report(widget: &str, result: AssetResult<()>) {
    if let Err(e) = result {
        log::error!("[BOOT] {} disabled: {}", widget, e);
    }
}

fn boot() {
    let settings = Settings::load().unwrap_or_else(|e| {
        log::error!("[BOOT] Invalid page settings, using defaults: {}", e);
        Settings::default()
    });

    admin::init_admin(&settings);
    report("Personal messages", personal_messages::init_personal_messages(&settings));
    report(
        "oEmbed rewriter",
        oembed::replace_oembeds().map(|n| log::debug!("[BOOT] Replaced {} oEmbed video(s)", n)),
    );
    report("Editor reset", editor::init_editor_reset());
    report("Dashboard widgets", dashboard::init_dashboard(&settings.dashboard));
}

fn main() {
    console_error_panic_hook::set_once();
    // No mount_to_body here, so spawn_local needs an explicit executor
    if let Err(e) = any_spawner::Executor::init_wasm_bindgen() {
        web_sys::console::warn_1(&format!("[BOOT] Executor already set: {:?}", e).into());
    }

    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = console_logger::init_logger(level, LOG_CAPACITY) {
        web_sys::console::warn_1(&format!("[BOOT] Logger already set: {}", e).into());
    }

    // Signals and spawned tasks hang off this owner for the page's lifetime
    let owner = Owner::new();
    owner.with(boot);
    std::mem::forget(owner);
}
