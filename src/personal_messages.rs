//! Personal Messages
//!
//! "Read" buttons load a message body into its card; reading from the
//! inbox refreshes the unread badge.

use leptos::task::spawn_local;
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::Element;

use leptos_sortable::CSRF_FIELD;

use crate::dom;
use crate::error::{AssetError, AssetResult};
use crate::http;
use crate::settings::Settings;

const READ_BUTTON: &str = "button.btn-read-personal-message";
const BADGE: &str = ".aa-forum-badge-personal-messages-unread-count";
const UNREAD_ITEM_CLASS: &str = "panel-aa-forum-personal-messages-item-unread";
const INBOX: &str = "inbox";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UnreadMessagesCount {
    pub unread_messages_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeUpdate {
    Remove,
    SetText(String),
    Keep,
}

pub fn badge_update(count: &UnreadMessagesCount) -> BadgeUpdate {
    match count.unread_messages_count {
        0 => BadgeUpdate::Remove,
        n if n > 0 => BadgeUpdate::SetText(n.to_string()),
        _ => BadgeUpdate::Keep,
    }
}

/// Data attributes of a read button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadMessage {
    pub sender: String,
    pub recipient: String,
    pub message: String,
    pub folder: String,
}

impl ReadMessage {
    pub fn from_button(button: &Element) -> Option<Self> {
        let attr = |name: &str| button.get_attribute(name);
        Some(Self {
            sender: attr("data-sender")?,
            recipient: attr("data-recipient")?,
            message: attr("data-message")?,
            folder: attr("data-message-folder").unwrap_or_default(),
        })
    }

    pub fn form_fields(&self, csrf_token: &str) -> Vec<(String, String)> {
        vec![
            (CSRF_FIELD.to_string(), csrf_token.to_string()),
            ("sender".to_string(), self.sender.clone()),
            ("recipient".to_string(), self.recipient.clone()),
            ("message".to_string(), self.message.clone()),
        ]
    }

    pub fn is_inbox(&self) -> bool {
        self.folder == INBOX
    }

    fn card_selector(&self, inner: &str) -> String {
        format!("#aa-forum-personal-message-id-{} {}", self.message, inner)
    }
}

fn apply_badge(update: &BadgeUpdate) -> AssetResult<()> {
    for badge in dom::query_all(BADGE)? {
        match update {
            BadgeUpdate::Remove => badge.remove(),
            BadgeUpdate::SetText(text) => badge.set_inner_html(text),
            BadgeUpdate::Keep => {}
        }
    }
    Ok(())
}

async fn refresh_unread_count(url: &str) -> AssetResult<()> {
    let count: UnreadMessagesCount = http::get_json(url).await?;
    log::debug!("[PM] Unread count now {}", count.unread_messages_count);
    apply_badge(&badge_update(&count))
}

async fn read_message(read: ReadMessage, urls: MessageUrls, csrf_token: String) -> AssetResult<()> {
    let html = http::post_form(&urls.read_message, &read.form_fields(&csrf_token)).await?;
    if html.is_empty() {
        return Ok(());
    }

    let selector = read.card_selector(".card-aa-forum-personal-messages-message");
    let container = dom::query_one(&selector)?.ok_or(AssetError::MissingElement(selector))?;
    container.set_inner_html(&html);
    container.class_list().remove_1("d-none")?;

    if read.is_inbox() {
        if let Some(item) = dom::query_one(&read.card_selector(".card-aa-forum-personal-messages-item"))? {
            item.class_list().remove_1(UNREAD_ITEM_CLASS)?;
        }
        if let Some(url) = &urls.unread_messages_count {
            refresh_unread_count(url).await?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct MessageUrls {
    read_message: String,
    unread_messages_count: Option<String>,
}

pub fn init_personal_messages(settings: &Settings) -> AssetResult<()> {
    let Some(read_url) = settings.url.read_message.clone() else {
        return Ok(());
    };
    let urls = MessageUrls {
        read_message: read_url,
        unread_messages_count: settings.url.unread_messages_count.clone(),
    };

    let buttons = dom::query_all(READ_BUTTON)?;
    for button in &buttons {
        let urls = urls.clone();
        let csrf_token = settings.form.csrf_token.clone();
        dom::on(button, "click", move |ev| {
            let Some(button) = ev.current_target().and_then(|t| t.dyn_into::<Element>().ok()) else {
                return;
            };
            let Some(read) = ReadMessage::from_button(&button) else {
                log::warn!("[PM] Read button without message data");
                return;
            };
            let urls = urls.clone();
            let csrf_token = csrf_token.clone();
            spawn_local(async move {
                if let Err(e) = read_message(read, urls, csrf_token).await {
                    log::error!("[PM] Reading message failed: {}", e);
                }
            });
        })?;
    }
    log::debug!("[PM] {} read button(s) bound", buttons.len());
    Ok(())
}
