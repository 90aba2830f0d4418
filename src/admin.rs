//! Forum Administration Sortables
//!
//! Categories, boards per category and child boards per board, each a
//! sortable list saving its order to the admin AJAX endpoints.

use leptos_sortable::{
    attach_all, ItemId, ParentRef, PayloadShape, SortableOptions, TimerSleeper,
};

use crate::http::FetchTransport;
use crate::settings::Settings;

pub const CATEGORIES_CONTAINER: &str = ".categories-sortable";
pub const PLACEHOLDER_CLASS: &str = "aa-forum-ui-placeholder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Categories,
    Boards,
    ChildBoards,
}

impl ListKind {
    /// Form field the endpoint reads the JSON array from
    pub fn field_name(self) -> &'static str {
        match self {
            ListKind::Categories => "categories",
            ListKind::Boards | ListKind::ChildBoards => "boards",
        }
    }

    pub fn id_key(self) -> &'static str {
        match self {
            ListKind::Categories => "catId",
            ListKind::Boards | ListKind::ChildBoards => "boardId",
        }
    }

    pub fn position_key(self) -> &'static str {
        match self {
            ListKind::Categories => "catOrder",
            ListKind::Boards | ListKind::ChildBoards => "boardOrder",
        }
    }

    pub fn item_selector(self) -> &'static str {
        match self {
            ListKind::Categories => ".category-sortable",
            ListKind::Boards => "li.board-sortable",
            ListKind::ChildBoards => "li.child-board-sortable",
        }
    }

    pub fn id_attribute(self) -> &'static str {
        match self {
            ListKind::Categories => "data-category-id",
            ListKind::Boards | ListKind::ChildBoards => "data-board-id",
        }
    }

    pub fn endpoint(self, settings: &Settings) -> Option<&str> {
        match self {
            ListKind::Categories => settings.url.category_order.as_deref(),
            ListKind::Boards | ListKind::ChildBoards => settings.url.board_order.as_deref(),
        }
    }

    pub fn shape(self) -> PayloadShape {
        PayloadShape::new(self.field_name(), self.id_key(), self.position_key())
    }
}

/// Options for one list, or `None` when its endpoint is not configured
pub fn sortable_options(
    kind: ListKind,
    group_selector: Option<String>,
    settings: &Settings,
) -> Option<SortableOptions> {
    let endpoint = kind.endpoint(settings)?;
    Some(SortableOptions {
        item_selector: kind.item_selector().to_string(),
        group_selector,
        endpoint_url: endpoint.to_string(),
        csrf_token: settings.form.csrf_token.clone(),
        id_attribute: kind.id_attribute().to_string(),
        placeholder_class: PLACEHOLDER_CLASS.to_string(),
        shape: kind.shape(),
        retry: settings.reorder.retry_policy(),
        rollback_on_failure: settings.reorder.rollback_on_failure,
    })
}

/// Board lists connect with themselves, or with every category's list
/// when cross-category moves are enabled.
fn board_group(selector: &str, settings: &Settings) -> String {
    if settings.reorder.connect_board_lists && !settings.categories_with_boards.is_empty() {
        settings.categories_with_boards.join(", ")
    } else {
        selector.to_string()
    }
}

/// Category owning a board list, read from the container's `data-category-id`
fn board_parent(selector: &str) -> Option<ParentRef> {
    let container = crate::dom::query_one(selector).ok()??;
    let raw = container.get_attribute("data-category-id")?;
    Some(ParentRef {
        key: "categoryId".to_string(),
        id: ItemId::parse_attr(&raw),
    })
}

pub fn init_admin(settings: &Settings) {
    let mut bound = 0;

    if let Some(options) = sortable_options(ListKind::Categories, None, settings) {
        bound += attach_all(CATEGORIES_CONTAINER, &options, FetchTransport, TimerSleeper);
    }

    for selector in &settings.categories_with_boards {
        let group = board_group(selector, settings);
        if let Some(mut options) = sortable_options(ListKind::Boards, Some(group), settings) {
            if settings.reorder.connect_board_lists {
                options.shape.parent = board_parent(selector);
            }
            bound += attach_all(selector, &options, FetchTransport, TimerSleeper);
        }
    }

    for selector in &settings.boards_with_children {
        if let Some(options) = sortable_options(ListKind::ChildBoards, Some(selector.clone()), settings) {
            bound += attach_all(selector, &options, FetchTransport, TimerSleeper);
        }
    }

    log::info!("[ADMIN] {} sortable list(s) active", bound);
}
