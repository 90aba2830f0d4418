//! DOM Binding
//!
//! Mouse-driven sorting of server-rendered rows.
//! Uses a movement threshold to distinguish click from drag, a placeholder
//! row that follows the pointer, and a `sortreceive` event to hand an item
//! over to a connected list.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CustomEvent, CustomEventInit, Element, HtmlElement, MouseEvent, NodeList};

use crate::geometry::{Containment, DragGeometry};
use crate::model::ItemId;
use crate::persist::{OrderTransport, Sleeper};
use crate::sync::{SortableOptions, SortableSync};
use crate::view::{is_innermost_list, ListView};

/// Movement threshold in pixels to start dragging
const DRAG_THRESHOLD_PX: i32 = 5;

/// Event dispatched on a container that received an item from a connected list
pub const RECEIVE_EVENT: &str = "sortreceive";

/// Attribute written on every row after a reorder
pub const POSITION_ATTRIBUTE: &str = "data-position";

/// Marks a container that has a sortable attached
pub const LIST_ATTRIBUTE: &str = "data-sortable-list";

/// Collect the elements of a node list
pub fn elements(list: NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

fn query_all(root: &Element, selector: &str) -> Vec<Element> {
    match root.query_selector_all(selector) {
        Ok(list) => elements(list),
        Err(_) => {
            log::warn!("[SORT] Invalid selector: {}", selector);
            Vec::new()
        }
    }
}

fn document_query_all(selector: &str) -> Vec<Element> {
    let Some(doc) = web_sys::window().and_then(|w| w.document()) else {
        return Vec::new();
    };
    match doc.query_selector_all(selector) {
        Ok(list) => elements(list),
        Err(_) => {
            log::warn!("[SORT] Invalid selector: {}", selector);
            Vec::new()
        }
    }
}

/// [`ListView`] over a container element
#[derive(Clone)]
pub struct DomListView {
    container: Element,
    item_selector: String,
    id_attribute: String,
    group_selector: Option<String>,
}

impl DomListView {
    pub fn new(container: Element, options: &SortableOptions) -> Self {
        Self {
            container,
            item_selector: options.item_selector.clone(),
            id_attribute: options.id_attribute.clone(),
            group_selector: options.group_selector.clone(),
        }
    }

    pub fn container(&self) -> &Element {
        &self.container
    }

    fn rows(&self) -> Vec<Element> {
        query_all(&self.container, &self.item_selector)
    }

    fn row_id(&self, row: &Element) -> Option<ItemId> {
        row.get_attribute(&self.id_attribute)
            .map(|raw| ItemId::parse_attr(&raw))
    }

    /// Containers this list exchanges items with, itself included
    fn group(&self) -> Vec<Element> {
        let mut group = vec![self.container.clone()];
        if let Some(selector) = &self.group_selector {
            for other in document_query_all(selector) {
                if other != self.container {
                    group.push(other);
                }
            }
        }
        group
    }

    /// Look for a row in this container first, then in connected ones
    fn find_row(&self, id: &ItemId) -> Option<Element> {
        self.group().into_iter().find_map(|container| {
            query_all(&container, &self.item_selector)
                .into_iter()
                .find(|row| self.row_id(row).as_ref() == Some(id))
        })
    }
}

impl ListView for DomListView {
    fn item_ids(&self) -> Vec<ItemId> {
        self.rows().iter().filter_map(|row| self.row_id(row)).collect()
    }

    fn set_position(&self, id: &ItemId, position: usize) {
        if let Some(row) = self.find_row(id) {
            let _ = row.set_attribute(POSITION_ATTRIBUTE, &position.to_string());
        }
    }

    fn render(&self, order: &[ItemId]) {
        for id in order {
            match self.find_row(id) {
                Some(row) => {
                    let _ = self.container.append_child(&row);
                }
                None => log::warn!("[SORT] Row {} vanished before render", id),
            }
        }
    }
}

/// DnD state signals
#[derive(Clone, Copy)]
pub struct DndSignals {
    /// Pending item id (mousedown but not yet dragging)
    pub pending_id_read: ReadSignal<Option<ItemId>>,
    pub pending_id_write: WriteSignal<Option<ItemId>>,
    pub dragging_read: ReadSignal<bool>,
    pub dragging_write: WriteSignal<bool>,
    /// Start position for movement detection
    pub start_x_read: ReadSignal<i32>,
    pub start_x_write: WriteSignal<i32>,
    pub start_y_read: ReadSignal<i32>,
    pub start_y_write: WriteSignal<i32>,
}

pub fn create_dnd_signals() -> DndSignals {
    let (pending_id_read, pending_id_write) = signal(None::<ItemId>);
    let (dragging_read, dragging_write) = signal(false);
    let (start_x_read, start_x_write) = signal(0i32);
    let (start_y_read, start_y_write) = signal(0i32);
    DndSignals {
        pending_id_read,
        pending_id_write,
        dragging_read,
        dragging_write,
        start_x_read,
        start_x_write,
        start_y_read,
        start_y_write,
    }
}

/// Elements of a drag in progress
struct ActiveDrag {
    row: HtmlElement,
    placeholder: Element,
    geometry: DragGeometry,
    before: Vec<ItemId>,
    id: ItemId,
    saved_style: Option<String>,
}

type DomSync<T, S> = SortableSync<DomListView, T, S>;

fn spawn_persist<T, S>(sync: &Rc<DomSync<T, S>>, before: Vec<ItemId>)
where
    T: OrderTransport + 'static,
    S: Sleeper + 'static,
{
    let command = sync.commit(before);
    let sync = Rc::clone(sync);
    spawn_local(async move {
        sync.persist(command).await;
    });
}

fn is_form_control(target: &Element) -> bool {
    target.dyn_ref::<web_sys::HtmlInputElement>().is_some()
        || target.dyn_ref::<web_sys::HtmlButtonElement>().is_some()
        || target.dyn_ref::<web_sys::HtmlSelectElement>().is_some()
        || target.dyn_ref::<web_sys::HtmlTextAreaElement>().is_some()
}

fn containment_of(element: &Element) -> Containment {
    let rect = element.get_bounding_client_rect();
    Containment::new(rect.left(), rect.top(), rect.right(), rect.bottom())
}

fn point_inside(element: &Element, x: f64, y: f64) -> bool {
    let rect = element.get_bounding_client_rect();
    x >= rect.left() && x <= rect.right() && y >= rect.top() && y <= rect.bottom()
}

fn begin_drag<T, S>(sync: &DomSync<T, S>, id: ItemId, start_y: i32) -> Option<ActiveDrag>
where
    T: OrderTransport,
    S: Sleeper,
{
    let view = sync.view();
    let row = view.find_row(&id)?.dyn_into::<HtmlElement>().ok()?;
    let before = sync.snapshot();

    let rect = row.get_bounding_client_rect();
    let geometry = DragGeometry::start(
        rect.height(),
        f64::from(start_y) - rect.top(),
        containment_of(view.container()),
    );

    let doc = web_sys::window()?.document()?;
    let placeholder = doc.create_element(&row.tag_name()).ok()?;
    placeholder.set_class_name(&sync.options().placeholder_class);
    let _ = placeholder.set_attribute("style", &format!("height: {}px", geometry.placeholder_height));
    row.parent_node()?.insert_before(&placeholder, Some(row.as_ref())).ok()?;

    let saved_style = row.get_attribute("style");
    let style = row.style();
    let _ = style.set_property("position", "fixed");
    let _ = style.set_property("left", &format!("{}px", rect.left()));
    let _ = style.set_property("top", &format!("{}px", rect.top()));
    let _ = style.set_property("width", &format!("{}px", rect.width()));
    let _ = style.set_property("z-index", "1000");
    let _ = style.set_property("pointer-events", "none");

    log::debug!("[SORT] Drag start: id={}, height={}", id, geometry.placeholder_height);
    Some(ActiveDrag { row, placeholder, geometry, before, id, saved_style })
}

/// Move the helper and slot the placeholder under the pointer
fn track_drag(drag: &ActiveDrag, view: &DomListView, x: f64, y: f64) {
    let top = drag.geometry.helper_top(y);
    let _ = drag.row.style().set_property("top", &format!("{}px", top));

    let Some(target) = view.group().into_iter().find(|c| point_inside(c, x, y)) else {
        return;
    };
    let dragged: &Element = drag.row.as_ref();
    let rows: Vec<Element> = query_all(&target, &view.item_selector)
        .into_iter()
        .filter(|row| row != dragged)
        .collect();

    let next = rows.iter().find(|row| {
        let rect = row.get_bounding_client_rect();
        y < rect.top() + rect.height() / 2.0
    });
    match next {
        Some(row) => {
            if let Some(parent) = row.parent_node() {
                let _ = parent.insert_before(&drag.placeholder, Some(row.as_ref()));
            }
        }
        None => match rows.last().and_then(|row| row.parent_node()) {
            Some(parent) => {
                let _ = parent.append_child(&drag.placeholder);
            }
            None => {
                let _ = target.append_child(&drag.placeholder);
            }
        },
    }
}

/// Put the row where the placeholder is; returns the container it landed in
fn finish_drag(drag: &ActiveDrag, view: &DomListView) -> Option<Element> {
    if let Some(parent) = drag.placeholder.parent_node() {
        let _ = parent.insert_before(&drag.row, Some(drag.placeholder.as_ref()));
    }
    drag.placeholder.remove();
    match &drag.saved_style {
        Some(style) => {
            let _ = drag.row.set_attribute("style", style);
        }
        None => {
            let _ = drag.row.remove_attribute("style");
        }
    }
    view.group()
        .into_iter()
        .find(|container| container.contains(Some(drag.row.as_ref())))
}

fn dispatch_receive(container: &Element, id: &ItemId) {
    let init = CustomEventInit::new();
    init.set_detail(&JsValue::from_str(&id.to_string()));
    match CustomEvent::new_with_event_init_dict(RECEIVE_EVENT, &init) {
        Ok(event) => {
            let _ = container.dispatch_event(&event);
        }
        Err(e) => log::error!("[SORT] Could not create {} event: {:?}", RECEIVE_EVENT, e),
    }
}

/// Bind drag sorting to the sync's container.
pub fn attach<T, S>(sync: Rc<DomSync<T, S>>)
where
    T: OrderTransport + 'static,
    S: Sleeper + 'static,
{
    let dnd = create_dnd_signals();
    let active: Rc<RefCell<Option<ActiveDrag>>> = Rc::new(RefCell::new(None));
    let container = sync.view().container().clone();
    let _ = container.set_attribute(LIST_ATTRIBUTE, "");

    // Record pending drag with start position
    {
        let sync = Rc::clone(&sync);
        let on_mousedown = Closure::<dyn FnMut(MouseEvent)>::new(move |ev: MouseEvent| {
            if ev.button() != 0 {
                return;
            }
            let Some(target) = ev.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
                return;
            };
            if is_form_control(&target) {
                return;
            }
            let view = sync.view();
            let ancestors = std::iter::successors(Some(target.clone()), |el| el.parent_element());
            if !is_innermost_list(ancestors, |el| el.has_attribute(LIST_ATTRIBUTE), view.container()) {
                return;
            }
            let Ok(Some(row)) = target.closest(&view.item_selector) else {
                return;
            };
            if !view.container().contains(Some(row.as_ref())) {
                return;
            }
            if let Some(id) = view.row_id(&row) {
                ev.prevent_default();
                dnd.pending_id_write.set(Some(id));
                dnd.start_x_write.set(ev.client_x());
                dnd.start_y_write.set(ev.client_y());
            }
        });
        let _ = container
            .add_event_listener_with_callback("mousedown", on_mousedown.as_ref().unchecked_ref());
        on_mousedown.forget();
    }

    // Start dragging once moved beyond threshold, then follow the pointer
    {
        let sync = Rc::clone(&sync);
        let active = Rc::clone(&active);
        let on_mousemove = Closure::<dyn FnMut(MouseEvent)>::new(move |ev: MouseEvent| {
            let Some(pending) = dnd.pending_id_read.get_untracked() else {
                return;
            };
            if !dnd.dragging_read.get_untracked() {
                let dx = (ev.client_x() - dnd.start_x_read.get_untracked()).abs();
                let dy = (ev.client_y() - dnd.start_y_read.get_untracked()).abs();
                if dx <= DRAG_THRESHOLD_PX && dy <= DRAG_THRESHOLD_PX {
                    return;
                }
                match begin_drag(&sync, pending, dnd.start_y_read.get_untracked()) {
                    Some(drag) => {
                        *active.borrow_mut() = Some(drag);
                        dnd.dragging_write.set(true);
                        sync.begin_drag();
                    }
                    None => {
                        dnd.pending_id_write.set(None);
                        return;
                    }
                }
            }
            if let Some(drag) = active.borrow().as_ref() {
                track_drag(drag, sync.view(), f64::from(ev.client_x()), f64::from(ev.client_y()));
            }
        });
        if let Some(doc) = web_sys::window().and_then(|w| w.document()) {
            let _ = doc.add_event_listener_with_callback("mousemove", on_mousemove.as_ref().unchecked_ref());
        }
        on_mousemove.forget();
    }

    // Drop: renumber and persist every list that changed
    {
        let sync = Rc::clone(&sync);
        let active = Rc::clone(&active);
        let on_mouseup = Closure::<dyn FnMut(MouseEvent)>::new(move |_ev: MouseEvent| {
            dnd.pending_id_write.set(None);
            dnd.dragging_write.set(false);

            let Some(drag) = active.borrow_mut().take() else {
                return;
            };
            let view = sync.view();
            let landed = finish_drag(&drag, view);

            match landed {
                Some(dest) if &dest != view.container() => {
                    log::debug!("[SORT] Drop: id={} moved to a connected list", drag.id);
                    spawn_persist(&sync, drag.before);
                    dispatch_receive(&dest, &drag.id);
                }
                _ => {
                    if view.item_ids() != drag.before {
                        log::debug!("[SORT] Drop: id={} reordered", drag.id);
                        spawn_persist(&sync, drag.before);
                    }
                }
            }
            sync.end_drag();
        });
        if let Some(doc) = web_sys::window().and_then(|w| w.document()) {
            let _ = doc.add_event_listener_with_callback("mouseup", on_mouseup.as_ref().unchecked_ref());
        }
        on_mouseup.forget();
    }

    // Items handed over from a connected list
    {
        let sync = Rc::clone(&sync);
        let on_receive = Closure::<dyn FnMut(CustomEvent)>::new(move |ev: CustomEvent| {
            let Some(raw) = ev.detail().as_string() else {
                return;
            };
            let id = ItemId::parse_attr(&raw);
            let command = sync.commit_received(&id);
            let sync = Rc::clone(&sync);
            spawn_local(async move {
                sync.persist(command).await;
            });
        });
        let _ = container
            .add_event_listener_with_callback(RECEIVE_EVENT, on_receive.as_ref().unchecked_ref());
        on_receive.forget();
    }
}

/// Attach a sortable to every container matching `selector`.
/// Returns the number of lists bound.
pub fn attach_all<T, S>(selector: &str, options: &SortableOptions, transport: T, sleeper: S) -> usize
where
    T: OrderTransport + Clone + 'static,
    S: Sleeper + Clone + 'static,
{
    let containers = document_query_all(selector);
    for container in &containers {
        let view = DomListView::new(container.clone(), options);
        let sync = SortableSync::new(view, transport.clone(), sleeper.clone(), options.clone());
        attach(Rc::new(sync));
    }
    log::info!("[SORT] Bound {} list(s) for {}", containers.len(), selector);
    containers.len()
}
