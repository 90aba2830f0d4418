//! Ordered List Sync
//!
//! Ties a [`ListView`] to the order endpoint: renumber after a drop,
//! persist, and roll back when saving fails for good.

use std::cell::{Cell, RefCell};

use crate::model::{ItemId, ReorderError, ReorderModel};
use crate::persist::{
    send_with_retry, OrderTransport, PayloadShape, PersistOutcome, PersistRequest, ReorderCommand,
    RetryPolicy, Sleeper,
};
use crate::view::ListView;

/// Per-list configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SortableOptions {
    /// Selector of the item rows inside the container
    pub item_selector: String,
    /// Containers items may be moved between (connect-with)
    pub group_selector: Option<String>,
    pub endpoint_url: String,
    pub csrf_token: String,
    /// Data attribute holding each row's id
    pub id_attribute: String,
    /// Class given to the drop placeholder row
    pub placeholder_class: String,
    pub shape: PayloadShape,
    pub retry: RetryPolicy,
    pub rollback_on_failure: bool,
}

pub struct SortableSync<V, T, S> {
    view: V,
    transport: T,
    sleeper: S,
    options: SortableOptions,
    generation: Cell<u64>,
    dragging: Cell<bool>,
    /// Rollback that arrived mid-drag: generation and order to restore
    deferred_rollback: RefCell<Option<(u64, Vec<ItemId>)>>,
}

impl<V, T, S> SortableSync<V, T, S>
where
    V: ListView,
    T: OrderTransport,
    S: Sleeper,
{
    pub fn new(view: V, transport: T, sleeper: S, options: SortableOptions) -> Self {
        Self {
            view,
            transport,
            sleeper,
            options,
            generation: Cell::new(0),
            dragging: Cell::new(false),
            deferred_rollback: RefCell::new(None),
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn options(&self) -> &SortableOptions {
        &self.options
    }

    /// Current order, taken at drag start
    pub fn snapshot(&self) -> Vec<ItemId> {
        self.view.item_ids()
    }

    /// The view has already been rearranged (by a drag); renumber and
    /// build the persist command. `before` is the drag-start snapshot.
    pub fn commit(&self, before: Vec<ItemId>) -> ReorderCommand {
        let model = ReorderModel::from_ids(self.view.item_ids());
        for item in model.items() {
            self.view.set_position(&item.id, item.position);
        }

        let request = PersistRequest::build(
            &self.options.endpoint_url,
            &self.options.csrf_token,
            &self.options.shape,
            model.items(),
        );
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        ReorderCommand {
            generation,
            before,
            after: model.ids(),
            request,
        }
    }

    /// An item from a connected list was dropped into this one
    pub fn commit_received(&self, received: &ItemId) -> ReorderCommand {
        let before = self
            .view
            .item_ids()
            .into_iter()
            .filter(|id| id != received)
            .collect();
        self.commit(before)
    }

    /// Programmatic reorder: move, render, commit
    pub fn move_item(&self, from: usize, to: usize) -> Result<ReorderCommand, ReorderError> {
        let before = self.snapshot();
        let mut model = ReorderModel::from_ids(before.clone());
        model.move_item(from, to)?;
        self.view.render(&model.ids());
        Ok(self.commit(before))
    }

    /// A drag on this list has lifted a row
    pub fn begin_drag(&self) {
        self.dragging.set(true);
    }

    /// The drag is over and any drop has been committed. A rollback held
    /// back during the drag is applied now, unless the drop superseded it.
    pub fn end_drag(&self) {
        self.dragging.set(false);
        let Some((generation, before)) = self.deferred_rollback.borrow_mut().take() else {
            return;
        };
        if generation == self.generation.get() {
            log::debug!("[SORT] Applying rollback of generation {} after drag", generation);
            self.restore(&before);
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.get()
    }

    /// Latest generation issued by [`commit`](Self::commit)
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Save a committed reorder, retrying per policy.
    ///
    /// On final failure the view goes back to `command.before`, unless a
    /// newer reorder of this list was committed in the meantime.
    pub async fn persist(&self, command: ReorderCommand) -> PersistOutcome {
        let (attempts, result) = send_with_retry(
            &self.transport,
            &self.sleeper,
            &self.options.retry,
            &command.request,
        )
        .await;

        match result {
            Ok(()) => {
                log::debug!(
                    "[SORT] Saved {} positions to {} (attempts={})",
                    command.after.len(),
                    command.request.url,
                    attempts
                );
                PersistOutcome::Saved { attempts }
            }
            Err(e) => {
                log::error!(
                    "[SORT] Giving up saving order to {} after {} attempts: {}",
                    command.request.url,
                    attempts,
                    e
                );
                let rolled_back = self.rollback(&command);
                PersistOutcome::Failed { attempts, rolled_back }
            }
        }
    }

    fn rollback(&self, command: &ReorderCommand) -> bool {
        if !self.options.rollback_on_failure {
            return false;
        }
        if command.generation != self.generation.get() {
            log::warn!(
                "[SORT] Skipping rollback of generation {}; list has moved on to {}",
                command.generation,
                self.generation.get()
            );
            return false;
        }
        if self.dragging.get() {
            log::warn!(
                "[SORT] Holding rollback of generation {} until the current drag ends",
                command.generation
            );
            *self.deferred_rollback.borrow_mut() = Some((command.generation, command.before.clone()));
            return false;
        }
        self.restore(&command.before);
        true
    }

    fn restore(&self, order: &[ItemId]) {
        self.view.render(order);
        for (position, id) in order.iter().enumerate() {
            self.view.set_position(id, position);
        }
    }
}
