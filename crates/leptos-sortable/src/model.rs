//! Reorder Model
//!
//! DOM-free ordering of a sortable list. Positions are always the
//! contiguous sequence `0..len` in visual order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-owned identifier of a sortable row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Str(String),
}

impl ItemId {
    /// Parse a DOM attribute value; numeric text becomes `Int`
    pub fn parse_attr(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => ItemId::Int(n),
            Err(_) => ItemId::Str(trimmed.to_string()),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Int(n) => write!(f, "{}", n),
            ItemId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(n: i64) -> Self {
        ItemId::Int(n)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::Str(s.to_string())
    }
}

/// One row of a sortable list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderableItem {
    pub id: ItemId,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderError {
    OutOfRange { index: usize, len: usize },
    UnknownItem(ItemId),
}

impl fmt::Display for ReorderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReorderError::OutOfRange { index, len } => {
                write!(f, "Index {} out of range for list of {}", index, len)
            }
            ReorderError::UnknownItem(id) => write!(f, "Unknown item: {}", id),
        }
    }
}

impl std::error::Error for ReorderError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderModel {
    items: Vec<OrderableItem>,
}

impl ReorderModel {
    /// Build from ids in document order
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = ItemId>,
    {
        let items = ids
            .into_iter()
            .enumerate()
            .map(|(position, id)| OrderableItem { id, position })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[OrderableItem] {
        &self.items
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index_of(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    /// Move the item at `from` so it ends up at index `to`
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), ReorderError> {
        let len = self.items.len();
        if from >= len {
            return Err(ReorderError::OutOfRange { index: from, len });
        }
        if to >= len {
            return Err(ReorderError::OutOfRange { index: to, len });
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        self.renumber();
        Ok(())
    }

    /// Remove an item that is leaving for a connected list
    pub fn take(&mut self, id: &ItemId) -> Result<ItemId, ReorderError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| ReorderError::UnknownItem(id.clone()))?;
        let item = self.items.remove(index);
        self.renumber();
        Ok(item.id)
    }

    /// Insert an item arriving from a connected list; index is clamped to the end
    pub fn insert(&mut self, index: usize, id: ItemId) {
        let index = index.min(self.items.len());
        self.items.insert(index, OrderableItem { id, position: index });
        self.renumber();
    }

    fn renumber(&mut self) {
        for (position, item) in self.items.iter_mut().enumerate() {
            item.position = position;
        }
    }
}
