//! List View Capability
//!
//! What a sortable list needs from its rendering surface.

use crate::model::ItemId;

pub trait ListView {
    /// Item ids in current visual order
    fn item_ids(&self) -> Vec<ItemId>;

    /// Record an item's ordinal where later reads can observe it
    fn set_position(&self, id: &ItemId, position: usize);

    /// Rearrange the rendered items to match `order`
    fn render(&self, order: &[ItemId]);
}

/// Whether `list` is the innermost sortable list around a pointer target.
/// `ancestors` starts at the target and walks outward.
///
/// Lists nest on the admin page (boards inside category rows, child boards
/// inside board rows), and one mousedown bubbles through all of them. Only
/// the innermost list may claim the gesture.
pub fn is_innermost_list<N, I, F>(ancestors: I, is_list: F, list: &N) -> bool
where
    N: PartialEq,
    I: IntoIterator<Item = N>,
    F: Fn(&N) -> bool,
{
    ancestors.into_iter().find(|node| is_list(node)).as_ref() == Some(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTS: [&str; 3] = ["categories", "boards-of-cat-1", "children-of-board-4"];

    fn is_list(node: &&str) -> bool {
        LISTS.contains(node)
    }

    #[test]
    fn test_board_row_belongs_to_board_list() {
        let from_board_row = ["span", "board-4", "boards-of-cat-1", "cat-1", "categories", "body"];
        assert!(is_innermost_list(from_board_row, is_list, &"boards-of-cat-1"));
        assert!(!is_innermost_list(from_board_row, is_list, &"categories"));
    }

    #[test]
    fn test_category_header_belongs_to_category_list() {
        let from_header = ["h4", "cat-1", "categories", "body"];
        assert!(is_innermost_list(from_header, is_list, &"categories"));
        assert!(!is_innermost_list(from_header, is_list, &"boards-of-cat-1"));
    }

    #[test]
    fn test_child_board_row_claims_only_innermost() {
        let from_child = ["child-7", "children-of-board-4", "board-4", "boards-of-cat-1", "cat-1", "categories"];
        assert!(is_innermost_list(from_child, is_list, &"children-of-board-4"));
        assert!(!is_innermost_list(from_child, is_list, &"boards-of-cat-1"));
        assert!(!is_innermost_list(from_child, is_list, &"categories"));
    }

    #[test]
    fn test_outside_any_list() {
        assert!(!is_innermost_list(["div", "body"], is_list, &"categories"));
    }
}
