//! Drag-and-drop reordering of parent/child hierarchies.
//!
//! Planning is pure: callers load the sibling rows, call [`plan_drop`] and
//! persist the returned parent and display orders in one transaction.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

pub const ORDER_STEP: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    /// Becomes the last child of the target.
    Over,
    Before,
    After,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub id: i32,
    pub parent_id: Option<i32>,
    pub display_order: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DropPlan {
    pub item_id: i32,
    pub new_parent_id: Option<i32>,
    /// `(id, display_order)` pairs that must be written, the moved item included.
    pub orders: Vec<(i32, i32)>,
}

impl DropPlan {
    pub fn order_of(&self, id: i32) -> Option<i32> {
        self.orders.iter().find(|(i, _)| *i == id).map(|(_, o)| *o)
    }
}

fn is_descendant(by_id: &HashMap<i32, &TreeNode>, candidate: i32, ancestor: i32) -> bool {
    let mut seen = HashSet::new();
    let mut cur = by_id.get(&candidate).and_then(|n| n.parent_id);
    while let Some(pid) = cur {
        if pid == ancestor {
            return true;
        }
        if !seen.insert(pid) {
            return false;
        }
        cur = by_id.get(&pid).and_then(|n| n.parent_id);
    }
    false
}

fn sorted_children(nodes: &[TreeNode], parent: Option<i32>, exclude: i32) -> Vec<TreeNode> {
    let mut v: Vec<TreeNode> = nodes
        .iter()
        .filter(|n| n.parent_id == parent && n.id != exclude)
        .copied()
        .collect();
    v.sort_by_key(|n| (n.display_order, n.id));
    v
}

/// Compute the new parent and sibling orders for dropping `item` relative to `target`.
pub fn plan_drop(nodes: &[TreeNode], item: i32, target: i32, position: DropPosition) -> Result<DropPlan, ServiceError> {
    let by_id: HashMap<i32, &TreeNode> = nodes.iter().map(|n| (n.id, n)).collect();
    if !by_id.contains_key(&item) {
        return Err(ServiceError::not_found("drop item"));
    }
    let target_node = **by_id.get(&target).ok_or_else(|| ServiceError::not_found("drop target"))?;
    if item == target {
        return Err(ServiceError::validation("cannot drop a node onto itself"));
    }
    if is_descendant(&by_id, target, item) {
        return Err(ServiceError::validation("cannot move a node below one of its descendants"));
    }

    if position == DropPosition::Over {
        let siblings = sorted_children(nodes, Some(target), item);
        let last = siblings.iter().map(|n| n.display_order).max().unwrap_or(0);
        let orders = match last.checked_add(ORDER_STEP) {
            Some(order) => vec![(item, order)],
            None => renumber(&siblings, siblings.len(), item)?,
        };
        return Ok(DropPlan { item_id: item, new_parent_id: Some(target), orders });
    }

    let parent = target_node.parent_id;
    let siblings = sorted_children(nodes, parent, item);
    let idx = siblings.iter().position(|n| n.id == target).unwrap_or(0);
    let insert_at = if position == DropPosition::Before { idx } else { idx + 1 };
    let prev = insert_at.checked_sub(1).and_then(|i| siblings.get(i));
    let next = siblings.get(insert_at);

    // Gaps are measured in i64 so extreme orders cannot wrap.
    let slot = match (prev, next) {
        (Some(p), Some(n)) => {
            let (lo, hi) = (i64::from(p.display_order), i64::from(n.display_order));
            (hi - lo > 1).then(|| lo + (hi - lo) / 2).and_then(|o| i32::try_from(o).ok())
        }
        (None, Some(n)) if n.display_order > 1 => Some(n.display_order / 2),
        (Some(p), None) => p.display_order.checked_add(ORDER_STEP),
        _ => None,
    };
    if let Some(order) = slot {
        return Ok(DropPlan { item_id: item, new_parent_id: parent, orders: vec![(item, order)] });
    }

    // No room between the neighbors: renumber the whole sibling list.
    let orders = renumber(&siblings, insert_at, item)?;
    Ok(DropPlan { item_id: item, new_parent_id: parent, orders })
}

/// Orders `siblings` with `item` inserted at `insert_at` as multiples of
/// [`ORDER_STEP`], keeping only the rows whose order changes.
fn renumber(siblings: &[TreeNode], insert_at: usize, item: i32) -> Result<Vec<(i32, i32)>, ServiceError> {
    let mut ordered: Vec<i32> = siblings.iter().map(|n| n.id).collect();
    ordered.insert(insert_at, item);
    let current: HashMap<i32, i32> = siblings.iter().map(|n| (n.id, n.display_order)).collect();
    let mut orders = Vec::new();
    for (i, id) in ordered.into_iter().enumerate() {
        let order = i32::try_from(i + 1)
            .ok()
            .and_then(|pos| pos.checked_mul(ORDER_STEP))
            .ok_or_else(|| ServiceError::validation("too many siblings to renumber"))?;
        if id == item || current.get(&id) != Some(&order) {
            orders.push((id, order));
        }
    }
    Ok(orders)
}

/// Rejects a parent assignment that would make `id` its own ancestor.
pub fn check_parent(nodes: &[TreeNode], id: i32, new_parent: Option<i32>) -> Result<(), ServiceError> {
    let Some(pid) = new_parent else { return Ok(()) };
    if pid == id {
        return Err(ServiceError::validation("a node cannot be its own parent"));
    }
    let by_id: HashMap<i32, &TreeNode> = nodes.iter().map(|n| (n.id, n)).collect();
    if is_descendant(&by_id, pid, id) {
        return Err(ServiceError::validation("parent assignment would create a cycle"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(id: i32, parent_id: Option<i32>, display_order: i32) -> TreeNode {
        TreeNode { id, parent_id, display_order }
    }

    fn tree() -> Vec<TreeNode> {
        vec![
            n(1, None, 10),
            n(2, None, 20),
            n(3, None, 30),
            n(4, Some(1), 10),
            n(5, Some(1), 20),
            n(6, Some(4), 10),
        ]
    }

    #[test]
    fn over_appends_as_last_child() {
        let plan = plan_drop(&tree(), 3, 1, DropPosition::Over).unwrap();
        assert_eq!(plan.new_parent_id, Some(1));
        assert_eq!(plan.orders, vec![(3, 30)]);

        let plan = plan_drop(&tree(), 2, 6, DropPosition::Over).unwrap();
        assert_eq!(plan.new_parent_id, Some(6));
        assert_eq!(plan.orders, vec![(2, 10)]);
    }

    #[test]
    fn before_uses_midpoint_when_gap() {
        let plan = plan_drop(&tree(), 3, 2, DropPosition::Before).unwrap();
        assert_eq!(plan.new_parent_id, None);
        assert_eq!(plan.orders, vec![(3, 15)]);
    }

    #[test]
    fn after_last_sibling_steps_past_it() {
        let plan = plan_drop(&tree(), 6, 5, DropPosition::After).unwrap();
        assert_eq!(plan.new_parent_id, Some(1));
        assert_eq!(plan.orders, vec![(6, 30)]);
    }

    #[test]
    fn before_first_sibling_halves_its_order() {
        let plan = plan_drop(&tree(), 3, 1, DropPosition::Before).unwrap();
        assert_eq!(plan.orders, vec![(3, 5)]);
    }

    #[test]
    fn renumbers_when_neighbors_are_adjacent() {
        let nodes = vec![n(1, None, 1), n(2, None, 2), n(3, None, 3), n(9, Some(3), 0)];
        let plan = plan_drop(&nodes, 9, 2, DropPosition::Before).unwrap();
        assert_eq!(plan.new_parent_id, None);
        assert_eq!(plan.order_of(1), Some(10));
        assert_eq!(plan.order_of(9), Some(20));
        assert_eq!(plan.order_of(2), Some(30));
        assert_eq!(plan.order_of(3), Some(40));

        // relative order of the untouched siblings is preserved
        let mut all: Vec<(i32, i32)> = plan.orders.clone();
        all.sort_by_key(|(_, o)| *o);
        let ids: Vec<i32> = all.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 9, 2, 3]);
    }

    #[test]
    fn renumber_skips_rows_already_in_place() {
        let nodes = vec![n(1, None, 10), n(2, None, 11), n(7, None, 50)];
        let plan = plan_drop(&nodes, 7, 2, DropPosition::Before).unwrap();
        assert_eq!(plan.order_of(1), None);
        assert_eq!(plan.order_of(7), Some(20));
        assert_eq!(plan.order_of(2), Some(30));
    }

    #[test]
    fn over_renumbers_children_at_the_order_ceiling() {
        let nodes = vec![n(1, None, 10), n(4, Some(1), i32::MAX), n(5, Some(1), 20), n(3, None, 30)];
        let plan = plan_drop(&nodes, 3, 1, DropPosition::Over).unwrap();
        assert_eq!(plan.new_parent_id, Some(1));
        assert_eq!(plan.order_of(5), Some(10));
        assert_eq!(plan.order_of(4), Some(20));
        assert_eq!(plan.order_of(3), Some(30));
    }

    #[test]
    fn extreme_neighbor_orders_do_not_wrap() {
        let nodes = vec![n(1, None, i32::MIN), n(2, None, i32::MAX), n(3, Some(2), 0)];
        let plan = plan_drop(&nodes, 3, 2, DropPosition::Before).unwrap();
        assert_eq!(plan.orders, vec![(3, -1)]);

        let plan = plan_drop(&nodes, 3, 2, DropPosition::After).unwrap();
        assert_eq!(plan.order_of(1), Some(10));
        assert_eq!(plan.order_of(2), Some(20));
        assert_eq!(plan.order_of(3), Some(30));
    }

    #[test]
    fn rejects_self_and_descendant_targets() {
        assert!(plan_drop(&tree(), 1, 1, DropPosition::Over).is_err());
        assert!(plan_drop(&tree(), 1, 6, DropPosition::Over).is_err());
        assert!(plan_drop(&tree(), 1, 4, DropPosition::After).is_err());
        assert!(plan_drop(&tree(), 42, 1, DropPosition::Over).is_err());
    }

    #[test]
    fn parent_cycle_check() {
        assert!(check_parent(&tree(), 1, Some(6)).is_err());
        assert!(check_parent(&tree(), 4, Some(4)).is_err());
        assert!(check_parent(&tree(), 4, Some(2)).is_ok());
        assert!(check_parent(&tree(), 4, None).is_ok());
    }
}
