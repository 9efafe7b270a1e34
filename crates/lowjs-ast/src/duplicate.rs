//! Deep copies with fresh jump labels.

use crate::arena::NodeArena;
use crate::node::{NodeData, NodeIndex};
use std::convert::Infallible;

impl NodeArena {
    /// Copy the subtree rooted at `idx` into fresh arena slots.
    ///
    /// Every breakable node of the copy gets a new [`JumpLabel`](crate::JumpLabel),
    /// so the copy can be placed in the same function as the original (or
    /// as another copy) without two nodes sharing a branch target. Nested
    /// functions are copied structurally too.
    pub fn duplicate_with_unique_labels(&mut self, idx: NodeIndex) -> NodeIndex {
        let Some(node) = self.get(idx) else {
            return idx;
        };
        let span = node.span;
        let flags = node.flags;
        let data = node.data.clone();

        let mapped: Result<NodeData, Infallible> =
            data.try_map_children(|child| Ok(self.duplicate_with_unique_labels(child)));
        let mut data = match mapped {
            Ok(data) => data,
            Err(never) => match never {},
        };
        if data.jump_label().is_some() {
            let label = self.fresh_label();
            data.set_jump_label(label);
        }
        self.add_node(span, flags, data)
    }
}
