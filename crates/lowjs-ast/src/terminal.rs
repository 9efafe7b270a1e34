//! Static control-flow termination predicates.

use crate::arena::NodeArena;
use crate::node::{ForKind, Literal, NodeData, NodeFlags, NodeIndex};

impl NodeArena {
    /// Does control never continue past this statement?
    ///
    /// Conservative: `false` means "may complete normally".
    #[must_use]
    pub fn is_terminal(&self, idx: NodeIndex) -> bool {
        let Some(node) = self.get(idx) else {
            return false;
        };
        match &node.data {
            NodeData::Return(_) | NodeData::Throw(_) => true,
            NodeData::Block(_) => node.has_flag(NodeFlags::TERMINAL),
            NodeData::If(if_data) => {
                if_data.fail.is_some_and(|fail| self.is_terminal(fail)) && self.is_terminal(if_data.pass)
            }
            NodeData::Try(try_data) => {
                self.is_terminal(try_data.body)
                    && try_data
                        .catch_blocks
                        .iter()
                        .all(|&catch_block| self.is_terminal(catch_block))
            }
            NodeData::Catch(catch) => catch.condition.is_none() && self.is_terminal(catch.body),
            NodeData::Labelled(labelled) => self.is_terminal(labelled.body),
            NodeData::For(_) | NodeData::While(_) => self.is_terminal_loop(idx),
            _ => false,
        }
    }

    /// Loops are terminal only when they are certainly entered, no jump
    /// leaves them, and they either never fall out of the body or never
    /// re-test a condition.
    fn is_terminal_loop(&self, idx: NodeIndex) -> bool {
        let Some(node) = self.get(idx) else {
            return false;
        };
        if node.has_flag(NodeFlags::CONTROL_FLOW_ESCAPES) {
            return false;
        }
        let (must_enter, test, body) = match &node.data {
            NodeData::For(for_data) => (
                for_data.kind == ForKind::For && for_data.test.is_none(),
                for_data.test,
                for_data.body,
            ),
            NodeData::While(while_data) => (while_data.is_do_while, while_data.test, while_data.body),
            _ => return false,
        };
        must_enter && (test.is_none() || self.is_terminal(body))
    }

    /// `break` and `continue`.
    #[must_use]
    pub fn has_goto(&self, idx: NodeIndex) -> bool {
        matches!(
            self.data(idx),
            Some(NodeData::Break(_) | NodeData::Continue(_))
        )
    }

    /// Terminal, or a jump. Nothing after such a statement in the same
    /// block is reachable.
    #[must_use]
    pub fn has_terminal_flags(&self, idx: NodeIndex) -> bool {
        self.is_terminal(idx) || self.has_goto(idx)
    }

    /// Conservative "always true" for loop tests: an absent test or the
    /// literal `true`. Nothing else is folded.
    #[must_use]
    pub fn is_always_true(&self, test: Option<NodeIndex>) -> bool {
        match test {
            None => true,
            Some(test) => matches!(self.data(test), Some(NodeData::Literal(Literal::Boolean(true)))),
        }
    }
}
