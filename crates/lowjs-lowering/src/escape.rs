//! Loop escape analysis.

use lowjs_ast::lexical_context::resolve_continue;
use lowjs_ast::{BreakableKind, NodeArena, NodeData, NodeIndex};

/// Can a `break` or `continue` inside `body` transfer control out of it?
///
/// Any `break` counts as escaping, even one that only leaves a switch or
/// loop nested in the body. A `continue` escapes unless it targets a loop
/// nested inside the body. Nested functions are not searched.
pub(crate) fn control_flow_escapes(arena: &NodeArena, body: NodeIndex) -> bool {
    let mut scopes = Vec::new();
    escapes(arena, body, &mut scopes)
}

fn escapes(arena: &NodeArena, idx: NodeIndex, scopes: &mut Vec<(NodeIndex, BreakableKind)>) -> bool {
    let Some(data) = arena.data(idx) else {
        return false;
    };
    let inner = || scopes.iter().rev().map(|(node, kind)| (*node, kind));
    match data {
        NodeData::Function(_) => return false,
        NodeData::Break(_) => return true,
        NodeData::Continue(jump) => return resolve_continue(inner(), jump.label.as_deref()).is_none(),
        _ => {}
    }

    let scope = BreakableKind::of(data);
    let pushed = scope.is_some();
    if let Some(kind) = scope {
        scopes.push((idx, kind));
    }
    let found = data
        .children()
        .into_iter()
        .any(|child| escapes(arena, child, scopes));
    if pushed {
        scopes.pop();
    }
    found
}
