//! Tree dump helpers.
//!
//! Converts the composed tree into indented plain text suitable for snapshot
//! testing and assertions. Node ids are arena keys and differ between runs,
//! so the dump shows tags, ids, classes, attributes, and text instead.

use crate::dom::{Dom, NodeData, NodeId, NodeKind};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Dump the composed tree under `start`, one node per line, two spaces of
/// indent per level. Isolated scopes print as `#scope` under their host,
/// before the host's light children. Hidden nodes are suffixed `(hidden)`.
///
/// Returns an empty string if `start` is not in the tree.
pub fn dump_tree(dom: &Dom, start: NodeId) -> String {
    let mut lines = Vec::new();
    dump_node(dom, start, 0, &mut lines);
    lines.join("\n")
}

/// One-line description of a node.
pub fn describe(data: &NodeData) -> String {
    match data.kind {
        NodeKind::Scope => "#scope".to_owned(),
        NodeKind::Content => format!("{:?}", data.text.as_deref().unwrap_or_default()),
        NodeKind::Element => {
            let mut out = data.tag.clone();
            if let Some(id) = &data.id {
                out.push('#');
                out.push_str(id);
            }
            for class in &data.classes {
                out.push('.');
                out.push_str(class);
            }
            for (name, value) in &data.attributes {
                if value.is_empty() {
                    out.push_str(&format!(" [{name}]"));
                } else {
                    out.push_str(&format!(" [{name}={value}]"));
                }
            }
            if !data.visible {
                out.push_str(" (hidden)");
            }
            out
        }
    }
}

fn dump_node(dom: &Dom, node: NodeId, depth: usize, lines: &mut Vec<String>) {
    let Some(data) = dom.get(node) else { return };
    lines.push(format!("{}{}", "  ".repeat(depth), describe(data)));
    if let Some(scope) = dom.scope_of(node) {
        dump_node(dom, scope, depth + 1, lines);
    }
    for &child in dom.children(node) {
        dump_node(dom, child, depth + 1, lines);
    }
}
