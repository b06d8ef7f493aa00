//! The scope resolver: given a namespace node and a symbolic name, find the node
//! the name refers to, or report absent. Used both by the resolution pass (binding field/RPC
//! type references) and by [`crate::builder::Root::lookup`] / [`crate::builder::Root::build`].

use crate::node::{Node, NodeId};

/// Resolve `name` against `from` and, failing that, its ancestors up to the root.
/// A leading `.` anchors the search at the tree root instead. `exclude_non_namespace` filters
/// out hits that aren't one of `Namespace`/`Message`/`Enum`/`Service`.
pub fn resolve(
    arena: &[Node],
    from: NodeId,
    name: &str,
    exclude_non_namespace: bool,
) -> Option<NodeId> {
    if let Some(rest) = name.strip_prefix('.') {
        return descend(arena, root_of(arena, from), rest, exclude_non_namespace);
    }

    let mut scope = Some(from);
    while let Some(current) = scope {
        if let Some(found) = descend(arena, current, name, exclude_non_namespace) {
            return Some(found);
        }
        scope = arena[current.0].parent;
    }
    None
}

fn root_of(arena: &[Node], mut id: NodeId) -> NodeId {
    while let Some(parent) = arena[id.0].parent {
        id = parent;
    }
    id
}

/// Consume dotted segments left-to-right by descending into children by name; any
/// missing segment aborts this scope attempt.
fn descend(arena: &[Node], start: NodeId, name: &str, exclude_non_namespace: bool) -> Option<NodeId> {
    let mut current = start;
    for segment in name.split('.') {
        let children = arena[current.0].kind.children()?;
        current = *children.get(segment)?;
    }
    if exclude_non_namespace && !arena[current.0].kind.is_namespace_like() {
        return None;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Root;

    fn sample_root() -> Root {
        let mut root = Root::new();
        root.define("a.b").unwrap();
        root.create(serde_json::json!({
            "name": "M",
            "fields": [
                {"rule": "optional", "name": "x", "type": "int32", "id": 1}
            ]
        }))
        .unwrap();
        root
    }

    #[test]
    fn resolves_dotted_path_from_root() {
        let root = sample_root();
        let found = resolve(&root.arena, root.root_id(), "a.b.M.x", false);
        assert!(found.is_some());
    }

    #[test]
    fn leading_dot_anchors_at_root() {
        let mut root = sample_root();
        let m = root.define("a.b").unwrap();
        let found = resolve(&root.arena, m, ".a.b.M", false);
        assert!(found.is_some());
    }

    #[test]
    fn exclude_non_namespace_filters_fields() {
        let root = sample_root();
        let found = resolve(&root.arena, root.root_id(), "a.b.M.x", true);
        assert!(found.is_none());
    }

    #[test]
    fn ancestor_fallback_finds_sibling_scope() {
        let root = sample_root();
        let b = root.lookup(Some("a.b"), false).unwrap();
        // from "a.b" scope (and its ancestors), "a.b.M" resolves even though "M" alone doesn't
        // exist directly under "a.b" as a dotted search target.
        let found = resolve(&root.arena, b, "a.b.M", false);
        assert!(found.is_some());
    }
}
