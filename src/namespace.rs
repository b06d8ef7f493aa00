use linked_hash_map::LinkedHashMap;
use serde_json::Value;

use crate::node::NodeId;

/// A Namespace is an ordered collection of child nodes. The anonymous root of every
/// [`crate::builder::Root`] is a `Namespace`; every `package` declaration ingested during
/// `import` creates or reuses one via [`crate::builder::Root::define`], descending one segment
/// at a time and reusing an existing child namespace rather than shadowing it.
#[derive(Debug, Default)]
pub struct Namespace {
    /// name => node id, ordered by first declaration.
    pub children: LinkedHashMap<String, NodeId>,

    /// Option name => value, merged in from `json.options` during `import`.
    pub options: LinkedHashMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::Namespace;

    #[test]
    fn test_new_namespace_has_no_children() {
        let ns = Namespace::new();
        assert!(ns.children.is_empty());
        assert!(ns.options.is_empty());
    }
}
