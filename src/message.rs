use std::collections::HashMap;

use linked_hash_map::LinkedHashMap;
use serde_json::Value;

use crate::{node::NodeId, syntax::Syntax};

/// A namespace that additionally carries a declared field set, an optional extension id range,
/// a group flag, and a syntax tag. `children` holds both nested types *and* declared
/// fields in one ordered map -- see [`crate::node::NodeKind::children`] for why -- while
/// `field_ids` is kept separately purely to answer the uniqueness/range questions
/// without scanning `children` by kind on every insert.
#[derive(Debug)]
pub struct Message {
    pub children: LinkedHashMap<String, NodeId>,

    /// field id => node id, for duplicate-id and extension-range checks.
    pub field_ids: HashMap<i32, NodeId>,

    /// The declared extension id range `[lo, hi]`, already clamped to `[ID_MIN, ID_MAX]`.
    pub extension_range: Option<(i32, i32)>,

    pub is_group: bool,
    pub syntax: Syntax,
    pub options: LinkedHashMap<String, Value>,
}

impl Message {
    pub fn new(syntax: Syntax, is_group: bool) -> Self {
        Self {
            children: LinkedHashMap::new(),
            field_ids: HashMap::new(),
            extension_range: None,
            is_group,
            syntax,
            options: LinkedHashMap::new(),
        }
    }
}
