use linked_hash_map::LinkedHashMap;
use serde_json::Value;

use crate::{node::NodeId, syntax::Syntax};

/// An ordered set of [`EnumValue`] children. Carries its own `syntax` tag: a proto3 message may
/// not reference an enum declared in a proto2 file, which is why the tag has to live on the enum
/// itself rather than be inferred from the referencing field.
#[derive(Debug)]
pub struct Enum {
    pub children: LinkedHashMap<String, NodeId>,
    pub syntax: Syntax,
    pub options: LinkedHashMap<String, Value>,
}

impl Enum {
    pub fn new(syntax: Syntax) -> Self {
        Self {
            children: LinkedHashMap::new(),
            syntax,
            options: LinkedHashMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct EnumValue {
    pub id: i32,
}
