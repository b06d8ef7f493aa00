use std::cell::RefCell;

use derive_more::Display;
use linked_hash_map::LinkedHashMap;
use serde_json::Value;

use crate::{node::NodeId, scalar::BuiltinType, syntax::Syntax};

/// FieldRule represents a proto [field rule].
///
/// [field rule]: https://developers.google.com/protocol-buffers/docs/proto#specifying_field_rules
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    #[display(fmt = "repeated")]
    Repeated,

    #[display(fmt = "optional")]
    Optional,

    #[display(fmt = "required")]
    Required,
}

impl FieldRule {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "repeated" => Some(FieldRule::Repeated),
            "optional" => Some(FieldRule::Optional),
            "required" => Some(FieldRule::Required),
            _ => None,
        }
    }
}

/// A field's declared type, before or after resolution. Before `resolveAll` runs this is always
/// `Unresolved` (the raw string the parser/JSON handed us, a builtin name or a possibly-dotted
/// symbolic reference); after, it is always `Resolved`.
#[derive(Debug, Clone)]
pub enum DeclaredType {
    Unresolved(String),
    Resolved(BuiltinType),
}

impl DeclaredType {
    pub fn as_tag(&self) -> Option<BuiltinType> {
        match self {
            DeclaredType::Resolved(tag) => Some(*tag),
            DeclaredType::Unresolved(_) => None,
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            DeclaredType::Unresolved(s) => s.clone(),
            DeclaredType::Resolved(tag) => tag.to_string(),
        }
    }
}

/// Field represents a proto message [field].
///
/// `type` and `key_type` live behind a `RefCell`: `resolveAll` mutates them in place from a
/// symbolic reference to a resolved tag without needing `&mut` access to the whole arena.
///
/// [field]: https://developers.google.com/protocol-buffers/docs/proto#specifying_field_types
#[derive(Debug)]
pub struct Field {
    pub rule: FieldRule,
    pub id: i32,
    pub r#type: RefCell<DeclaredType>,

    /// Only `Some` for a map field. Map-ness is signaled purely by the presence of a declared
    /// key type, independent of `rule` (see `DESIGN.md`).
    pub key_type: RefCell<Option<DeclaredType>>,

    /// The owning oneof, if any. Always a child of the same message.
    pub oneof: Option<NodeId>,

    /// Populated during `resolveAll` when `type` refers to a message or enum.
    pub resolved_type: RefCell<Option<NodeId>>,

    pub options: LinkedHashMap<String, Value>,
    pub syntax: Syntax,
}

impl Field {
    pub fn new(
        rule: FieldRule,
        id: i32,
        type_name: String,
        key_type: Option<String>,
        oneof: Option<NodeId>,
        options: LinkedHashMap<String, Value>,
        syntax: Syntax,
    ) -> Self {
        Self {
            rule,
            id,
            r#type: RefCell::new(DeclaredType::Unresolved(type_name)),
            key_type: RefCell::new(key_type.map(DeclaredType::Unresolved)),
            oneof,
            resolved_type: RefCell::new(None),
            options,
            syntax,
        }
    }

    pub fn is_map(&self) -> bool {
        self.key_type.borrow().is_some()
    }
}
