use linked_hash_map::LinkedHashMap;
use serde_json::Value;

use crate::{
    enum_def::{Enum, EnumValue},
    extension::{Extension, ExtensionField},
    field::Field,
    message::Message,
    namespace::Namespace,
    oneof::OneOf,
    service::{RpcMethod, Service},
};

/// A `NodeId` is an index into [`crate::builder::Root`]'s arena. Resolution edges
/// (`Field::resolved_type`, `RpcMethod::resolved_request`, ...) are plain `NodeId`s rather than
/// `Rc`/`Weak` pointers: they may point anywhere in the arena, including back up the tree, without
/// ever implying ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// The tagged variants of the reflection tree. Every variant shares `{name, parent}`;
/// `children` (an ordered name -> `NodeId` map) only exists on the variants that are namespaces
/// in the structural sense -- `Namespace`, `Message`, `Enum` and `Service`.
#[derive(Debug)]
pub enum NodeKind {
    Namespace(Namespace),
    Message(Message),
    Field(Field),
    ExtensionField(ExtensionField),
    Extension(Extension),
    OneOf(OneOf),
    Enum(Enum),
    EnumValue(EnumValue),
    Service(Service),
    RpcMethod(RpcMethod),
}

impl NodeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Namespace(_) => "namespace",
            NodeKind::Message(_) => "message",
            NodeKind::Field(_) => "field",
            NodeKind::ExtensionField(_) => "field",
            NodeKind::Extension(_) => "extension",
            NodeKind::OneOf(_) => "oneof",
            NodeKind::Enum(_) => "enum",
            NodeKind::EnumValue(_) => "enum value",
            NodeKind::Service(_) => "service",
            NodeKind::RpcMethod(_) => "rpc",
        }
    }

    /// True for node kinds the scope resolver may descend into by name (`excludeNonNamespace`
    /// filters these in, everything else out).
    pub fn is_namespace_like(&self) -> bool {
        matches!(
            self,
            NodeKind::Namespace(_) | NodeKind::Message(_) | NodeKind::Enum(_) | NodeKind::Service(_)
        )
    }

    /// The child-lookup map, shared by every namespace-like kind. For `Message` this map holds
    /// both nested types *and* declared fields side by side -- the same combined ordering
    /// `lookup("a.b.M.x")` relies on to find a field by plain name.
    pub fn children(&self) -> Option<&LinkedHashMap<String, NodeId>> {
        match self {
            NodeKind::Namespace(n) => Some(&n.children),
            NodeKind::Message(m) => Some(&m.children),
            NodeKind::Enum(e) => Some(&e.children),
            NodeKind::Service(s) => Some(&s.children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut LinkedHashMap<String, NodeId>> {
        match self {
            NodeKind::Namespace(n) => Some(&mut n.children),
            NodeKind::Message(m) => Some(&mut m.children),
            NodeKind::Enum(e) => Some(&mut e.children),
            NodeKind::Service(s) => Some(&mut s.children),
            _ => None,
        }
    }

    /// The option map, shared by every kind that carries one: a mapping of string option names
    /// to option values.
    pub fn options_mut(&mut self) -> Option<&mut LinkedHashMap<String, Value>> {
        match self {
            NodeKind::Namespace(n) => Some(&mut n.options),
            NodeKind::Message(m) => Some(&mut m.options),
            NodeKind::Enum(e) => Some(&mut e.options),
            NodeKind::Service(s) => Some(&mut s.options),
            _ => None,
        }
    }
}

/// A single entry in the arena: the node's own data plus its back-reference to its unique owner
/// (every child has exactly one parent, except the root).
#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(name: impl Into<String>, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            parent,
            kind,
        }
    }

    /// The node's fully qualified name: the dot-joined path of names from the root, omitting
    /// the root itself.
    pub fn fully_qualified_name(arena: &[Node], mut id: NodeId) -> String {
        let mut segments = Vec::new();
        loop {
            let node = &arena[id.0];
            match node.parent {
                None => break,
                Some(parent) => {
                    segments.push(node.name.as_str());
                    id = parent;
                }
            }
        }
        segments.reverse();
        segments.join(".")
    }
}
