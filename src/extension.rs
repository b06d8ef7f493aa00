use crate::{field::Field, node::NodeId};

/// A Field whose runtime key (the owning [`Node`](crate::node::Node)'s `name`) is the fully
/// qualified name at the extension declaration site. Lives as a child of the *target* message,
/// not of the namespace the `extend` block appeared in.
#[derive(Debug)]
pub struct ExtensionField {
    pub field: Field,

    /// The message this field was added to.
    pub extendee: NodeId,

    /// The namespace the `extend` block appeared in -- symbolic types on this field resolve
    /// against this scope, not against `extendee`.
    pub declared_scope: NodeId,
}

/// A thin wrapper node placed in the namespace where the `extend` block appeared. Its own
/// `name` is the original source name, unaffected by `convertFieldsToCamelCase`.
#[derive(Debug)]
pub struct Extension {
    pub field: NodeId,
}
