use crate::node::NodeId;

/// A named grouping of fields within one message. Owns an ordered list of member
/// field node ids, populated as fields naming this oneof are ingested. Every
/// oneof reference on a field names a oneof declared earlier in the same message.
#[derive(Debug, Default)]
pub struct OneOf {
    pub fields: Vec<NodeId>,
}

impl OneOf {
    pub fn new() -> Self {
        Self::default()
    }
}
