//! The definition classifier: a descriptor record is a JSON object; the classifier inspects
//! shape, not a discriminator tag.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Message,
    Enum,
    Service,
    Extend,
}

/// `Extend` iff `ref` is a string. Checked first: an extend block never carries `name`, so it
/// can't collide with the other four shapes.
pub fn is_extend(def: &Map<String, Value>) -> bool {
    matches!(def.get("ref"), Some(Value::String(_)))
}

/// `Enum` iff `name` is a string AND `values` is a non-empty ordered sequence.
pub fn is_enum(def: &Map<String, Value>) -> bool {
    matches!(def.get("name"), Some(Value::String(_)))
        && matches!(def.get("values"), Some(Value::Array(v)) if !v.is_empty())
}

/// `Service` iff `name` is a string AND `rpc` is a non-null mapping.
pub fn is_service(def: &Map<String, Value>) -> bool {
    matches!(def.get("name"), Some(Value::String(_))) && matches!(def.get("rpc"), Some(Value::Object(_)))
}

/// `Message` iff `name` is a string AND neither `values` nor `rpc` is present.
pub fn is_message(def: &Map<String, Value>) -> bool {
    matches!(def.get("name"), Some(Value::String(_)))
        && def.get("values").is_none()
        && def.get("rpc").is_none()
}

/// `Message field` iff `rule`, `name`, `type` are strings AND `id` is present.
pub fn is_message_field(def: &Map<String, Value>) -> bool {
    matches!(def.get("rule"), Some(Value::String(_)))
        && matches!(def.get("name"), Some(Value::String(_)))
        && matches!(def.get("type"), Some(Value::String(_)))
        && def.get("id").is_some()
}

/// Classify a top-level or nested definition record. Returns `None` for records matching no
/// variant -- callers turn that into `BuildError::InvalidDefinition`.
pub fn classify(def: &Map<String, Value>) -> Option<DefinitionKind> {
    if is_extend(def) {
        Some(DefinitionKind::Extend)
    } else if is_enum(def) {
        Some(DefinitionKind::Enum)
    } else if is_service(def) {
        Some(DefinitionKind::Service)
    } else if is_message(def) {
        Some(DefinitionKind::Message)
    } else {
        None
    }
}
