//! The ingestion engine and the `Root` type tying the whole reflection tree together: the
//! arena, the moving insertion pointer, and the builder-wide configuration.

use std::cell::RefCell;
use std::collections::HashSet;

use convert_case::{Case, Casing};
use linked_hash_map::LinkedHashMap;
use serde_json::{Map, Value};

use crate::{
    enum_def::{Enum, EnumValue},
    error::BuildError,
    extension::{Extension, ExtensionField},
    field::{Field, FieldRule},
    message::Message,
    namespace::Namespace,
    node::{Node, NodeId, NodeKind},
    oneof::OneOf,
    scalar,
    scope,
    service::{RpcMethod, Service},
    syntax::Syntax,
};

/// Legal field ids. Extension ranges are clamped to this interval at construction.
pub const ID_MIN: i32 = 1;
pub const ID_MAX: i32 = 536_870_911;

/// `convertFieldsToCamelCase`: rewrites extension field runtime keys to camelCase. The
/// builder-wide configuration knob, threaded through [`Root::with_options`] the way a parser
/// carries a root directory.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub convert_fields_to_camel_case: bool,
}

/// The reflection tree plus the mutable state the two-phase pipeline needs: the insertion
/// pointer, the resolved/cached-build latch, and the import dedup set. Single-threaded and
/// non-reentrant.
#[derive(Debug)]
pub struct Root {
    pub(crate) arena: Vec<Node>,
    pub(crate) ptr: NodeId,
    pub(crate) resolved: bool,
    pub(crate) cached_build: RefCell<Option<Value>>,
    pub(crate) imported: HashSet<String>,
    pub(crate) import_root: Option<String>,
    pub(crate) options: BuildOptions,
}

impl Default for Root {
    fn default() -> Self {
        Self::new()
    }
}

impl Root {
    pub fn new() -> Self {
        Self::with_options(BuildOptions::default())
    }

    pub fn with_options(options: BuildOptions) -> Self {
        let root_node = Node::new("", None, NodeKind::Namespace(Namespace::new()));
        Self {
            arena: vec![root_node],
            ptr: NodeId(0),
            resolved: false,
            cached_build: RefCell::new(None),
            imported: HashSet::new(),
            import_root: None,
            options,
        }
    }

    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    /// Moves the insertion pointer back to the root.
    pub fn reset(&mut self) {
        self.ptr = self.root_id();
    }

    pub(crate) fn invalidate(&mut self) {
        self.resolved = false;
        *self.cached_build.get_mut() = None;
    }

    /// For each dotted segment, reuse an existing child namespace or create one; advances the
    /// insertion pointer to the final segment.
    pub fn define(&mut self, dotted: &str) -> Result<NodeId, BuildError> {
        if dotted.is_empty() || dotted.starts_with('.') || !scalar::is_type_ref(dotted) {
            return Err(BuildError::IllegalNamespace(dotted.to_string()));
        }

        let mut current = self.ptr;
        for segment in dotted.split('.') {
            current = self.ensure_child_namespace(current, segment);
        }
        self.ptr = current;
        self.invalidate();
        Ok(current)
    }

    fn ensure_child_namespace(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(children) = self.arena[parent.0].kind.children() {
            if let Some(&id) = children.get(name) {
                return id;
            }
        }
        self.push_child(parent, name, NodeKind::Namespace(Namespace::new()))
    }

    fn push_child(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> NodeId {
        let id = NodeId(self.arena.len());
        self.arena.push(Node::new(name, Some(parent), kind));
        if let Some(children) = self.arena[parent.0].kind.children_mut() {
            children.insert(name.to_string(), id);
        }
        id
    }

    /// Accepts either a single descriptor or an ordered sequence.
    pub fn create(&mut self, defs: Value) -> Result<(), BuildError> {
        let list = as_def_list(&defs)?;
        self.create_list(list)?;
        self.invalidate();
        Ok(())
    }

    /// Processes a list of sibling definitions under the current pointer. Implemented with plain
    /// recursion rather than an explicit work-stack, which is fine as long as depth is bounded
    /// by the input, which message nesting naturally is (see `DESIGN.md`).
    pub(crate) fn create_list(&mut self, defs: Vec<Map<String, Value>>) -> Result<(), BuildError> {
        for def in defs {
            match crate::classifier::classify(&def) {
                Some(crate::classifier::DefinitionKind::Message) => {
                    self.create_message(def)?;
                }
                Some(crate::classifier::DefinitionKind::Enum) => {
                    self.create_enum(def)?;
                }
                Some(crate::classifier::DefinitionKind::Service) => {
                    self.create_service(def)?;
                }
                Some(crate::classifier::DefinitionKind::Extend) => {
                    self.create_extend(def)?;
                }
                None => {
                    return Err(BuildError::InvalidDefinition(format!("{:?}", Value::Object(def))));
                }
            }
        }
        Ok(())
    }

    fn create_message(&mut self, def: Map<String, Value>) -> Result<NodeId, BuildError> {
        let name = get_str(&def, "name")?.to_string();
        let syntax = Syntax::from_str_opt(def.get("syntax").and_then(Value::as_str));
        let is_group = matches!(def.get("group"), Some(Value::Bool(true)));

        let message_id = self.push_child(self.ptr, &name, NodeKind::Message(Message::new(syntax, is_group)));

        if let Some(Value::Object(oneofs)) = def.get("oneofs") {
            for oneof_name in oneofs.keys() {
                self.push_child(message_id, oneof_name, NodeKind::OneOf(OneOf::new()));
            }
        }

        // an absent `fields` list is treated as empty (see `DESIGN.md`).
        if let Some(fields) = def.get("fields") {
            let fields = fields
                .as_array()
                .ok_or_else(|| BuildError::InvalidDefinition(format!("fields of {:?}", name)))?;
            for f in fields {
                let f = f
                    .as_object()
                    .ok_or_else(|| BuildError::InvalidDefinition(format!("field of {:?}", name)))?;
                self.create_field(message_id, &name, f, syntax)?;
            }
        }

        if let Some(range) = def.get("extensions") {
            let (lo, hi) = parse_extension_range(range)?;
            if let NodeKind::Message(m) = &mut self.arena[message_id.0].kind {
                m.extension_range = Some((lo.max(ID_MIN), hi.min(ID_MAX)));
            }
        }

        if let Some(Value::Object(opts)) = def.get("options") {
            merge_options(&mut self.arena[message_id.0].kind, opts);
        }

        let saved_ptr = self.ptr;
        self.ptr = message_id;
        let nested = gather_nested(&def);
        let result = if nested.is_empty() {
            Ok(())
        } else {
            self.create_list(nested)
        };
        self.ptr = saved_ptr;
        result?;

        Ok(message_id)
    }

    fn create_field(
        &mut self,
        message_id: NodeId,
        message_name: &str,
        f: &Map<String, Value>,
        syntax: Syntax,
    ) -> Result<NodeId, BuildError> {
        let rule_name = get_str(f, "rule")?;
        let rule = FieldRule::from_name(rule_name)
            .ok_or_else(|| BuildError::InvalidDefinition(format!("field rule {:?}", rule_name)))?;
        let name = get_str(f, "name")?.to_string();
        let type_name = get_str(f, "type")?.to_string();
        let id = get_i32(f, "id")?;

        if self.message_ref(message_id).field_ids.contains_key(&id) {
            return Err(BuildError::DuplicateFieldId {
                message: message_name.to_string(),
                id,
            });
        }

        let oneof = match f.get("oneof").and_then(Value::as_str) {
            Some(oneof_name) => {
                let existing = self
                    .message_ref(message_id)
                    .children
                    .get(oneof_name)
                    .copied()
                    .filter(|id| matches!(self.arena[id.0].kind, NodeKind::OneOf(_)));
                match existing {
                    Some(id) => Some(id),
                    None => {
                        return Err(BuildError::IllegalOneof {
                            field: name,
                            oneof: oneof_name.to_string(),
                        })
                    }
                }
            }
            None => None,
        };

        let key_type = f.get("keyType").and_then(Value::as_str).map(str::to_string);
        let options = match f.get("options") {
            None => LinkedHashMap::new(),
            Some(Value::Object(o)) => clone_options(o),
            Some(_) => return Err(BuildError::IllegalOptions { field: name }),
        };

        let field = Field::new(rule, id, type_name, key_type, oneof, options, syntax);
        let field_id = self.push_child(message_id, &name, NodeKind::Field(field));

        if let NodeKind::Message(m) = &mut self.arena[message_id.0].kind {
            m.field_ids.insert(id, field_id);
        }
        if let Some(oneof_id) = oneof {
            if let NodeKind::OneOf(o) = &mut self.arena[oneof_id.0].kind {
                o.fields.push(field_id);
            }
        }

        Ok(field_id)
    }

    fn create_enum(&mut self, def: Map<String, Value>) -> Result<NodeId, BuildError> {
        let name = get_str(&def, "name")?.to_string();
        let syntax = Syntax::from_str_opt(def.get("syntax").and_then(Value::as_str));
        let enum_id = self.push_child(self.ptr, &name, NodeKind::Enum(Enum::new(syntax)));

        if let Some(values) = def.get("values") {
            let values = values
                .as_array()
                .ok_or_else(|| BuildError::InvalidDefinition(format!("values of {:?}", name)))?;
            for v in values {
                let v = v
                    .as_object()
                    .ok_or_else(|| BuildError::InvalidDefinition(format!("enum value of {:?}", name)))?;
                let vname = get_str(v, "name")?.to_string();
                let vid = get_i32(v, "id")?;
                self.push_child(enum_id, &vname, NodeKind::EnumValue(EnumValue { id: vid }));
            }
        }

        if let Some(Value::Object(opts)) = def.get("options") {
            merge_options(&mut self.arena[enum_id.0].kind, opts);
        }

        Ok(enum_id)
    }

    fn create_service(&mut self, def: Map<String, Value>) -> Result<NodeId, BuildError> {
        let name = get_str(&def, "name")?.to_string();
        let service_id = self.push_child(self.ptr, &name, NodeKind::Service(Service::new()));

        if let Some(Value::Object(rpc)) = def.get("rpc") {
            for (method_name, m) in rpc {
                let m = m
                    .as_object()
                    .ok_or_else(|| BuildError::InvalidDefinition(format!("rpc {:?}", method_name)))?;
                let request_name = get_str(m, "requestType")?.to_string();
                let response_name = get_str(m, "responseType")?.to_string();
                let request_stream = m.get("requestStream").and_then(Value::as_bool).unwrap_or(false);
                let response_stream = m.get("responseStream").and_then(Value::as_bool).unwrap_or(false);
                let options = match m.get("options") {
                    Some(Value::Object(o)) => clone_options(o),
                    _ => LinkedHashMap::new(),
                };
                self.push_child(
                    service_id,
                    method_name,
                    NodeKind::RpcMethod(RpcMethod::new(
                        request_name,
                        response_name,
                        request_stream,
                        response_stream,
                        options,
                    )),
                );
            }
        }

        if let Some(Value::Object(opts)) = def.get("options") {
            merge_options(&mut self.arena[service_id.0].kind, opts);
        }

        Ok(service_id)
    }

    fn create_extend(&mut self, def: Map<String, Value>) -> Result<(), BuildError> {
        let ref_name = get_str(&def, "ref")?.to_string();

        let target = scope::resolve(&self.arena, self.ptr, &ref_name, true)
            .filter(|id| matches!(self.arena[id.0].kind, NodeKind::Message(_)));

        let target = match target {
            Some(t) => t,
            None => {
                if ref_name.trim_start_matches('.').starts_with("google.protobuf.") {
                    return Ok(());
                }
                return Err(BuildError::ExtendedNotDefined(ref_name));
            }
        };

        let extend_scope = self.ptr;
        let target_fqn = Node::fully_qualified_name(&self.arena, target);

        if let Some(fields) = def.get("fields") {
            let fields = fields
                .as_array()
                .ok_or_else(|| BuildError::InvalidDefinition(format!("extend fields on {:?}", ref_name)))?;
            for f in fields {
                let f = f
                    .as_object()
                    .ok_or_else(|| BuildError::InvalidDefinition(format!("extension field on {:?}", ref_name)))?;
                self.create_extension_field(target, &target_fqn, extend_scope, f)?;
            }
        }

        Ok(())
    }

    fn create_extension_field(
        &mut self,
        target: NodeId,
        target_fqn: &str,
        extend_scope: NodeId,
        f: &Map<String, Value>,
    ) -> Result<(), BuildError> {
        let rule_name = get_str(f, "rule")?;
        let rule = FieldRule::from_name(rule_name)
            .ok_or_else(|| BuildError::InvalidDefinition(format!("field rule {:?}", rule_name)))?;
        let original_name = get_str(f, "name")?.to_string();
        let type_name = get_str(f, "type")?.to_string();
        let id = get_i32(f, "id")?;
        let key_type = f.get("keyType").and_then(Value::as_str).map(str::to_string);
        let options = match f.get("options") {
            None => LinkedHashMap::new(),
            Some(Value::Object(o)) => clone_options(o),
            Some(_) => return Err(BuildError::IllegalOptions { field: original_name }),
        };

        {
            let target_message = self.message_ref(target);
            if target_message.field_ids.contains_key(&id) {
                return Err(BuildError::DuplicateFieldId {
                    message: target_fqn.to_string(),
                    id,
                });
            }
            match target_message.extension_range {
                Some((lo, hi)) if id >= lo && id <= hi => {}
                _ => {
                    return Err(BuildError::IllegalExtensionRange {
                        message: target_fqn.to_string(),
                        id,
                    })
                }
            }
        }

        let effective_name = if self.options.convert_fields_to_camel_case {
            original_name.to_case(Case::Camel)
        } else {
            original_name.clone()
        };
        let runtime_key = format!("{}.{}", target_fqn, effective_name);
        let syntax = self.message_ref(target).syntax;

        let field = Field::new(rule, id, type_name, key_type, None, options, syntax);
        let ext_field = ExtensionField {
            field,
            extendee: target,
            declared_scope: extend_scope,
        };

        let field_id = NodeId(self.arena.len());
        self.arena
            .push(Node::new(runtime_key.clone(), Some(target), NodeKind::ExtensionField(ext_field)));

        if let NodeKind::Message(m) = &mut self.arena[target.0].kind {
            m.children.insert(runtime_key, field_id);
            m.field_ids.insert(id, field_id);
        }

        self.push_child(extend_scope, &original_name, NodeKind::Extension(Extension { field: field_id }));

        Ok(())
    }

    pub(crate) fn message_ref(&self, id: NodeId) -> &Message {
        match &self.arena[id.0].kind {
            NodeKind::Message(m) => m,
            other => panic!("node {:?} is a {}, not a message", id, other.type_name()),
        }
    }
}

fn as_def_list(defs: &Value) -> Result<Vec<Map<String, Value>>, BuildError> {
    match defs {
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_object()
                    .cloned()
                    .ok_or_else(|| BuildError::InvalidDefinition(v.to_string()))
            })
            .collect(),
        Value::Object(o) => Ok(vec![o.clone()]),
        other => Err(BuildError::InvalidDefinition(other.to_string())),
    }
}

fn get_str<'a>(def: &'a Map<String, Value>, key: &str) -> Result<&'a str, BuildError> {
    def.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| BuildError::InvalidDefinition(format!("missing {:?}", key)))
}

fn get_i32(def: &Map<String, Value>, key: &str) -> Result<i32, BuildError> {
    def.get(key)
        .and_then(Value::as_i64)
        .map(|v| v as i32)
        .ok_or_else(|| BuildError::InvalidDefinition(format!("missing {:?}", key)))
}

fn parse_extension_range(v: &Value) -> Result<(i32, i32), BuildError> {
    match v.as_array() {
        Some(arr) if arr.len() == 2 => {
            let lo = arr[0]
                .as_i64()
                .ok_or_else(|| BuildError::InvalidDefinition("extensions range".to_string()))? as i32;
            let hi = arr[1]
                .as_i64()
                .ok_or_else(|| BuildError::InvalidDefinition("extensions range".to_string()))? as i32;
            Ok((lo, hi))
        }
        _ => Err(BuildError::InvalidDefinition("extensions range".to_string())),
    }
}

/// Top-level descriptor keys that may carry nested definitions, in the order a faithful
/// `create_list` should process them. A nested `extend` is processed in the same pass as
/// nested messages/enums/services, deliberately unlike the package-level ordering `import`
/// enforces (where extends run last so they can see same-file forward types).
fn gather_nested(def: &Map<String, Value>) -> Vec<Map<String, Value>> {
    let mut out = Vec::new();
    for key in ["messages", "enums", "services", "extends"] {
        if let Some(Value::Array(items)) = def.get(key) {
            for item in items {
                if let Some(obj) = item.as_object() {
                    out.push(obj.clone());
                }
            }
        }
    }
    out
}

pub(crate) fn clone_options(o: &Map<String, Value>) -> LinkedHashMap<String, Value> {
    o.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

pub(crate) fn merge_options(kind: &mut NodeKind, opts: &Map<String, Value>) {
    if let Some(options) = kind.options_mut() {
        for (k, v) in opts {
            options.insert(k.clone(), v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn define_and_nest() {
        let mut root = Root::new();
        root.define("a.b").unwrap();
        root.create(json!({
            "name": "M",
            "fields": [{"rule": "optional", "name": "x", "type": "int32", "id": 1}]
        }))
        .unwrap();

        let field = root.lookup(Some("a.b.M.x"), false).unwrap();
        match &root.arena[field.0].kind {
            NodeKind::Field(f) => assert_eq!(f.id, 1),
            other => panic!("expected a field, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_field_id_is_rejected() {
        let mut root = Root::new();
        let err = root
            .create(json!({
                "name": "M",
                "fields": [
                    {"rule": "optional", "name": "x", "type": "int32", "id": 1},
                    {"rule": "optional", "name": "y", "type": "int32", "id": 1}
                ]
            }))
            .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateFieldId { id: 1, .. }));
    }

    #[test]
    fn oneof_membership_tracks_both_fields() {
        let mut root = Root::new();
        root.create(json!({
            "name": "M",
            "oneofs": {"u": {}},
            "fields": [
                {"rule": "optional", "name": "a", "type": "int32", "id": 1, "oneof": "u"},
                {"rule": "optional", "name": "b", "type": "int32", "id": 2, "oneof": "u"}
            ]
        }))
        .unwrap();

        let oneof_id = root.lookup(Some("M.u"), false).unwrap();
        let (a_id, b_id) = (
            root.lookup(Some("M.a"), false).unwrap(),
            root.lookup(Some("M.b"), false).unwrap(),
        );

        match &root.arena[oneof_id.0].kind {
            NodeKind::OneOf(o) => assert_eq!(o.fields, vec![a_id, b_id]),
            other => panic!("expected a oneof, got {:?}", other),
        }
        for field_id in [a_id, b_id] {
            match &root.arena[field_id.0].kind {
                NodeKind::Field(f) => assert_eq!(f.oneof, Some(oneof_id)),
                other => panic!("expected a field, got {:?}", other),
            }
        }
    }

    #[test]
    fn oneof_reference_to_undeclared_name_fails() {
        let mut root = Root::new();
        let err = root
            .create(json!({
                "name": "M",
                "fields": [{"rule": "optional", "name": "a", "type": "int32", "id": 1, "oneof": "missing"}]
            }))
            .unwrap_err();
        assert!(matches!(err, BuildError::IllegalOneof { .. }));
    }

    #[test]
    fn missing_fields_list_is_treated_as_empty() {
        let mut root = Root::new();
        root.create(json!({"name": "Empty"})).unwrap();
        let id = root.lookup(Some("Empty"), false).unwrap();
        match &root.arena[id.0].kind {
            NodeKind::Message(m) => assert!(m.children.is_empty()),
            other => panic!("expected a message, got {:?}", other),
        }
    }

    #[test]
    fn extension_range_enforcement() {
        let mut root = Root::new();
        root.create(json!({"name": "M", "extensions": [100, 200]})).unwrap();
        let err = root
            .create(json!({
                "ref": "M",
                "fields": [{"rule": "optional", "name": "x", "type": "int32", "id": 99}]
            }))
            .unwrap_err();
        assert!(matches!(err, BuildError::IllegalExtensionRange { id: 99, .. }));
    }

    #[test]
    fn extend_targets_message_and_adds_field_with_preserved_extension_name() {
        let mut root = Root::new();
        root.create(json!({"name": "M", "extensions": [100, 200]})).unwrap();
        root.create(json!({
            "ref": "M",
            "fields": [{"rule": "optional", "name": "bar", "type": "int32", "id": 100}]
        }))
        .unwrap();

        let extension_id = root.lookup(Some("bar"), false).unwrap();
        match &root.arena[extension_id.0].kind {
            NodeKind::Extension(_) => {}
            other => panic!("expected an extension, got {:?}", other),
        }
    }

    #[test]
    fn extend_on_well_known_type_is_silently_skipped() {
        let mut root = Root::new();
        root.create(json!({
            "ref": "google.protobuf.FileOptions",
            "fields": [{"rule": "optional", "name": "bar", "type": "int32", "id": 50000}]
        }))
        .unwrap();
    }

    #[test]
    fn extend_on_undefined_message_fails() {
        let mut root = Root::new();
        let err = root
            .create(json!({
                "ref": "Missing",
                "fields": [{"rule": "optional", "name": "bar", "type": "int32", "id": 1}]
            }))
            .unwrap_err();
        assert!(matches!(err, BuildError::ExtendedNotDefined(_)));
    }

    #[test]
    fn extension_field_without_a_rule_is_rejected() {
        let mut root = Root::new();
        root.create(json!({"name": "M", "extensions": [100, 200]})).unwrap();
        let err = root
            .create(json!({
                "ref": "M",
                "fields": [{"name": "bar", "type": "int32", "id": 100}]
            }))
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidDefinition(_)));
    }

    #[test]
    fn define_rejects_illegal_namespace() {
        let mut root = Root::new();
        assert!(matches!(root.define(""), Err(BuildError::IllegalNamespace(_))));
        assert!(matches!(root.define(".a.b"), Err(BuildError::IllegalNamespace(_))));
    }

    #[test]
    fn nested_message_attaches_under_parent_and_restores_pointer() {
        let mut root = Root::new();
        root.create(json!({
            "name": "Outer",
            "messages": [{"name": "Inner", "fields": []}]
        }))
        .unwrap();

        assert!(root.lookup(Some("Outer.Inner"), false).is_some());
        assert_eq!(root.ptr, root.root_id());
    }
}
