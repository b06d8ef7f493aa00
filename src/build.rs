//! The build projection: turns the live arena into a `serde_json::Value` tree shaped like
//! protobufjs's own reflection JSON, and answers `lookup`/`build` path queries against it.
//!
//! A recursive, owned tree of structs gets this for free from a derived `Serialize` impl (a
//! wrapper struct nesting everything under one `"nested"` key, `#[serde(flatten)]` on the ordered
//! child maps). The arena here is flat and index-based, so there is no struct to derive
//! `Serialize` on; `project` walks the arena and assembles the equivalent `Value` by hand,
//! keeping the same key names (`nested`, `fields`, `oneofs`, `values`, `methods`) that approach
//! would produce.

use linked_hash_map::LinkedHashMap;
use serde_json::{json, Map, Value};

use crate::{
    builder::Root,
    error::ResolveError,
    field::{DeclaredType, Field},
    node::{Node, NodeId, NodeKind},
    oneof::OneOf,
    scope,
    service::RpcMethod,
};

impl Root {
    /// Resolves `path` against the tree, optionally restricted to namespace-like nodes.
    /// `None` searches from the tree root.
    pub fn lookup(&self, path: Option<&str>, exclude_non_namespace: bool) -> Option<NodeId> {
        match path {
            None => Some(self.root_id()),
            Some(p) if p.is_empty() => Some(self.root_id()),
            Some(p) => scope::resolve(&self.arena, self.root_id(), p, exclude_non_namespace),
        }
    }

    /// Runs the resolution pass if it hasn't already run, then projects the whole tree (or the
    /// subtree rooted at `path`) to JSON. Caches the whole-tree projection across calls until the
    /// next mutation invalidates it.
    pub fn build(&mut self, path: Option<&str>) -> Result<Option<Value>, ResolveError> {
        if !self.resolved {
            self.resolve_all()?;
        }

        if self.cached_build.borrow().is_none() {
            let whole = project(&self.arena, self.root_id());
            *self.cached_build.borrow_mut() = Some(whole);
        }

        let whole = self.cached_build.borrow().clone().expect("just populated above");
        match path {
            None => Ok(Some(whole)),
            Some(p) => Ok(self.lookup(Some(p), false).map(|id| project(&self.arena, id))),
        }
    }
}

fn project(arena: &[Node], id: NodeId) -> Value {
    match &arena[id.0].kind {
        NodeKind::Namespace(n) => {
            let mut map = Map::new();
            if !n.options.is_empty() {
                map.insert("options".to_string(), options_to_value(&n.options));
            }
            if let Some(nested) = project_children(arena, &n.children) {
                map.insert("nested".to_string(), nested);
            }
            Value::Object(map)
        }
        NodeKind::Message(m) => {
            let mut map = Map::new();
            map.insert("syntax".to_string(), json!(m.syntax.to_string()));
            if m.is_group {
                map.insert("group".to_string(), json!(true));
            }

            let mut fields = Map::new();
            let mut oneofs = Map::new();
            let mut nested = Map::new();
            for (name, child_id) in m.children.iter() {
                match &arena[child_id.0].kind {
                    NodeKind::Field(f) => {
                        fields.insert(name.clone(), project_field(f));
                    }
                    NodeKind::ExtensionField(ef) => {
                        fields.insert(name.clone(), project_field(&ef.field));
                    }
                    NodeKind::OneOf(o) => {
                        oneofs.insert(name.clone(), project_oneof(arena, o));
                    }
                    _ => {
                        nested.insert(name.clone(), project(arena, *child_id));
                    }
                }
            }

            if !fields.is_empty() {
                map.insert("fields".to_string(), Value::Object(fields));
            }
            if !oneofs.is_empty() {
                map.insert("oneofs".to_string(), Value::Object(oneofs));
            }
            if let Some((lo, hi)) = m.extension_range {
                map.insert("extensions".to_string(), json!([lo, hi]));
            }
            if !m.options.is_empty() {
                map.insert("options".to_string(), options_to_value(&m.options));
            }
            if !nested.is_empty() {
                map.insert("nested".to_string(), Value::Object(nested));
            }
            Value::Object(map)
        }
        NodeKind::Enum(e) => {
            let mut map = Map::new();
            map.insert("syntax".to_string(), json!(e.syntax.to_string()));
            let mut values = Map::new();
            for (name, child_id) in e.children.iter() {
                if let NodeKind::EnumValue(v) = &arena[child_id.0].kind {
                    values.insert(name.clone(), json!(v.id));
                }
            }
            map.insert("values".to_string(), Value::Object(values));
            if !e.options.is_empty() {
                map.insert("options".to_string(), options_to_value(&e.options));
            }
            Value::Object(map)
        }
        NodeKind::Service(s) => {
            let mut map = Map::new();
            let mut methods = Map::new();
            for (name, child_id) in s.children.iter() {
                if let NodeKind::RpcMethod(m) = &arena[child_id.0].kind {
                    methods.insert(name.clone(), project_rpc_method(m));
                }
            }
            if !methods.is_empty() {
                map.insert("methods".to_string(), Value::Object(methods));
            }
            if !s.options.is_empty() {
                map.insert("options".to_string(), options_to_value(&s.options));
            }
            Value::Object(map)
        }
        NodeKind::Field(f) => project_field(f),
        NodeKind::ExtensionField(ef) => project_field(&ef.field),
        NodeKind::EnumValue(v) => json!(v.id),
        NodeKind::RpcMethod(m) => project_rpc_method(m),
        NodeKind::OneOf(o) => project_oneof(arena, o),
        // an Extension is a thin wrapper; addressing it directly projects the field it wraps.
        NodeKind::Extension(ext) => project(arena, ext.field),
    }
}

fn project_children(arena: &[Node], children: &LinkedHashMap<String, NodeId>) -> Option<Value> {
    if children.is_empty() {
        return None;
    }
    let mut map = Map::new();
    for (name, id) in children.iter() {
        map.insert(name.clone(), project(arena, *id));
    }
    Some(Value::Object(map))
}

fn project_oneof(arena: &[Node], o: &OneOf) -> Value {
    let member_names: Vec<Value> = o.fields.iter().map(|fid| json!(arena[fid.0].name)).collect();
    json!({ "oneof": member_names })
}

fn project_rpc_method(m: &RpcMethod) -> Value {
    let mut method = Map::new();
    method.insert("requestType".to_string(), json!(m.request_name));
    method.insert("responseType".to_string(), json!(m.response_name));
    if m.request_stream {
        method.insert("requestStream".to_string(), json!(true));
    }
    if m.response_stream {
        method.insert("responseStream".to_string(), json!(true));
    }
    if !m.options.is_empty() {
        method.insert("options".to_string(), options_to_value(&m.options));
    }
    Value::Object(method)
}

fn project_field(f: &Field) -> Value {
    let mut map = Map::new();
    map.insert("rule".to_string(), json!(f.rule.to_string()));
    map.insert("type".to_string(), json!(f.r#type.borrow().to_display_string()));
    map.insert("id".to_string(), json!(f.id));
    if let Some(key) = f.key_type.borrow().as_ref() {
        map.insert("keyType".to_string(), json!(key.to_display_string()));
    }
    if !f.options.is_empty() {
        map.insert("options".to_string(), options_to_value(&f.options));
    }
    Value::Object(map)
}

fn options_to_value(options: &LinkedHashMap<String, Value>) -> Value {
    let map: Map<String, Value> = options.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn build_projects_scalar_field() {
        let mut root = Root::new();
        root.create(json!({
            "name": "M",
            "fields": [{"rule": "optional", "name": "x", "type": "int32", "id": 1}]
        }))
        .unwrap();

        let built = root.build(Some("M")).unwrap().unwrap();
        assert_eq!(
            built["fields"]["x"],
            json!({"rule": "optional", "type": "int32", "id": 1})
        );
    }

    #[test]
    fn build_projects_nested_namespace_and_message() {
        let mut root = Root::new();
        root.define("a.b").unwrap();
        root.create(json!({"name": "M", "fields": []})).unwrap();

        let whole = root.build(None).unwrap().unwrap();
        assert!(whole["nested"]["a"]["nested"]["b"]["nested"]["M"].is_object());
    }

    #[test]
    fn build_projects_enum_values() {
        let mut root = Root::new();
        root.create(json!({"name": "E", "values": [{"name": "A", "id": 0}, {"name": "B", "id": 1}]}))
            .unwrap();

        let built = root.build(Some("E")).unwrap().unwrap();
        assert_eq!(built["values"]["A"], json!(0));
        assert_eq!(built["values"]["B"], json!(1));
    }

    #[test]
    fn build_projects_service_methods() {
        let mut root = Root::new();
        root.create(json!({"name": "Req", "fields": []})).unwrap();
        root.create(json!({"name": "Resp", "fields": []})).unwrap();
        root.create(json!({
            "name": "Svc",
            "rpc": {"Do": {"requestType": "Req", "responseType": "Resp", "requestStream": true}}
        }))
        .unwrap();

        let built = root.build(Some("Svc")).unwrap().unwrap();
        assert_eq!(built["methods"]["Do"]["requestType"], json!("Req"));
        assert_eq!(built["methods"]["Do"]["requestStream"], json!(true));
    }

    #[test]
    fn build_caches_until_invalidated_by_a_mutation() {
        let mut root = Root::new();
        root.create(json!({"name": "M", "fields": []})).unwrap();
        root.build(None).unwrap();
        assert!(root.cached_build.borrow().is_some());

        root.create(json!({"name": "N", "fields": []})).unwrap();
        assert!(root.cached_build.borrow().is_none());
    }

    #[test]
    fn lookup_with_no_path_returns_root() {
        let root = Root::new();
        assert_eq!(root.lookup(None, false), Some(root.root_id()));
    }

    #[test]
    fn build_projects_rpc_method_directly() {
        let mut root = Root::new();
        root.create(json!({"name": "Req", "fields": []})).unwrap();
        root.create(json!({"name": "Resp", "fields": []})).unwrap();
        root.create(json!({
            "name": "Svc",
            "rpc": {"Do": {"requestType": "Req", "responseType": "Resp", "requestStream": true}}
        }))
        .unwrap();

        let built = root.build(Some("Svc.Do")).unwrap().unwrap();
        assert_eq!(built["requestType"], json!("Req"));
        assert_eq!(built["requestStream"], json!(true));
    }

    #[test]
    fn build_projects_oneof_directly() {
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

        let built = root.build(Some("M.u")).unwrap().unwrap();
        assert_eq!(built["oneof"], json!(["a", "b"]));
    }

    #[test]
    fn build_projects_extension_as_its_wrapped_field() {
        let mut root = Root::new();
        root.create(json!({"name": "M", "extensions": [100, 200]})).unwrap();
        root.create(json!({
            "ref": "M",
            "fields": [{"rule": "optional", "name": "bar", "type": "int32", "id": 100}]
        }))
        .unwrap();

        let built = root.build(Some("bar")).unwrap().unwrap();
        assert_eq!(built, json!({"rule": "optional", "type": "int32", "id": 100}));
    }
}
