//! The resolution pass: a depth-first walk that binds every symbolic type
//! reference to a concrete reflection node, resolves map key types, and enforces
//! cross-syntax compatibility.

use crate::{
    builder::Root,
    error::ResolveError,
    field::{DeclaredType, Field},
    node::{Node, NodeId, NodeKind},
    scalar::BuiltinType,
    scope,
    syntax::Syntax,
};

impl Root {
    /// Runs the resolution pass and latches `resolved`. Idempotent in the sense that re-running
    /// it on an already-resolved tree simply re-resolves already-resolved fields (a no-op, since
    /// their declared type is already `Resolved`).
    pub fn resolve_all(&mut self) -> Result<(), ResolveError> {
        let root = self.root_id();
        self.resolve_node(root)?;
        self.reset();
        self.resolved = true;
        Ok(())
    }

    fn resolve_node(&mut self, id: NodeId) -> Result<(), ResolveError> {
        match &self.arena[id.0].kind {
            NodeKind::Namespace(_) | NodeKind::Message(_) | NodeKind::Service(_) => {
                let children: Vec<NodeId> = self.arena[id.0].kind.children().unwrap().values().copied().collect();
                for child in children {
                    self.resolve_node(child)?;
                }
                Ok(())
            }
            NodeKind::Field(_) => self.resolve_field(id),
            NodeKind::ExtensionField(_) => self.resolve_extension_field(id),
            NodeKind::RpcMethod(_) => self.resolve_rpc(id),
            NodeKind::Enum(_) | NodeKind::EnumValue(_) | NodeKind::OneOf(_) | NodeKind::Extension(_) => Ok(()),
        }
    }

    fn resolve_field(&mut self, id: NodeId) -> Result<(), ResolveError> {
        let parent = self.arena[id.0].parent.expect("field always has a parent");
        self.resolve_field_type(id, parent)
    }

    fn resolve_extension_field(&mut self, id: NodeId) -> Result<(), ResolveError> {
        let declared_scope = match &self.arena[id.0].kind {
            NodeKind::ExtensionField(ef) => ef.declared_scope,
            _ => unreachable!(),
        };
        self.resolve_field_type(id, declared_scope)
    }

    /// Resolves `type` and, if present, `key_type` on the field at `field_id`, against
    /// `scope_from` (the field's own parent for a plain field, or the `extend` site for an
    /// extension field).
    fn resolve_field_type(&mut self, field_id: NodeId, scope_from: NodeId) -> Result<(), ResolveError> {
        let field_name = Node::fully_qualified_name(&self.arena, field_id);
        let field = self.field_data(field_id);
        let declared_type = field.r#type.borrow().clone_declared();
        let declared_key = field
            .key_type
            .borrow()
            .as_ref()
            .and_then(|d| d.clone_if_unresolved());
        let field_syntax = field.syntax;

        if let Some(type_name) = declared_type {
            if let Some(tag) = BuiltinType::from_name(&type_name) {
                self.set_field_tag(field_id, tag);
            } else {
                if !crate::scalar::is_type_ref(&type_name) {
                    return Err(ResolveError::UnresolvableType(type_name));
                }

                let resolved = scope::resolve(&self.arena, scope_from, &type_name, false)
                    .ok_or_else(|| ResolveError::UnresolvableType(type_name.clone()))?;

                let tag = match &self.arena[resolved.0].kind {
                    NodeKind::Enum(e) => {
                        if field_syntax == Syntax::Proto3 && e.syntax == Syntax::Proto2 {
                            return Err(ResolveError::SyntaxMismatch {
                                field: field_name,
                                r#enum: Node::fully_qualified_name(&self.arena, resolved),
                            });
                        }
                        BuiltinType::Enum
                    }
                    NodeKind::Message(m) => {
                        if m.is_group {
                            BuiltinType::Group
                        } else {
                            BuiltinType::Message
                        }
                    }
                    _ => return Err(ResolveError::UnresolvableType(type_name)),
                };

                self.set_field_tag(field_id, tag);
                self.set_field_resolved_type(field_id, resolved);
            }
        }

        if let Some(key_name) = declared_key {
            let tag = BuiltinType::from_name(&key_name).ok_or_else(|| ResolveError::IllegalKeyType(key_name.clone()))?;
            if !tag.is_valid_map_key() {
                return Err(ResolveError::IllegalKeyType(key_name));
            }
            self.set_field_key_tag(field_id, tag);
        }

        Ok(())
    }

    fn resolve_rpc(&mut self, id: NodeId) -> Result<(), ResolveError> {
        let parent = self.arena[id.0].parent.expect("rpc always has a parent");
        let (request_name, response_name) = match &self.arena[id.0].kind {
            NodeKind::RpcMethod(m) => (m.request_name.clone(), m.response_name.clone()),
            _ => unreachable!(),
        };

        let request = scope::resolve(&self.arena, parent, &request_name, true)
            .filter(|id| matches!(self.arena[id.0].kind, NodeKind::Message(_)))
            .ok_or_else(|| ResolveError::UnresolvableType(request_name))?;
        let response = scope::resolve(&self.arena, parent, &response_name, true)
            .filter(|id| matches!(self.arena[id.0].kind, NodeKind::Message(_)))
            .ok_or_else(|| ResolveError::UnresolvableType(response_name))?;

        if let NodeKind::RpcMethod(m) = &self.arena[id.0].kind {
            *m.resolved_request.borrow_mut() = Some(request);
            *m.resolved_response.borrow_mut() = Some(response);
        }
        Ok(())
    }

    fn field_data(&self, id: NodeId) -> &Field {
        match &self.arena[id.0].kind {
            NodeKind::Field(f) => f,
            NodeKind::ExtensionField(ef) => &ef.field,
            other => panic!("node {:?} is a {}, not a field", id, other.type_name()),
        }
    }

    fn set_field_tag(&self, id: NodeId, tag: BuiltinType) {
        *self.field_data(id).r#type.borrow_mut() = DeclaredType::Resolved(tag);
    }

    fn set_field_resolved_type(&self, id: NodeId, target: NodeId) {
        *self.field_data(id).resolved_type.borrow_mut() = Some(target);
    }

    fn set_field_key_tag(&self, id: NodeId, tag: BuiltinType) {
        *self.field_data(id).key_type.borrow_mut() = Some(DeclaredType::Resolved(tag));
    }
}

impl DeclaredType {
    fn clone_declared(&self) -> Option<String> {
        match self {
            DeclaredType::Unresolved(s) => Some(s.clone()),
            DeclaredType::Resolved(_) => None,
        }
    }

    fn clone_if_unresolved(&self) -> Option<String> {
        self.clone_declared()
    }
}
