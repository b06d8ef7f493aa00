use derive_more::Display;
use lazy_static::lazy_static;
use phf::phf_map;
use regex::Regex;

/// BuiltinType is the tag a resolved [`crate::field::Field`] type settles on: either one of the
/// proto scalar value types, or one of the three reference kinds a symbolic type name can
/// resolve to.
///
/// [scalar value types] https://developers.google.com/protocol-buffers/docs/overview#scalar
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    #[display(fmt = "double")]
    Double,
    #[display(fmt = "float")]
    Float,
    #[display(fmt = "int32")]
    Int32,
    #[display(fmt = "int64")]
    Int64,
    #[display(fmt = "uint32")]
    Uint32,
    #[display(fmt = "uint64")]
    Uint64,
    #[display(fmt = "sint32")]
    Sint32,
    #[display(fmt = "sint64")]
    Sint64,
    #[display(fmt = "fixed32")]
    Fixed32,
    #[display(fmt = "fixed64")]
    Fixed64,
    #[display(fmt = "sfixed32")]
    Sfixed32,
    #[display(fmt = "sfixed64")]
    Sfixed64,
    #[display(fmt = "bool")]
    Bool,
    #[display(fmt = "string")]
    String,
    #[display(fmt = "bytes")]
    Bytes,
    /// Assigned to a field whose declared type resolved to an [`crate::enum_def::Enum`].
    #[display(fmt = "enum")]
    Enum,
    /// Assigned to a field whose declared type resolved to a non-group [`crate::message::Message`].
    #[display(fmt = "message")]
    Message,
    /// Assigned to a field whose declared type resolved to a group [`crate::message::Message`].
    #[display(fmt = "group")]
    Group,
}

impl BuiltinType {
    /// Map a builtin type name (e.g. `"int32"`) to its tag, if it is one.
    ///
    /// Note that `"enum"`, `"message"` and `"group"` are not builtin *names* a parser ever
    /// emits for a declared field type (those tags are only ever assigned by the resolver), so
    /// they are intentionally absent from this table.
    pub fn from_name(name: &str) -> Option<Self> {
        BUILTIN_NAMES.get(name).copied()
    }

    /// True for the scalar types proto allows as a map key: every integral type, `bool` and
    /// `string`. `float`, `double`, `bytes`, and of course `enum`/`message`/`group`, are not
    /// valid map key types.
    pub fn is_valid_map_key(self) -> bool {
        matches!(
            self,
            BuiltinType::Int32
                | BuiltinType::Int64
                | BuiltinType::Uint32
                | BuiltinType::Uint64
                | BuiltinType::Sint32
                | BuiltinType::Sint64
                | BuiltinType::Fixed32
                | BuiltinType::Fixed64
                | BuiltinType::Sfixed32
                | BuiltinType::Sfixed64
                | BuiltinType::Bool
                | BuiltinType::String
        )
    }
}

/// Compile-time table of builtin scalar type names to tags, the same way `TYPE_MAPPING` in
/// `typescript/constants.rs` maps proto type names to their generated TypeScript counterpart.
static BUILTIN_NAMES: phf::Map<&'static str, BuiltinType> = phf_map! {
    "double" => BuiltinType::Double,
    "float" => BuiltinType::Float,
    "int32" => BuiltinType::Int32,
    "int64" => BuiltinType::Int64,
    "uint32" => BuiltinType::Uint32,
    "uint64" => BuiltinType::Uint64,
    "sint32" => BuiltinType::Sint32,
    "sint64" => BuiltinType::Sint64,
    "fixed32" => BuiltinType::Fixed32,
    "fixed64" => BuiltinType::Fixed64,
    "sfixed32" => BuiltinType::Sfixed32,
    "sfixed64" => BuiltinType::Sfixed64,
    "bool" => BuiltinType::Bool,
    "string" => BuiltinType::String,
    "bytes" => BuiltinType::Bytes,
};

/// scalars defines all the possible [scalar value types]
/// [scalar value types] https://developers.google.com/protocol-buffers/docs/overview#scalar
pub static SCALARS: phf::Set<&'static str> = phf::phf_set! {
    "double", "float",
    "int32", "int64", "uint32", "uint64", "sint32", "sint64",
    "fixed32", "fixed64", "sfixed32", "sfixed64",
    "bool", "string", "bytes"
};

lazy_static! {
    /// `TYPE` grammar: matches a bare builtin type name.
    static ref TYPE_RE: Regex = Regex::new(
        r"^(double|float|u?int(32|64)|s(int|fixed)(32|64)|fixed(32|64)|bool|string|bytes)$"
    ).unwrap();

    /// `TYPEREF` grammar: a dotted identifier path, optionally rooted with a leading `.`.
    static ref TYPEREF_RE: Regex = Regex::new(
        r"^\.?[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$"
    ).unwrap();
}

/// Returns true if `name` matches the `TYPE` grammar (a bare builtin type name).
pub fn is_type(name: &str) -> bool {
    TYPE_RE.is_match(name)
}

/// Returns true if `name` matches the `TYPEREF` grammar (a dotted, optionally
/// fully-qualified, identifier path).
pub fn is_type_ref(name: &str) -> bool {
    TYPEREF_RE.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(BuiltinType::from_name("int32"), Some(BuiltinType::Int32));
        assert_eq!(BuiltinType::from_name("pb.foo.Bar"), None);
    }

    #[test]
    fn test_map_key_validity() {
        assert!(BuiltinType::Int32.is_valid_map_key());
        assert!(BuiltinType::String.is_valid_map_key());
        assert!(!BuiltinType::Bytes.is_valid_map_key());
        assert!(!BuiltinType::Double.is_valid_map_key());
        assert!(!BuiltinType::Message.is_valid_map_key());
    }

    #[test]
    fn test_type_ref_grammar() {
        assert!(is_type_ref("foo.bar.Baz"));
        assert!(is_type_ref(".foo.bar.Baz"));
        assert!(is_type_ref("Baz"));
        assert!(!is_type_ref("1foo"));
        assert!(!is_type_ref("foo..bar"));
        assert!(!is_type_ref(""));
    }

    #[test]
    fn test_type_grammar() {
        assert!(is_type("int32"));
        assert!(is_type("bytes"));
        assert!(!is_type("enum"));
        assert!(!is_type("pb.Foo"));
    }
}
