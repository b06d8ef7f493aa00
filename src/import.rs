//! The import composer: recursively loads dependent schemas, deduplicates them by canonical
//! file path, and merges their top-level packages into the namespace tree.

use serde_json::{Map, Value};

use crate::{
    builder::Root,
    error::{BuildError, ImportError},
    external::{PathTools, ResourceLoader, TextParser},
};

/// How a file was named for the purposes of canonicalization and dedup.
#[derive(Debug, Clone)]
pub enum FileRef {
    Name(String),
    RootFile { root: String, file: String },
}

const WELL_KNOWN_DESCRIPTOR: &str = "google/protobuf/descriptor.proto";

impl Root {
    /// Merges one descriptor file and, recursively, everything it transitively references.
    pub fn import(
        &mut self,
        json: Value,
        filename: Option<FileRef>,
        loader: &dyn ResourceLoader,
        parser: Option<&dyn TextParser>,
        path_tools: Option<&dyn PathTools>,
    ) -> Result<(), ImportError> {
        let canonical = filename.as_ref().map(|f| canonicalize_file_ref(f, path_tools));

        if let Some(cname) = &canonical {
            if self.imported.contains(cname) {
                self.reset();
                return Ok(());
            }
            self.imported.insert(cname.clone());
        }

        let mut json = json
            .as_object()
            .cloned()
            .ok_or_else(|| ImportError::Build(BuildError::InvalidDefinition("file descriptor".to_string())))?;

        let had_root_before = self.import_root.is_some();
        if let Some(FileRef::RootFile { root, .. }) = &filename {
            self.import_root = Some(canonicalize_or(root, path_tools));
        }
        let installed_this_call = !had_root_before && self.import_root.is_some();

        if let Some(syntax) = json.get("syntax").and_then(Value::as_str).map(str::to_string) {
            stamp_syntax(&mut json, &syntax);
        }

        if let Some(imports) = json.get("imports").and_then(Value::as_array).cloned() {
            for (index, entry) in imports.into_iter().enumerate() {
                self.import_entry(entry, loader, parser, path_tools, &canonical, index)?;
            }
        }

        if installed_this_call {
            self.import_root = None;
        }

        if let Some(pkg) = json.get("package").and_then(Value::as_str) {
            self.define(pkg)?;
        }
        let package_ptr = self.ptr;

        if let Some(Value::Object(opts)) = json.get("options") {
            crate::builder::merge_options(&mut self.arena[package_ptr.0].kind, opts);
        }

        for key in ["messages", "enums", "services"] {
            if let Some(Value::Array(items)) = json.get(key) {
                let defs = items
                    .iter()
                    .map(|v| {
                        v.as_object()
                            .cloned()
                            .ok_or_else(|| BuildError::InvalidDefinition(v.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                self.ptr = package_ptr;
                self.create_list(defs)?;
                self.ptr = package_ptr;
            }
        }

        // extends last: they may reference types declared earlier in the same file.
        if let Some(Value::Array(items)) = json.get("extends") {
            let defs = items
                .iter()
                .map(|v| {
                    v.as_object()
                        .cloned()
                        .ok_or_else(|| BuildError::InvalidDefinition(v.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            self.ptr = package_ptr;
            self.create_list(defs)?;
            self.ptr = package_ptr;
        }

        self.invalidate();
        self.reset();
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn import_entry(
        &mut self,
        entry: Value,
        loader: &dyn ResourceLoader,
        parser: Option<&dyn TextParser>,
        path_tools: Option<&dyn PathTools>,
        current_filename: &Option<String>,
        index: usize,
    ) -> Result<(), ImportError> {
        match entry {
            Value::String(relative) => {
                if relative == WELL_KNOWN_DESCRIPTOR {
                    return Ok(());
                }

                let root = self.effective_import_root(current_filename, &relative)?;
                let mut resolved = if root == "." {
                    relative
                } else {
                    let delim = if root.contains('\\') { '\\' } else { '/' };
                    format!("{}{}{}", root, delim, relative)
                };

                if resolved.ends_with(".proto") && parser.is_none() {
                    resolved.truncate(resolved.len() - ".proto".len());
                    resolved.push_str(".json");
                }

                let bytes = loader
                    .fetch(&resolved)
                    .ok_or_else(|| ImportError::ImportMissing(resolved.clone()))?;

                let descriptor = if resolved.ends_with(".proto") {
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    parser
                        .expect("a .proto import requires a TextParser")
                        .parse(&text)?
                } else {
                    serde_json::from_slice(&bytes)
                        .map_err(|_| ImportError::Build(BuildError::InvalidDefinition(resolved.clone())))?
                };

                self.import(descriptor, Some(FileRef::Name(resolved)), loader, parser, path_tools)
            }
            Value::Object(obj) => {
                let synthetic = match current_filename {
                    Some(name) => synthesize_import_name(name, index),
                    None => format!("inline_import{}", index),
                };
                self.import(
                    Value::Object(obj),
                    Some(FileRef::Name(synthetic)),
                    loader,
                    parser,
                    path_tools,
                )
            }
            other => Err(ImportError::Build(BuildError::InvalidDefinition(other.to_string()))),
        }
    }

    fn effective_import_root(
        &self,
        current_filename: &Option<String>,
        relative: &str,
    ) -> Result<String, ImportError> {
        if let Some(root) = &self.import_root {
            return Ok(root.clone());
        }
        match current_filename {
            Some(name) => {
                let delim = if name.contains('\\') { '\\' } else { '/' };
                Ok(match name.rfind(delim) {
                    Some(idx) => name[..idx].to_string(),
                    None => ".".to_string(),
                })
            }
            None => Err(ImportError::ImportRootUnknown {
                import: relative.to_string(),
            }),
        }
    }
}

fn canonicalize_or(path: &str, path_tools: Option<&dyn PathTools>) -> String {
    path_tools.and_then(|pt| pt.canonicalize(path)).unwrap_or_else(|| path.to_string())
}

fn canonicalize_file_ref(file_ref: &FileRef, path_tools: Option<&dyn PathTools>) -> String {
    match file_ref {
        FileRef::Name(name) => canonicalize_or(name, path_tools),
        FileRef::RootFile { root, file } => {
            let delim = if root.contains('\\') || file.contains('\\') { '\\' } else { '/' };
            format!("{}{}{}", canonicalize_or(root, path_tools), delim, file)
        }
    }
}

/// Synthesizes a unique filename for an inlined (object) import by appending `_import<i>`
/// before the extension, or at the end if there is none.
fn synthesize_import_name(base: &str, index: usize) -> String {
    let last_sep = base.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    match base[last_sep..].rfind('.') {
        Some(rel_idx) => {
            let dot = last_sep + rel_idx;
            format!("{}_import{}{}", &base[..dot], index, &base[dot..])
        }
        None => format!("{}_import{}", base, index),
    }
}

/// Stamps `syntax` onto every nested message and enum descriptor reachable from `json`.
/// Enums don't recurse further; messages do, into their own nested messages/enums.
fn stamp_syntax(json: &mut Map<String, Value>, syntax: &str) {
    if let Some(Value::Array(items)) = json.get_mut("messages") {
        for item in items {
            if let Some(obj) = item.as_object_mut() {
                stamp_message(obj, syntax);
            }
        }
    }
    if let Some(Value::Array(items)) = json.get_mut("enums") {
        for item in items {
            if let Some(obj) = item.as_object_mut() {
                obj.insert("syntax".to_string(), Value::String(syntax.to_string()));
            }
        }
    }
}

fn stamp_message(msg: &mut Map<String, Value>, syntax: &str) {
    msg.insert("syntax".to_string(), Value::String(syntax.to_string()));
    if let Some(Value::Array(items)) = msg.get_mut("messages") {
        for item in items {
            if let Some(obj) = item.as_object_mut() {
                stamp_message(obj, syntax);
            }
        }
    }
    if let Some(Value::Array(items)) = msg.get_mut("enums") {
        for item in items {
            if let Some(obj) = item.as_object_mut() {
                obj.insert("syntax".to_string(), Value::String(syntax.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use indoc::indoc;
    use serde_json::json;

    /// An in-memory resource loader: keeps fixtures as plain strings rather than touching disk.
    struct FixtureLoader {
        files: HashMap<String, Vec<u8>>,
        fetch_log: RefCell<Vec<String>>,
    }

    impl FixtureLoader {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                    .collect(),
                fetch_log: RefCell::new(Vec::new()),
            }
        }
    }

    impl ResourceLoader for FixtureLoader {
        fn fetch(&self, path: &str) -> Option<Vec<u8>> {
            self.fetch_log.borrow_mut().push(path.to_string());
            self.files.get(path).cloned()
        }
    }

    #[test]
    fn cross_file_resolution_binds_imported_message() {
        let loader = FixtureLoader::new(&[(
            "a.json",
            &json!({
                "package": "pkg",
                "messages": [{"name": "M", "fields": []}]
            })
            .to_string(),
        )]);

        let mut root = Root::new();
        let b = json!({
            "imports": ["a.json"],
            "messages": [{
                "name": "B",
                "fields": [{"rule": "optional", "name": "m", "type": "pkg.M", "id": 1}]
            }]
        });
        root.import(b, Some(FileRef::Name("b.json".to_string())), &loader, None, None)
            .unwrap();
        root.resolve_all().unwrap();

        let field_id = root.lookup(Some("B.m"), false).unwrap();
        let target_id = root.lookup(Some("pkg.M"), false).unwrap();
        match &root.arena[field_id.0].kind {
            crate::node::NodeKind::Field(f) => {
                assert_eq!(*f.resolved_type.borrow(), Some(target_id));
            }
            other => panic!("expected a field, got {:?}", other),
        }
    }

    #[test]
    fn importing_the_same_file_twice_is_idempotent() {
        let loader = FixtureLoader::new(&[]);
        let json = json!({
            "package": "pkg",
            "messages": [{"name": "M", "fields": []}]
        });

        let mut once = Root::new();
        once.import(json.clone(), Some(FileRef::Name("x.json".to_string())), &loader, None, None)
            .unwrap();
        let once_count = once.arena.len();

        let mut twice = Root::new();
        twice
            .import(json.clone(), Some(FileRef::Name("x.json".to_string())), &loader, None, None)
            .unwrap();
        twice
            .import(json, Some(FileRef::Name("x.json".to_string())), &loader, None, None)
            .unwrap();
        let twice_count = twice.arena.len();

        assert_eq!(once_count, twice_count);
    }

    #[test]
    fn missing_import_is_an_error() {
        let loader = FixtureLoader::new(&[]);
        let mut root = Root::new();
        let err = root
            .import(
                json!({"imports": ["missing.json"]}),
                Some(FileRef::Name("root.json".to_string())),
                &loader,
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ImportError::ImportMissing(_)));
    }

    #[test]
    fn well_known_descriptor_import_is_skipped() {
        let loader = FixtureLoader::new(&[]);
        let mut root = Root::new();
        root.import(
            json!({"imports": ["google/protobuf/descriptor.proto"]}),
            Some(FileRef::Name("root.json".to_string())),
            &loader,
            None,
            None,
        )
        .unwrap();
    }

    #[test]
    fn relative_import_with_no_filename_context_is_an_error() {
        let loader = FixtureLoader::new(&[]);
        let mut root = Root::new();
        let err = root
            .import(json!({"imports": ["a.json"]}), None, &loader, None, None)
            .unwrap_err();
        assert!(matches!(err, ImportError::ImportRootUnknown { .. }));
    }

    #[test]
    fn inline_object_import_gets_synthesized_name_and_is_deduped() {
        let loader = FixtureLoader::new(&[]);
        let mut root = Root::new();
        let inline = json!({"package": "inl", "messages": [{"name": "M", "fields": []}]});
        root.import(
            json!({"imports": [inline]}),
            Some(FileRef::Name("root.json".to_string())),
            &loader,
            None,
            None,
        )
        .unwrap();

        assert!(root.imported.contains("root_import0.json"));
    }

    #[test]
    fn root_file_pair_canonicalizes_with_matching_delimiter() {
        let loader = FixtureLoader::new(&[]);
        let mut root = Root::new();
        root.import(
            json!({"package": "pkg", "messages": [{"name": "M", "fields": []}]}),
            Some(FileRef::RootFile {
                root: "proj".to_string(),
                file: "a.json".to_string(),
            }),
            &loader,
            None,
            None,
        )
        .unwrap();
        assert!(root.imported.contains("proj/a.json"));
    }

    #[test]
    fn syntax_is_stamped_onto_nested_messages_and_enums() {
        let loader = FixtureLoader::new(&[]);
        let mut root = Root::new();
        root.import(
            json!({
                "syntax": "proto3",
                "messages": [{
                    "name": "Outer",
                    "fields": [],
                    "messages": [{"name": "Inner", "fields": []}],
                    "enums": [{"name": "E", "values": [{"name": "A", "id": 0}]}]
                }]
            }),
            Some(FileRef::Name("s.json".to_string())),
            &loader,
            None,
            None,
        )
        .unwrap();

        for path in ["Outer", "Outer.Inner", "Outer.E"] {
            let id = root.lookup(Some(path), false).unwrap();
            let syntax = match &root.arena[id.0].kind {
                crate::node::NodeKind::Message(m) => m.syntax,
                crate::node::NodeKind::Enum(e) => e.syntax,
                other => panic!("unexpected kind {:?}", other),
            };
            assert_eq!(syntax, crate::syntax::Syntax::Proto3);
        }
    }

    /// A `TextParser` stub standing in for the out-of-scope `.proto` grammar: it only
    /// understands the one fixture below, the same way a test-only tokenizer would.
    struct StubTextParser;

    impl TextParser for StubTextParser {
        fn parse(&self, contents: &str) -> Result<Value, ImportError> {
            assert!(contents.contains("package pkg"));
            Ok(json!({
                "package": "pkg",
                "messages": [{"name": "M", "fields": []}]
            }))
        }
    }

    #[test]
    fn proto_import_is_dispatched_to_the_supplied_text_parser() {
        let loader = FixtureLoader::new(&[(
            "dep.proto",
            indoc! {"
                syntax = \"proto3\";
                package pkg;
                message M {}
            "},
        )]);
        let parser = StubTextParser;

        let mut root = Root::new();
        root.import(
            json!({
                "imports": ["dep.proto"],
                "messages": [{
                    "name": "B",
                    "fields": [{"rule": "optional", "name": "m", "type": "pkg.M", "id": 1}]
                }]
            }),
            Some(FileRef::Name("b.json".to_string())),
            &loader,
            Some(&parser),
            None,
        )
        .unwrap();

        root.resolve_all().unwrap();
        assert!(root.lookup(Some("pkg.M"), false).is_some());
    }
}
