pub mod builder;
pub mod classifier;
pub mod enum_def;
pub mod error;
pub mod extension;
pub mod external;
pub mod field;
pub mod import;
pub mod message;
pub mod namespace;
pub mod node;
pub mod oneof;
pub mod scalar;
pub mod scope;
pub mod service;
pub mod syntax;

mod build;
mod resolve;

pub use builder::{BuildOptions, Root, ID_MAX, ID_MIN};
pub use classifier::{classify, is_enum, is_extend, is_message, is_message_field, is_service, DefinitionKind};
pub use error::{BuildError, ImportError, ResolveError};
pub use external::{PathTools, ResourceLoader, TextParser};
pub use import::FileRef;
pub use node::{Node, NodeId, NodeKind};
