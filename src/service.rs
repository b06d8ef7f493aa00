use std::cell::RefCell;

use linked_hash_map::LinkedHashMap;
use serde_json::Value;

use crate::node::NodeId;

/// A namespace of [`RpcMethod`] children.
#[derive(Debug)]
pub struct Service {
    pub children: LinkedHashMap<String, NodeId>,
    pub options: LinkedHashMap<String, Value>,
}

impl Service {
    pub fn new() -> Self {
        Self {
            children: LinkedHashMap::new(),
            options: LinkedHashMap::new(),
        }
    }
}

impl Default for Service {
    fn default() -> Self {
        Self::new()
    }
}

/// A single RPC method. `resolved_request`/`resolved_response` are populated by `resolveAll`
/// against the method's parent service; both must resolve to messages.
#[derive(Debug)]
pub struct RpcMethod {
    pub request_name: String,
    pub response_name: String,
    pub request_stream: bool,
    pub response_stream: bool,
    pub options: LinkedHashMap<String, Value>,
    pub resolved_request: RefCell<Option<NodeId>>,
    pub resolved_response: RefCell<Option<NodeId>>,
}

impl RpcMethod {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        request_name: String,
        response_name: String,
        request_stream: bool,
        response_stream: bool,
        options: LinkedHashMap<String, Value>,
    ) -> Self {
        Self {
            request_name,
            response_name,
            request_stream,
            response_stream,
            options,
            resolved_request: RefCell::new(None),
            resolved_response: RefCell::new(None),
        }
    }
}
