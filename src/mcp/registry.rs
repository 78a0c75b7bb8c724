use std::{collections::HashMap, future::Future, pin::Pin};

use rmcp::ErrorData as McpError;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ReadResourceRequestParam, ReadResourceResult,
};

use super::server::IntakeMcpServer;

pub(crate) type ResourceFuture =
    Pin<Box<dyn Future<Output = Result<ReadResourceResult, McpError>> + Send>>;
pub(crate) type ToolFuture =
    Pin<Box<dyn Future<Output = Result<CallToolResult, McpError>> + Send>>;

pub(crate) type ResourceHandler = fn(&IntakeMcpServer, ReadResourceRequestParam) -> ResourceFuture;
pub(crate) type ToolHandler = fn(&IntakeMcpServer, CallToolRequestParam) -> ToolFuture;

/// Dispatch table mapping resource URIs and tool names to handler functions.
pub(crate) struct Registry {
    pub(crate) resources: HashMap<&'static str, ResourceHandler>,
    pub(crate) tools: HashMap<&'static str, ToolHandler>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            resources: HashMap::new(),
            tools: HashMap::new(),
        }
    }

    pub(crate) fn register_resource(&mut self, uri: &'static str, handler: ResourceHandler) {
        self.resources.insert(uri, handler);
    }

    pub(crate) fn register_tool(&mut self, name: &'static str, handler: ToolHandler) {
        self.tools.insert(name, handler);
    }
}
