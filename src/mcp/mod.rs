//! Model Context Protocol (MCP) surface for the intake service.
//!
//! JSON-RPC 2.0 requests arrive over HTTP (see [`crate::api`]) and are dispatched here by
//! method name. The surface area consists of:
//!
//! - Tools: `echo`, `upload_files`, `check_job`, `add_schema`, `list_schemas`, `get_schema`,
//!   `list_resources`, `read_resource`, and `get_prompt`.
//! - Resources: `file:///example.txt` and `schemas://builtin`.
//! - Prompts: `code-review`.
//!
//! Handlers, schemas, and formatting helpers are kept in focused submodules to make tests and
//! reviews small and targeted.

mod format;
pub(crate) mod handlers;
pub mod jsonrpc;
mod prompts;
mod registry;
mod schemas;
mod server;
mod session;

pub use server::{IntakeMcpServer, Reply};
pub use session::SessionRegistry;

/// The only protocol revision accepted in the `MCP-Protocol-Version` header.
pub const PROTOCOL_VERSION: &str = "2025-11-25";
