#![deny(missing_docs)]

//! Core library for the document intake MCP server.

/// HTTP routing for the protocol endpoint and health probe.
pub mod api;
/// Service wiring.
pub mod app;
/// ZIP and TAR extraction into job folders.
pub mod archive;
/// Three-method document classification and consensus voting.
pub mod classification;
/// Environment-driven configuration management.
pub mod config;
/// OCR, spreadsheet, markdown, and field extraction.
pub mod extraction;
/// Upload orchestration and job-folder persistence.
pub mod ingest;
/// Asynchronous job registry and bounded worker pool.
pub mod jobs;
/// Language model client abstraction and adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Upload metrics helpers.
pub mod metrics;
/// Custom and built-in extraction schemas.
pub mod schema_registry;
