/// MCP surface over stdio
///
/// JSON-RPC 2.0 framing lives in `protocol`; `server` owns the read loop,
/// the tool catalogue, and dispatch into the analytics engine.

pub mod protocol;
pub mod server;

pub use server::McpServer;
