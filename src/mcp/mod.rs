//! Minimal MCP server: JSON-RPC 2.0 framing, method dispatch, and the stdio
//! transport an MCP host launches this process with.

pub mod protocol;
pub mod server;
pub mod stdio;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
pub use server::McpServer;
pub use stdio::{run_stdio_server, serve};
