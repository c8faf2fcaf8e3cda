// MCP (Model Context Protocol) server exposing a sandbox's scripts and
// helper programs to agent clients over stdio

pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use server::McpServer;
pub use transport::StdioTransport;
