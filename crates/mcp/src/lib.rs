//! MCP client side of the tool gateway.
//!
//! This crate provides:
//! - JSON-RPC 2.0 over stdio (`stdio`) and Streamable HTTP (`streamable_http`)
//! - In-cluster attach sessions driven through a CLI (`attach`)
//! - MCP client handshake and `tools/call` (`client`)
//! - Provider to transport routing (`router`) and one-shot invocation (`invoke`)
//! - Response templates (`transform`)
//! - The tool gateway itself (`gateway`)

pub mod attach;
pub mod client;
pub mod error;
pub mod gateway;
pub mod invoke;
pub mod router;
pub mod stdio;
pub mod streamable_http;
pub mod traits;
pub mod transform;
pub mod types;

pub use {
    attach::AttachOptions,
    client::{McpClient, McpClientState},
    error::{Error, McpTransportError, Result},
    gateway::ToolGateway,
    invoke::{ConnectOptions, invoke},
    router::{StreamableHttpTarget, TransportRouter, TransportTarget},
    streamable_http::{HttpOptions, StreamableHttpTransport},
    traits::McpTransport,
    transform::{HandlebarsEngine, ResponseTransformer, TemplateEngine, TemplateError},
};
